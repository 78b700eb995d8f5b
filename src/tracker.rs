/// Per-window new-tab tracking
///
/// Decides whether a freshly opened new-tab page is redirected to the
/// countdown page. The first new tab in a window keeps the browser's default
/// page; every later new tab in that window is overridden.
///
/// State per window:
///
/// ```text
/// Fresh --first new tab--> FirstSkipped --next new tab--> Overriding
///   ^                                                          |
///   +-------------------- reset_window / reset_all ------------+
/// ```
///
/// All mutation happens inside a single event callback; the caller owns the
/// tracker and serializes access to it.
use std::collections::HashMap;

use serde::Serialize;

use crate::error::TrackerError;
use crate::tab_data::{TabEvent, WindowSnapshot, WINDOW_ID_NONE};

/// How long a decided tab is shielded from re-evaluation
pub const PROTECTION_TTL_MS: f64 = 5_000.0;

/// How often stale window entries are swept
pub const SWEEP_INTERVAL_MS: i32 = 5 * 60 * 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TabPhase {
    Fresh,
    FirstSkipped,
    Overriding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowTabState {
    pub window_id: i32,
    pub new_tab_count: u32,
    pub first_tab_skipped: bool,
}

impl WindowTabState {
    pub fn new(window_id: i32) -> WindowTabState {
        WindowTabState {
            window_id,
            new_tab_count: 0,
            first_tab_skipped: false,
        }
    }

    pub fn phase(&self) -> TabPhase {
        match (self.first_tab_skipped, self.new_tab_count) {
            (false, _) => TabPhase::Fresh,
            (true, 0..=1) => TabPhase::FirstSkipped,
            (true, _) => TabPhase::Overriding,
        }
    }

    fn reset(&mut self) {
        self.new_tab_count = 0;
        self.first_tab_skipped = false;
    }
}

/// Tab ids recently decided on, each with an expiry timestamp (ms)
#[derive(Debug, Clone, Default)]
pub struct ProtectedTabSet {
    expiries: HashMap<i32, f64>,
}

impl ProtectedTabSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protect(&mut self, tab_id: i32, now_ms: f64) {
        self.expiries.insert(tab_id, now_ms + PROTECTION_TTL_MS);
    }

    pub fn is_protected(&self, tab_id: i32, now_ms: f64) -> bool {
        self.expiries
            .get(&tab_id)
            .is_some_and(|&expires_at| now_ms < expires_at)
    }

    /// Drop expired entries, returning how many were removed
    pub fn release_expired(&mut self, now_ms: f64) -> usize {
        let before = self.expiries.len();
        self.expiries.retain(|_, expires_at| now_ms < *expires_at);
        before - self.expiries.len()
    }

    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }

    pub fn clear(&mut self) {
        self.expiries.clear();
    }
}

#[derive(Debug, Default)]
pub struct TabOverrideTracker {
    windows: HashMap<i32, WindowTabState>,
    protected: ProtectedTabSet,
}

impl TabOverrideTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the windows and tabs already open when the extension starts
    ///
    /// A window that already shows a new-tab page has used up its default
    /// first tab.
    pub fn seed(&mut self, windows: &[WindowSnapshot]) {
        for window in windows {
            let state = self
                .windows
                .entry(window.id)
                .or_insert_with(|| WindowTabState::new(window.id));

            let open_new_tabs = window.tabs.iter().filter(|t| t.is_new_tab_page()).count() as u32;
            if open_new_tabs > 0 && !state.first_tab_skipped {
                state.first_tab_skipped = true;
                state.new_tab_count = open_new_tabs;
            }
        }
        log::debug!("Seeded tab tracking for {} window(s)", windows.len());
    }

    pub fn on_window_created(&mut self, window_id: i32) {
        self.windows
            .entry(window_id)
            .or_insert_with(|| WindowTabState::new(window_id));
    }

    pub fn on_window_removed(&mut self, window_id: i32) {
        self.windows.remove(&window_id);
    }

    /// Decide whether to redirect a newly created tab, failing safe
    ///
    /// Any processing error is logged and answered with "do not override".
    pub fn should_override(&mut self, tab: &TabEvent, now_ms: f64) -> bool {
        match self.evaluate(tab, now_ms) {
            Ok(decision) => decision,
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    /// Decide whether to redirect a newly created tab
    pub fn evaluate(&mut self, tab: &TabEvent, now_ms: f64) -> Result<bool, TrackerError> {
        let tab_id = tab
            .id
            .ok_or_else(|| TrackerError::EventProcessing("tab has no id".to_string()))?;

        if self.protected.is_protected(tab_id, now_ms) {
            log::debug!("Tab {} is protected, skipping", tab_id);
            return Ok(false);
        }

        if !tab.is_new_tab_page() {
            return Ok(false);
        }

        let window_id = match tab.window_id {
            Some(id) if id != WINDOW_ID_NONE => id,
            _ => {
                return Err(TrackerError::EventProcessing(format!(
                    "tab {} is not attached to a window",
                    tab_id
                )));
            }
        };

        let state = self
            .windows
            .entry(window_id)
            .or_insert_with(|| WindowTabState::new(window_id));

        let decision = if state.first_tab_skipped {
            state.new_tab_count += 1;
            true
        } else {
            state.first_tab_skipped = true;
            state.new_tab_count = 1;
            false
        };
        self.protected.protect(tab_id, now_ms);

        log::debug!(
            "Window {} new tab #{} (tab {}): override={}",
            window_id,
            state.new_tab_count,
            tab_id,
            decision
        );
        Ok(decision)
    }

    /// `None` for windows that were never seen or have been closed
    pub fn window_state(&self, window_id: i32) -> Option<&WindowTabState> {
        self.windows.get(&window_id)
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn is_protected(&self, tab_id: i32, now_ms: f64) -> bool {
        self.protected.is_protected(tab_id, now_ms)
    }

    pub fn release_expired(&mut self, now_ms: f64) -> usize {
        self.protected.release_expired(now_ms)
    }

    /// Forget windows that no longer exist and expired protections
    ///
    /// Returns the number of window entries removed.
    pub fn sweep(&mut self, live_window_ids: &[i32], now_ms: f64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|id, _| live_window_ids.contains(id));
        self.protected.release_expired(now_ms);
        before - self.windows.len()
    }

    /// Put one window back to `Fresh`; returns false for unknown windows
    pub fn reset_window(&mut self, window_id: i32) -> bool {
        self.windows
            .get_mut(&window_id)
            .map(WindowTabState::reset)
            .is_some()
    }

    pub fn reset_all(&mut self) {
        self.windows.values_mut().for_each(WindowTabState::reset);
        self.protected.clear();
    }

    /// Drop all state; used on shutdown
    pub fn clear(&mut self) {
        self.windows.clear();
        self.protected.clear();
    }
}
