/// Background service worker: feeds browser window/tab events into the
/// [`TabOverrideTracker`] and redirects the tabs it picks
///
/// The JS side keeps the returned [`BackgroundHandle`] for the worker's
/// lifetime. `shutdown()` (or `free()`) unsubscribes every listener and
/// stops every timer.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::chrome;
use crate::tab_data::{TabEvent, WindowSnapshot};
use crate::tracker::{PROTECTION_TTL_MS, SWEEP_INTERVAL_MS, TabOverrideTracker};

/// Extension page that replaces overridden new tabs
pub const COUNTDOWN_PAGE: &str = "newtab.html";

/// Messages the popup sends to the background
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackgroundMessage {
    ResetTabTracking,
    #[serde(rename_all = "camelCase")]
    ResetWindow { window_id: i32 },
}

#[derive(Serialize)]
struct WindowQuery {
    populate: bool,
}

#[derive(Serialize)]
struct TabUpdate {
    url: String,
}

#[derive(Serialize)]
struct MessageReply {
    ok: bool,
}

type SharedTracker = Rc<RefCell<TabOverrideTracker>>;

/// One `setTimeout` per protected tab; all share the same delay so they
/// fire in the order they were scheduled
struct ExpiryTimers {
    callback: Closure<dyn FnMut()>,
    pending: Rc<RefCell<VecDeque<JsValue>>>,
}

impl ExpiryTimers {
    fn new(tracker: SharedTracker) -> Self {
        let pending: Rc<RefCell<VecDeque<JsValue>>> = Rc::default();
        let fired = pending.clone();
        let callback = Closure::<dyn FnMut()>::new(move || {
            fired.borrow_mut().pop_front();
            let released = tracker.borrow_mut().release_expired(js_sys::Date::now());
            if released > 0 {
                log::debug!("Released {} protected tab(s)", released);
            }
        });
        ExpiryTimers { callback, pending }
    }

    fn schedule(&self) {
        let handle = chrome::set_timeout(
            self.callback.as_ref().unchecked_ref(),
            PROTECTION_TTL_MS as i32,
        );
        self.pending.borrow_mut().push_back(handle);
    }

    fn cancel_all(&self) {
        for handle in self.pending.borrow_mut().drain(..) {
            chrome::clear_timeout(&handle);
        }
    }
}

struct Background {
    tracker: SharedTracker,
    expiry: Rc<ExpiryTimers>,
    on_tab_created: Closure<dyn FnMut(JsValue)>,
    on_window_created: Closure<dyn FnMut(JsValue)>,
    on_window_removed: Closure<dyn FnMut(JsValue)>,
    on_message: Closure<dyn FnMut(JsValue, JsValue, js_sys::Function)>,
    _on_sweep: Closure<dyn FnMut()>,
    sweep_handle: JsValue,
}

impl Background {
    fn start() -> Self {
        let tracker: SharedTracker = Rc::default();
        let expiry = Rc::new(ExpiryTimers::new(tracker.clone()));

        let on_tab_created = {
            let tracker = tracker.clone();
            let expiry = expiry.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |tab: JsValue| {
                handle_tab_created(&tracker, &expiry, tab);
            })
        };

        let on_window_created = {
            let tracker = tracker.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |window: JsValue| {
                match serde_wasm_bindgen::from_value::<WindowSnapshot>(window) {
                    Ok(window) => tracker.borrow_mut().on_window_created(window.id),
                    Err(e) => log::warn!("Ignoring malformed window event: {:?}", e),
                }
            })
        };

        let on_window_removed = {
            let tracker = tracker.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |window_id: JsValue| {
                match window_id.as_f64() {
                    Some(id) => tracker.borrow_mut().on_window_removed(id as i32),
                    None => log::warn!("Ignoring window removal without id: {:?}", window_id),
                }
            })
        };

        let on_message = {
            let tracker = tracker.clone();
            Closure::<dyn FnMut(JsValue, JsValue, js_sys::Function)>::new(
                move |message: JsValue, _sender: JsValue, send_response: js_sys::Function| {
                    let ok = handle_message(&tracker, message);
                    if let Ok(reply) = serde_wasm_bindgen::to_value(&MessageReply { ok }) {
                        let _ = send_response.call1(&JsValue::NULL, &reply);
                    }
                },
            )
        };

        let on_sweep = {
            let tracker = tracker.clone();
            Closure::<dyn FnMut()>::new(move || {
                spawn_local(sweep_windows(tracker.clone()));
            })
        };

        chrome::add_tab_created_listener(on_tab_created.as_ref().unchecked_ref());
        chrome::add_window_created_listener(on_window_created.as_ref().unchecked_ref());
        chrome::add_window_removed_listener(on_window_removed.as_ref().unchecked_ref());
        chrome::add_message_listener(on_message.as_ref().unchecked_ref());
        let sweep_handle = chrome::set_interval(on_sweep.as_ref().unchecked_ref(), SWEEP_INTERVAL_MS);

        spawn_local(seed_windows(tracker.clone()));
        log::info!("Background tab tracking started");

        Background {
            tracker,
            expiry,
            on_tab_created,
            on_window_created,
            on_window_removed,
            on_message,
            _on_sweep: on_sweep,
            sweep_handle,
        }
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        chrome::remove_tab_created_listener(self.on_tab_created.as_ref().unchecked_ref());
        chrome::remove_window_created_listener(self.on_window_created.as_ref().unchecked_ref());
        chrome::remove_window_removed_listener(self.on_window_removed.as_ref().unchecked_ref());
        chrome::remove_message_listener(self.on_message.as_ref().unchecked_ref());
        chrome::clear_interval(&self.sweep_handle);
        self.expiry.cancel_all();
        self.tracker.borrow_mut().clear();
        log::info!("Background tab tracking stopped");
    }
}

/// Handle to the running background service, owned by the JS service worker
#[wasm_bindgen]
pub struct BackgroundHandle {
    inner: Option<Background>,
}

#[wasm_bindgen]
impl BackgroundHandle {
    /// Subscribe to browser events and start tracking
    #[wasm_bindgen(constructor)]
    pub fn new() -> BackgroundHandle {
        BackgroundHandle {
            inner: Some(Background::start()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_some()
    }

    /// Tracking state for one window, `undefined` for unknown windows
    pub fn window_state(&self, window_id: i32) -> JsValue {
        self.inner
            .as_ref()
            .and_then(|bg| {
                let tracker = bg.tracker.borrow();
                tracker
                    .window_state(window_id)
                    .and_then(|state| serde_wasm_bindgen::to_value(state).ok())
            })
            .unwrap_or(JsValue::UNDEFINED)
    }

    /// Unsubscribe every listener, stop timers and drop all tracked state
    pub fn shutdown(&mut self) {
        self.inner.take();
    }
}

impl Default for BackgroundHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracker outcome for one created tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TabCreated {
    /// Tab to send to the countdown page
    redirect: Option<i32>,
    /// The tab just became protected and needs an expiry timer
    schedule_expiry: bool,
}

fn track_tab_created(tracker: &mut TabOverrideTracker, tab: &TabEvent, now_ms: f64) -> TabCreated {
    let was_protected = tab.id.is_some_and(|id| tracker.is_protected(id, now_ms));
    let decision = tracker.should_override(tab, now_ms);
    let is_protected = tab.id.is_some_and(|id| tracker.is_protected(id, now_ms));

    TabCreated {
        redirect: tab.id.filter(|_| decision),
        schedule_expiry: is_protected && !was_protected,
    }
}

fn handle_tab_created(tracker: &SharedTracker, expiry: &ExpiryTimers, tab: JsValue) {
    let tab: TabEvent = match serde_wasm_bindgen::from_value(tab) {
        Ok(tab) => tab,
        Err(e) => {
            log::warn!("Ignoring malformed tab event: {:?}", e);
            return;
        }
    };

    let outcome = track_tab_created(&mut tracker.borrow_mut(), &tab, js_sys::Date::now());

    if outcome.schedule_expiry {
        expiry.schedule();
    }

    if let Some(tab_id) = outcome.redirect {
        spawn_local(redirect_to_countdown(tab_id));
    }
}

fn handle_message(tracker: &SharedTracker, message: JsValue) -> bool {
    match serde_wasm_bindgen::from_value::<BackgroundMessage>(message) {
        Ok(message) => apply_message(&mut tracker.borrow_mut(), message),
        Err(e) => {
            log::debug!("Ignoring unrelated runtime message: {:?}", e);
            false
        }
    }
}

/// Apply a popup message, `false` when it named an unknown window
fn apply_message(tracker: &mut TabOverrideTracker, message: BackgroundMessage) -> bool {
    match message {
        BackgroundMessage::ResetTabTracking => {
            tracker.reset_all();
            log::info!("Tab tracking reset for all windows");
            true
        }
        BackgroundMessage::ResetWindow { window_id } => {
            let known = tracker.reset_window(window_id);
            log::info!("Tab tracking reset for window {} (known: {})", window_id, known);
            known
        }
    }
}

async fn redirect_to_countdown(tab_id: i32) {
    let update = TabUpdate {
        url: chrome::runtime_get_url(COUNTDOWN_PAGE),
    };
    let properties = match serde_wasm_bindgen::to_value(&update) {
        Ok(properties) => properties,
        Err(e) => {
            log::warn!("Failed to build tab update: {:?}", e);
            return;
        }
    };

    if let Err(e) = chrome::tabs_update(tab_id, properties).await {
        log::warn!("Failed to redirect tab {}: {:?}", tab_id, e);
    }
}

async fn query_windows(populate: bool) -> Result<Vec<WindowSnapshot>, String> {
    let query = serde_wasm_bindgen::to_value(&WindowQuery { populate })
        .map_err(|e| format!("Failed to serialize query: {:?}", e))?;

    let windows_js = chrome::windows_get_all(query)
        .await
        .map_err(|e| format!("Failed to list windows: {:?}", e))?;

    serde_wasm_bindgen::from_value(windows_js).map_err(|e| format!("Failed to parse windows: {:?}", e))
}

async fn seed_windows(tracker: SharedTracker) {
    match query_windows(true).await {
        Ok(windows) => tracker.borrow_mut().seed(&windows),
        Err(e) => log::warn!("{}", e),
    }
}

async fn sweep_windows(tracker: SharedTracker) {
    match query_windows(false).await {
        Ok(windows) => {
            let live: Vec<i32> = windows.iter().map(|w| w.id).collect();
            let removed = tracker.borrow_mut().sweep(&live, js_sys::Date::now());
            if removed > 0 {
                log::debug!("Swept {} stale window(s)", removed);
            }
        }
        Err(e) => log::warn!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_message_shape() {
        let json = serde_json::to_value(BackgroundMessage::ResetTabTracking).unwrap();
        assert_eq!(json, serde_json::json!({"type": "resetTabTracking"}));

        let json = serde_json::to_value(BackgroundMessage::ResetWindow { window_id: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "resetWindow", "windowId": 4}));
    }

    #[test]
    fn test_parse_reset_window_message() {
        let message: BackgroundMessage =
            serde_json::from_str(r#"{"type": "resetWindow", "windowId": 12}"#).unwrap();
        assert_eq!(message, BackgroundMessage::ResetWindow { window_id: 12 });

        assert!(serde_json::from_str::<BackgroundMessage>(r#"{"type": "somethingElse"}"#).is_err());
    }

    const NEW_TAB: &str = "chrome://newtab/";

    #[test]
    fn test_first_tab_is_protected_but_not_redirected() {
        let mut tracker = TabOverrideTracker::new();
        tracker.on_window_created(1);

        let outcome = track_tab_created(&mut tracker, &TabEvent::new(10, 1, NEW_TAB), 0.0);

        assert_eq!(
            outcome,
            TabCreated {
                redirect: None,
                schedule_expiry: true,
            }
        );
    }

    #[test]
    fn test_second_tab_is_redirected_and_protected() {
        let mut tracker = TabOverrideTracker::new();
        tracker.on_window_created(1);
        track_tab_created(&mut tracker, &TabEvent::new(10, 1, NEW_TAB), 0.0);

        let outcome = track_tab_created(&mut tracker, &TabEvent::new(11, 1, NEW_TAB), 50.0);

        assert_eq!(
            outcome,
            TabCreated {
                redirect: Some(11),
                schedule_expiry: true,
            }
        );
    }

    #[test]
    fn test_duplicate_event_schedules_no_second_timer() {
        let mut tracker = TabOverrideTracker::new();
        tracker.on_window_created(1);
        track_tab_created(&mut tracker, &TabEvent::new(10, 1, NEW_TAB), 0.0);
        track_tab_created(&mut tracker, &TabEvent::new(11, 1, NEW_TAB), 50.0);

        let outcome = track_tab_created(&mut tracker, &TabEvent::new(11, 1, NEW_TAB), 100.0);

        assert_eq!(outcome, TabCreated::default());
        assert_eq!(tracker.window_state(1).unwrap().new_tab_count, 2);
    }

    #[test]
    fn test_expired_protection_is_scheduled_again() {
        let mut tracker = TabOverrideTracker::new();
        tracker.on_window_created(1);
        track_tab_created(&mut tracker, &TabEvent::new(10, 1, NEW_TAB), 0.0);
        track_tab_created(&mut tracker, &TabEvent::new(11, 1, NEW_TAB), 0.0);

        let later = PROTECTION_TTL_MS + 1.0;
        assert_eq!(tracker.release_expired(later), 2);
        let outcome = track_tab_created(&mut tracker, &TabEvent::new(11, 1, NEW_TAB), later);

        assert_eq!(outcome.redirect, Some(11));
        assert!(outcome.schedule_expiry);
    }

    #[test]
    fn test_ignored_tabs_need_no_timer() {
        let mut tracker = TabOverrideTracker::new();
        tracker.on_window_created(1);

        let regular = track_tab_created(&mut tracker, &TabEvent::new(10, 1, "https://example.com/"), 0.0);
        assert_eq!(regular, TabCreated::default());

        let mut without_id = TabEvent::new(0, 1, NEW_TAB);
        without_id.id = None;
        assert_eq!(track_tab_created(&mut tracker, &without_id, 0.0), TabCreated::default());

        let detached = TabEvent::new(12, crate::tab_data::WINDOW_ID_NONE, NEW_TAB);
        assert_eq!(track_tab_created(&mut tracker, &detached, 0.0), TabCreated::default());
    }

    #[test]
    fn test_apply_reset_messages() {
        let mut tracker = TabOverrideTracker::new();
        tracker.on_window_created(1);
        tracker.on_window_created(2);
        track_tab_created(&mut tracker, &TabEvent::new(10, 1, NEW_TAB), 0.0);
        track_tab_created(&mut tracker, &TabEvent::new(20, 2, NEW_TAB), 0.0);

        assert!(apply_message(&mut tracker, BackgroundMessage::ResetWindow { window_id: 1 }));
        assert!(!tracker.window_state(1).unwrap().first_tab_skipped);
        assert!(tracker.window_state(2).unwrap().first_tab_skipped);

        assert!(!apply_message(&mut tracker, BackgroundMessage::ResetWindow { window_id: 99 }));

        assert!(apply_message(&mut tracker, BackgroundMessage::ResetTabTracking));
        assert!(!tracker.window_state(2).unwrap().first_tab_skipped);
    }
}
