/// Countdown Tab - Chrome Extension that replaces the new tab page with a countdown
/// Built with Rust + WASM + Yew

pub mod background;
pub mod calendar;
mod chrome;
pub mod countdown;
pub mod error;
pub mod settings;
pub mod storage;
pub mod tab_data;
pub mod tracker;
pub mod ui;

use chrono::{Local, NaiveDateTime, TimeZone};
use wasm_bindgen::prelude::*;

use crate::background::BackgroundHandle;
use crate::settings::TimerSettings;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the new tab countdown page
#[wasm_bindgen]
pub fn start_newtab() {
    yew::Renderer::<ui::newtab::CountdownPage>::new().render();
}

// Start the Yew app for the settings popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Start tab tracking in the background service worker
#[wasm_bindgen]
pub fn start_background() -> BackgroundHandle {
    BackgroundHandle::new()
}

// Re-export the calculator for JavaScript access
#[wasm_bindgen]
pub fn calculate_countdown(settings: JsValue, now_ms: f64) -> Result<JsValue, JsValue> {
    let settings: TimerSettings = serde_wasm_bindgen::from_value(settings)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse settings: {:?}", e)))?;

    let now = local_from_millis(now_ms)
        .ok_or_else(|| JsValue::from_str(&format!("Invalid timestamp: {}", now_ms)))?;

    let remaining = countdown::calculate(&settings, now).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&remaining)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize countdown: {:?}", e)))
}

#[wasm_bindgen]
pub fn ordinal_suffix(n: u32) -> String {
    calendar::ordinal_suffix(n).to_string()
}

/// Convert a JS epoch timestamp to local wall-clock time
pub fn local_from_millis(ms: f64) -> Option<NaiveDateTime> {
    if !ms.is_finite() {
        return None;
    }
    Local
        .timestamp_millis_opt(ms as i64)
        .single()
        .map(|at| at.naive_local())
}
