//! Browser tests for the JS-facing exports
//!
//! Run with `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use countdown_tab::countdown::RemainingTime;
use countdown_tab::settings::TimerSettings;
use countdown_tab::{calculate_countdown, local_from_millis, ordinal_suffix, start_background};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn test_calculate_countdown_daily() {
    let settings = serde_wasm_bindgen::to_value(&TimerSettings::daily()).unwrap();

    let result = calculate_countdown(settings, js_sys::Date::now()).unwrap();
    let remaining: RemainingTime = serde_wasm_bindgen::from_value(result).unwrap();

    assert!(remaining.total_millis <= 24 * 60 * 60 * 1000);
    assert!((0.0..=100.0).contains(&remaining.progress_percentage));
}

#[wasm_bindgen_test]
fn test_calculate_countdown_reports_invalid_input() {
    let settings = serde_wasm_bindgen::to_value(&TimerSettings::birthday("")).unwrap();

    let err = calculate_countdown(settings, js_sys::Date::now()).unwrap_err();

    assert_eq!(err.as_string().as_deref(), Some("Invalid input: Birth date is required"));
}

#[wasm_bindgen_test]
fn test_calculate_countdown_rejects_bad_timestamp() {
    let settings = serde_wasm_bindgen::to_value(&TimerSettings::daily()).unwrap();

    assert!(calculate_countdown(settings, f64::NAN).is_err());
    assert!(local_from_millis(f64::INFINITY).is_none());
}

#[wasm_bindgen_test]
fn test_calculate_countdown_from_plain_object() {
    let settings = js_sys::JSON::parse(r#"{"timerType": "life", "birthDate": "1990-01-01", "lifeExpectancy": 80}"#)
        .unwrap();

    let result = calculate_countdown(settings, js_sys::Date::now()).unwrap();

    assert!(!result.is_undefined());
    assert_ne!(result, JsValue::NULL);
}

#[wasm_bindgen_test]
fn test_ordinal_suffix_export() {
    assert_eq!(ordinal_suffix(1), "st");
    assert_eq!(ordinal_suffix(13), "th");
    assert_eq!(ordinal_suffix(22), "nd");
}

/// Replace `chrome` with listener lists the test can inspect
fn install_chrome_stub() {
    js_sys::Function::new_no_args(
        r#"
        const event = () => {
            const list = [];
            return {
                list,
                addListener: (f) => list.push(f),
                removeListener: (f) => {
                    const i = list.indexOf(f);
                    if (i >= 0) list.splice(i, 1);
                },
            };
        };
        globalThis.chrome = {
            tabs: { onCreated: event(), update: () => Promise.resolve({}) },
            windows: {
                onCreated: event(),
                onRemoved: event(),
                getAll: () => Promise.resolve([]),
            },
            runtime: {
                onMessage: event(),
                getURL: (path) => "chrome-extension://test/" + path,
                sendMessage: () => Promise.resolve(),
            },
        };
        "#,
    )
    .call0(&JsValue::NULL)
    .unwrap();
}

fn registered_listeners() -> f64 {
    js_sys::Function::new_no_args(
        "return chrome.tabs.onCreated.list.length
            + chrome.windows.onCreated.list.length
            + chrome.windows.onRemoved.list.length
            + chrome.runtime.onMessage.list.length;",
    )
    .call0(&JsValue::NULL)
    .unwrap()
    .as_f64()
    .unwrap()
}

#[wasm_bindgen_test]
fn test_background_shutdown_removes_listeners() {
    install_chrome_stub();

    let mut handle = start_background();
    assert!(handle.is_running());
    assert_eq!(registered_listeners(), 4.0);

    handle.shutdown();
    assert!(!handle.is_running());
    assert_eq!(registered_listeners(), 0.0);
    assert!(handle.window_state(1).is_undefined());

    handle.shutdown();
    assert!(!handle.is_running());
    assert_eq!(registered_listeners(), 0.0);
}

#[wasm_bindgen_test]
fn test_background_restart_cycles_do_not_leak() {
    install_chrome_stub();

    for _ in 0..3 {
        let mut handle = start_background();
        assert_eq!(registered_listeners(), 4.0);
        handle.shutdown();
    }
    assert_eq!(registered_listeners(), 0.0);

    let handle = start_background();
    drop(handle);
    assert_eq!(registered_listeners(), 0.0);
}
