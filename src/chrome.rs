/// Bindings to the `chrome.*` extension APIs and global timer functions
///
/// Promise-returning APIs are imported as `async` functions; every one of
/// them resolves exactly once.
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    // chrome.storage.local

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    pub async fn storage_local_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    pub async fn storage_local_set(items: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = clear)]
    pub async fn storage_local_clear() -> Result<JsValue, JsValue>;

    // chrome.tabs

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = update)]
    pub async fn tabs_update(tab_id: i32, properties: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onCreated"], js_name = addListener)]
    pub fn add_tab_created_listener(callback: &js_sys::Function);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onCreated"], js_name = removeListener)]
    pub fn remove_tab_created_listener(callback: &js_sys::Function);

    // chrome.windows

    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = getAll)]
    pub async fn windows_get_all(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "windows", "onCreated"], js_name = addListener)]
    pub fn add_window_created_listener(callback: &js_sys::Function);

    #[wasm_bindgen(js_namespace = ["chrome", "windows", "onCreated"], js_name = removeListener)]
    pub fn remove_window_created_listener(callback: &js_sys::Function);

    #[wasm_bindgen(js_namespace = ["chrome", "windows", "onRemoved"], js_name = addListener)]
    pub fn add_window_removed_listener(callback: &js_sys::Function);

    #[wasm_bindgen(js_namespace = ["chrome", "windows", "onRemoved"], js_name = removeListener)]
    pub fn remove_window_removed_listener(callback: &js_sys::Function);

    // chrome.runtime

    #[wasm_bindgen(js_namespace = ["chrome", "runtime"], js_name = getURL)]
    pub fn runtime_get_url(path: &str) -> String;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    pub async fn runtime_send_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    pub fn add_message_listener(callback: &js_sys::Function);

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = removeListener)]
    pub fn remove_message_listener(callback: &js_sys::Function);

    // Timers exist on both `window` and the service worker global scope

    #[wasm_bindgen(js_name = setTimeout)]
    pub fn set_timeout(handler: &js_sys::Function, timeout_ms: i32) -> JsValue;

    #[wasm_bindgen(js_name = clearTimeout)]
    pub fn clear_timeout(handle: &JsValue);

    #[wasm_bindgen(js_name = setInterval)]
    pub fn set_interval(handler: &js_sys::Function, timeout_ms: i32) -> JsValue;

    #[wasm_bindgen(js_name = clearInterval)]
    pub fn clear_interval(handle: &JsValue);
}

/// Whether `chrome.storage.local` exists in the current global scope
pub fn has_storage_api() -> bool {
    ["chrome", "storage", "local"]
        .iter()
        .try_fold(js_sys::global().into(), |object: JsValue, key| {
            js_sys::Reflect::get(&object, &JsValue::from_str(key))
                .ok()
                .filter(|value| !value.is_undefined() && !value.is_null())
        })
        .is_some()
}
