/// Tab and window payloads delivered by the browser's event APIs
use serde::{Deserialize, Serialize};
use url::Url;

/// Browsers report `windowId: -1` (`chrome.windows.WINDOW_ID_NONE`) for
/// tabs that are not attached to any window
pub const WINDOW_ID_NONE: i32 = -1;

/// Schemes whose `newtab` host is the browser's own new-tab page
const NEW_TAB_SCHEMES: [&str; 4] = ["chrome", "edge", "brave", "vivaldi"];

/// A tab as delivered by `chrome.tabs.onCreated` or `chrome.tabs.query`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabEvent {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub window_id: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pending_url: Option<String>,
}

impl TabEvent {
    pub fn new(id: i32, window_id: i32, url: &str) -> TabEvent {
        TabEvent {
            id: Some(id),
            window_id: Some(window_id),
            url: Some(url.to_string()),
            pending_url: None,
        }
    }

    /// Whether the tab is (or is about to become) the browser's new-tab page
    pub fn is_new_tab_page(&self) -> bool {
        [self.url.as_deref(), self.pending_url.as_deref()]
            .into_iter()
            .flatten()
            .any(is_new_tab_url)
    }
}

/// A window as returned by `chrome.windows.getAll({ populate: true })`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub id: i32,
    #[serde(default)]
    pub tabs: Vec<TabEvent>,
}

/// Detect the platform's new-tab sentinel (`chrome://newtab/`,
/// `edge://newtab/`, `about:newtab`, ...)
pub fn is_new_tab_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw.trim()) else {
        return false;
    };

    match url.scheme() {
        "about" => url.path().trim_end_matches('/') == "newtab",
        scheme if NEW_TAB_SCHEMES.contains(&scheme) => {
            url.host_str() == Some("newtab") && matches!(url.path(), "" | "/")
        }
        _ => false,
    }
}
