use crate::export::ExportConfig;
use crate::storage::SAVED_GROUPS_KEY;
use crate::sync::SettleConfig;
use crate::util::RetryPolicy;
use leptos::logging::warn;
use serde::{Deserialize, Serialize};

/// Selectors and timings for one injected page.
///
/// Every field has a default; a page may override any subset by defining
/// `window.ORGANIZER_CONFIG` as a plain object before the script runs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct OrganizerConfig {
    pub toolbar_selector: String,
    pub turn_selector: String,
    /// Scrollable element enclosing the turns; observed for structural changes.
    pub chat_container_selector: String,
    pub text_chunk_selector: String,
    /// Matches inside a turn when the user authored it; anything else is the model.
    pub user_role_selector: String,

    pub storage_key: String,

    pub settle_idle_ms: u32,
    pub settle_max_wait_ms: u32,

    pub mount_poll_ms: u32,
    pub mount_max_attempts: u32,

    pub export_scroll_step_px: i32,
    pub export_poll_ms: u32,
    pub export_max_attempts: u32,
    pub export_readiness_threshold: f32,

    pub default_group_name: String,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            toolbar_selector: "ms-toolbar".to_string(),
            turn_selector: "ms-chat-turn".to_string(),
            chat_container_selector: "ms-chat-session".to_string(),
            text_chunk_selector: "ms-text-chunk".to_string(),
            user_role_selector: ".chat-turn-container.user".to_string(),
            storage_key: SAVED_GROUPS_KEY.to_string(),
            settle_idle_ms: 400,
            settle_max_wait_ms: 15_000,
            mount_poll_ms: 500,
            mount_max_attempts: 20,
            export_scroll_step_px: 800,
            export_poll_ms: 250,
            export_max_attempts: 40,
            export_readiness_threshold: 0.8,
            default_group_name: "My Investigation".to_string(),
        }
    }
}

impl OrganizerConfig {
    /// Defaults merged with `window.ORGANIZER_CONFIG`, if the page defines one.
    pub fn from_window() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let Some(overrides) = window.get("ORGANIZER_CONFIG") else {
            return Self::default();
        };
        if overrides.is_undefined() || !overrides.is_object() {
            return Self::default();
        }

        let json = js_sys::JSON::stringify(&overrides)
            .ok()
            .and_then(|s| s.as_string())
            .unwrap_or_default();
        Self::from_json(&json)
    }

    /// Parse overrides; malformed input falls back to defaults.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Organizer: ignoring malformed ORGANIZER_CONFIG: {e}");
                Self::default()
            }
        }
    }

    pub fn settle(&self) -> SettleConfig {
        SettleConfig {
            idle_window_ms: i64::from(self.settle_idle_ms),
            max_wait_ms: i64::from(self.settle_max_wait_ms),
        }
    }

    pub fn mount_wait(&self) -> RetryPolicy {
        RetryPolicy {
            interval_ms: self.mount_poll_ms,
            max_attempts: self.mount_max_attempts,
        }
    }

    pub fn export(&self) -> ExportConfig {
        ExportConfig {
            scroll_step_px: self.export_scroll_step_px,
            poll: RetryPolicy {
                interval_ms: self.export_poll_ms,
                max_attempts: self.export_max_attempts,
            },
            readiness_threshold: self.export_readiness_threshold,
        }
    }
}
