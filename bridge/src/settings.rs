//! Presentation settings forwarded to the GUI subprocess.
//!
//! The GUI treats the snapshot as opaque key/value data; the bridge only
//! cares about the two label fields, which host adapters fill in while
//! they are still at their defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::defaults;

/// Settings sent along with every GUI `show`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    /// Label of the root item in the GUI's instance list.
    pub context_label: String,
    /// Title of the GUI window.
    pub window_title: String,
    pub window_size: (u32, u32),
    pub window_position: (u32, u32),
    /// GUI sections hidden from the user.
    pub hidden_sections: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            context_label: defaults::CONTEXT_LABEL.to_string(),
            window_title: defaults::WINDOW_TITLE.to_string(),
            window_size: defaults::WINDOW_SIZE,
            window_position: defaults::WINDOW_POSITION,
            hidden_sections: defaults::HIDDEN_SECTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Settings {
    /// Key/value snapshot used as the payload of the GUI `show` command.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// True while no adapter or user has customized the context label.
    pub fn context_label_is_default(&self) -> bool {
        self.context_label == defaults::CONTEXT_LABEL
    }

    /// True while no adapter or user has customized the window title.
    pub fn window_title_is_default(&self) -> bool {
        self.window_title == defaults::WINDOW_TITLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sentinels() {
        let settings = Settings::default();
        assert!(settings.context_label_is_default());
        assert!(settings.window_title_is_default());
        assert_eq!(settings.window_size, (430, 600));
    }

    #[test]
    fn customization_clears_default_flag() {
        let mut settings = Settings::default();
        settings.context_label = "Maya".to_string();
        assert!(!settings.context_label_is_default());
        assert!(settings.window_title_is_default());
    }

    #[test]
    fn snapshot_uses_gui_key_casing() {
        let map = Settings::default().to_map();
        assert_eq!(
            map.get("ContextLabel").and_then(Value::as_str),
            Some("Context")
        );
        assert_eq!(
            map.get("WindowTitle").and_then(Value::as_str),
            Some("Pyblish")
        );
        assert!(map.contains_key("HiddenSections"));
    }
}
