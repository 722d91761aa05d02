use serde::{Deserialize, Serialize};

/// User preferences consulted by editing gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Move the playhead to the end of pasted material.
    pub paste_seeks: bool,
    pub snapping: bool,
    /// Snap distance in frames.
    pub snap_range: i64,
    /// Length in frames of transitions created by `AddTransition`.
    pub default_transition_length: i64,
    /// Clicking with the edit tool also selects linked clips.
    pub edit_tool_selects_links: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            paste_seeks: true,
            snapping: true,
            snap_range: 3,
            default_transition_length: 30,
            edit_tool_selects_links: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EditorSettings;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: EditorSettings =
            serde_json::from_str(r#"{ "snap_range": 8 }"#).expect("settings should parse");
        assert_eq!(settings.snap_range, 8);
        assert!(settings.paste_seeks);
        assert_eq!(settings.default_transition_length, 30);
    }
}
