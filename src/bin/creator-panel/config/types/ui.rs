use serde::{Deserialize, Serialize};

use super::DEFAULT_TICK_MS;

/// UI configuration for the panel.
///
/// Themes: `warm` (default), `cool` and `mono`. `NO_COLOR` forces `mono`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: String,
    /// Redraw interval for elapsed-time counters.
    pub tick_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "warm".to_string(),
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_theme_is_warm() {
        let config = UiConfig::default();
        assert_eq!(config.theme, "warm");
        assert_eq!(config.tick_ms, DEFAULT_TICK_MS);
    }

    #[test]
    fn deserialize_theme() {
        let json = r#"{"theme": "cool"}"#;
        let config: UiConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.theme, "cool");
        assert_eq!(config.tick_ms, DEFAULT_TICK_MS);
    }
}
