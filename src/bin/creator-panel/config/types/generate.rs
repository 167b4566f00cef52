use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How generation commands are launched.
///
/// `program` replaces the first word of every target's command and may carry
/// its own arguments (`"npx gpt-creator"`). `extra_args` go after the
/// built-in arguments and `env` is added to the inherited environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub program: Option<String>,
    pub extra_args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_env_table() {
        let config: GenerateConfig = toml::from_str(
            "program = \"npx gpt-creator\"\nextra_args = [\"--yes\"]\n[env]\nCI = \"1\"\n",
        )
        .unwrap();
        assert_eq!(config.program.as_deref(), Some("npx gpt-creator"));
        assert_eq!(config.extra_args, vec!["--yes"]);
        assert_eq!(config.env.get("CI").map(String::as_str), Some("1"));
    }
}
