use serde::{Deserialize, Serialize};

use super::{DiffConfig, GenerateConfig, JobsConfig, LoggingConfig, UiConfig};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub jobs: JobsConfig,
    pub generate: GenerateConfig,
    pub diff: DiffConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}
