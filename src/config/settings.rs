use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_ACTOR: &str = "deskhand";
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
pub const DEFAULT_PASS_DELAY_MS: u64 = 250;
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

const MAX_PASS_DELAY_MS: u64 = 60_000;

/// Operator-editable knobs, stored as `deskhand.yaml` at the store root.
/// A missing file means defaults; a present but invalid file is an error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_actor")]
    pub actor: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_pass_delay_ms")]
    pub pass_delay_ms: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_actor() -> String {
    DEFAULT_ACTOR.to_string()
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_pass_delay_ms() -> u64 {
    DEFAULT_PASS_DELAY_MS
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            actor: default_actor(),
            max_iterations: default_max_iterations(),
            pass_delay_ms: default_pass_delay_ms(),
            retention_days: default_retention_days(),
        }
    }
}

impl Settings {
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        let settings: Settings =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let body = serde_yaml::to_string(self).map_err(|source| ConfigError::Encode {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, body).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actor.trim().is_empty() {
            return Err(ConfigError::Settings("actor must not be empty".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Settings(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.pass_delay_ms > MAX_PASS_DELAY_MS {
            return Err(ConfigError::Settings(format!(
                "pass_delay_ms must not exceed {MAX_PASS_DELAY_MS}"
            )));
        }
        if self.retention_days == 0 {
            return Err(ConfigError::Settings(
                "retention_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
