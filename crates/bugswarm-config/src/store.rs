// File-backed resource id persistence.
//
// The connector reports the server-assigned resource id; we write it into
// the active profile so the next run reuses the same device resource.

use std::path::PathBuf;
use std::sync::Mutex;

use bugswarm_core::{CoreError, ResourceStore};
use tracing::info;

use crate::{ConfigError, read_config_file, save_config_to};

/// Rewrites `profiles.<name>.resource_id` in a TOML config file.
#[derive(Debug)]
pub struct ProfileResourceStore {
    path: PathBuf,
    profile: String,
    // Serialises read-modify-write of the file.
    lock: Mutex<()>,
}

impl ProfileResourceStore {
    pub fn new(path: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            profile: profile.into(),
            lock: Mutex::new(()),
        }
    }

    fn update(&self, resource_id: Option<&str>) -> Result<(), ConfigError> {
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut cfg = read_config_file(&self.path)?;
        let profile = cfg.profiles.entry(self.profile.clone()).or_default();
        profile.resource_id = resource_id.map(str::to_owned);
        save_config_to(&self.path, &cfg)?;

        info!(
            profile = %self.profile,
            path = %self.path.display(),
            resource_id = resource_id.unwrap_or("<none>"),
            "updated stored resource id"
        );
        Ok(())
    }
}

impl ResourceStore for ProfileResourceStore {
    fn store_resource_id(&self, resource_id: &str) -> Result<(), CoreError> {
        self.update(Some(resource_id)).map_err(into_core)
    }

    fn clear_resource_id(&self) -> Result<(), CoreError> {
        self.update(None).map_err(into_core)
    }
}

fn into_core(err: ConfigError) -> CoreError {
    match err {
        ConfigError::Io(e) => CoreError::Io(e),
        other => CoreError::Config {
            message: other.to_string(),
        },
    }
}
