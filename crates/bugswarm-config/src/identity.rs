// Stable local device identity.
//
// A freshly created device resource is named after the host. The value
// should survive reboots, so the machine id is preferred over the host
// name, and a random name is the last resort.

use std::path::{Path, PathBuf};

use strum::Display;
use tracing::debug;

const MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum IdentitySource {
    MachineId,
    Hostname,
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub value: String,
    pub source: IdentitySource,
}

impl DeviceIdentity {
    /// Derive the identity from the well-known machine-id locations.
    pub fn detect() -> Self {
        let paths: Vec<PathBuf> = MACHINE_ID_PATHS.iter().map(PathBuf::from).collect();
        Self::detect_from(&paths)
    }

    /// Derive the identity, trying `machine_id_paths` in order before
    /// falling back to the host name.
    pub fn detect_from(machine_id_paths: &[PathBuf]) -> Self {
        let identity = machine_id_paths
            .iter()
            .find_map(|p| read_machine_id(p))
            .map(|value| Self {
                value,
                source: IdentitySource::MachineId,
            })
            .or_else(|| {
                local_hostname().map(|value| Self {
                    value,
                    source: IdentitySource::Hostname,
                })
            })
            .unwrap_or_else(|| Self {
                value: uuid::Uuid::new_v4().simple().to_string(),
                source: IdentitySource::Random,
            });

        debug!(source = %identity.source, value = %identity.value, "device identity");
        identity
    }
}

fn read_machine_id(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let id = raw.trim();
    (!id.is_empty()).then(|| id.to_owned())
}

fn local_hostname() -> Option<String> {
    let name = hostname::get().ok()?.into_string().ok()?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}
