// Persistence of the server-assigned device resource id.

use std::sync::Mutex;

use crate::error::CoreError;

/// Where the connector keeps the resource id between runs.
pub trait ResourceStore: Send + Sync {
    fn store_resource_id(&self, resource_id: &str) -> Result<(), CoreError>;

    /// Forget the stored id so the next start creates a fresh resource.
    fn clear_resource_id(&self) -> Result<(), CoreError>;
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    resource_id: Mutex<Option<String>>,
}

impl MemoryResourceStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            resource_id: Mutex::new(initial),
        }
    }

    pub fn resource_id(&self) -> Option<String> {
        self.resource_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set(&self, value: Option<String>) {
        *self
            .resource_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = value;
    }
}

impl ResourceStore for MemoryResourceStore {
    fn store_resource_id(&self, resource_id: &str) -> Result<(), CoreError> {
        self.set(Some(resource_id.to_owned()));
        Ok(())
    }

    fn clear_resource_id(&self) -> Result<(), CoreError> {
        self.set(None);
        Ok(())
    }
}
