//! Manager configuration

use serde::{Deserialize, Serialize};

/// Configuration for a [`CollisionManager`](crate::manager::CollisionManager)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Trigger state assigned to tag pairs that have not been configured
    /// explicitly (new tags enable testing against everything by default)
    pub default_trigger: bool,

    /// Tags to create empty buckets for up front, so their triggers can be
    /// configured before any collider is registered
    pub initial_tags: Vec<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_trigger: true,
            initial_tags: Vec::new(),
        }
    }
}
