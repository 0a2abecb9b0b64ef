//! Event list configuration
//!
//! Configuration is a plain serde struct with defaults for every field, so a
//! partial TOML document only overrides what it names.
//!
//! # Example
//!
//! ```toml
//! # Merge adjacent same-kind blocks: "adjacent" (default) or "disabled"
//! coalescing = "adjacent"
//!
//! # Compare storage length with the expected size after every mutation
//! check_consistency = true
//!
//! # Capacity reserved by the default Vec storage
//! initial_capacity = 0
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How the change assembler merges consecutive blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coalescing {
    /// Merge a block into the previous one when both have the same kind and
    /// their ranges touch
    #[default]
    Adjacent,
    /// Keep one block per primitive edit
    Disabled,
}

/// Configuration for an event list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventListConfig {
    /// Block merging policy
    pub coalescing: Coalescing,
    /// Detect storage length divergence after each mutation
    pub check_consistency: bool,
    /// Capacity reserved by the default storage
    pub initial_capacity: usize,
}

impl Default for EventListConfig {
    fn default() -> Self {
        Self {
            coalescing: Coalescing::Adjacent,
            check_consistency: true,
            initial_capacity: 0,
        }
    }
}

impl EventListConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the text is not valid TOML or names
    /// an unknown coalescing mode.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Builder-style setter for the coalescing policy
    pub fn with_coalescing(mut self, coalescing: Coalescing) -> Self {
        self.coalescing = coalescing;
        self
    }

    /// Builder-style setter for the consistency check
    pub fn with_consistency_check(mut self, enabled: bool) -> Self {
        self.check_consistency = enabled;
        self
    }
}
