//! Logical datastore selector

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two logical trees a path is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datastore {
    /// Configuration data, writable
    Configuration,
    /// Operational state reported by the device
    Operational,
}

impl Datastore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Operational => "operational",
        }
    }
}

impl fmt::Display for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
