//! Bus payload

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque body plus string headers
///
/// The bus never looks inside either; typed layers above it decide what
/// the body holds and which headers matter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl Message {
    pub fn new(body: Vec<u8>, headers: HashMap<String, String>) -> Self {
        Self { body, headers }
    }

    /// Body without headers
    pub fn bare(body: Vec<u8>) -> Self {
        Self::new(body, HashMap::new())
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup() {
        let msg = Message::bare(b"x".to_vec()).with_header("kind", "read");
        assert_eq!(msg.header("kind"), Some("read"));
        assert_eq!(msg.header("txn_id"), None);
    }
}
