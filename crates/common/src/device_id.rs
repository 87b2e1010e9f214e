//! Remote device identifier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of a mounted device, as configured in the topology
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteDeviceId(Arc<str>);

impl RemoteDeviceId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Bus endpoint name of the master session for this device
    pub fn master_endpoint(&self) -> String {
        format!("{}.master", self.0)
    }

    /// Bus endpoint name serving device RPCs on the master node
    pub fn rpc_endpoint(&self) -> String {
        format!("{}.rpc", self.0)
    }
}

impl fmt::Display for RemoteDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteDevice{{{}}}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_plain_name() {
        let device = RemoteDeviceId::new("router-1");
        let json = serde_json::to_string(&device).unwrap();
        assert_eq!(json, "\"router-1\"");

        let parsed: RemoteDeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, device);
        assert_eq!(parsed.master_endpoint(), "router-1.master");
        assert_eq!(parsed.rpc_endpoint(), "router-1.rpc");
    }
}
