//! RPC capability of a device session

use crate::error::Result;
use crate::timeout::RequestTimeout;
use async_trait::async_trait;
use netmount_common::NormalizedNode;
use std::sync::Arc;

/// Outcome of an RPC the device answered
///
/// A reply carrying errors is still an answer: the session is alive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcResult {
    pub value: Option<NormalizedNode>,
    pub errors: Vec<String>,
}

impl RpcResult {
    pub fn with_value(value: NormalizedNode) -> Self {
        Self {
            value: Some(value),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(errors: Vec<String>) -> Self {
        Self {
            value: None,
            errors,
        }
    }

    /// Neither output nor errors
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.errors.is_empty()
    }
}

/// RPCs of a device whose schema is known
#[async_trait]
pub trait NormalizedRpcService: Send + Sync {
    async fn invoke_rpc(&self, name: &str, input: NormalizedNode) -> Result<RpcResult>;
}

/// RPCs of a device mounted without a schema
#[async_trait]
pub trait SchemalessRpcService: Send + Sync {
    /// Invoke a base protocol operation
    async fn invoke_netconf(&self, name: &str, input: NormalizedNode) -> Result<RpcResult>;

    /// Invoke an RPC with a raw document as input and output
    async fn invoke_rpc(&self, name: &str, input: String) -> Result<String>;
}

/// RPC capability of a connected device, fixed when the session comes up
#[derive(Clone)]
pub enum Rpcs {
    Normalized(Arc<dyn NormalizedRpcService>),
    Schemaless(Arc<dyn SchemalessRpcService>),
}

impl Rpcs {
    /// Invoke a base protocol operation through whichever variant this is
    pub async fn invoke_netconf(&self, name: &str, input: NormalizedNode) -> Result<RpcResult> {
        match self {
            Rpcs::Normalized(service) => service.invoke_rpc(name, input).await,
            Rpcs::Schemaless(service) => service.invoke_netconf(name, input).await,
        }
    }

    pub fn is_schemaless(&self) -> bool {
        matches!(self, Rpcs::Schemaless(_))
    }
}

impl std::fmt::Debug for Rpcs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rpcs::Normalized(_) => f.write_str("Rpcs::Normalized"),
            Rpcs::Schemaless(_) => f.write_str("Rpcs::Schemaless"),
        }
    }
}

/// Bounds every call of a normalized service with the request timeout
struct NormalizedKeepaliveRpcs {
    delegate: Arc<dyn NormalizedRpcService>,
    timeout: RequestTimeout,
}

#[async_trait]
impl NormalizedRpcService for NormalizedKeepaliveRpcs {
    async fn invoke_rpc(&self, name: &str, input: NormalizedNode) -> Result<RpcResult> {
        self.timeout
            .schedule(self.delegate.invoke_rpc(name, input))
            .await
    }
}

/// Bounds every call of a schemaless service with the request timeout
struct SchemalessKeepaliveRpcs {
    delegate: Arc<dyn SchemalessRpcService>,
    timeout: RequestTimeout,
}

#[async_trait]
impl SchemalessRpcService for SchemalessKeepaliveRpcs {
    async fn invoke_netconf(&self, name: &str, input: NormalizedNode) -> Result<RpcResult> {
        self.timeout
            .schedule(self.delegate.invoke_netconf(name, input))
            .await
    }

    async fn invoke_rpc(&self, name: &str, input: String) -> Result<String> {
        self.timeout
            .schedule(self.delegate.invoke_rpc(name, input))
            .await
    }
}

/// Wrap `rpcs` so every call goes through `timeout`, keeping its variant
pub(crate) fn decorate(rpcs: &Rpcs, timeout: RequestTimeout) -> Rpcs {
    match rpcs {
        Rpcs::Normalized(delegate) => Rpcs::Normalized(Arc::new(NormalizedKeepaliveRpcs {
            delegate: delegate.clone(),
            timeout,
        })),
        Rpcs::Schemaless(delegate) => Rpcs::Schemaless(Arc::new(SchemalessKeepaliveRpcs {
            delegate: delegate.clone(),
            timeout,
        })),
    }
}
