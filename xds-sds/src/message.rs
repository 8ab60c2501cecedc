//! Crate-owned SDS message types.
//!
//! These types are codegen-agnostic and serve as the interface between
//! the reconciliation logic and the codec layer. The codec converts these
//! to/from the wire format (prost/envoy-types).

use bytes::Bytes;

/// A discovery request received from an SDS client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryRequest {
    /// The version_info of the most recent response the client accepted,
    /// or empty on first contact.
    pub version_info: String,
    /// The node making the request.
    pub node: Node,
    /// Names of the secrets the client subscribes to, in order.
    pub resource_names: Vec<String>,
    /// Type URL of the resource being requested.
    pub type_url: String,
    /// The nonce of the most recent response the client processed,
    /// or empty for the first request.
    pub response_nonce: String,
    /// Error details if this is a NACK (negative acknowledgment).
    pub error_detail: Option<ErrorDetail>,
}

impl DiscoveryRequest {
    /// Create a request for the given secret names.
    pub fn new<I, S>(resource_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_names: resource_names.into_iter().map(Into::into).collect(),
            type_url: crate::SECRET_TYPE_URL.to_string(),
            ..Default::default()
        }
    }

    /// Set the version_info.
    pub fn with_version_info(mut self, version_info: impl Into<String>) -> Self {
        self.version_info = version_info.into();
        self
    }

    /// Set the response_nonce.
    pub fn with_response_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.response_nonce = nonce.into();
        self
    }

    /// Set the node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.node = node;
        self
    }

    /// Mark this request as a NACK.
    pub fn with_error_detail(mut self, error_detail: ErrorDetail) -> Self {
        self.error_detail = Some(error_detail);
        self
    }

    /// Returns true if the client is rejecting the last response.
    pub fn is_nack(&self) -> bool {
        self.error_detail.is_some()
    }
}

/// A discovery response sent to an SDS client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryResponse {
    /// The version of the response data.
    pub version_info: String,
    /// The response resources wrapped as Any protos, in request order.
    pub resources: Vec<ResourceAny>,
    /// Type URL of the resources.
    pub type_url: String,
    /// Nonce for this response, to be echoed back in the next request.
    pub nonce: String,
}

/// A resource wrapped as google.protobuf.Any.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceAny {
    /// Type URL of the resource.
    pub type_url: String,
    /// Serialized resource bytes.
    pub value: Bytes,
}

/// A named secret payload, as produced by a [`SecretResolver`](crate::SecretResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    /// The secret name, unique within a response.
    pub name: String,
    /// Opaque secret bytes.
    pub payload: Bytes,
}

impl Secret {
    /// Create a new secret.
    pub fn new(name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }
}

/// Node identification of the client. Opaque to the server, used for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    /// An opaque node identifier.
    pub id: String,
    /// The cluster the node belongs to.
    pub cluster: String,
    /// Free-form string identifying the client type (e.g., "envoy", "grpc").
    pub user_agent_name: String,
}

impl Node {
    /// Create a new node with the given id and cluster.
    pub fn new(id: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cluster: cluster.into(),
            user_agent_name: String::new(),
        }
    }

    /// Set the user agent name.
    pub fn with_user_agent_name(mut self, name: impl Into<String>) -> Self {
        self.user_agent_name = name.into();
        self
    }
}

/// Error details carried by a NACK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// gRPC status code.
    pub code: i32,
    /// Error message.
    pub message: String,
}
