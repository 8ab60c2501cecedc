//! Prost-based codec using envoy-types.

use crate::codec::SdsCodec;
use crate::error::{Error, Result};
use crate::message::{DiscoveryRequest, DiscoveryResponse, ErrorDetail, Node, ResourceAny, Secret};
use crate::SECRET_TYPE_URL;
use envoy_types::pb::envoy::config::core::v3 as core_v3;
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3 as tls;
use envoy_types::pb::envoy::service::discovery::v3 as discovery;
use envoy_types::pb::google::protobuf::Any;
use envoy_types::pb::google::rpc::Status;
use prost::Message;

/// A codec that encodes secrets as Envoy `Secret` protos carrying a
/// `GenericSecret` with an inline-bytes data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProstCodec;

impl SdsCodec for ProstCodec {
    fn encode_secret(&self, secret: &Secret) -> Result<ResourceAny> {
        let proto_secret = tls::Secret {
            name: secret.name.clone(),
            r#type: Some(tls::secret::Type::GenericSecret(tls::GenericSecret {
                secret: Some(core_v3::DataSource {
                    specifier: Some(core_v3::data_source::Specifier::InlineBytes(
                        secret.payload.to_vec(),
                    )),
                    ..Default::default()
                }),
                ..Default::default()
            })),
            ..Default::default()
        };

        Ok(ResourceAny {
            type_url: SECRET_TYPE_URL.to_string(),
            value: proto_secret.encode_to_vec().into(),
        })
    }

    fn decode_secret(&self, resource: &ResourceAny) -> Result<Secret> {
        if resource.type_url != SECRET_TYPE_URL {
            return Err(Error::UnexpectedTypeUrl(resource.type_url.clone()));
        }

        let proto_secret = tls::Secret::decode(resource.value.clone())?;
        let payload = match proto_secret.r#type {
            Some(tls::secret::Type::GenericSecret(generic)) => generic
                .secret
                .and_then(|source| source.specifier)
                .and_then(|specifier| match specifier {
                    core_v3::data_source::Specifier::InlineBytes(bytes) => Some(bytes),
                    _ => None,
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        Ok(Secret::new(proto_secret.name, payload))
    }
}

impl From<discovery::DiscoveryRequest> for DiscoveryRequest {
    fn from(proto: discovery::DiscoveryRequest) -> Self {
        let node = proto
            .node
            .map(|node| Node {
                id: node.id,
                cluster: node.cluster,
                user_agent_name: node.user_agent_name,
            })
            .unwrap_or_default();

        Self {
            version_info: proto.version_info,
            node,
            resource_names: proto.resource_names,
            type_url: proto.type_url,
            response_nonce: proto.response_nonce,
            error_detail: proto.error_detail.map(|status| ErrorDetail {
                code: status.code,
                message: status.message,
            }),
        }
    }
}

impl From<DiscoveryRequest> for discovery::DiscoveryRequest {
    fn from(request: DiscoveryRequest) -> Self {
        Self {
            version_info: request.version_info,
            node: Some(core_v3::Node {
                id: request.node.id,
                cluster: request.node.cluster,
                user_agent_name: request.node.user_agent_name,
                ..Default::default()
            }),
            resource_names: request.resource_names,
            type_url: request.type_url,
            response_nonce: request.response_nonce,
            error_detail: request.error_detail.map(|e| Status {
                code: e.code,
                message: e.message,
                details: vec![],
            }),
            ..Default::default()
        }
    }
}

impl From<DiscoveryResponse> for discovery::DiscoveryResponse {
    fn from(response: DiscoveryResponse) -> Self {
        Self {
            version_info: response.version_info,
            resources: response
                .resources
                .into_iter()
                .map(|resource| Any {
                    type_url: resource.type_url,
                    value: resource.value.to_vec(),
                })
                .collect(),
            type_url: response.type_url,
            nonce: response.nonce,
            ..Default::default()
        }
    }
}

impl From<discovery::DiscoveryResponse> for DiscoveryResponse {
    fn from(proto: discovery::DiscoveryResponse) -> Self {
        Self {
            version_info: proto.version_info,
            resources: proto
                .resources
                .into_iter()
                .map(|any| ResourceAny {
                    type_url: any.type_url,
                    value: any.value.into(),
                })
                .collect(),
            type_url: proto.type_url,
            nonce: proto.nonce,
        }
    }
}
