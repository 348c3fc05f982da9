//! Docker Engine swarm node directory
//!
//! Talks to the Docker Engine API of a swarm manager, either over the local
//! unix socket or over plain TCP.
//!
//! - `GET /nodes` lists the swarm nodes
//! - `GET /nodes/{id}` re-reads one node before an update
//! - `POST /nodes/{id}/update?version={index}` replaces the node spec
//!
//! The engine rejects an update whose version index is stale, which gives the
//! label replacement optimistic concurrency: if anyone touched the node since
//! the snapshot, the write fails and the next cycle re-plans from fresh data.
//!
//! Reference: https://docs.docker.com/engine/api/v1.43/#tag/Node

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use hyper::{Body, Client, Method, Request};
use hyperlocal::{UnixClientExt, UnixConnector, Uri as UnixUri};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{DirectoryError, NodeDirectory};
use crate::cluster::{Availability, Labels, Node, NodeRole, Platform};

/// Default engine endpoint, same as the docker CLI
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Where the Docker Engine API is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerHost {
    /// `unix:///path/to/docker.sock`
    Unix(PathBuf),
    /// `tcp://host:port` or `http://host:port`, stored as an http base URL
    Tcp(String),
}

impl DockerHost {
    /// Parse a `DOCKER_HOST` style endpoint
    pub fn parse(raw: &str) -> Result<Self, DirectoryError> {
        let raw = raw.trim();
        if let Some(path) = raw.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(DirectoryError::InvalidHost(raw.to_string()));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = raw.strip_prefix("tcp://") {
            if addr.is_empty() {
                return Err(DirectoryError::InvalidHost(raw.to_string()));
            }
            return Ok(Self::Tcp(format!("http://{}", addr.trim_end_matches('/'))));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self::Tcp(raw.trim_end_matches('/').to_string()));
        }
        if raw.starts_with('/') {
            return Ok(Self::Unix(PathBuf::from(raw)));
        }
        Err(DirectoryError::InvalidHost(raw.to_string()))
    }
}

// ============================================================================
// Engine API wire types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SwarmNode {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    version: Option<ObjectVersion>,
    spec: SwarmNodeSpec,
    #[serde(default)]
    description: Option<NodeDescription>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectVersion {
    index: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SwarmNodeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    labels: Option<Labels>,
    #[serde(default)]
    role: String,
    #[serde(default)]
    availability: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeDescription {
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    platform: Option<NodePlatform>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodePlatform {
    #[serde(rename = "OS", default)]
    os: String,
    #[serde(default)]
    architecture: String,
}

#[derive(Debug, Deserialize)]
struct EngineError {
    message: String,
}

impl From<SwarmNode> for Node {
    fn from(node: SwarmNode) -> Self {
        let description = node.description.unwrap_or_default();
        let platform = description.platform.unwrap_or_default();
        Node {
            id: node.id,
            version: node.version.map(|v| v.index),
            hostname: description.hostname,
            role: NodeRole::parse(&node.spec.role),
            available: Availability::parse(&node.spec.availability).is_available(),
            platform: Platform {
                os: platform.os,
                architecture: platform.architecture,
            },
            labels: node.spec.labels.unwrap_or_default(),
        }
    }
}

// ============================================================================
// SBIO: I/O implementation (real Docker Engine client)
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Verb {
    Get,
    Post,
}

struct RawResponse {
    status: u16,
    body: Vec<u8>,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Engine errors come back as `{"message": "..."}`
    fn message(&self) -> String {
        serde_json::from_slice::<EngineError>(&self.body)
            .map(|e| e.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&self.body).trim().to_string())
    }
}

enum Transport {
    Unix {
        client: Client<UnixConnector>,
        socket: PathBuf,
    },
    Tcp {
        client: reqwest::Client,
        base_url: String,
    },
}

impl Transport {
    async fn send(
        &self,
        verb: Verb,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse, DirectoryError> {
        match self {
            Transport::Unix { client, socket } => {
                let uri: hyper::Uri = UnixUri::new(socket, path).into();
                let method = match verb {
                    Verb::Get => Method::GET,
                    Verb::Post => Method::POST,
                };

                let mut builder = Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Accept", "application/json");
                let body = match body {
                    Some(bytes) => {
                        builder = builder.header("Content-Type", "application/json");
                        Body::from(bytes)
                    }
                    None => Body::empty(),
                };
                let request = builder
                    .body(body)
                    .map_err(|e| DirectoryError::Http(e.to_string()))?;

                let response = client
                    .request(request)
                    .await
                    .map_err(|e| DirectoryError::Http(e.to_string()))?;
                let status = response.status().as_u16();
                let body = hyper::body::to_bytes(response.into_body())
                    .await
                    .map_err(|e| DirectoryError::Http(e.to_string()))?;

                Ok(RawResponse {
                    status,
                    body: body.to_vec(),
                })
            }
            Transport::Tcp { client, base_url } => {
                let url = format!("{}{}", base_url, path);
                let mut request = match verb {
                    Verb::Get => client.get(&url),
                    Verb::Post => client.post(&url),
                }
                .header("Accept", "application/json");
                if let Some(bytes) = body {
                    request = request
                        .header("Content-Type", "application/json")
                        .body(bytes);
                }

                let response = request
                    .send()
                    .await
                    .map_err(|e| DirectoryError::Http(e.to_string()))?;
                let status = response.status().as_u16();
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| DirectoryError::Http(e.to_string()))?;

                Ok(RawResponse {
                    status,
                    body: body.to_vec(),
                })
            }
        }
    }
}

/// Node directory backed by a swarm manager's Docker Engine API
pub struct DockerDirectory {
    transport: Transport,
    timeout: Duration,
}

impl DockerDirectory {
    /// Create a client for `host` with the given per-request timeout
    pub fn new(host: DockerHost, timeout: Duration) -> Result<Self, DirectoryError> {
        if timeout.is_zero() {
            return Err(DirectoryError::InvalidTimeout);
        }

        let transport = match host {
            DockerHost::Unix(socket) => Transport::Unix {
                client: Client::unix(),
                socket,
            },
            DockerHost::Tcp(base_url) => Transport::Tcp {
                client: reqwest::Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(|e| DirectoryError::Http(e.to_string()))?,
                base_url,
            },
        };

        Ok(Self {
            transport,
            timeout,
        })
    }

    /// Parse `raw` as a `DOCKER_HOST` value and connect to it
    pub fn from_host_str(raw: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        Self::new(DockerHost::parse(raw)?, timeout)
    }

    async fn request(
        &self,
        verb: Verb,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse, DirectoryError> {
        trace!(?verb, path, "Docker Engine request");
        tokio::time::timeout(self.timeout, self.transport.send(verb, path, body))
            .await
            .map_err(|_| {
                DirectoryError::Http(format!(
                    "request to {} timed out after {}s",
                    path,
                    self.timeout.as_secs()
                ))
            })?
    }

    async fn inspect_node(&self, id: &str) -> Result<SwarmNode, DirectoryError> {
        let response = self.request(Verb::Get, &format!("/nodes/{}", id), None).await?;
        match response.status {
            404 => Err(DirectoryError::NodeNotFound(id.to_string())),
            _ if response.is_success() => Ok(serde_json::from_slice(&response.body)?),
            status => Err(DirectoryError::Api {
                status,
                message: response.message(),
            }),
        }
    }
}

#[async_trait]
impl NodeDirectory for DockerDirectory {
    async fn list_nodes(&self) -> Result<Vec<Node>, DirectoryError> {
        let response = self.request(Verb::Get, "/nodes", None).await?;
        if !response.is_success() {
            return Err(DirectoryError::Api {
                status: response.status,
                message: response.message(),
            });
        }

        let nodes: Vec<SwarmNode> = serde_json::from_slice(&response.body)?;
        debug!("Listed {} swarm nodes", nodes.len());
        Ok(nodes.into_iter().map(Node::from).collect())
    }

    async fn update_node_labels(&self, node: &Node, labels: Labels) -> Result<(), DirectoryError> {
        // The update replaces the whole spec, so role and availability are
        // taken from a fresh read. The version comes from the snapshot the
        // labels were planned against.
        let current = self.inspect_node(&node.id).await?;
        let version = node
            .version
            .or(current.version.map(|v| v.index))
            .ok_or_else(|| DirectoryError::Api {
                status: 0,
                message: format!("node {} has no version index", node.id),
            })?;

        let spec = SwarmNodeSpec {
            labels: Some(labels),
            ..current.spec
        };
        let body = serde_json::to_vec(&spec)?;
        let path = format!("/nodes/{}/update?version={}", node.id, version);

        let response = self.request(Verb::Post, &path, Some(body)).await?;
        if response.is_success() {
            debug!(node = %node.id, version, "Node labels updated");
            return Ok(());
        }

        let message = response.message();
        match response.status {
            404 => Err(DirectoryError::NodeNotFound(node.id.clone())),
            _ if message.contains("out of sequence") => Err(DirectoryError::VersionConflict {
                node: node.id.clone(),
                version,
                message,
            }),
            status => Err(DirectoryError::Api { status, message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_JSON: &str = r#"{
        "ID": "24ifsmvkjbyhk",
        "Version": {"Index": 373531},
        "CreatedAt": "2016-08-18T10:44:24.496525531Z",
        "Spec": {
            "Availability": "active",
            "Name": "node-name",
            "Role": "manager",
            "Labels": {"priority": "high", "disabled.ssd": "true"}
        },
        "Description": {
            "Hostname": "bf3067039e47",
            "Platform": {"Architecture": "x86_64", "OS": "linux"},
            "Resources": {"NanoCPUs": 4000000000, "MemoryBytes": 8272408576}
        },
        "Status": {"State": "ready", "Addr": "172.17.0.2"}
    }"#;

    #[test]
    fn test_parse_docker_host() {
        assert_eq!(
            DockerHost::parse(DEFAULT_DOCKER_HOST).unwrap(),
            DockerHost::Unix(PathBuf::from("/var/run/docker.sock"))
        );
        assert_eq!(
            DockerHost::parse("tcp://10.0.0.1:2375").unwrap(),
            DockerHost::Tcp("http://10.0.0.1:2375".to_string())
        );
        assert_eq!(
            DockerHost::parse("http://manager:2375/").unwrap(),
            DockerHost::Tcp("http://manager:2375".to_string())
        );
        assert_eq!(
            DockerHost::parse("/run/docker.sock").unwrap(),
            DockerHost::Unix(PathBuf::from("/run/docker.sock"))
        );
        assert!(DockerHost::parse("ssh://manager").is_err());
        assert!(DockerHost::parse("unix://").is_err());
    }

    #[test]
    fn test_swarm_node_to_node() {
        let wire: SwarmNode = serde_json::from_str(NODE_JSON).unwrap();
        let node = Node::from(wire);

        assert_eq!(node.id, "24ifsmvkjbyhk");
        assert_eq!(node.version, Some(373531));
        assert_eq!(node.hostname, "bf3067039e47");
        assert_eq!(node.role, NodeRole::Manager);
        assert!(node.available);
        assert_eq!(node.platform.os, "linux");
        assert_eq!(node.platform.architecture, "x86_64");
        assert_eq!(node.labels.len(), 2);
        assert_eq!(node.labels.get("priority").map(String::as_str), Some("high"));
    }

    #[test]
    fn test_drained_node_with_null_labels() {
        let json = r#"{
            "ID": "abc",
            "Version": {"Index": 1},
            "Spec": {"Availability": "drain", "Role": "worker", "Labels": null},
            "Description": {"Hostname": "n2"}
        }"#;
        let node = Node::from(serde_json::from_str::<SwarmNode>(json).unwrap());

        assert!(!node.available);
        assert_eq!(node.role, NodeRole::Worker);
        assert!(node.labels.is_empty());
        assert_eq!(node.platform, Platform::default());
    }

    #[test]
    fn test_update_spec_keeps_role_and_availability() {
        let wire: SwarmNode = serde_json::from_str(NODE_JSON).unwrap();
        let mut labels = Labels::new();
        labels.insert("disabled.priority".to_string(), "high".to_string());

        let spec = SwarmNodeSpec {
            labels: Some(labels),
            ..wire.spec
        };
        let json: serde_json::Value = serde_json::to_value(&spec).unwrap();

        assert_eq!(json["Role"], "manager");
        assert_eq!(json["Availability"], "active");
        assert_eq!(json["Name"], "node-name");
        assert_eq!(json["Labels"]["disabled.priority"], "high");
        assert!(json["Labels"].get("priority").is_none());
    }

    #[test]
    fn test_engine_error_message() {
        let response = RawResponse {
            status: 500,
            body: br#"{"message":"update out of sequence"}"#.to_vec(),
        };
        assert!(!response.is_success());
        assert_eq!(response.message(), "update out of sequence");

        let plain = RawResponse {
            status: 502,
            body: b"bad gateway\n".to_vec(),
        };
        assert_eq!(plain.message(), "bad gateway");
    }

    #[tokio::test]
    async fn test_unreachable_socket_is_an_error() {
        let directory = DockerDirectory::new(
            DockerHost::Unix(PathBuf::from("/nonexistent/docker.sock")),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(directory.list_nodes().await.is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = DockerDirectory::from_host_str(DEFAULT_DOCKER_HOST, Duration::ZERO);
        assert!(matches!(result, Err(DirectoryError::InvalidTimeout)));

        let result = DockerDirectory::from_host_str("tcp://manager:2375", Duration::ZERO);
        assert!(matches!(result, Err(DirectoryError::InvalidTimeout)));

        assert!(DockerDirectory::from_host_str("tcp://manager:2375", Duration::from_secs(1)).is_ok());
    }
}
