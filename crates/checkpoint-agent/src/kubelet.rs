//! Kubelet checkpoint endpoint client
//!
//! Issues the checkpoint POST against the local kubelet over mutual TLS.
//! Client credentials are discovered from a small set of canonical host
//! paths (worker and master layouts differ); the first complete triple wins.
//! Peer-name verification is disabled because kubelet serving certificates
//! routinely lack IP SANs, but the CA chain is still validated.

use crate::backoff::ExponentialBackoff;
use crate::error::CheckpointError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

const CHECKPOINT_TIMEOUT: Duration = Duration::from_secs(30);

/// One candidate (cert, key, CA) location on the host filesystem
#[derive(Debug, Clone)]
pub struct CredentialTriple {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub ca: PathBuf,
    pub desc: &'static str,
}

/// The canonical credential locations, in probe order.
pub fn candidate_triples() -> Vec<CredentialTriple> {
    vec![
        // Worker node paths (kubelet auto-generated; cert and key share a file)
        CredentialTriple {
            cert: PathBuf::from("/var/lib/kubelet/pki/kubelet-client-current.pem"),
            key: PathBuf::from("/var/lib/kubelet/pki/kubelet-client-current.pem"),
            ca: PathBuf::from("/etc/kubernetes/pki/ca.crt"),
            desc: "worker node (kubelet auto-generated)",
        },
        // Master node paths (kubeadm generated)
        CredentialTriple {
            cert: PathBuf::from("/etc/kubernetes/pki/apiserver-kubelet-client.crt"),
            key: PathBuf::from("/etc/kubernetes/pki/apiserver-kubelet-client.key"),
            ca: PathBuf::from("/etc/kubernetes/pki/ca.crt"),
            desc: "master node (kubeadm generated)",
        },
        // Alternative master node paths
        CredentialTriple {
            cert: PathBuf::from("/etc/kubernetes/pki/apiserver-kubelet-client.crt"),
            key: PathBuf::from("/etc/kubernetes/pki/apiserver-kubelet-client.key"),
            ca: PathBuf::from("/var/lib/kubelet/pki/kubelet.crt"),
            desc: "master node (alternative CA)",
        },
    ]
}

/// Pick the first triple whose three files all exist.
pub fn select_triple(candidates: &[CredentialTriple]) -> Option<&CredentialTriple> {
    candidates.iter().find(|triple| {
        for path in [&triple.cert, &triple.key, &triple.ca] {
            if !path.exists() {
                debug!("Credential file not found: {}", path.display());
                return false;
            }
        }
        true
    })
}

/// The kubelet checkpoint URL for one container.
pub fn checkpoint_url(
    node_name: &str,
    kubelet_port: u16,
    pod_namespace: &str,
    pod_name: &str,
    container_name: &str,
) -> String {
    format!(
        "https://{}:{}/checkpoint/{}/{}/{}",
        node_name, kubelet_port, pod_namespace, pod_name, container_name
    )
}

#[derive(Debug, Deserialize)]
struct CheckpointItems {
    #[serde(default)]
    items: Vec<String>,
}

/// Parse the kubelet's checkpoint response body into archive paths.
///
/// An empty `items` array is a failure: the kubelet accepted the request but
/// produced nothing, which the caller treats as retriable.
pub fn parse_checkpoint_response(body: &str) -> Result<Vec<String>, CheckpointError> {
    let parsed: CheckpointItems = serde_json::from_str(body)?;
    if parsed.items.is_empty() {
        return Err(CheckpointError::NoArchives);
    }
    Ok(parsed.items)
}

/// HTTPS client for the local kubelet's checkpoint endpoint
pub struct KubeletClient {
    http: reqwest::Client,
    node_name: String,
    kubelet_port: u16,
}

impl KubeletClient {
    /// Build a client with mutual-TLS credentials discovered from the host.
    pub fn new(node_name: &str, kubelet_port: u16) -> Result<Self, CheckpointError> {
        let candidates = candidate_triples();
        let triple = select_triple(&candidates).ok_or(CheckpointError::NoClientCredentials)?;
        info!(
            "Loaded kubelet client credentials: {} (cert={}, key={}, ca={})",
            triple.desc,
            triple.cert.display(),
            triple.key.display(),
            triple.ca.display()
        );
        let http = build_tls_client(triple)?;
        Ok(Self {
            http,
            node_name: node_name.to_string(),
            kubelet_port,
        })
    }

    /// Checkpoint one container, retrying with bounded exponential backoff.
    ///
    /// Returns the archive paths the kubelet reports; the first entry is the
    /// canonical artifact.
    pub async fn checkpoint(
        &self,
        pod_namespace: &str,
        pod_name: &str,
        container_name: &str,
    ) -> Result<Vec<String>, CheckpointError> {
        let url = checkpoint_url(
            &self.node_name,
            self.kubelet_port,
            pod_namespace,
            pod_name,
            container_name,
        );

        let mut backoff = ExponentialBackoff::kubelet();
        loop {
            match self.checkpoint_once(&url).await {
                Ok(items) => {
                    info!("Checkpoint created successfully, files: {:?}", items);
                    return Ok(items);
                }
                Err(err) => match backoff.next_delay() {
                    Some(delay) => {
                        warn!("Kubelet checkpoint attempt failed, retrying: {}", err);
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(CheckpointError::RetriesExhausted(Box::new(err))),
                },
            }
        }
    }

    async fn checkpoint_once(&self, url: &str) -> Result<Vec<String>, CheckpointError> {
        let response = self.http.post(url).send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(CheckpointError::KubeletStatus {
                status: status.as_u16(),
                body,
            });
        }

        parse_checkpoint_response(&body)
    }
}

/// Build the reqwest client carrying the mutual-TLS identity.
fn build_tls_client(triple: &CredentialTriple) -> Result<reqwest::Client, CheckpointError> {
    let cert_pem = std::fs::read(&triple.cert)?;
    let key_pem = std::fs::read(&triple.key)?;
    let ca_pem = std::fs::read(&triple.ca)?;

    let identity = reqwest::Identity::from_pkcs8_pem(&cert_pem, &key_pem)?;
    let ca = reqwest::Certificate::from_pem(&ca_pem)?;

    let client = reqwest::Client::builder()
        .timeout(CHECKPOINT_TIMEOUT)
        .identity(identity)
        .add_root_certificate(ca)
        // Kubelet serving certs often lack IP SANs; the CA chain is still checked.
        .danger_accept_invalid_hostnames(true)
        .build()?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn checkpoint_url_embeds_pod_coordinates() {
        let url = checkpoint_url("node-2", 10250, "default", "p1", "c");
        assert_eq!(url, "https://node-2:10250/checkpoint/default/p1/c");
    }

    #[test]
    fn parse_response_returns_items() {
        let items =
            parse_checkpoint_response(r#"{"items": ["/var/lib/kubelet/checkpoints/a.tar"]}"#)
                .unwrap();
        assert_eq!(items, vec!["/var/lib/kubelet/checkpoints/a.tar"]);
    }

    #[test]
    fn parse_response_rejects_empty_items() {
        assert!(matches!(
            parse_checkpoint_response(r#"{"items": []}"#),
            Err(CheckpointError::NoArchives)
        ));
        assert!(matches!(
            parse_checkpoint_response(r#"{}"#),
            Err(CheckpointError::NoArchives)
        ));
    }

    #[test]
    fn parse_response_rejects_malformed_json() {
        assert!(matches!(
            parse_checkpoint_response("not json"),
            Err(CheckpointError::Serialization(_))
        ));
    }

    #[test]
    fn select_triple_takes_first_complete() {
        let dir = tempfile::tempdir().unwrap();
        let present = |name: &str| {
            let path = dir.path().join(name);
            fs::write(&path, "pem").unwrap();
            path
        };

        let incomplete = CredentialTriple {
            cert: dir.path().join("missing.crt"),
            key: present("k1.key"),
            ca: present("ca1.crt"),
            desc: "incomplete",
        };
        let complete = CredentialTriple {
            cert: present("c2.crt"),
            key: present("k2.key"),
            ca: present("ca2.crt"),
            desc: "complete",
        };
        let also_complete = CredentialTriple {
            cert: present("c3.crt"),
            key: present("k3.key"),
            ca: present("ca3.crt"),
            desc: "later",
        };

        let candidates = vec![incomplete, complete, also_complete];
        let selected = select_triple(&candidates).unwrap();
        assert_eq!(selected.desc, "complete");
    }

    #[test]
    fn select_triple_none_when_all_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![CredentialTriple {
            cert: dir.path().join("nope.crt"),
            key: dir.path().join("nope.key"),
            ca: dir.path().join("nope-ca.crt"),
            desc: "absent",
        }];
        assert!(select_triple(&candidates).is_none());
    }
}
