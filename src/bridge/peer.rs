//! Resolver implementations that sit on the far side of a `ResolverChannel`
//!
//! `spawn_http_peer` forwards each request to a sidecar service over HTTP.
//! `spawn_static_peer` answers from a fixed table, which is enough to drive
//! the terminal demo offline.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, warn};

use super::protocol::{InboundMessage, LocationResponse, OutboundMessage};
use super::{BridgeError, PeerEnd};

/// Body returned by the sidecar: a single message or a batch
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SidecarReply {
    One(InboundMessage),
    Many(Vec<InboundMessage>),
}

impl SidecarReply {
    fn into_messages(self) -> Vec<InboundMessage> {
        match self {
            SidecarReply::One(message) => vec![message],
            SidecarReply::Many(messages) => messages,
        }
    }
}

/// Posts `request` to the sidecar and returns whatever messages it answers with
async fn post_request(
    client: &Client,
    endpoint: &str,
    request: &OutboundMessage,
) -> Result<Vec<InboundMessage>, BridgeError> {
    let response = client
        .post(endpoint)
        .json(request)
        .send()
        .await
        .map_err(|e| BridgeError::Transport(e.to_string()))?
        .error_for_status()
        .map_err(|e| BridgeError::Transport(e.to_string()))?;

    let reply: SidecarReply = response
        .json()
        .await
        .map_err(|e| BridgeError::Transport(e.to_string()))?;
    Ok(reply.into_messages())
}

/// Forwards every request to an HTTP sidecar resolver
///
/// Each request is posted as JSON to `endpoint`; the reply body may be one
/// inbound message or a list of them, so a sidecar can attach a
/// `rateLimitInfo` notice to a response. Failed posts produce no reply and
/// the bridge's timeout turns them into misses.
pub fn spawn_http_peer(endpoint: String, peer: PeerEnd) -> JoinHandle<()> {
    let PeerEnd {
        mut requests,
        replies,
    } = peer;
    let client = Client::new();

    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let client = client.clone();
            let endpoint = endpoint.clone();
            let replies = replies.clone();

            tokio::spawn(async move {
                match post_request(&client, &endpoint, &request).await {
                    Ok(messages) => {
                        for message in messages {
                            if replies.send(message).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "resolver sidecar request failed"),
                }
            });
        }
    })
}

/// Loads a username to location table from a JSON object file
pub fn load_location_table(path: &Path) -> std::io::Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Answers requests from a fixed table after a simulated round-trip delay
pub fn spawn_static_peer(
    table: HashMap<String, String>,
    latency: Duration,
    peer: PeerEnd,
) -> JoinHandle<()> {
    let PeerEnd {
        mut requests,
        replies,
    } = peer;

    tokio::spawn(async move {
        while let Some(OutboundMessage::FetchLocation {
            screen_name,
            request_id,
        }) = requests.recv().await
        {
            time::sleep(latency).await;
            debug!(username = %screen_name, "static resolver answering");
            let response = LocationResponse {
                location: table.get(&screen_name).cloned(),
                screen_name,
                request_id,
                is_rate_limited: false,
                reset_time: None,
            };
            if replies
                .send(InboundMessage::LocationResponse(response))
                .is_err()
            {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ResolverChannel;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_static_peer_answers_known_and_unknown() {
        let (mut channel, peer) = ResolverChannel::pair();
        let table = HashMap::from([("jdoe".to_string(), "Canada".to_string())]);
        spawn_static_peer(table, Duration::ZERO, peer);

        for (name, id) in [("jdoe", 1), ("nobody", 2)] {
            channel
                .outbound
                .send(OutboundMessage::FetchLocation {
                    screen_name: name.to_string(),
                    request_id: id,
                })
                .unwrap();
        }

        let first = channel.inbound.recv().await.unwrap();
        let second = channel.inbound.recv().await.unwrap();
        match (first, second) {
            (InboundMessage::LocationResponse(a), InboundMessage::LocationResponse(b)) => {
                assert_eq!((a.request_id, a.location.as_deref()), (1, Some("Canada")));
                assert_eq!((b.request_id, b.location), (2, None));
            }
            other => panic!("unexpected replies: {:?}", other),
        }
    }

    #[test]
    fn test_sidecar_reply_accepts_single_or_batch() {
        let single: SidecarReply = serde_json::from_value(json!({
            "type": "locationResponse", "screenName": "a", "requestId": 1, "location": null
        }))
        .unwrap();
        assert_eq!(single.into_messages().len(), 1);

        let batch: SidecarReply = serde_json::from_value(json!([
            {"type": "rateLimitInfo", "resetTime": 1_700_000_000, "waitTime": 1000},
            {"type": "locationResponse", "screenName": "a", "requestId": 1, "isRateLimited": true}
        ]))
        .unwrap();
        assert_eq!(batch.into_messages().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_sidecar_sends_no_reply() {
        let (mut channel, peer) = ResolverChannel::pair();
        spawn_http_peer("http://127.0.0.1:9/resolve".to_string(), peer);

        channel
            .outbound
            .send(OutboundMessage::FetchLocation {
                screen_name: "jdoe".to_string(),
                request_id: 1,
            })
            .unwrap();

        let reply = time::timeout(Duration::from_secs(2), channel.inbound.recv()).await;
        assert!(reply.is_err(), "a failed post must not produce a reply");
    }

    #[test]
    fn test_load_location_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("locations.json");
        std::fs::write(&path, r#"{"jdoe": "Canada", "mika": "Finland"}"#).unwrap();

        let table = load_location_table(&path).unwrap();
        assert_eq!(table.get("mika").map(String::as_str), Some("Finland"));
    }
}
