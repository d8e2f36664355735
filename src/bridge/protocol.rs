//! Messages exchanged with the page-context resolver

use serde::{Deserialize, Serialize};

/// Request sent to the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    #[serde(rename_all = "camelCase")]
    FetchLocation { screen_name: String, request_id: u64 },
}

/// Reply to a single `fetchLocation` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub screen_name: String,
    pub request_id: u64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_rate_limited: bool,
    /// When the rate limit lifts (epoch seconds), if the resolver knows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<i64>,
}

/// Anything the resolver may send back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    LocationResponse(LocationResponse),
    /// Out-of-band notice that the platform is throttling requests
    #[serde(rename_all = "camelCase")]
    RateLimitInfo {
        /// Epoch seconds at which requests may resume
        reset_time: i64,
        /// Milliseconds until then, as measured by the resolver
        #[serde(default)]
        wait_time: u64,
    },
}
