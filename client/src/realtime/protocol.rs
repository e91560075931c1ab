//! Realtime message shapes.
//!
//! The server speaks server-sent events. The first event on a new stream is
//! `PB_CONNECT` carrying the client id; every later event is named after the
//! topic it belongs to and carries a [`ChangeEvent`](basket_engine::ChangeEvent)
//! as JSON data.

use serde::{Deserialize, Serialize};

/// Name of the handshake event.
pub const CONNECT_EVENT: &str = "PB_CONNECT";

/// Topic covering every record of a collection.
pub fn collection_topic(collection: &str) -> String {
    format!("{}/*", collection)
}

/// Data of the `PB_CONNECT` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectPayload {
    pub client_id: String,
}

/// Body of `POST /api/realtime`, replacing the client's topic list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSubscriptions {
    pub client_id: String,
    pub subscriptions: Vec<String>,
}
