//! Realtime session over server-sent events.
//!
//! Opening a session issues `GET /api/realtime` and waits for the
//! `PB_CONNECT` event to learn the client id. The topic list is then set with
//! `POST /api/realtime`, and re-posted whenever a subscription is added or
//! removed. A reader task decodes the stream and dispatches each event to the
//! subscribers of its topic.

use std::sync::Arc;

use basket_engine::ChangeEvent;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Method;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{check_status, PocketBaseClient};
use crate::api::{EventSender, SubscriptionId};
use crate::error::{ClientError, Result};
use crate::realtime::sse::SseDecoder;
use crate::realtime::{ConnectPayload, SetSubscriptions, SubscriberRegistry, CONNECT_EVENT};

/// An open realtime stream.
pub(crate) struct Session {
    client_id: String,
    reader: JoinHandle<()>,
}

impl Session {
    fn is_open(&self) -> bool {
        !self.reader.is_finished()
    }

    pub(crate) fn close(self) {
        self.reader.abort();
    }
}

impl PocketBaseClient {
    pub(super) async fn subscribe_topic(
        &self,
        topic: String,
        sender: EventSender,
    ) -> Result<SubscriptionId> {
        let mut session = self.session.lock().await;
        let id = self.registry.register(topic.clone(), sender);

        let result = match self.ensure_session(&mut session).await {
            Ok(client_id) => self.submit_subscriptions(&client_id).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            self.registry.unregister(&id);
            return Err(e);
        }

        tracing::info!(topic = %topic, subscription = %id, "Realtime subscription active");
        Ok(id)
    }

    pub(super) async fn unsubscribe_id(&self, id: &str) -> Result<()> {
        let mut session = self.session.lock().await;
        if !self.registry.unregister(id) {
            return Ok(());
        }

        if self.registry.is_empty() {
            if let Some(open) = session.take() {
                open.close();
                tracing::info!("Realtime session closed");
            }
            return Ok(());
        }

        match session.as_ref() {
            Some(open) if open.is_open() => self.submit_subscriptions(&open.client_id).await,
            _ => Ok(()),
        }
    }

    /// Return the client id of the open session, connecting if needed.
    async fn ensure_session(&self, slot: &mut Option<Session>) -> Result<String> {
        if let Some(open) = slot.as_ref() {
            if open.is_open() {
                return Ok(open.client_id.clone());
            }
            tracing::warn!(client_id = %open.client_id, "Realtime stream was closed, reconnecting");
        }

        let url = self.url(&["api", "realtime"])?;
        let response = self
            .request(Method::GET, url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;

        let (connected_tx, connected_rx) = oneshot::channel();
        let reader = tokio::spawn(read_stream(
            response.bytes_stream(),
            self.registry.clone(),
            connected_tx,
        ));

        let client_id = match connected_rx.await {
            Ok(client_id) => client_id,
            Err(_) => {
                reader.abort();
                return Err(ClientError::Realtime(
                    "stream ended before the connect event".to_string(),
                ));
            }
        };

        tracing::info!(client_id = %client_id, "Realtime session established");

        *slot = Some(Session {
            client_id: client_id.clone(),
            reader,
        });
        Ok(client_id)
    }

    async fn submit_subscriptions(&self, client_id: &str) -> Result<()> {
        let body = SetSubscriptions {
            client_id: client_id.to_string(),
            subscriptions: self.registry.topics(),
        };
        let url = self.url(&["api", "realtime"])?;
        let response = self.request(Method::POST, url).json(&body).send().await?;
        check_status(response).await?;

        tracing::debug!(
            client_id = %client_id,
            topics = body.subscriptions.len(),
            "Realtime subscriptions submitted"
        );
        Ok(())
    }
}

/// Decode the event stream until it ends, dispatching change events.
async fn read_stream<S, B>(
    stream: S,
    registry: Arc<SubscriberRegistry>,
    connected: oneshot::Sender<String>,
) where
    S: Stream<Item = reqwest::Result<B>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = SseDecoder::new();
    let mut connected = Some(connected);

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("Realtime stream error: {}", e);
                break;
            }
        };

        for event in decoder.feed(chunk.as_ref()) {
            if event.event == CONNECT_EVENT {
                match serde_json::from_str::<ConnectPayload>(&event.data) {
                    Ok(payload) => {
                        if let Some(tx) = connected.take() {
                            let _ = tx.send(payload.client_id);
                        }
                    }
                    Err(e) => tracing::warn!("Invalid connect event: {}", e),
                }
                continue;
            }

            match serde_json::from_str::<ChangeEvent>(&event.data) {
                Ok(change) => {
                    registry.dispatch(&event.event, &change);
                }
                Err(e) => {
                    tracing::warn!(topic = %event.event, "Ignoring undecodable realtime event: {}", e);
                }
            }
        }
    }

    tracing::info!("Realtime stream ended");
}
