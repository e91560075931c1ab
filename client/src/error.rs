//! Error types for the backend client and the synchronizer.

use basket_engine::CollectionName;

/// Errors returned by a [`RecordApi`](crate::RecordApi) implementation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("unsupported filter: {0}")]
    InvalidFilter(String),

    #[error("realtime error: {0}")]
    Realtime(String),

    #[error("injected failure: {0}")]
    Injected(String),
}

/// Result type for backend calls.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures the synchronizer catches at its boundary.
///
/// Neither kind is ever returned to callers: fetch failures end up in
/// `SyncState::error`, subscription failures are only logged.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to load {collection}: {source}")]
    Fetch {
        collection: CollectionName,
        #[source]
        source: ClientError,
    },

    #[error("live updates for {collection} degraded: {source}")]
    Subscription {
        collection: CollectionName,
        #[source]
        source: ClientError,
    },
}

impl SyncError {
    pub fn fetch(collection: &str, source: ClientError) -> Self {
        SyncError::Fetch {
            collection: collection.to_string(),
            source,
        }
    }

    pub fn subscription(collection: &str, source: ClientError) -> Self {
        SyncError::Subscription {
            collection: collection.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ClientError::Api {
            status: 400,
            message: "Something went wrong while processing your request.".into(),
        };
        assert_eq!(
            err.to_string(),
            "backend error 400: Something went wrong while processing your request."
        );

        let err = SyncError::fetch("products", ClientError::NotFound("products".into()));
        assert_eq!(
            err.to_string(),
            "failed to load products: not found: products"
        );

        let err = SyncError::subscription("products", ClientError::Realtime("closed".into()));
        assert_eq!(
            err.to_string(),
            "live updates for products degraded: realtime error: closed"
        );
    }
}
