//! Realtime change-feed support.
//!
//! The registry fans change events out to subscriber queues; the SSE decoder
//! and protocol types cover the PocketBase realtime stream.

mod protocol;
mod registry;
pub mod sse;

pub use protocol::*;
pub use registry::{Subscriber, SubscriberRegistry};
