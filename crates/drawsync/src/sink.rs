//! [`ChannelSink`]: encodes notifications and fans them out over a
//! Tokio broadcast channel.
//!
//! This is the piece a transport layer subscribes to. Each subscriber
//! gets every [`Published`] message and filters by topic itself.

use drawsync_protocol::{Codec, JsonCodec, Notification, Topic};
use drawsync_room::BroadcastSink;
use tokio::sync::broadcast;

/// One encoded notification, ready to hand to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Where it was published.
    pub topic: Topic,
    /// The notification, encoded with the sink's codec.
    pub payload: Vec<u8>,
}

/// A [`BroadcastSink`] backed by `tokio::sync::broadcast`.
///
/// Cheap to clone; clones publish into the same channel. When the ring
/// buffer is full, the oldest messages are dropped for lagging
/// receivers.
#[derive(Debug, Clone)]
pub struct ChannelSink<C: Codec = JsonCodec> {
    codec: C,
    sender: broadcast::Sender<Published>,
}

impl ChannelSink<JsonCodec> {
    /// Creates a JSON-encoding sink buffering up to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self::with_codec(JsonCodec, capacity)
    }
}

impl<C: Codec> ChannelSink<C> {
    /// Creates a sink using `codec`. A capacity of 0 is raised to 1.
    pub fn with_codec(codec: C, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { codec, sender }
    }

    /// A receiver for every message published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Published> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<C: Codec> BroadcastSink for ChannelSink<C> {
    fn publish(&self, topic: Topic, notification: Notification) {
        let payload = match self.codec.encode(&notification) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%topic, error = %e, "dropping notification that failed to encode");
                return;
            }
        };
        // No receivers is not an error: nobody is watching this room.
        let delivered = self.sender.send(Published { topic, payload }).unwrap_or(0);
        tracing::trace!(delivered, "notification published");
    }
}
