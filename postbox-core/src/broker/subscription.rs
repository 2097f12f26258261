//! Subscriber side of the broker

use std::fmt;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use uuid::Uuid;

use super::Registry;
use crate::model::MessageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(super) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A live registration with the broker
///
/// Yields every record published after it was created, in publish order.
/// The stream ends once the registration is gone (explicit unsubscribe,
/// overflow disconnect, broker shutdown) and the buffer has drained.
/// Dropping the value unregisters it.
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<MessageRecord>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub(super) fn new(
        id: SubscriptionId,
        rx: mpsc::Receiver<MessageRecord>,
        registry: Weak<Registry>,
    ) -> Self {
        Self { id, rx, registry }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next record, or `None` once the subscription has ended
    pub async fn recv(&mut self) -> Option<MessageRecord> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Subscription::recv`]; `None` if nothing is buffered
    pub fn try_recv(&mut self) -> Option<MessageRecord> {
        self.rx.try_recv().ok()
    }

    /// Unregister now instead of waiting for drop
    ///
    /// Returns `false` if the broker had already dropped this subscription.
    pub fn close(self) -> bool {
        self.unregister()
    }

    fn unregister(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }
}

impl Stream for Subscription {
    type Item = MessageRecord;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
