//! In-process publish/subscribe hub for newly created messages
//!
//! Each subscriber owns a bounded `mpsc` buffer. Publishing `try_send`s into
//! every buffer under the subscriber-set lock and never waits. A subscriber
//! whose buffer is full is disconnected: its entry is removed and its sender
//! dropped, so its stream ends after draining what it already holds. The
//! other subscribers and the publisher are unaffected.
//!
//! The subscriber set sits behind a synchronous mutex so that dropping a
//! [`Subscription`] can unregister it without an executor. The lock is never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::config::BrokerConfig;
use crate::metrics::{
    self as postbox_metrics, BROKER_DELIVERED, BROKER_DISCONNECTED, BROKER_SUBSCRIBERS,
};
use crate::model::MessageRecord;

mod subscription;

pub use subscription::{Subscription, SubscriptionId};

/// Default per-subscriber buffer
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 128;

/// Outcome of a single [`SubscriptionBroker::publish`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that accepted the record
    pub delivered: usize,
    /// Subscribers removed because their buffer was full
    pub disconnected: usize,
    /// Subscribers removed because their receiving side was already gone
    pub closed: usize,
}

pub(crate) struct Registry {
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::Sender<MessageRecord>>>,
    overflow_disconnects: AtomicU64,
}

impl Registry {
    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriptionId, mpsc::Sender<MessageRecord>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let removed = subscribers.remove(&id).is_some();
        if removed {
            postbox_metrics::record_gauge(BROKER_SUBSCRIBERS, subscribers.len() as f64);
            debug!(subscription = %id, remaining = subscribers.len(), "Subscription unregistered");
        }
        removed
    }
}

/// Cheap to clone; all clones share one subscriber set
#[derive(Clone)]
pub struct SubscriptionBroker {
    registry: Arc<Registry>,
    buffer: usize,
}

impl SubscriptionBroker {
    /// # Arguments
    /// * `buffer` - records held per subscriber before it is disconnected (minimum 1)
    pub fn new(buffer: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: Mutex::new(HashMap::new()),
                overflow_disconnects: AtomicU64::new(0),
            }),
            buffer: buffer.max(1),
        }
    }

    pub fn from_config(config: &BrokerConfig) -> Self {
        Self::new(config.subscriber_buffer)
    }

    pub fn buffer(&self) -> usize {
        self.buffer
    }

    /// Register a new subscriber
    ///
    /// Only records published after this call returns are delivered to it.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = SubscriptionId::generate();

        let mut subscribers = self.registry.lock();
        subscribers.insert(id, tx);
        postbox_metrics::record_gauge(BROKER_SUBSCRIBERS, subscribers.len() as f64);
        debug!(subscription = %id, total = subscribers.len(), "Subscription registered");
        drop(subscribers);

        Subscription::new(id, rx, Arc::downgrade(&self.registry))
    }

    /// Remove a subscriber; `false` if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.remove(id)
    }

    /// Offer `record` to every subscriber registered at this moment
    pub fn publish(&self, record: &MessageRecord) -> PublishReport {
        let mut report = PublishReport::default();

        let mut subscribers = self.registry.lock();
        subscribers.retain(|id, tx| match tx.try_send(record.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscription = %id, "Subscriber buffer full; disconnecting");
                report.disconnected += 1;
                false
            }
            Err(TrySendError::Closed(_)) => {
                report.closed += 1;
                false
            }
        });
        let remaining = subscribers.len();
        drop(subscribers);

        if report.disconnected > 0 {
            self.registry
                .overflow_disconnects
                .fetch_add(report.disconnected as u64, Ordering::Relaxed);
        }

        postbox_metrics::record_counter(BROKER_DELIVERED, report.delivered as u64);
        postbox_metrics::record_counter(BROKER_DISCONNECTED, report.disconnected as u64);
        if report.disconnected + report.closed > 0 {
            postbox_metrics::record_gauge(BROKER_SUBSCRIBERS, remaining as f64);
        }

        report
    }

    /// Unregister everyone; open streams end once drained
    ///
    /// Returns how many subscriptions were closed.
    pub fn close_all(&self) -> usize {
        let mut subscribers = self.registry.lock();
        let closed = subscribers.len();
        subscribers.clear();
        postbox_metrics::record_gauge(BROKER_SUBSCRIBERS, 0.0);
        closed
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Subscribers dropped for a full buffer since the broker was created
    pub fn overflow_disconnects(&self) -> u64 {
        self.registry.overflow_disconnects.load(Ordering::Relaxed)
    }
}

impl Default for SubscriptionBroker {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{recv_timeout, sample_record as record, RecvTimeoutError};
    use std::time::Duration;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_broker_creation() {
        let broker = SubscriptionBroker::new(10);
        assert_eq!(broker.subscriber_count(), 0);
        assert_eq!(broker.overflow_disconnects(), 0);
        assert_eq!(SubscriptionBroker::new(0).buffer(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_publish_order() {
        let broker = SubscriptionBroker::new(10);
        let mut sub = broker.subscribe();

        for text in ["a", "b", "c"] {
            assert_eq!(broker.publish(&record(text)).delivered, 1);
        }

        for expected in ["a", "b", "c"] {
            assert_eq!(sub.recv().await.unwrap().message, expected);
        }
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_no_backlog_for_late_subscribers() {
        let broker = SubscriptionBroker::new(10);
        broker.publish(&record("early"));

        let mut late = broker.subscribe();
        broker.publish(&record("late"));

        assert_eq!(late.recv().await.unwrap().message, "late");
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_fanout_to_multiple_subscribers() {
        let broker = SubscriptionBroker::new(10);
        let mut subs: Vec<_> = (0..3).map(|_| broker.subscribe()).collect();
        assert_eq!(broker.subscriber_count(), 3);

        let report = broker.publish(&record("hello"));
        assert_eq!(report.delivered, 3);

        for sub in &mut subs {
            assert_eq!(sub.recv().await.unwrap().message, "hello");
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let broker = SubscriptionBroker::new(10);
        assert_eq!(broker.publish(&record("nobody")), PublishReport::default());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let broker = SubscriptionBroker::new(10);
        let mut sub = broker.subscribe();

        broker.publish(&record("kept"));
        assert!(broker.unsubscribe(sub.id()));
        assert!(!broker.unsubscribe(sub.id()), "second unsubscribe is a no-op");

        let report = broker.publish(&record("dropped"));
        assert_eq!(report, PublishReport::default());

        // Buffered before unsubscribe, then end of stream.
        assert_eq!(sub.recv().await.unwrap().message, "kept");
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let broker = SubscriptionBroker::new(10);
        {
            let _sub = broker.subscribe();
            assert_eq!(broker.subscriber_count(), 1);
        }
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_close_reports_prior_removal() {
        let broker = SubscriptionBroker::new(10);
        let sub = broker.subscribe();
        assert!(sub.close());

        let sub = broker.subscribe();
        broker.unsubscribe(sub.id());
        assert!(!sub.close());
    }

    #[tokio::test]
    async fn test_full_buffer_disconnects_only_the_slow_subscriber() {
        let broker = SubscriptionBroker::new(2);
        let mut slow = broker.subscribe();
        let mut fast = broker.subscribe();

        let mut reports = Vec::new();
        for i in 0..4 {
            reports.push(broker.publish(&record(&i.to_string())));
            // fast keeps up
            assert_eq!(fast.recv().await.unwrap().message, i.to_string());
        }

        // Third publish overflows `slow`.
        assert_eq!(reports[2].disconnected, 1);
        assert_eq!(broker.overflow_disconnects(), 1);
        assert_eq!(reports[3].delivered, 1);
        assert_eq!(broker.subscriber_count(), 1);

        let drained: Vec<_> = (&mut slow).map(|r| r.message).collect().await;
        assert_eq!(drained, vec!["0", "1"]);
    }

    #[tokio::test]
    async fn test_close_all_ends_streams() {
        let broker = SubscriptionBroker::new(4);
        let mut a = broker.subscribe();
        let mut b = broker.subscribe();
        broker.publish(&record("last"));

        assert_eq!(broker.close_all(), 2);
        assert_eq!(a.recv().await.unwrap().message, "last");
        assert!(a.recv().await.is_none());
        assert_eq!(b.recv().await.unwrap().message, "last");
        assert!(b.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_outlives_broker() {
        let broker = SubscriptionBroker::new(4);
        let mut sub = broker.subscribe();
        drop(broker);

        // Registry (and its sender) is gone; stream simply ends.
        let next = recv_timeout(&mut sub, Duration::from_secs(1)).await;
        assert_eq!(next, Err(RecvTimeoutError::Closed));
    }
}
