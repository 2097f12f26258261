//! Async test helpers

use thiserror::Error;
use tokio::time::{timeout, Duration};

use crate::broker::Subscription;
use crate::model::MessageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvTimeoutError {
    #[error("receive operation timed out")]
    Timeout,
    #[error("subscription closed")]
    Closed,
}

/// Receive the next record from a subscription with a timeout
pub async fn recv_timeout(
    sub: &mut Subscription,
    duration: Duration,
) -> Result<MessageRecord, RecvTimeoutError> {
    timeout(duration, sub.recv())
        .await
        .map_err(|_| RecvTimeoutError::Timeout)?
        .ok_or(RecvTimeoutError::Closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::SubscriptionBroker;

    #[tokio::test]
    async fn test_recv_timeout_times_out_then_closes() {
        let broker = SubscriptionBroker::new(4);
        let mut sub = broker.subscribe();

        assert_eq!(
            recv_timeout(&mut sub, Duration::from_millis(20)).await,
            Err(RecvTimeoutError::Timeout)
        );

        broker.close_all();
        assert_eq!(
            recv_timeout(&mut sub, Duration::from_millis(20)).await,
            Err(RecvTimeoutError::Closed)
        );
    }
}
