//! Append-only in-memory message store

use tokio::sync::RwLock;

use crate::model::MessageRecord;

/// Records live for the lifetime of the process and are never edited
#[derive(Debug, Default)]
pub struct MessageStore {
    records: RwLock<Vec<MessageRecord>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; visible to every `all_messages` call that starts after this returns
    pub async fn append(&self, record: MessageRecord) {
        self.records.write().await.push(record);
    }

    /// Snapshot of every record in insertion order
    pub async fn all_messages(&self) -> Vec<MessageRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_record as record;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insertion_order_is_preserved() {
        let store = MessageStore::new();
        assert!(store.is_empty().await);

        for text in ["one", "two", "three"] {
            store.append(record(text)).await;
        }

        let texts: Vec<_> = store
            .all_messages()
            .await
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_snapshot_is_not_affected_by_later_appends() {
        let store = MessageStore::new();
        store.append(record("before")).await;

        let snapshot = store.all_messages().await;
        store.append(record("after")).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.all_messages().await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_every_record() {
        let store = Arc::new(MessageStore::new());

        let mut handles = Vec::new();
        for writer in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    store.append(record(&format!("{writer}-{i}"))).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let all = store.all_messages().await;
        assert_eq!(all.len(), 400);
        // Per-writer order survives interleaving.
        for writer in 0..8 {
            let prefix = format!("{writer}-");
            let seq: Vec<usize> = all
                .iter()
                .filter_map(|r| r.message.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(seq, (0..50).collect::<Vec<_>>());
        }
    }
}
