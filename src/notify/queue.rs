//! Bounded notification queue between the listener and its consumers

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::protocol::NotificationRecord;

/// Default number of records buffered before the listener blocks
pub const DEFAULT_CAPACITY: usize = 100;

/// Create a bounded queue.
///
/// The sending half stays inside the crate: only the listener enqueues, so
/// consumers cannot inject records of their own.
pub(crate) fn channel(capacity: NonZeroUsize) -> (NotificationSender, NotificationQueue) {
    let (tx, rx) = mpsc::channel(capacity.get());
    (
        NotificationSender { tx },
        NotificationQueue {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer half, owned by the listener
#[derive(Debug)]
pub(crate) struct NotificationSender {
    tx: mpsc::Sender<NotificationRecord>,
}

impl NotificationSender {
    /// Enqueue a record, waiting for a free slot when the queue is full.
    ///
    /// Gives the record back if every consumer handle has been dropped.
    pub(crate) async fn put(&self, record: NotificationRecord) -> Result<(), NotificationRecord> {
        self.tx.send(record).await.map_err(|e| e.0)
    }
}

/// Consumer handle.
///
/// Clones share one underlying queue: every record is handed to exactly one
/// `get` caller, in the order it was enqueued.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    rx: Arc<Mutex<mpsc::Receiver<NotificationRecord>>>,
}

impl NotificationQueue {
    /// Wait for the next record.
    ///
    /// Returns `None` once the listener is gone and everything it queued has
    /// been taken.
    pub async fn get(&self) -> Option<NotificationRecord> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::protocol::tests::record;
    use std::time::Duration;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, queue) = channel(capacity(DEFAULT_CAPACITY));
        for i in 0..10 {
            tx.put(record("app", &format!("n{}", i))).await.unwrap();
        }
        for i in 0..10 {
            let r = queue.get().await.unwrap();
            assert_eq!(r.summary(), format!("n{}", i));
        }
        drop(tx);
        assert!(queue.get().await.is_none());
    }

    #[tokio::test]
    async fn test_put_blocks_when_full() {
        let (tx, queue) = channel(NonZeroUsize::MIN);
        tx.put(record("app", "first")).await.unwrap();

        let mut second = tokio::spawn(async move {
            tx.put(record("app", "second")).await.unwrap();
        });

        // Still waiting for a slot
        assert!(tokio::time::timeout(Duration::from_millis(50), &mut second)
            .await
            .is_err());

        let first = queue.get().await.unwrap();
        assert_eq!(first.summary(), "first");

        tokio::time::timeout(Duration::from_secs(5), second)
            .await
            .expect("put did not complete after a slot freed")
            .unwrap();
        assert_eq!(queue.get().await.unwrap().summary(), "second");
    }

    #[tokio::test]
    async fn test_each_record_delivered_once() {
        let (tx, queue) = channel(capacity(8));
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(r) = queue.get().await {
                        seen.push(r.summary().to_string());
                    }
                    seen
                })
            })
            .collect();
        drop(queue);

        for i in 0..50 {
            tx.put(record("app", &i.to_string())).await.unwrap();
        }
        drop(tx);

        let mut all = Vec::new();
        for c in consumers {
            all.extend(c.await.unwrap());
        }
        all.sort_by_key(|s| s.parse::<u32>().unwrap());
        let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        assert_eq!(all, expected);
    }

    #[tokio::test]
    async fn test_closed_queue_drains_then_ends() {
        let (tx, queue) = channel(capacity(4));
        tx.put(record("app", "last")).await.unwrap();
        drop(tx);
        assert_eq!(queue.get().await.unwrap().summary(), "last");
        assert!(queue.get().await.is_none());
    }

    #[tokio::test]
    async fn test_put_fails_without_consumers() {
        let (tx, queue) = channel(capacity(4));
        drop(queue);
        let rejected = tx.put(record("app", "lost")).await.unwrap_err();
        assert_eq!(rejected.summary(), "lost");
    }
}
