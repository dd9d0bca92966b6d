//! Background listener feeding the notification queue

use std::num::NonZeroUsize;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::client::BusClient;
use super::filter::SubscriptionFilter;
use super::protocol;
use super::queue::{self, NotificationQueue, NotificationSender};
use crate::error::SnoopError;

/// Why the listener stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// Shutdown was requested through the cancellation token
    Cancelled,
    /// Every consumer handle was dropped
    QueueClosed,
}

/// A running listener and the queue it fills
pub struct Monitor {
    queue: NotificationQueue,
    handle: JoinHandle<Result<ListenerExit, SnoopError>>,
}

impl Monitor {
    /// Consumer handle for the queue. Clone it for as many consumers as needed.
    pub fn queue(&self) -> NotificationQueue {
        self.queue.clone()
    }

    /// Wait for the listener to stop and report how it ended.
    ///
    /// Fatal exits are logged at error level, cooperative ones at info level.
    /// A fatal error wraps the [`SnoopError`] that ended the listener.
    pub async fn join(self) -> anyhow::Result<ListenerExit> {
        drop(self.queue);
        let result = self.handle.await.unwrap_or_else(|e| Err(SnoopError::Listener(e)));

        match result {
            Ok(exit) => {
                tracing::info!("Notification listener stopped: {:?}", exit);
                Ok(exit)
            }
            Err(e) => {
                let e = anyhow::Error::from(e);
                tracing::error!("Notification listener terminated: {:#}", e);
                Err(e)
            }
        }
    }
}

/// Start snooping on notifications.
///
/// Installs the eavesdrop rule first; if the bus rejects it the error is
/// returned here and no listener is started. Otherwise the client moves into
/// a background task that runs until `shutdown` is cancelled, the bus fails,
/// or every queue handle is dropped.
///
/// Must be called from within a tokio runtime. The client is consumed, so a
/// second listener cannot compete for the same connection.
pub async fn start_monitor<C>(
    mut client: C,
    capacity: NonZeroUsize,
    shutdown: CancellationToken,
) -> Result<Monitor, SnoopError>
where
    C: BusClient + 'static,
{
    client
        .install_eavesdrop_rule(&SubscriptionFilter::notifications())
        .await?;

    let (tx, queue) = queue::channel(capacity);
    let handle = tokio::spawn(run_listener(client, tx, shutdown));
    tracing::info!("Notification listener started (queue capacity {})", capacity);

    Ok(Monitor { queue, handle })
}

/// Receive, decode, enqueue. Forever, or until something stops it.
async fn run_listener<C: BusClient>(
    mut client: C,
    tx: NotificationSender,
    shutdown: CancellationToken,
) -> Result<ListenerExit, SnoopError> {
    loop {
        let msg = tokio::select! {
            _ = shutdown.cancelled() => return Ok(ListenerExit::Cancelled),
            msg = client.receive_next_message() => msg?,
        };

        let Some(record) = protocol::decode(&msg)? else {
            continue;
        };
        tracing::debug!("Queued notification from {}", record.app_name());

        tokio::select! {
            _ = shutdown.cancelled() => return Ok(ListenerExit::Cancelled),
            sent = tx.put(record) => {
                if sent.is_err() {
                    return Ok(ListenerExit::QueueClosed);
                }
            }
        }
    }
}
