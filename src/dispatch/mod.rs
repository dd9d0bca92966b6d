//! Reacting to notifications
//!
//! The [`Dispatcher`] takes one record at a time off the queue. When the
//! record matches its predicate, every configured [`Handler`] runs
//! concurrently on a shared read-only view of it, and the dispatcher waits for
//! all of them before taking the next record. A failing or panicking handler
//! is logged and otherwise ignored.

pub mod command;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::notify::{NotificationQueue, NotificationRecord};

pub use command::{CommandHandler, HandlerConfig};

/// Something to do with a matching notification
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in log messages
    fn name(&self) -> &str;

    async fn handle(&self, notif: &NotificationRecord) -> anyhow::Result<()>;
}

type Predicate = dyn Fn(&NotificationRecord) -> bool + Send + Sync;

/// Result of dispatching one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The predicate did not match; no handler ran
    Skipped,
    /// Every handler ran to completion
    Handled { succeeded: usize, failed: usize },
}

/// Predicate matching records whose summary contains `marker`
pub fn summary_contains(
    marker: impl Into<String>,
) -> impl Fn(&NotificationRecord) -> bool + Send + Sync + 'static {
    let marker = marker.into();
    move |notif: &NotificationRecord| notif.summary().contains(marker.as_str())
}

pub struct Dispatcher {
    predicate: Box<Predicate>,
    handlers: Vec<Arc<dyn Handler>>,
}

impl Dispatcher {
    pub fn new(predicate: impl Fn(&NotificationRecord) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            handlers: Vec::new(),
        }
    }

    /// Append a handler. Handlers start in the order they were added.
    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|h| h.name())
    }

    /// Pull records until the queue closes or `shutdown` is cancelled.
    ///
    /// Cancellation is only observed while waiting for the next record; a
    /// handler set that already started is always waited for.
    pub async fn run(&self, queue: NotificationQueue, shutdown: CancellationToken) {
        tracing::info!(
            "Dispatcher started with {} handler(s)",
            self.handlers.len()
        );

        loop {
            let notif = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Dispatcher stopped by shutdown request");
                    return;
                }
                notif = queue.get() => notif,
            };

            match notif {
                Some(notif) => {
                    self.dispatch(notif).await;
                }
                None => {
                    tracing::warn!("Notification queue closed, dispatcher stopping");
                    return;
                }
            }
        }
    }

    /// Run every handler on `notif` if it matches, and wait for all of them.
    pub async fn dispatch(&self, notif: NotificationRecord) -> DispatchOutcome {
        if !(self.predicate)(&notif) {
            tracing::trace!("Skipping notification: {}", notif);
            return DispatchOutcome::Skipped;
        }
        tracing::info!("Dispatching notification: {}", notif);

        let notif = Arc::new(notif);
        let tasks: Vec<_> = self
            .handlers
            .iter()
            .map(|handler| {
                let name = handler.name().to_string();
                let handler = Arc::clone(handler);
                let notif = Arc::clone(&notif);
                let task = tokio::spawn(async move { handler.handle(&notif).await });
                (name, task)
            })
            .collect();

        let mut succeeded = 0;
        let mut failed = 0;
        for (name, task) in tasks {
            match task.await {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::warn!("Handler {} failed: {:#}", name, e);
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("Handler {} panicked: {}", name, e);
                }
            }
        }

        DispatchOutcome::Handled { succeeded, failed }
    }
}
