//! Desktop notification snooping
//!
//! Eavesdrops on `org.freedesktop.Notifications.Notify` calls on the message
//! bus, decodes them into [`NotificationRecord`]s and hands them out through a
//! bounded [`NotificationQueue`].
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use std::num::NonZeroUsize;
//!
//! use notif_snoop::notify::{self, BusKind, ZbusClient};
//! use tokio_util::sync::CancellationToken;
//!
//! let capacity = NonZeroUsize::new(100).unwrap();
//! let client = ZbusClient::connect(BusKind::Session).await?;
//! let monitor = notify::start_monitor(client, capacity, CancellationToken::new()).await?;
//! let queue = monitor.queue();
//! while let Some(notif) = queue.get().await {
//!     println!("{}", notif);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod filter;
pub mod protocol;
pub mod queue;
pub mod server;

pub use client::{BusClient, BusKind, ZbusClient};
pub use filter::SubscriptionFilter;
pub use protocol::{decode, Expiration, NotificationRecord, NOTIFY_SIGNATURE};
pub use queue::{NotificationQueue, DEFAULT_CAPACITY};
pub use server::{start_monitor, ListenerExit, Monitor};
