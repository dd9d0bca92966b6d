//! Bus client boundary
//!
//! The listener only needs two things from the bus: install the eavesdrop
//! rule once, then hand over raw messages one at a time. [`BusClient`] is that
//! seam; [`ZbusClient`] is the real D-Bus implementation on top of `zbus`.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use zbus::{Connection, Message, MessageStream};

use super::filter::SubscriptionFilter;
use crate::error::SnoopError;

const DBUS_NAME: &str = "org.freedesktop.DBus";
const DBUS_PATH: &str = "/org/freedesktop/DBus";
const ADD_MATCH: &str = "AddMatch";

/// Which message bus to snoop on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// Per-user session bus (where notifications normally travel)
    #[default]
    Session,
    System,
}

impl BusKind {
    pub fn name(self) -> &'static str {
        match self {
            BusKind::Session => "session",
            BusKind::System => "system",
        }
    }
}

/// Source of raw bus messages.
///
/// Implementations are owned by exactly one listener; nothing else may call
/// [`BusClient::receive_next_message`] on the same connection.
#[async_trait]
pub trait BusClient: Send {
    /// Install the match rule. A rejection means nothing will ever arrive.
    async fn install_eavesdrop_rule(&mut self, filter: &SubscriptionFilter)
        -> Result<(), SnoopError>;

    /// Wait for the next message on the connection
    async fn receive_next_message(&mut self) -> Result<Message, SnoopError>;
}

/// D-Bus connection backed by `zbus`
pub struct ZbusClient {
    connection: Connection,
    stream: MessageStream,
}

impl ZbusClient {
    /// Open a connection to the given bus.
    ///
    /// The message stream is attached before any rule is installed so no
    /// matching call can slip through in between.
    pub async fn connect(kind: BusKind) -> Result<Self, SnoopError> {
        let connection = match kind {
            BusKind::Session => Connection::session().await,
            BusKind::System => Connection::system().await,
        }
        .map_err(|source| SnoopError::Connect {
            bus: kind.name(),
            source,
        })?;

        let stream = MessageStream::from(&connection);
        tracing::info!(
            "Connected to {} bus as {:?}",
            kind.name(),
            connection.unique_name().map(|n| n.as_str())
        );

        Ok(Self { connection, stream })
    }
}

#[async_trait]
impl BusClient for ZbusClient {
    async fn install_eavesdrop_rule(
        &mut self,
        filter: &SubscriptionFilter,
    ) -> Result<(), SnoopError> {
        let rule = filter.to_string();
        let reply = self
            .connection
            .call_method(
                Some(DBUS_NAME),
                DBUS_PATH,
                Some(DBUS_NAME),
                ADD_MATCH,
                &(rule.as_str(),),
            )
            .await;

        match reply {
            Ok(_) => {
                tracing::info!("Installed eavesdrop rule: {}", rule);
                Ok(())
            }
            Err(source) => Err(SnoopError::SubscriptionRejected { rule, source }),
        }
    }

    async fn receive_next_message(&mut self) -> Result<Message, SnoopError> {
        match self.stream.next().await {
            Some(Ok(msg)) => Ok(msg),
            Some(Err(e)) => Err(SnoopError::Transport(e)),
            None => Err(SnoopError::Disconnected),
        }
    }
}
