//! Error types for the notification snooping core

use thiserror::Error;

/// Failures raised by the bus boundary, the decoder and the listener.
///
/// Everything here is fatal to whoever receives it. Filtered messages are not
/// errors and never show up as a variant.
#[derive(Debug, Error)]
pub enum SnoopError {
    /// Could not open the bus connection.
    #[error("failed to connect to the {bus} bus")]
    Connect {
        bus: &'static str,
        #[source]
        source: zbus::Error,
    },

    /// The bus refused the eavesdrop match rule (usually a policy/privilege issue).
    #[error("bus rejected eavesdrop rule: {rule}")]
    SubscriptionRejected {
        rule: String,
        #[source]
        source: zbus::Error,
    },

    /// Receiving from the bus failed.
    #[error("bus transport failed")]
    Transport(#[source] zbus::Error),

    /// The bus closed the message stream.
    #[error("bus connection closed")]
    Disconnected,

    /// The signature matched but the body could not be unpacked.
    #[error("notification body does not match its declared signature")]
    Decode(#[source] zbus::Error),

    /// The listener task panicked or was aborted.
    #[error("notification listener task failed")]
    Listener(#[source] tokio::task::JoinError),
}
