//! Decoding of eavesdropped `Notify` calls

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::debug;
use zbus::zvariant::{OwnedValue, Value};
use zbus::Message;

use crate::error::SnoopError;

/// Body signature of `org.freedesktop.Notifications.Notify`
pub const NOTIFY_SIGNATURE: &str = "susssasa{sv}i";

/// Positional `Notify` arguments, in wire order
pub(crate) type NotifyArgs = (
    String,
    u32,
    String,
    String,
    String,
    Vec<String>,
    HashMap<String, OwnedValue>,
    i32,
);

/// One decoded desktop notification.
///
/// Only built from a message whose signature is exactly [`NOTIFY_SIGNATURE`].
/// There are no setters: once decoded the record is read-only for everyone
/// who gets to see it.
#[derive(Debug, PartialEq)]
pub struct NotificationRecord {
    app_name: String,
    replaces_id: u32,
    app_icon: String,
    summary: String,
    body: String,
    actions: Vec<String>,
    hints: HashMap<String, OwnedValue>,
    timeout: i32,
}

/// How long the sender asked the notification to stay on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Server default (negative timeout)
    Default,
    /// Never expires (zero timeout)
    Never,
    After(Duration),
}

impl NotificationRecord {
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Id of the notification this one replaces, 0 if it is new
    pub fn replaces_id(&self) -> u32 {
        self.replaces_id
    }

    pub fn app_icon(&self) -> &str {
        &self.app_icon
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Body text, may contain markup
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Raw action list: alternating action id and label
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Actions as `(id, label)` pairs; a trailing unpaired id is ignored
    pub fn action_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.actions
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }

    pub fn hints(&self) -> &HashMap<String, OwnedValue> {
        &self.hints
    }

    pub fn hint(&self, key: &str) -> Option<&Value<'static>> {
        self.hints.get(key).map(|v| &**v)
    }

    /// The `urgency` hint (0 low, 1 normal, 2 critical) if the sender set one
    pub fn urgency(&self) -> Option<u8> {
        match self.hint("urgency") {
            Some(Value::U8(level)) => Some(*level),
            _ => None,
        }
    }

    /// Expiration timeout in milliseconds as sent
    pub fn timeout(&self) -> i32 {
        self.timeout
    }

    pub fn expiration(&self) -> Expiration {
        match self.timeout {
            t if t < 0 => Expiration::Default,
            0 => Expiration::Never,
            t => Expiration::After(Duration::from_millis(t as u64)),
        }
    }
}

impl From<NotifyArgs> for NotificationRecord {
    fn from(args: NotifyArgs) -> Self {
        let (app_name, replaces_id, app_icon, summary, body, actions, hints, timeout) = args;
        Self {
            app_name,
            replaces_id,
            app_icon,
            summary,
            body,
            actions,
            hints,
            timeout,
        }
    }
}

impl fmt::Display for NotificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.app_name, self.summary)?;
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

/// Decode one raw bus message.
///
/// Returns `Ok(None)` for anything that is not a `Notify` call with the
/// expected signature; the eavesdropped stream carries plenty of those. A
/// matching signature whose body still fails to unpack is a broken bus
/// contract and comes back as [`SnoopError::Decode`].
pub fn decode(msg: &Message) -> Result<Option<NotificationRecord>, SnoopError> {
    let header = msg.header();
    let signature = header.signature().map(|s| s.as_str()).unwrap_or("");

    if signature != NOTIFY_SIGNATURE {
        debug!(
            sender = ?header.sender(),
            interface = ?header.interface(),
            member = ?header.member(),
            signature,
            "Ignoring unknown message"
        );
        return Ok(None);
    }

    let args: NotifyArgs = msg.body().deserialize().map_err(SnoopError::Decode)?;
    Ok(Some(NotificationRecord::from(args)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::notify::filter::{NOTIFICATIONS_INTERFACE, NOTIFICATIONS_PATH, NOTIFY_MEMBER};

    /// Build a `Notify` call the way a notifying client would
    pub(crate) fn notify_message<B>(body: &B) -> Message
    where
        B: serde::Serialize + zbus::zvariant::DynamicType,
    {
        Message::method(NOTIFICATIONS_PATH, NOTIFY_MEMBER)
            .unwrap()
            .interface(NOTIFICATIONS_INTERFACE)
            .unwrap()
            .build(body)
            .unwrap()
    }

    pub(crate) fn mail_message() -> Message {
        let body = (
            "Mail",
            0u32,
            "icon",
            "New message",
            "hi",
            Vec::<&str>::new(),
            HashMap::<&str, Value>::new(),
            5000i32,
        );
        notify_message(&body)
    }

    /// A `Notify` call whose header claims the right signature but whose body
    /// holds a single string
    pub(crate) fn unpackable_message() -> Message {
        use zbus::zvariant::{serialized::Context, to_bytes, LE};

        let body = to_bytes(Context::new_dbus(LE, 0), &("x",)).unwrap();
        // SAFETY: no file descriptors are passed; the body/signature mismatch
        // is the point of this message
        unsafe {
            Message::method(NOTIFICATIONS_PATH, NOTIFY_MEMBER)
                .unwrap()
                .interface(NOTIFICATIONS_INTERFACE)
                .unwrap()
                .build_raw_body(&body, NOTIFY_SIGNATURE, vec![])
                .unwrap()
        }
    }

    pub(crate) fn record(app_name: &str, summary: &str) -> NotificationRecord {
        NotificationRecord::from((
            app_name.to_string(),
            0,
            String::new(),
            summary.to_string(),
            String::new(),
            Vec::new(),
            HashMap::new(),
            -1,
        ))
    }

    #[test]
    fn test_decode_matching_signature() {
        let record = decode(&mail_message()).unwrap().unwrap();
        assert_eq!(record.app_name(), "Mail");
        assert_eq!(record.replaces_id(), 0);
        assert_eq!(record.app_icon(), "icon");
        assert_eq!(record.summary(), "New message");
        assert_eq!(record.body(), "hi");
        assert!(record.actions().is_empty());
        assert!(record.hints().is_empty());
        assert_eq!(record.timeout(), 5000);
    }

    #[test]
    fn test_decode_keeps_fields_untouched() {
        let mut hints = HashMap::new();
        hints.insert("urgency", Value::U8(2));
        hints.insert("category", Value::from("im.received"));
        let body = (
            "Chat",
            7u32,
            "",
            "",
            "<b>hey</b>",
            vec!["default", "Open", "reply"],
            hints,
            -1i32,
        );

        let record = decode(&notify_message(&body)).unwrap().unwrap();
        assert_eq!(record.replaces_id(), 7);
        assert_eq!(record.summary(), "");
        assert_eq!(record.body(), "<b>hey</b>");
        assert_eq!(record.actions(), ["default", "Open", "reply"]);
        assert_eq!(record.action_pairs().collect::<Vec<_>>(), [("default", "Open")]);
        assert_eq!(record.urgency(), Some(2));
        assert_eq!(record.hint("category"), Some(&Value::from("im.received")));
        assert_eq!(record.timeout(), -1);
        assert_eq!(record.expiration(), Expiration::Default);
    }

    #[test]
    fn test_decode_rejects_missing_timeout() {
        let body = (
            "Mail",
            0u32,
            "icon",
            "New message",
            "hi",
            Vec::<&str>::new(),
            HashMap::<&str, Value>::new(),
        );
        assert!(decode(&notify_message(&body)).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_empty_body() {
        let msg = Message::method(NOTIFICATIONS_PATH, "GetCapabilities")
            .unwrap()
            .interface(NOTIFICATIONS_INTERFACE)
            .unwrap()
            .build(&())
            .unwrap();
        assert!(decode(&msg).unwrap().is_none());
    }

    #[test]
    fn test_decode_arity_mismatch_is_fatal() {
        let msg = unpackable_message();
        assert_eq!(
            msg.header().signature().map(|s| s.as_str()),
            Some(NOTIFY_SIGNATURE)
        );
        assert!(matches!(decode(&msg), Err(SnoopError::Decode(_))));
    }

    #[test]
    fn test_expiration() {
        let mut r = record("a", "b");
        assert_eq!(r.expiration(), Expiration::Default);
        r.timeout = 0;
        assert_eq!(r.expiration(), Expiration::Never);
        r.timeout = 1500;
        assert_eq!(r.expiration(), Expiration::After(Duration::from_millis(1500)));
    }

    #[test]
    fn test_display() {
        let record = decode(&mail_message()).unwrap().unwrap();
        assert_eq!(record.to_string(), "[Mail] New message: hi");
        assert_eq!(self::record("Mail", "Ping").to_string(), "[Mail] Ping");
    }
}
