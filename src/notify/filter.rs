//! Eavesdrop subscription for `org.freedesktop.Notifications.Notify` calls

use std::fmt;

/// Well-known notification interface name
pub const NOTIFICATIONS_INTERFACE: &str = "org.freedesktop.Notifications";
/// Well-known notification object path
pub const NOTIFICATIONS_PATH: &str = "/org/freedesktop/Notifications";
/// Method notifying clients call
pub const NOTIFY_MEMBER: &str = "Notify";

/// A bus match rule installed once at startup.
///
/// Built with [`SubscriptionFilter::notifications`] and never changed
/// afterwards. The bus client renders it with [`fmt::Display`] when calling
/// `AddMatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    msg_type: &'static str,
    interface: &'static str,
    path: &'static str,
    member: &'static str,
    eavesdrop: bool,
}

impl SubscriptionFilter {
    /// Method calls to `Notify` on the notification service, eavesdropped
    pub const fn notifications() -> Self {
        Self {
            msg_type: "method_call",
            interface: NOTIFICATIONS_INTERFACE,
            path: NOTIFICATIONS_PATH,
            member: NOTIFY_MEMBER,
            eavesdrop: true,
        }
    }
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self::notifications()
    }
}

impl fmt::Display for SubscriptionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type='{}',interface='{}',path='{}',member='{}'",
            self.msg_type, self.interface, self.path, self.member
        )?;
        if self.eavesdrop {
            f.write_str(",eavesdrop='true'")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_string() {
        let rule = SubscriptionFilter::notifications().to_string();
        assert_eq!(
            rule,
            "type='method_call',interface='org.freedesktop.Notifications',\
             path='/org/freedesktop/Notifications',member='Notify',eavesdrop='true'"
        );
    }

    #[test]
    fn test_default_is_notifications() {
        let filter = SubscriptionFilter::default();
        assert_eq!(filter, SubscriptionFilter::notifications());
        assert!(filter.to_string().ends_with(",member='Notify',eavesdrop='true'"));
    }
}
