//! Notification seam toward the embedding UI.
//!
//! The crate never renders toasts itself; it hands user-visible events to a
//! [`Notifier`] and the embedding application decides how to show them.

use tracing::{error, info};

/// How prominently a notification should be shown.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    /// Informational, e.g. a confirmation.
    Info,
    /// Something failed and the user should know.
    Error,
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    /// Report an event with a short title and a longer body.
    fn notify(&self, severity: Severity, title: &str, body: &str);
}

/// Default notifier that writes through `tracing`.
///
/// Useful headless and in tests; UIs supply their own implementation.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, title: &str, body: &str) {
        match severity {
            Severity::Info => info!("{title}: {body}"),
            Severity::Error => error!("{title}: {body}"),
        }
    }
}
