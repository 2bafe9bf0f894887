//! Transient notification slot with automatic expiry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;
use viva_mais_core::{Notification, NotificationKind};

struct NotifierInner {
    slot: watch::Sender<Option<Notification>>,
    generation: AtomicU64,
    ttl: Duration,
}

/// Holds at most one active [`Notification`] and clears it after a fixed
/// lifetime.
///
/// Each post starts its own expiry timer. A timer only clears the slot if no
/// newer notification has been posted since, so a replaced notification
/// never cuts the lifetime of its successor short.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            inner: Arc::new(NotifierInner {
                slot,
                generation: AtomicU64::new(0),
                ttl,
            }),
        }
    }

    /// Show `notification`, replacing the current one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn post(&self, notification: Notification) {
        debug!(kind = ?notification.kind, message = %notification.message, "Notification posted");

        let mut generation = 0;
        // The generation is bumped under the channel's lock so that posting
        // and expiring are serialized.
        self.inner.slot.send_modify(|slot| {
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *slot = Some(notification);
        });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.ttl).await;
            inner.slot.send_if_modified(|slot| {
                if inner.generation.load(Ordering::SeqCst) == generation && slot.is_some() {
                    *slot = None;
                    true
                } else {
                    false
                }
            });
        });
    }

    /// Shorthand for posting a message of the given kind.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        self.post(match kind {
            NotificationKind::Success => Notification::success(message),
            NotificationKind::Error => Notification::error(message),
        });
    }

    /// The active notification, if any.
    #[must_use]
    pub fn current(&self) -> Option<Notification> {
        self.inner.slot.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.inner.slot.subscribe()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("current", &self.current())
            .field("ttl", &self.inner.ttl)
            .finish()
    }
}
