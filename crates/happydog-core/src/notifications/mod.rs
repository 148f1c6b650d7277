// ── Notification Fan-out (C5) ───────────────────────────────────────────
// Synchronous helper invoked from inside service methods, always AFTER a
// DocStore commit — never from inside a transaction (spec.md §4.5).
// Fan-out never fails the enclosing operation; a logged warning suffices.

use crate::clock;
use crate::docstore::DocStore;
use crate::error::CoreResult;
use crate::model::{Notification, NotificationType, User, UserSnapshot, SYSTEM_SENDER_ID, SYSTEM_SENDER_NICKNAME};
use std::sync::Arc;

pub struct NotificationService {
    store: Arc<DocStore>,
}

impl NotificationService {
    pub fn new(store: Arc<DocStore>) -> Self {
        NotificationService { store }
    }

    /// Enqueue one notification, unless `recipient_id == sender_id` (silent
    /// drop — spec.md's "Notification self-delivery count is 0" invariant).
    /// Never returns an error to the caller: failures are logged and
    /// swallowed so a notification hiccup never rolls back or fails the
    /// primary action that triggered it.
    pub fn notify(
        &self,
        recipient_id: &str,
        sender_id: &str,
        notification_type: NotificationType,
        target_id: &str,
        target_summary: Option<String>,
    ) {
        if recipient_id == sender_id {
            return;
        }
        if let Err(e) = self.try_notify(recipient_id, sender_id, notification_type, target_id, target_summary) {
            log::warn!("[notifications] fan-out to {recipient_id} failed: {e}");
        }
    }

    /// Variant used for the CartoonJob terminal transitions, whose sender
    /// is always the constant system identity "HappyDog" rather than a
    /// User document.
    pub fn notify_from_system(
        &self,
        recipient_id: &str,
        notification_type: NotificationType,
        target_id: &str,
        target_summary: Option<String>,
    ) {
        let sender = UserSnapshot {
            user_id: SYSTEM_SENDER_ID.to_string(),
            nickname: SYSTEM_SENDER_NICKNAME.to_string(),
            profile_image_url: None,
        };
        if let Err(e) = self.write_notification(recipient_id, sender, notification_type, target_id, target_summary) {
            log::warn!("[notifications] system fan-out to {recipient_id} failed: {e}");
        }
    }

    fn try_notify(
        &self,
        recipient_id: &str,
        sender_id: &str,
        notification_type: NotificationType,
        target_id: &str,
        target_summary: Option<String>,
    ) -> CoreResult<()> {
        let sender_user: Option<User> = self.store.get("users", sender_id)?;
        let sender = match sender_user {
            Some(u) => UserSnapshot::from(&u),
            None => {
                log::warn!("[notifications] sender {sender_id} not found, skipping fan-out");
                return Ok(());
            }
        };
        self.write_notification(recipient_id, sender, notification_type, target_id, target_summary)
    }

    fn write_notification(
        &self,
        recipient_id: &str,
        sender: UserSnapshot,
        notification_type: NotificationType,
        target_id: &str,
        target_summary: Option<String>,
    ) -> CoreResult<()> {
        let created_at = clock::now();
        let notification = Notification {
            notification_id: clock::new_uuid(),
            recipient_id: recipient_id.to_string(),
            sender,
            notification_type,
            target_id: target_id.to_string(),
            target_summary,
            is_read: false,
            created_at,
        };
        self.store.set(
            "notifications",
            &notification.notification_id,
            &created_at.to_rfc3339(),
            &notification,
        )
    }
}
