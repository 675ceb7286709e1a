//! Chat-log notification sink.

use intoterica_core::config::NotificationConfig;
use intoterica_core::notify::{Notification, NotificationSink};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Posts notifications to the world chat, filtered by the notification
/// settings.
#[derive(Debug)]
pub struct ChatLog {
    config: NotificationConfig,
    messages: Mutex<Vec<String>>,
}

impl ChatLog {
    /// A chat log honouring `config`.
    #[must_use]
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            config,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Whether `notification` should be posted.
    #[must_use]
    pub fn allows(&self, notification: &Notification) -> bool {
        if !self.config.notify_factions {
            return false;
        }
        match notification {
            Notification::FactionReputation { .. } | Notification::MemberReputation { .. } => {
                self.config.reputation_changes
            }
            Notification::TierChanged { .. } => self.config.tier_changes,
            Notification::XpAwarded { .. } => self.config.xp_awards,
        }
    }

    /// Everything posted so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl NotificationSink for ChatLog {
    fn notify(&self, notification: Notification) {
        if !self.allows(&notification) {
            debug!(?notification, "Chat message suppressed by settings");
            return;
        }
        let text = notification.to_string();
        info!(target: "intoterica::chat", message = %text, "Chat message posted");
        self.messages.lock().push(text);
    }
}
