//! Cancellable delayed deletion of ephemeral messages.
//!
//! Search results and similar throwaway replies are scheduled here:
//! sleep, then delete. A missing target is swallowed as a no-op. Nothing is
//! persisted; pending timers die with the process.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tokio::task::JoinHandle;

#[derive(Default)]
pub struct AutoDeleteQueue {
    tasks: DashMap<(i64, i32), JoinHandle<()>>,
}

impl AutoDeleteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a message for deletion after `delay`. Re-scheduling the same
    /// message resets the timer.
    pub fn schedule(self: &Arc<Self>, bot: Bot, chat_id: ChatId, message_id: MessageId, delay: Duration) {
        let key = (chat_id.0, message_id.0);
        let queue = Arc::clone(self);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = bot.delete_message(chat_id, message_id).await {
                // Already deleted, or the chat is gone. Either way: done.
                log::debug!("Auto-delete skipped for {}/{}: {}", chat_id.0, message_id.0, e);
            }
            queue.tasks.remove(&key);
        });

        if let Some(previous) = self.tasks.insert(key, handle) {
            previous.abort();
        }
    }

    /// Cancel a pending deletion. Returns whether a timer existed.
    pub fn cancel(&self, chat_id: ChatId, message_id: MessageId) -> bool {
        if let Some((_, handle)) = self.tasks.remove(&(chat_id.0, message_id.0)) {
            handle.abort();
            true
        } else {
            false
        }
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_aborts_a_pending_timer() {
        let queue = Arc::new(AutoDeleteQueue::new());
        let bot = Bot::new("0:fake-token");

        queue.schedule(bot, ChatId(1), MessageId(10), Duration::from_secs(600));
        assert_eq!(queue.pending(), 1);

        assert!(queue.cancel(ChatId(1), MessageId(10)));
        assert_eq!(queue.pending(), 0);
        // Second cancel is a no-op
        assert!(!queue.cancel(ChatId(1), MessageId(10)));
    }

    #[tokio::test]
    async fn rescheduling_replaces_the_timer() {
        let queue = Arc::new(AutoDeleteQueue::new());
        let bot = Bot::new("0:fake-token");

        queue.schedule(bot.clone(), ChatId(1), MessageId(10), Duration::from_secs(600));
        queue.schedule(bot, ChatId(1), MessageId(10), Duration::from_secs(600));
        assert_eq!(queue.pending(), 1);
    }
}
