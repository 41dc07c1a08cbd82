//! Expiry sweeper: evicts members whose grants have lapsed.
//!
//! Runs on a fixed wall-clock interval with no persisted checkpoint; a
//! restart simply means interval-after-restart. Every per-row failure is
//! counted in the summary instead of silently swallowed, and a failing
//! eviction never blocks the row delete or the remaining rows.

use std::sync::Arc;
use teloxide::prelude::*;
use tokio::time::interval;

use porterocore::core::utils::now_string;
use porterocore::core::{config, AppResult};
use porterocore::storage::ledger::{self, Subscription};
use porterocore::storage::{get_connection, DbPool};

use crate::telegram::notifications;

/// Outcome of one sweep run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    /// Rows past expiry found by this run
    pub scanned: usize,
    pub evicted: usize,
    pub eviction_failures: usize,
    pub notice_failures: usize,
    pub deleted: usize,
}

impl SweepSummary {
    pub fn render(&self) -> String {
        format!(
            "{} expired, {} evicted ({} failed), {} notices failed, {} rows deleted",
            self.scanned, self.evicted, self.eviction_failures, self.notice_failures, self.deleted
        )
    }
}

/// Start the recurring sweep as a background task.
pub fn spawn_sweeper(bot: Bot, db_pool: Arc<DbPool>) {
    tokio::spawn(async move {
        let mut ticker = interval(config::sweeper::interval());

        log::info!("Expiry sweeper started (interval: {}s)", *config::sweeper::INTERVAL_SECS);

        loop {
            ticker.tick().await;

            match run_sweep(&bot, &db_pool).await {
                Ok(summary) if summary.scanned > 0 => {
                    log::info!("Sweep finished: {}", summary.render());
                }
                Ok(_) => {}
                Err(e) => log::error!("Sweep run failed: {}", e),
            }
        }
    });
}

/// Run one sweep: select, evict, notify, delete. Shared by the schedule and
/// the admin's manual `/sweep`.
pub async fn run_sweep(bot: &Bot, db_pool: &Arc<DbPool>) -> AppResult<SweepSummary> {
    let now = now_string();
    let expired = {
        let conn = get_connection(db_pool)?;
        ledger::expired_subscriptions(&conn, &now)?
    };

    let mut summary = SweepSummary {
        scanned: expired.len(),
        ..Default::default()
    };

    for sub in &expired {
        // Rows with no real chat (manual grants, bundle) skip eviction
        if sub.target_chat_id != 0 {
            match evict_member(bot, sub).await {
                Ok(()) => summary.evicted += 1,
                Err(e) => {
                    summary.eviction_failures += 1;
                    log::warn!(
                        "Failed to evict user {} from chat {}: {}",
                        sub.user_id,
                        sub.target_chat_id,
                        e
                    );
                }
            }
        }

        if notifications::send_expiry_notice(bot, sub).await.is_err() {
            summary.notice_failures += 1;
        }

        // The ledger row goes regardless of what the chat platform said
        let conn = get_connection(db_pool)?;
        if ledger::delete_subscription(&conn, sub.id)? {
            summary.deleted += 1;
        }

        notifications::notify_admin_member_expired(bot, sub).await;
    }

    Ok(summary)
}

/// Ban then immediately unban: the member is out, but no stale ban record
/// blocks a future re-join after a new purchase.
async fn evict_member(bot: &Bot, sub: &Subscription) -> AppResult<()> {
    let chat = ChatId(sub.target_chat_id);
    let Ok(user_id) = u64::try_from(sub.user_id) else {
        // Not a real user id; nothing to evict
        return Ok(());
    };
    let user = UserId(user_id);

    bot.ban_chat_member(chat, user).await?;
    bot.unban_chat_member(chat, user).await?;
    Ok(())
}
