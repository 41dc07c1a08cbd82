//! Admin console: catalog management, grants, sweeps, backfill, broadcast.
//!
//! Console commands are hidden (not in the Command enum) and admin-gated.
//! Multi-step flows run through the form state machine; every free-text
//! argument goes through a typed parser.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use url::Url;

use porterocore::core::config;
use porterocore::core::config::admin::{ADMIN_IDS, ADMIN_USER_ID};
use porterocore::core::utils::{expiry_after, format_ts};
use porterocore::core::validation::{parse_chat_id, parse_grant_spec};
use porterocore::forms::{self, FormEffect, FormState};
use porterocore::storage::db::{all_user_ids, count_users, DbPool};
use porterocore::storage::ledger::NewSubscription;
use porterocore::storage::{catalog, files, get_connection, ledger, settings};

use crate::indexer;
use crate::sweeper;
use crate::telegram::handlers::types::HandlerDeps;
use crate::telegram::notifications;

/// Maximum message length for Telegram (with margin)
const MAX_MESSAGE_LENGTH: usize = 4000;

/// Console commands, matched on the first token.
const ADMIN_COMMANDS: &[&str] = &[
    "/addcategory",
    "/delcategory",
    "/addplan",
    "/delplan",
    "/catalog",
    "/grant",
    "/revoke",
    "/subs",
    "/sweep",
    "/backfill",
    "/setbundle",
    "/setpayment",
    "/setnotify",
    "/setlink",
    "/broadcast",
    "/stats",
    "/cancel",
];

pub fn is_admin_command(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .map(|cmd| ADMIN_COMMANDS.contains(&cmd))
        .unwrap_or(false)
}

/// Check if user is admin
pub fn is_admin(user_id: i64) -> bool {
    if !ADMIN_IDS.is_empty() {
        return ADMIN_IDS.contains(&user_id);
    }
    if *ADMIN_USER_ID != 0 {
        return *ADMIN_USER_ID == user_id;
    }
    false
}

fn truncate_message(text: &str) -> String {
    if text.len() <= MAX_MESSAGE_LENGTH {
        return text.to_string();
    }
    let mut trimmed = text.chars().take(MAX_MESSAGE_LENGTH - 20).collect::<String>();
    trimmed.push_str("\n... (truncated)");
    trimmed
}

pub async fn handle_admin_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let admin_id = from.id.0 as i64;

    if !is_admin(admin_id) {
        bot.send_message(msg.chat.id, "You are not allowed to do that.").await?;
        return Ok(());
    }

    let text = msg.text().unwrap_or_default();
    let mut parts = text.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let args = parts.next().unwrap_or_default().trim();

    match command {
        "/addcategory" => {
            let prompt = deps.forms.start(admin_id, FormState::CategoryName);
            bot.send_message(msg.chat.id, prompt).await?;
        }
        "/addplan" => handle_addplan(bot, msg, deps, admin_id).await?,
        "/delcategory" => handle_delcategory(bot, msg, deps, args).await?,
        "/delplan" => handle_delplan(bot, msg, deps, args).await?,
        "/catalog" => handle_catalog(bot, msg, deps).await?,
        "/grant" => handle_grant(bot, msg, deps, args).await?,
        "/revoke" => handle_revoke(bot, msg, deps, args).await?,
        "/subs" => handle_subs(bot, msg, deps).await?,
        "/sweep" => {
            let summary = sweeper::run_sweep(bot, &deps.db_pool).await?;
            bot.send_message(msg.chat.id, format!("Sweep finished: {}", summary.render()))
                .await?;
        }
        "/backfill" => handle_backfill(bot, msg, deps, args).await?,
        "/setbundle" => {
            let prompt = deps.forms.start(admin_id, FormState::BundleLinks);
            bot.send_message(msg.chat.id, prompt).await?;
        }
        "/setpayment" => {
            let prompt = deps.forms.start(admin_id, FormState::PaymentRail);
            bot.send_message(msg.chat.id, prompt).await?;
        }
        "/setnotify" => handle_setnotify(bot, msg, deps, args).await?,
        "/setlink" => handle_setlink(bot, msg, deps, args).await?,
        "/broadcast" => handle_broadcast(bot, msg, deps, args).await?,
        "/stats" => handle_stats(bot, msg, deps).await?,
        "/cancel" => {
            let had_form = deps.forms.clear(admin_id);
            bot.send_message(msg.chat.id, if had_form { "Cancelled." } else { "Nothing to cancel." })
                .await?;
        }
        _ => {}
    }

    Ok(())
}

async fn handle_addplan(bot: &Bot, msg: &Message, deps: &HandlerDeps, admin_id: i64) -> Result<()> {
    let categories = {
        let conn = get_connection(&deps.db_pool)?;
        catalog::list_categories(&conn)?
    };

    if categories.is_empty() {
        bot.send_message(msg.chat.id, "No categories yet. Create one with /addcategory first.")
            .await?;
        return Ok(());
    }

    let mut text = String::from("Categories:\n");
    for cat in &categories {
        text.push_str(&format!("  {} — {}\n", cat.id, cat.name));
    }
    text.push('\n');
    text.push_str(&deps.forms.start(admin_id, FormState::PlanCategory));

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_delcategory(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> Result<()> {
    let category_id = match parse_chat_id(args) {
        Ok(id) => id,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("{}. Usage: /delcategory <id>", e)).await?;
            return Ok(());
        }
    };

    let mut conn = get_connection(&deps.db_pool)?;
    if catalog::get_category(&conn, category_id)?.is_none() {
        bot.send_message(msg.chat.id, format!("No category with id {}.", category_id))
            .await?;
        return Ok(());
    }

    let removed_plans = catalog::delete_category(&mut conn, category_id)?;
    bot.send_message(
        msg.chat.id,
        format!("Category {} deleted along with {} plan(s).", category_id, removed_plans),
    )
    .await?;
    Ok(())
}

async fn handle_delplan(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> Result<()> {
    let plan_id = match parse_chat_id(args) {
        Ok(id) => id,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("{}. Usage: /delplan <id>", e)).await?;
            return Ok(());
        }
    };

    let conn = get_connection(&deps.db_pool)?;
    let deleted = catalog::delete_plan(&conn, plan_id)?;
    bot.send_message(
        msg.chat.id,
        if deleted {
            format!("Plan {} deleted.", plan_id)
        } else {
            format!("No plan with id {}.", plan_id)
        },
    )
    .await?;
    Ok(())
}

async fn handle_catalog(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let conn = get_connection(&deps.db_pool)?;
    let categories = catalog::list_categories(&conn)?;

    if categories.is_empty() {
        bot.send_message(msg.chat.id, "The catalog is empty.").await?;
        return Ok(());
    }

    let mut text = String::new();
    for cat in &categories {
        text.push_str(&format!("📁 {} (id {})\n", cat.name, cat.id));
        for plan in catalog::list_plans(&conn, cat.id)? {
            text.push_str(&format!(
                "    {} — {} / {} days → chat {} (id {})\n",
                plan.name, plan.price, plan.duration_days, plan.target_chat_id, plan.id
            ));
        }
    }

    bot.send_message(msg.chat.id, truncate_message(&text)).await?;
    Ok(())
}

/// `/grant UserID Days PlanName` — manual grant, bypassing payment.
///
/// If the plan name matches a catalog plan, its chat and invite link are
/// used; otherwise the grant is ad-hoc (no chat, nothing to evict from).
async fn handle_grant(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> Result<()> {
    let grant = match parse_grant_spec(args) {
        Ok(grant) => grant,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("{}. Usage: /grant <UserID> <Days> <PlanName>", e))
                .await?;
            return Ok(());
        }
    };

    let plan = {
        let conn = get_connection(&deps.db_pool)?;
        catalog::find_plan_by_name(&conn, &grant.plan_name)?
    };

    let now = chrono::Utc::now();
    let row = NewSubscription {
        user_id: grant.user_id,
        plan_id: plan.as_ref().map(|p| p.id),
        plan_name: plan.as_ref().map(|p| p.name.clone()).unwrap_or(grant.plan_name.clone()),
        target_chat_id: plan.as_ref().map(|p| p.target_chat_id).unwrap_or(0),
        joined_at: format_ts(now),
        expires_at: format_ts(expiry_after(now, grant.days)),
    };

    {
        let mut conn = get_connection(&deps.db_pool)?;
        ledger::upsert_subscription(&mut conn, &row)?;
    }

    if let Some(plan) = &plan {
        if let Err(e) = notifications::send_invite_links(bot, ChatId(grant.user_id), &plan.name, &[plan.invite_link.clone()], None).await
        {
            log::warn!("Failed to send invite for manual grant: {}", e);
        }
    }

    bot.send_message(
        msg.chat.id,
        format!(
            "Granted '{}' to user {} until {}.",
            row.plan_name, grant.user_id, row.expires_at
        ),
    )
    .await?;
    Ok(())
}

async fn handle_revoke(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> Result<()> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let user_raw = parts.next().unwrap_or_default();
    let plan_name = parts.next().unwrap_or_default().trim();

    let user_id = match user_raw.parse::<i64>() {
        Ok(id) if !plan_name.is_empty() => id,
        _ => {
            bot.send_message(msg.chat.id, "Usage: /revoke <UserID> <PlanName>").await?;
            return Ok(());
        }
    };

    let conn = get_connection(&deps.db_pool)?;
    let removed = ledger::delete_subscription_for(&conn, user_id, plan_name)?;
    bot.send_message(
        msg.chat.id,
        if removed {
            format!("Revoked '{}' from user {}.", plan_name, user_id)
        } else {
            format!("User {} has no '{}' grant.", user_id, plan_name)
        },
    )
    .await?;
    Ok(())
}

async fn handle_subs(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let subs = {
        let conn = get_connection(&deps.db_pool)?;
        ledger::all_subscriptions(&conn)?
    };

    if subs.is_empty() {
        bot.send_message(msg.chat.id, "No active memberships.").await?;
        return Ok(());
    }

    let mut text = format!("Active memberships ({}):\n", subs.len());
    for sub in &subs {
        text.push_str(&format!(
            "• user {} — {} until {} (chat {})\n",
            sub.user_id, sub.plan_name, sub.expires_at, sub.target_chat_id
        ));
    }

    bot.send_message(msg.chat.id, truncate_message(&text)).await?;
    Ok(())
}

/// `/backfill <upto> [from]` — walk the storage channel history as a
/// background task, editing a status message as it goes.
async fn handle_backfill(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> Result<()> {
    let storage_chat = *config::STORAGE_CHANNEL_ID;
    if storage_chat == 0 {
        bot.send_message(msg.chat.id, "STORAGE_CHANNEL_ID is not configured.").await?;
        return Ok(());
    }

    let mut parts = args.split_whitespace();
    let upto: Option<i64> = parts.next().and_then(|v| v.parse().ok());
    let from: i64 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(1);

    let Some(upto) = upto.filter(|v| *v >= 1) else {
        bot.send_message(msg.chat.id, "Usage: /backfill <highest message id> [lowest message id]")
            .await?;
        return Ok(());
    };

    let status = bot
        .send_message(msg.chat.id, format!("Backfill started: ids {}..={}", from, upto))
        .await?;

    let bot = bot.clone();
    let db_pool = Arc::clone(&deps.db_pool);
    let client = Arc::clone(&deps.mtproto);
    let status_chat = status.chat.id;
    let status_id = status.id;

    tokio::spawn(async move {
        let result = indexer::run_backfill(
            &client,
            &db_pool,
            storage_chat,
            from,
            upto,
            Some((&bot, status_chat, status_id)),
        )
        .await;

        let final_text = match result {
            Ok(report) => format!("Backfill finished: {}", report.render()),
            Err(e) => format!("Backfill failed: {}", e),
        };
        let _ = bot.edit_message_text(status_chat, status_id, final_text).await;
    });

    Ok(())
}

async fn handle_setnotify(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> Result<()> {
    let conn = get_connection(&deps.db_pool)?;

    if args.eq_ignore_ascii_case("off") {
        settings::set_notify_target(&conn, None)?;
        bot.send_message(msg.chat.id, "Promotional notices disabled.").await?;
        return Ok(());
    }

    match parse_chat_id(args) {
        Ok(chat_id) => {
            settings::set_notify_target(&conn, Some(chat_id))?;
            bot.send_message(msg.chat.id, format!("Promotional notices go to {}.", chat_id))
                .await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("{}. Usage: /setnotify <chat id|off>", e))
                .await?;
        }
    }
    Ok(())
}

async fn handle_setlink(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> Result<()> {
    if Url::parse(args).is_err() {
        bot.send_message(msg.chat.id, "That doesn't look like a URL. Usage: /setlink <url>")
            .await?;
        return Ok(());
    }

    let conn = get_connection(&deps.db_pool)?;
    settings::set_update_link(&conn, args)?;
    bot.send_message(msg.chat.id, "Updates link saved.").await?;
    Ok(())
}

/// `/broadcast <text>` — fan out to every known user as a background task.
/// Per-recipient failures are counted, never fatal.
async fn handle_broadcast(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> Result<()> {
    if args.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /broadcast <text>").await?;
        return Ok(());
    }

    let bot = bot.clone();
    let db_pool = Arc::clone(&deps.db_pool);
    let text = args.to_string();
    let report_chat = msg.chat.id;

    tokio::spawn(async move {
        run_broadcast(bot, db_pool, text, report_chat).await;
    });

    Ok(())
}

async fn run_broadcast(bot: Bot, db_pool: Arc<DbPool>, text: String, report_chat: ChatId) {
    let ids = match get_connection(&db_pool).map_err(anyhow::Error::from).and_then(|conn| {
        all_user_ids(&conn).map_err(anyhow::Error::from)
    }) {
        Ok(ids) => ids,
        Err(e) => {
            log::error!("Broadcast aborted, cannot list users: {}", e);
            return;
        }
    };

    let mut sent = 0usize;
    let mut failed = 0usize;
    for id in ids {
        match bot.send_message(ChatId(id), &text).await {
            Ok(_) => sent += 1,
            Err(e) => {
                failed += 1;
                log::debug!("Broadcast to {} failed: {}", id, e);
            }
        }
    }

    log::info!("Broadcast done: {} sent, {} failed", sent, failed);
    let _ = bot
        .send_message(report_chat, format!("Broadcast done: {} sent, {} failed.", sent, failed))
        .await;
}

async fn handle_stats(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let conn = get_connection(&deps.db_pool)?;
    let categories = catalog::list_categories(&conn)?.len();
    let plans = catalog::list_all_plans(&conn)?.len();
    let subs = ledger::count_subscriptions(&conn)?;
    let files = files::count_files(&conn)?;
    let users = count_users(&conn)?;

    bot.send_message(
        msg.chat.id,
        format!(
            "📊 Stats\nCategories: {}\nPlans: {}\nActive memberships: {}\nIndexed files: {}\nKnown users: {}",
            categories, plans, subs, files, users
        ),
    )
    .await?;
    Ok(())
}

/// Drive an active multi-step form with one message of input.
pub async fn handle_form_input(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let admin_id = from.id.0 as i64;

    if !is_admin(admin_id) {
        deps.forms.clear(admin_id);
        return Ok(());
    }

    let Some(state) = deps.forms.take(admin_id) else {
        return Ok(());
    };
    let input = msg.text().unwrap_or_default();

    let (next, effect) = forms::advance(state, input);

    match effect {
        FormEffect::Prompt(prompt) => {
            if let Some(next) = next {
                deps.forms.put(admin_id, next);
            }
            bot.send_message(msg.chat.id, prompt).await?;
        }
        FormEffect::SelectPlanCategory { category_id } => {
            let exists = {
                let conn = get_connection(&deps.db_pool)?;
                catalog::get_category(&conn, category_id)?.is_some()
            };
            if exists {
                if let Some(next) = next {
                    deps.forms.put(admin_id, next);
                }
                bot.send_message(msg.chat.id, "Send the plan name.").await?;
            } else {
                deps.forms.put(admin_id, FormState::PlanCategory);
                bot.send_message(
                    msg.chat.id,
                    format!("No category with id {}. Send the category id.", category_id),
                )
                .await?;
            }
        }
        FormEffect::CreateCategory { name } => {
            let conn = get_connection(&deps.db_pool)?;
            let id = catalog::create_category(&conn, &name)?;
            bot.send_message(msg.chat.id, format!("Category '{}' created with id {}.", name, id))
                .await?;
        }
        FormEffect::CreatePlan(draft) => {
            let result = {
                let conn = get_connection(&deps.db_pool)?;
                catalog::create_plan(
                    &conn,
                    &catalog::NewPlan {
                        category_id: draft.category_id,
                        name: draft.name.clone(),
                        invite_link: draft.invite_link,
                        price: draft.price,
                        duration_days: draft.duration_days,
                        target_chat_id: draft.target_chat_id,
                    },
                )
            };
            match result {
                Ok(id) => {
                    bot.send_message(msg.chat.id, format!("Plan '{}' created with id {}.", draft.name, id))
                        .await?;
                }
                Err(e) => {
                    bot.send_message(msg.chat.id, format!("Plan not created: {}", e)).await?;
                }
            }
        }
        FormEffect::SetBundle {
            links,
            price,
            duration_days,
        } => {
            let conn = get_connection(&deps.db_pool)?;
            settings::set_bundle(&conn, &links, &price, duration_days)?;
            bot.send_message(
                msg.chat.id,
                format!("Bundle saved: {} link(s), {} / {} days.", links.len(), price, duration_days),
            )
            .await?;
        }
        FormEffect::SetPaymentRail { rail, value } => {
            let conn = get_connection(&deps.db_pool)?;
            settings::set_payment_rail(&conn, rail, &value)?;
            bot.send_message(msg.chat.id, format!("{} payment details saved.", rail.label()))
                .await?;
        }
        FormEffect::Cancelled => {
            bot.send_message(msg.chat.id, "Cancelled.").await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_command_matching_is_token_exact() {
        assert!(is_admin_command("/sweep"));
        assert!(is_admin_command("/grant 1 30 VIP"));
        assert!(!is_admin_command("/sweeping"));
        assert!(!is_admin_command("/subscribe"));
        assert!(!is_admin_command("hello"));
    }
}
