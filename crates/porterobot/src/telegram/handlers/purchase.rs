//! Purchase flow: plan browsing, payment instructions, proof submission,
//! admin approval, and private-file archiving.
//!
//! The ledger write always happens before the courtesy messages; a failed
//! send never rolls back an approval.

use anyhow::Result;
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId};
use url::Url;

use porterocore::approval::PurchaseTarget;
use porterocore::core::{config, utils};
use porterocore::storage::ledger::NewSubscription;
use porterocore::storage::settings::BotSettings;
use porterocore::storage::{catalog, get_connection, ledger, settings};

use super::types::{HandlerDeps, UserInfo};
use crate::indexer;
use crate::telegram::admin::is_admin;
use crate::telegram::notifications;

/// Route inline keyboard callbacks.
pub async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> Result<()> {
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();
    let from_id = q.from.id.0 as i64;

    if let Some(category) = data.strip_prefix("cat:") {
        if let Ok(category_id) = category.parse::<i64>() {
            show_category_plans(bot, chat_id, message_id, deps, category_id).await?;
        }
    } else if let Some(target) = data.strip_prefix("buy:") {
        if let Some(target) = PurchaseTarget::decode(target) {
            start_purchase(bot, chat_id, from_id, deps, target).await?;
        }
    } else if let Some(rest) = data.strip_prefix("apr:") {
        handle_approval(bot, deps, from_id, chat_id, message_id, rest).await?;
    }

    Ok(())
}

/// Edit the plan-picker message to list one category's plans.
async fn show_category_plans(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    deps: &HandlerDeps,
    category_id: i64,
) -> Result<()> {
    let (category, plans) = {
        let conn = get_connection(&deps.db_pool)?;
        (catalog::get_category(&conn, category_id)?, catalog::list_plans(&conn, category_id)?)
    };

    let Some(category) = category else {
        bot.edit_message_text(chat_id, message_id, "That category is gone. Use /plans again.")
            .await?;
        return Ok(());
    };

    if plans.is_empty() {
        bot.edit_message_text(chat_id, message_id, format!("No plans in '{}' yet.", category.name))
            .await?;
        return Ok(());
    }

    let rows: Vec<Vec<InlineKeyboardButton>> = plans
        .iter()
        .map(|plan| {
            vec![InlineKeyboardButton::callback(
                format!("{} — {} / {} days", plan.name, plan.price, plan.duration_days),
                format!("buy:{}", PurchaseTarget::Plan(plan.id).encode()),
            )]
        })
        .collect();

    bot.edit_message_text(chat_id, message_id, format!("Plans in '{}':", category.name))
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

fn payment_instructions(settings: &BotSettings, offer_name: &str, price: &str) -> String {
    let mut text = format!("You picked: {} — {}\n\n", offer_name, price);

    if settings.has_payment_rails() {
        text.push_str("Pay using any of:\n");
        if let Some(upi) = &settings.payment_upi {
            text.push_str(&format!("• UPI: {}\n", upi));
        }
        if let Some(paypal) = &settings.payment_paypal {
            text.push_str(&format!("• PayPal: {}\n", paypal));
        }
        if let Some(crypto) = &settings.payment_crypto {
            text.push_str(&format!("• Crypto: {}\n", crypto));
        }
    } else {
        text.push_str("Payment details are not configured yet; contact the admin.\n");
    }

    text.push_str("\nWhen you're done, send the payment screenshot here as a photo.");
    text
}

/// `buy:` callback: show payment instructions and open a purchase session.
async fn start_purchase(
    bot: &Bot,
    chat_id: ChatId,
    buyer_id: i64,
    deps: &HandlerDeps,
    target: PurchaseTarget,
) -> Result<()> {
    let settings = {
        let conn = get_connection(&deps.db_pool)?;
        settings::get_settings(&conn)?
    };

    let (offer_name, price) = match target {
        PurchaseTarget::Plan(plan_id) => {
            let plan = {
                let conn = get_connection(&deps.db_pool)?;
                catalog::get_plan(&conn, plan_id)?
            };
            let Some(plan) = plan else {
                bot.send_message(chat_id, "That plan no longer exists. Use /plans again.")
                    .await?;
                return Ok(());
            };
            (plan.name, plan.price)
        }
        PurchaseTarget::Bundle => {
            let Some(bundle) = settings.bundle() else {
                bot.send_message(chat_id, "The bundle is not available right now.").await?;
                return Ok(());
            };
            ("All-in-one Bundle".to_string(), bundle.price)
        }
    };

    deps.sessions.begin(buyer_id, target);
    bot.send_message(chat_id, payment_instructions(&settings, &offer_name, &price))
        .await?;
    Ok(())
}

/// A photo in private chat: either a payment proof or noise.
pub async fn handle_proof_photo(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let user = UserInfo::from_message(msg);
    let buyer_id = user.chat_id;

    let Some(target) = deps.sessions.take(buyer_id) else {
        // Session expired or never existed: the buyer must restart
        bot.send_message(
            msg.chat.id,
            "That photo isn't attached to an active purchase. Pick a plan with /plans first.",
        )
        .await?;
        return Ok(());
    };

    let admin_id = *config::admin::ADMIN_USER_ID;
    if admin_id == 0 {
        log::error!("OWNER_ID not set; cannot forward payment proof");
        bot.send_message(msg.chat.id, "Approvals are not configured. Contact the admin.")
            .await?;
        return Ok(());
    }

    let (offer_name, price) = {
        let conn = get_connection(&deps.db_pool)?;
        match target {
            PurchaseTarget::Plan(plan_id) => match catalog::get_plan(&conn, plan_id)? {
                Some(plan) => (plan.name, plan.price),
                None => {
                    bot.send_message(msg.chat.id, "That plan was removed meanwhile. Use /plans again.")
                        .await?;
                    return Ok(());
                }
            },
            PurchaseTarget::Bundle => match settings::get_settings(&conn)?.bundle() {
                Some(bundle) => ("All-in-one Bundle".to_string(), bundle.price),
                None => {
                    bot.send_message(msg.chat.id, "The bundle is not available right now.").await?;
                    return Ok(());
                }
            },
        }
    };

    let caption = format!(
        "Payment proof\nFrom: {} (id {})\nPlan: {}\nPrice: {}\nAt: {} UTC",
        user.display(),
        buyer_id,
        offer_name,
        price,
        utils::now_string(),
    );

    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Approve", format!("apr:ok:{}:{}", buyer_id, target.encode())),
        InlineKeyboardButton::callback("❌ Reject", format!("apr:no:{}:{}", buyer_id, target.encode())),
    ]]);

    bot.copy_message(ChatId(admin_id), msg.chat.id, msg.id)
        .caption(caption)
        .reply_markup(keyboard)
        .await?;

    bot.send_message(msg.chat.id, "Submitted for review. You'll get your invite here once approved.")
        .await?;
    Ok(())
}

/// `apr:` callback on the admin's copy of the proof.
async fn handle_approval(
    bot: &Bot,
    deps: &HandlerDeps,
    from_id: i64,
    admin_chat: ChatId,
    admin_msg: MessageId,
    rest: &str,
) -> Result<()> {
    if !is_admin(from_id) {
        return Ok(());
    }

    let mut parts = rest.splitn(3, ':');
    let action = parts.next().unwrap_or_default();
    let buyer_id: i64 = match parts.next().and_then(|v| v.parse().ok()) {
        Some(id) => id,
        None => return Ok(()),
    };
    let Some(target) = parts.next().and_then(PurchaseTarget::decode) else {
        return Ok(());
    };

    match action {
        "ok" => approve(bot, deps, buyer_id, target, admin_chat, admin_msg).await,
        "no" => reject(bot, buyer_id, admin_chat, admin_msg).await,
        _ => Ok(()),
    }
}

async fn approve(
    bot: &Bot,
    deps: &HandlerDeps,
    buyer_id: i64,
    target: PurchaseTarget,
    admin_chat: ChatId,
    admin_msg: MessageId,
) -> Result<()> {
    let now = Utc::now();
    let joined_at = utils::format_ts(now);

    let (plan_name, price, links, row) = match target {
        PurchaseTarget::Plan(plan_id) => {
            let plan = {
                let conn = get_connection(&deps.db_pool)?;
                catalog::get_plan(&conn, plan_id)?
            };
            let Some(plan) = plan else {
                let _ = bot
                    .edit_message_caption(admin_chat, admin_msg)
                    .caption("⚠️ Plan was deleted; nothing granted.")
                    .await;
                return Ok(());
            };
            let expires_at = utils::format_ts(utils::expiry_after(now, plan.duration_days));
            (
                plan.name.clone(),
                plan.price.clone(),
                vec![plan.invite_link.clone()],
                NewSubscription {
                    user_id: buyer_id,
                    plan_id: Some(plan.id),
                    plan_name: plan.name,
                    target_chat_id: plan.target_chat_id,
                    joined_at: joined_at.clone(),
                    expires_at,
                },
            )
        }
        PurchaseTarget::Bundle => {
            let bundle = {
                let conn = get_connection(&deps.db_pool)?;
                settings::get_settings(&conn)?.bundle()
            };
            let Some(bundle) = bundle else {
                let _ = bot
                    .edit_message_caption(admin_chat, admin_msg)
                    .caption("⚠️ Bundle is no longer configured; nothing granted.")
                    .await;
                return Ok(());
            };
            let expires_at = utils::format_ts(utils::expiry_after(now, bundle.duration_days));
            (
                "All-in-one Bundle".to_string(),
                bundle.price.clone(),
                bundle.links.clone(),
                NewSubscription {
                    user_id: buyer_id,
                    plan_id: None,
                    plan_name: "All-in-one Bundle".to_string(),
                    // No single chat to evict from; the sweeper skips removal
                    target_chat_id: 0,
                    joined_at: joined_at.clone(),
                    expires_at,
                },
            )
        }
    };

    let expires_at = row.expires_at.clone();

    // Ledger first. Delete-then-insert keyed by (user, plan name): approving
    // twice overwrites instead of stacking.
    {
        let mut conn = get_connection(&deps.db_pool)?;
        ledger::upsert_subscription(&mut conn, &row)?;
    }

    let settings = {
        let conn = get_connection(&deps.db_pool)?;
        settings::get_settings(&conn)?
    };

    // Everything below is best-effort
    if let Err(e) = notifications::send_invite_links(
        bot,
        ChatId(buyer_id),
        &plan_name,
        &links,
        settings.update_link.as_deref(),
    )
    .await
    {
        log::error!("Failed to send invite links to {}: {}", buyer_id, e);
    }

    if let Err(e) = notifications::send_receipt(bot, ChatId(buyer_id), &plan_name, &price, &joined_at, &expires_at).await
    {
        log::error!("Failed to send receipt to {}: {}", buyer_id, e);
    }

    let _ = bot
        .edit_message_caption(admin_chat, admin_msg)
        .caption(format!("✅ Approved — user {} / {} until {}", buyer_id, plan_name, expires_at))
        .await;

    if let Some(notify_chat_id) = settings.notify_chat_id {
        notifications::publish_promo(bot, notify_chat_id, &plan_name).await;
    }

    Ok(())
}

async fn reject(bot: &Bot, buyer_id: i64, admin_chat: ChatId, admin_msg: MessageId) -> Result<()> {
    let _ = bot
        .edit_message_caption(admin_chat, admin_msg)
        .caption(format!("❌ Rejected — user {}", buyer_id))
        .await;

    if let Err(e) = bot
        .send_message(
            ChatId(buyer_id),
            "Your payment could not be verified and was rejected. You can start over with /plans.",
        )
        .await
    {
        log::warn!("Failed to notify {} about rejection: {}", buyer_id, e);
    }

    Ok(())
}

/// A document/video/audio sent privately: archive it in the storage channel,
/// index it, and hand back the fast link.
pub async fn handle_user_media(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let storage_chat = *config::STORAGE_CHANNEL_ID;
    if storage_chat == 0 {
        bot.send_message(msg.chat.id, "Archiving is not configured.").await?;
        return Ok(());
    }

    let forwarded = bot.forward_message(ChatId(storage_chat), msg.chat.id, msg.id).await?;

    let Some(file) = indexer::index_channel_post(&deps.db_pool, &forwarded)? else {
        bot.send_message(msg.chat.id, "I couldn't read that file's metadata.").await?;
        return Ok(());
    };

    let link = format!("{}/watch/{}", config::BASE_URL.as_str(), file.msg_id);
    let text = format!(
        "File archived!\n\nName: {}\nSize: {}\n\n⚡ Fast link: {}\n\n✏️ To rename on download: {}?name=New_Name.mkv",
        file.file_name,
        porterocore::core::utils::format_file_size(file.file_size),
        link,
        link,
    );

    let mut request = bot.send_message(msg.chat.id, text);
    if let Ok(url) = Url::parse(&link) {
        request = request.reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
            "⚡ Fast Download",
            url,
        )]]));
    }
    request.await?;
    Ok(())
}
