//! Outbound notices: admin alerts, receipts, invites, expiry messages.
//!
//! Everything here is best-effort. A lost message never rolls back a ledger
//! write; failures are logged (and, for the sweeper, counted by the caller).

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use porterocore::core::config::admin::ADMIN_USER_ID;
use porterocore::storage::ledger::Subscription;

use crate::telegram::markdown::escape_markdown;

/// Send a plain-text notification to the primary administrator.
pub async fn notify_admin_text(bot: &Bot, text: &str) {
    let admin_id = *ADMIN_USER_ID;
    if admin_id == 0 {
        log::warn!("OWNER_ID not set, dropping admin notification: {}", text);
        return;
    }

    if let Err(e) = bot.send_message(ChatId(admin_id), text).await {
        log::error!("Failed to send admin notification: {}", e);
    }
}

/// Tell a member their grant lapsed.
pub async fn send_expiry_notice(bot: &Bot, sub: &Subscription) -> Result<(), teloxide::RequestError> {
    bot.send_message(
        ChatId(sub.user_id),
        format!(
            "Your '{}' membership expired on {}. Use /plans to renew.",
            sub.plan_name, sub.expires_at
        ),
    )
    .await?;
    Ok(())
}

/// Tell the admin a member was swept out.
pub async fn notify_admin_member_expired(bot: &Bot, sub: &Subscription) {
    notify_admin_text(
        bot,
        &format!(
            "Membership expired: user {} / plan '{}' (chat {}, expired {})",
            sub.user_id, sub.plan_name, sub.target_chat_id, sub.expires_at
        ),
    )
    .await;
}

/// Send the invite link(s) after an approval.
pub async fn send_invite_links(
    bot: &Bot,
    chat_id: ChatId,
    plan_name: &str,
    links: &[String],
    update_link: Option<&str>,
) -> Result<(), teloxide::RequestError> {
    let mut text = format!("You're in! Your '{}' access:\n\n", plan_name);
    for link in links {
        text.push_str(link);
        text.push('\n');
    }
    if let Some(update_link) = update_link {
        text.push_str(&format!("\nUpdates channel: {}", update_link));
    }

    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Send a formatted digital receipt after an approval.
pub async fn send_receipt(
    bot: &Bot,
    chat_id: ChatId,
    plan_name: &str,
    price: &str,
    joined_at: &str,
    expires_at: &str,
) -> Result<(), teloxide::RequestError> {
    let text = format!(
        "🧾 *Receipt*\n\n\
         Plan: *{}*\n\
         Price: {}\n\
         Activated: {}\n\
         Expires: {}\n\n\
         Keep this message for your records\\.",
        escape_markdown(plan_name),
        escape_markdown(price),
        escape_markdown(joined_at),
        escape_markdown(expires_at),
    );

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}

/// Publish a promotional notice to the configured broadcast target.
pub async fn publish_promo(bot: &Bot, notify_chat_id: i64, plan_name: &str) {
    if let Err(e) = bot
        .send_message(
            ChatId(notify_chat_id),
            format!("🎉 A new member just joined '{}'. Use /plans to get yours.", plan_name),
        )
        .await
    {
        log::warn!("Failed to publish promo notice to {}: {}", notify_chat_id, e);
    }
}
