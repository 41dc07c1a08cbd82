//! User-facing command handlers: /start, /help, /plans, /search, /myplan

use anyhow::Result;
use indoc::indoc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use porterocore::core::utils::format_file_size;
use porterocore::core::{config, utils};
use porterocore::storage::{catalog, files, get_connection, ledger, settings};

use super::types::{record_user, HandlerDeps, UserInfo};
use crate::telegram::bot::Command;

/// How many catalog hits one /search answers with
const SEARCH_PAGE_SIZE: i64 = 10;

pub async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, deps: &HandlerDeps) -> Result<()> {
    match cmd {
        Command::Start => handle_start(bot, msg, deps).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Plans => handle_plans(bot, msg, deps).await,
        Command::Search(query) => handle_search(bot, msg, deps, &query).await,
        Command::MyPlan => handle_myplan(bot, msg, deps).await,
    }
}

async fn handle_start(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let user = UserInfo::from_message(msg);
    record_user(&deps.db_pool, &user);

    let settings = {
        let conn = get_connection(&deps.db_pool)?;
        settings::get_settings(&conn)?
    };

    let mut text = indoc! {"
        Hi! I keep the channel archive searchable and memberships running.

        /search <name> finds files and hands you a fast download link.
        /plans shows what you can join.
        /myplan shows your active memberships.
    "}
    .to_string();

    if let Some(update_link) = settings.update_link {
        text.push_str(&format!("\nUpdates: {}", update_link));
    }

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_help(bot: &Bot, msg: &Message) -> Result<()> {
    bot.send_message(
        msg.chat.id,
        indoc! {"
            Searching: /search <part of the file name>. Every hit comes with
            a fast download link; append ?name=New_Name.mkv to the link to
            download under a different filename.

            Memberships: /plans lists categories and plans. Pick one, pay
            using the shown details, then send the payment screenshot here
            as a photo. An admin reviews it and your invite link plus a
            receipt arrive in this chat.

            Sending me a file archives it and returns its fast link.
        "},
    )
    .await?;
    Ok(())
}

async fn handle_plans(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let user = UserInfo::from_message(msg);
    record_user(&deps.db_pool, &user);

    let (categories, bundle) = {
        let conn = get_connection(&deps.db_pool)?;
        (catalog::list_categories(&conn)?, settings::get_settings(&conn)?.bundle())
    };

    if categories.is_empty() && bundle.is_none() {
        bot.send_message(msg.chat.id, "Nothing is for sale yet. Check back later.")
            .await?;
        return Ok(());
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .map(|cat| vec![InlineKeyboardButton::callback(cat.name.clone(), format!("cat:{}", cat.id))])
        .collect();

    if let Some(bundle) = bundle {
        rows.push(vec![InlineKeyboardButton::callback(
            format!("🎁 All-in-one Bundle — {}", bundle.price),
            "buy:bundle".to_string(),
        )]);
    }

    bot.send_message(msg.chat.id, "Pick a category:")
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

async fn handle_search(bot: &Bot, msg: &Message, deps: &HandlerDeps, query: &str) -> Result<()> {
    let user = UserInfo::from_message(msg);
    record_user(&deps.db_pool, &user);

    let query = query.trim();
    if query.is_empty() {
        bot.send_message(msg.chat.id, "Give me a name to search. Example: /search Avengers")
            .await?;
        return Ok(());
    }

    let hits = {
        let conn = get_connection(&deps.db_pool)?;
        files::search_files(&conn, query, SEARCH_PAGE_SIZE, 0)?
    };

    if hits.is_empty() {
        bot.send_message(msg.chat.id, "No files found in the catalog.").await?;
        return Ok(());
    }

    for file in &hits {
        let link = format!("{}/watch/{}", config::BASE_URL.as_str(), file.msg_id);

        let mut text = format!("File: {}\nSize: {}\n", file.file_name, format_file_size(file.file_size));
        if !file.caption.is_empty() {
            text.push_str(&format!("Caption: {}\n", file.caption));
        }
        text.push_str(&format!("\nRename on the fly: {}?name=New_Name.mkv", link));

        let mut request = bot.send_message(msg.chat.id, text);
        if let Ok(url) = Url::parse(&link) {
            request = request.reply_markup(InlineKeyboardMarkup::new(vec![vec![
                InlineKeyboardButton::url("📥 Fast Download / Watch", url),
            ]]));
        }
        let sent = request.await?;

        // Search results are ephemeral
        deps.autodelete
            .schedule(bot.clone(), sent.chat.id, sent.id, config::autodelete::delay());
    }

    Ok(())
}

async fn handle_myplan(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let subs = {
        let conn = get_connection(&deps.db_pool)?;
        ledger::subscriptions_for_user(&conn, msg.chat.id.0)?
    };

    if subs.is_empty() {
        bot.send_message(msg.chat.id, "You have no active memberships. See /plans.")
            .await?;
        return Ok(());
    }

    let mut text = String::from("Your memberships:\n\n");
    for sub in &subs {
        let remaining = utils::parse_ts(&sub.expires_at)
            .map(|expiry| {
                let days = (expiry - chrono::Utc::now()).num_days();
                if days >= 0 {
                    format!("{} day(s) left", days)
                } else {
                    "expired, pending cleanup".to_string()
                }
            })
            .unwrap_or_default();
        text.push_str(&format!("• {} — until {} ({})\n", sub.plan_name, sub.expires_at, remaining));
    }

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
