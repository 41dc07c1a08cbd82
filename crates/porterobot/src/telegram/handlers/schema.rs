//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatKind, Message};

use porterocore::core::config;

use super::commands::handle_command;
use super::purchase::{handle_callback, handle_proof_photo, handle_user_media};
use super::types::{HandlerDeps, HandlerError};
use crate::indexer;
use crate::telegram::admin;
use crate::telegram::bot::Command;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Returns a handler tree for teloxide's Dispatcher. The same schema is used
/// in production and from integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_channel = deps.clone();
    let deps_admin = deps.clone();
    let deps_form = deps.clone();
    let deps_commands = deps.clone();
    let deps_proof = deps.clone();
    let deps_media = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // New media in the storage channel
        .branch(channel_post_handler(deps_channel))
        // Hidden admin console commands (not in the Command enum)
        .branch(admin_command_handler(deps_admin))
        // Active multi-step form input
        .branch(form_input_handler(deps_form))
        // User commands
        .branch(command_handler(deps_commands))
        // Payment screenshot during an active purchase
        .branch(proof_photo_handler(deps_proof))
        // Files sent privately: archive and hand back a fast link
        .branch(user_media_handler(deps_media))
        // Inline keyboard callbacks
        .branch(callback_handler(deps_callback))
}

fn is_private(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

fn has_indexable_media(msg: &Message) -> bool {
    msg.document().is_some() || msg.video().is_some() || msg.audio().is_some()
}

/// Live indexer branch: media landing in the storage channel.
fn channel_post_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_channel_post()
        .filter(|msg: Message| msg.chat.id.0 == *config::STORAGE_CHANNEL_ID && has_indexable_media(&msg))
        .endpoint(move |msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = indexer::index_channel_post(&deps.db_pool, &msg) {
                    log::error!("Failed to index channel post {}: {}", msg.id.0, e);
                }
                Ok(())
            }
        })
}

/// Hidden admin commands, matched by prefix like the rest of the console.
fn admin_command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| {
            msg.text()
                .map(|text| admin::is_admin_command(text))
                .unwrap_or(false)
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = admin::handle_admin_command(&bot, &msg, &deps).await {
                    log::error!("Admin command failed: {}", e);
                    let _ = bot.send_message(msg.chat.id, format!("Command failed: {}", e)).await;
                }
                Ok(())
            }
        })
}

/// Text input while an admin form is active.
fn form_input_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_filter = deps.clone();
    Update::filter_message()
        .filter(move |msg: Message| {
            msg.text().is_some()
                && msg
                    .from
                    .as_ref()
                    .map(|u| deps_filter.forms.is_active(u.id.0 as i64))
                    .unwrap_or(false)
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = admin::handle_form_input(&bot, &msg, &deps).await {
                    log::error!("Form input failed: {}", e);
                }
                Ok(())
            }
        })
}

/// User commands from the Command enum.
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_command(&bot, &msg, cmd, &deps).await {
                    log::error!("Command handler failed: {}", e);
                }
                Ok(())
            }
        })
}

/// Payment screenshots (photos in private chat).
fn proof_photo_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| is_private(&msg) && msg.photo().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_proof_photo(&bot, &msg, &deps).await {
                    log::error!("Proof submission failed: {}", e);
                }
                Ok(())
            }
        })
}

/// Files sent to the bot privately.
fn user_media_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| is_private(&msg) && has_indexable_media(&msg))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_user_media(&bot, &msg, &deps).await {
                    log::error!("User media handling failed: {}", e);
                }
                Ok(())
            }
        })
}

/// Inline keyboard callbacks (plan browsing, purchases, approvals).
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = handle_callback(&bot, &q, &deps).await {
                log::error!("Callback handler failed: {}", e);
            }
            Ok(())
        }
    })
}
