use anyhow::Result;
use dotenvy::dotenv;
use std::path::Path;
use std::sync::Arc;
use teloxide::prelude::*;

use portero::autodelete::AutoDeleteQueue;
use portero::cli::{Cli, Commands};
use portero::indexer;
use portero::mtproto::MtProtoClient;
use portero::relay::{start_relay_server, MtProtoStreamer, RelayState};
use portero::sweeper;
use portero::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use porterocore::approval::SessionStore;
use porterocore::core::{config, init_logger};
use porterocore::forms::FormStore;
use porterocore::storage::{create_pool, DbPool};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot
/// creation, MTProto sign-in).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics from spawned tasks instead of dying silently
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    // Load environment variables from .env if present
    let _ = dotenv();

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::Sweep) => run_manual_sweep().await,
        Some(Commands::Backfill { upto, from }) => run_cli_backfill(from, upto).await,
    }
}

fn create_db_pool() -> Result<Arc<DbPool>> {
    Ok(Arc::new(create_pool(&config::DATABASE_PATH)?))
}

/// Connect and sign in the MTProto client. Fatal without credentials: the
/// relay and the backfill cannot work over the Bot API alone.
async fn connect_mtproto() -> Result<Arc<MtProtoClient>> {
    let api_id = *config::mtproto::API_ID;
    let api_hash = config::mtproto::API_HASH.clone();
    if api_id == 0 || api_hash.is_empty() {
        return Err(anyhow::anyhow!("API_ID / API_HASH environment variables not set"));
    }

    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }

    let client =
        MtProtoClient::new_bot(api_id, &api_hash, &token, Path::new(config::mtproto::SESSION_PATH.as_str())).await?;
    Ok(Arc::new(client))
}

async fn run_bot() -> Result<()> {
    log::info!("Portero starting...");

    let db_pool = create_db_pool()?;
    let bot = create_bot()?;
    let mtproto = connect_mtproto().await?;

    if *config::STORAGE_CHANNEL_ID == 0 {
        log::warn!("STORAGE_CHANNEL_ID not set; indexing and the relay will be idle");
    }

    // Relay server
    let relay_state = RelayState {
        streamer: Arc::new(MtProtoStreamer::new(Arc::clone(&mtproto), *config::STORAGE_CHANNEL_ID)),
    };
    let relay_port = *config::relay::PORT;
    tokio::spawn(async move {
        if let Err(e) = start_relay_server(relay_port, relay_state).await {
            log::error!("Relay server stopped: {}", e);
        }
    });

    // Expiry sweeper
    sweeper::spawn_sweeper(bot.clone(), Arc::clone(&db_pool));

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let deps = HandlerDeps {
        db_pool,
        sessions: Arc::new(SessionStore::new()),
        forms: Arc::new(FormStore::new()),
        autodelete: Arc::new(AutoDeleteQueue::new()),
        mtproto,
    };

    log::info!("Dispatcher starting (long polling)");
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn run_manual_sweep() -> Result<()> {
    let db_pool = create_db_pool()?;
    let bot = create_bot()?;

    let summary = sweeper::run_sweep(&bot, &db_pool).await?;
    log::info!("Sweep finished: {}", summary.render());
    println!("Sweep finished: {}", summary.render());
    Ok(())
}

async fn run_cli_backfill(from: i64, upto: i64) -> Result<()> {
    let storage_chat = *config::STORAGE_CHANNEL_ID;
    if storage_chat == 0 {
        return Err(anyhow::anyhow!("STORAGE_CHANNEL_ID environment variable not set"));
    }

    let db_pool = create_db_pool()?;
    let mtproto = connect_mtproto().await?;

    let report = indexer::run_backfill(&mtproto, &db_pool, storage_chat, from, upto, None).await?;
    log::info!("Backfill finished: {}", report.render());
    println!("Backfill finished: {}", report.render());
    Ok(())
}
