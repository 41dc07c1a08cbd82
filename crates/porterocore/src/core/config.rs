use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: portero.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "portero.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: portero.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "portero.log".to_string()));

/// Public base URL used to build fast-download links.
/// No trailing slash. Example: https://my-bot.onrender.com
pub static BASE_URL: Lazy<String> =
    Lazy::new(|| env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()));

/// The private storage channel every indexed file lives in.
/// Channel ids start with -100.
pub static STORAGE_CHANNEL_ID: Lazy<i64> = Lazy::new(|| {
    env::var("STORAGE_CHANNEL_ID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
});

/// Administrator configuration
pub mod admin {
    use super::*;

    /// Primary administrator user id (OWNER_ID)
    pub static ADMIN_USER_ID: Lazy<i64> = Lazy::new(|| {
        env::var("OWNER_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(0)
    });

    /// Additional administrator ids, comma separated (ADMIN_IDS)
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .map(|v| v.split(',').filter_map(|s| s.trim().parse().ok()).collect())
            .unwrap_or_default()
    });
}

/// MTProto credentials (my.telegram.org) for raw channel access
pub mod mtproto {
    use super::*;

    pub static API_ID: Lazy<i32> = Lazy::new(|| {
        env::var("API_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(0)
    });

    pub static API_HASH: Lazy<String> = Lazy::new(|| env::var("API_HASH").unwrap_or_else(|_| String::new()));

    /// Path of the persisted MTProto session file
    pub static SESSION_PATH: Lazy<String> =
        Lazy::new(|| env::var("SESSION_PATH").unwrap_or_else(|_| "portero.session".to_string()));
}

/// Relay HTTP server configuration
pub mod relay {
    use super::*;

    /// Listen port for the relay (PORT, default 8080)
    pub static PORT: Lazy<u16> = Lazy::new(|| {
        env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080)
    });
}

/// Expiry sweeper configuration
pub mod sweeper {
    use super::*;

    /// Seconds between sweep runs (SWEEP_INTERVAL_SECS, default hourly)
    pub static INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600)
    });

    /// Sweep interval duration
    pub fn interval() -> Duration {
        Duration::from_secs(*INTERVAL_SECS)
    }
}

/// Auto-delete configuration for ephemeral messages
pub mod autodelete {
    use super::*;

    /// Seconds a search result lives before it is deleted
    /// (AUTO_DELETE_SECS, default 30 minutes)
    pub static DELAY_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("AUTO_DELETE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1800)
    });

    /// Auto-delete delay duration
    pub fn delay() -> Duration {
        Duration::from_secs(*DELAY_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// History backfill configuration
pub mod backfill {
    /// Message ids fetched per channels.getMessages call
    pub const BATCH_SIZE: i32 = 100;

    /// Edit the progress message every this many scanned ids
    pub const PROGRESS_EVERY: i64 = 1000;
}
