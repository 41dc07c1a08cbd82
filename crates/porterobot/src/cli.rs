use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "portero")]
#[command(author, version, about = "Telegram bot for channel media indexing, fast-link relay and timed memberships", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (dispatcher + relay server + expiry sweeper)
    Run,

    /// Run one expiry sweep and exit
    Sweep,

    /// Index the storage channel history and exit
    Backfill {
        /// Highest message id to scan
        #[arg(long)]
        upto: i64,

        /// Lowest message id to scan
        #[arg(long, default_value_t = 1)]
        from: i64,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
