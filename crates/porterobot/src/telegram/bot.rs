//! Bot initialization and command definitions

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use porterocore::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "What I can do:")]
pub enum Command {
    #[command(description = "welcome and quick start")]
    Start,
    #[command(description = "how the bot works")]
    Help,
    #[command(description = "browse membership plans")]
    Plans,
    #[command(description = "search the file catalog")]
    Search(String),
    #[command(description = "your active memberships")]
    MyPlan,
}

/// Creates a Bot instance with a request timeout suited for large media.
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(token, client))
}

/// Sets up bot commands in the Telegram UI
///
/// Admin console commands stay hidden; only user-facing commands are listed.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "welcome and quick start"),
        BotCommand::new("help", "how the bot works"),
        BotCommand::new("plans", "browse membership plans"),
        BotCommand::new("search", "search the file catalog"),
        BotCommand::new("myplan", "your active memberships"),
    ])
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions() {
        let commands = Command::descriptions();
        let command_list = format!("{}", commands);

        assert!(command_list.contains("What I can do"));
        assert!(command_list.contains("start"));
        assert!(command_list.contains("plans"));
        assert!(command_list.contains("search"));
    }
}
