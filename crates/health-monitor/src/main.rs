//! Polls the relay's health endpoint and alerts the admin chat when the
//! service flips between alive and dead. Runs outside the bot process so a
//! wedged bot still gets reported.

use std::time::Duration;

struct Config {
    health_url: String,
    interval: Duration,
    bot_token: Option<String>,
    alert_chat_id: Option<i64>,
}

impl Config {
    fn from_env() -> Self {
        Self {
            health_url: std::env::var("HEALTH_URL").unwrap_or_else(|_| "http://127.0.0.1:8080/".to_string()),
            interval: Duration::from_secs(
                std::env::var("CHECK_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            bot_token: std::env::var("BOT_TOKEN").ok().filter(|v| !v.is_empty()),
            alert_chat_id: std::env::var("ALERT_CHAT_ID").ok().and_then(|v| v.parse().ok()),
        }
    }
}

async fn check_health(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
            match response.json::<serde_json::Value>().await {
                Ok(payload) => payload["status"] == "running",
                Err(_) => false,
            }
        }
        Ok(response) => {
            log::warn!("Health endpoint returned {}", response.status());
            false
        }
        Err(e) => {
            log::warn!("Health check failed: {}", e);
            false
        }
    }
}

/// Alert through the plain Bot API; no bot framework needed here.
async fn send_alert(client: &reqwest::Client, config: &Config, text: &str) {
    let (Some(token), Some(chat_id)) = (&config.bot_token, config.alert_chat_id) else {
        return;
    };

    let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
    let result = client
        .post(&url)
        .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
        .send()
        .await;

    if let Err(e) = result {
        log::error!("Failed to send alert: {}", e);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let config = Config::from_env();
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(15)).build() {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to build HTTP client: {}", e);
            return;
        }
    };

    log::info!(
        "Monitoring {} every {}s",
        config.health_url,
        config.interval.as_secs()
    );

    let mut was_alive: Option<bool> = None;
    let mut ticker = tokio::time::interval(config.interval);

    loop {
        ticker.tick().await;

        let alive = check_health(&client, &config.health_url).await;
        match was_alive {
            Some(previous) if previous == alive => {}
            _ => {
                if alive {
                    log::info!("Relay is up");
                    if was_alive == Some(false) {
                        send_alert(&client, &config, "✅ portero relay is back up").await;
                    }
                } else {
                    log::error!("Relay is DOWN");
                    send_alert(&client, &config, "❌ portero relay is down").await;
                }
            }
        }
        was_alive = Some(alive);
    }
}
