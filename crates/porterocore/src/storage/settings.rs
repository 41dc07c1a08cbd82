//! Bot settings singleton.
//!
//! One row (id = 1), created by the initial migration. All access goes
//! through these functions; nothing reads the row as ambient global state.

use rusqlite::{params, Result};

use crate::forms::PaymentRail;
use crate::storage::db::DbConnection;

/// The singleton settings record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotSettings {
    /// Broadcast target for promotional notices on approvals
    pub notify_chat_id: Option<i64>,
    /// External "updates channel" link shown to buyers
    pub update_link: Option<String>,
    pub payment_upi: Option<String>,
    pub payment_paypal: Option<String>,
    pub payment_crypto: Option<String>,
    pub bundle_links: Option<String>,
    pub bundle_price: Option<String>,
    pub bundle_duration_days: Option<i64>,
}

/// The all-in-one bundle offering, when fully configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleConfig {
    pub links: Vec<String>,
    pub price: String,
    pub duration_days: i64,
}

impl BotSettings {
    /// The bundle is purchasable only once links, price and duration are set.
    pub fn bundle(&self) -> Option<BundleConfig> {
        let links: Vec<String> = self
            .bundle_links
            .as_deref()?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if links.is_empty() {
            return None;
        }
        Some(BundleConfig {
            links,
            price: self.bundle_price.clone()?,
            duration_days: self.bundle_duration_days?,
        })
    }

    /// True when at least one payment rail is configured.
    pub fn has_payment_rails(&self) -> bool {
        self.payment_upi.is_some() || self.payment_paypal.is_some() || self.payment_crypto.is_some()
    }
}

pub fn get_settings(conn: &DbConnection) -> Result<BotSettings> {
    // The migration seeds the row; INSERT OR IGNORE covers databases that
    // lost it to manual surgery.
    conn.execute("INSERT OR IGNORE INTO bot_settings (id) VALUES (1)", [])?;
    conn.query_row(
        "SELECT notify_chat_id, update_link, payment_upi, payment_paypal, payment_crypto,
                bundle_links, bundle_price, bundle_duration_days
         FROM bot_settings WHERE id = 1",
        [],
        |row| {
            Ok(BotSettings {
                notify_chat_id: row.get(0)?,
                update_link: row.get(1)?,
                payment_upi: row.get(2)?,
                payment_paypal: row.get(3)?,
                payment_crypto: row.get(4)?,
                bundle_links: row.get(5)?,
                bundle_price: row.get(6)?,
                bundle_duration_days: row.get(7)?,
            })
        },
    )
}

pub fn set_notify_target(conn: &DbConnection, chat_id: Option<i64>) -> Result<()> {
    conn.execute(
        "UPDATE bot_settings SET notify_chat_id = ?1 WHERE id = 1",
        params![chat_id],
    )?;
    Ok(())
}

pub fn set_update_link(conn: &DbConnection, link: &str) -> Result<()> {
    conn.execute("UPDATE bot_settings SET update_link = ?1 WHERE id = 1", params![link])?;
    Ok(())
}

pub fn set_payment_rail(conn: &DbConnection, rail: PaymentRail, value: &str) -> Result<()> {
    let column = match rail {
        PaymentRail::Upi => "payment_upi",
        PaymentRail::Paypal => "payment_paypal",
        PaymentRail::Crypto => "payment_crypto",
    };
    conn.execute(
        &format!("UPDATE bot_settings SET {} = ?1 WHERE id = 1", column),
        params![value],
    )?;
    Ok(())
}

pub fn set_bundle(conn: &DbConnection, links: &[String], price: &str, duration_days: i64) -> Result<()> {
    conn.execute(
        "UPDATE bot_settings SET bundle_links = ?1, bundle_price = ?2, bundle_duration_days = ?3 WHERE id = 1",
        params![links.join(","), price, duration_days],
    )?;
    Ok(())
}
