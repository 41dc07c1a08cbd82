//! Subscription ledger.
//!
//! One row per active grant. Approval uses delete-then-insert keyed by
//! (user, plan name) so re-approving the same purchase never stacks rows.
//! Rows with `target_chat_id == 0` are manual or bundle grants with no real
//! chat; the sweeper skips eviction for them but still deletes and notifies.

use rusqlite::{params, Result};

use crate::storage::db::DbConnection;

/// An active grant of a plan to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    /// None for manual grants and bundle purchases
    pub plan_id: Option<i64>,
    /// Snapshot of the plan name at approval time
    pub plan_name: String,
    pub target_chat_id: i64,
    pub joined_at: String,
    pub expires_at: String,
}

/// Fields for a new grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub user_id: i64,
    pub plan_id: Option<i64>,
    pub plan_name: String,
    pub target_chat_id: i64,
    pub joined_at: String,
    pub expires_at: String,
}

fn sub_from_row(row: &rusqlite::Row<'_>) -> Result<Subscription> {
    Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        plan_id: row.get(2)?,
        plan_name: row.get(3)?,
        target_chat_id: row.get(4)?,
        joined_at: row.get(5)?,
        expires_at: row.get(6)?,
    })
}

const SUB_COLUMNS: &str = "id, user_id, plan_id, plan_name, target_chat_id, joined_at, expires_at";

/// Write a grant, replacing any existing row for the same (user, plan name).
///
/// Delete-then-insert: re-approval overwrites rather than stacks.
pub fn upsert_subscription(conn: &mut DbConnection, sub: &NewSubscription) -> Result<i64> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM subscriptions WHERE user_id = ?1 AND plan_name = ?2",
        params![sub.user_id, sub.plan_name],
    )?;
    tx.execute(
        "INSERT INTO subscriptions (user_id, plan_id, plan_name, target_chat_id, joined_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            sub.user_id,
            sub.plan_id,
            sub.plan_name,
            sub.target_chat_id,
            sub.joined_at,
            sub.expires_at
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(id)
}

pub fn subscriptions_for_user(conn: &DbConnection, user_id: i64) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM subscriptions WHERE user_id = ?1 ORDER BY expires_at",
        SUB_COLUMNS
    ))?;
    let rows = stmt.query_map(params![user_id], sub_from_row)?;
    rows.collect()
}

pub fn all_subscriptions(conn: &DbConnection) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM subscriptions ORDER BY expires_at", SUB_COLUMNS))?;
    let rows = stmt.query_map([], sub_from_row)?;
    rows.collect()
}

/// Rows past expiry at `now` (storage-format timestamp). The sweeper's
/// selection: strictly `expires_at < now`, never `>=`.
pub fn expired_subscriptions(conn: &DbConnection, now: &str) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM subscriptions WHERE expires_at < ?1 ORDER BY expires_at",
        SUB_COLUMNS
    ))?;
    let rows = stmt.query_map(params![now], sub_from_row)?;
    rows.collect()
}

pub fn delete_subscription(conn: &DbConnection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM subscriptions WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Admin revoke by user and plan name.
pub fn delete_subscription_for(conn: &DbConnection, user_id: i64, plan_name: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM subscriptions WHERE user_id = ?1 AND plan_name = ?2 COLLATE NOCASE",
        params![user_id, plan_name],
    )?;
    Ok(deleted > 0)
}

pub fn count_subscriptions(conn: &DbConnection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM subscriptions", [], |row| row.get(0))
}
