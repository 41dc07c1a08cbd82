//! Category and plan catalog.
//!
//! Plans are immutable once created: the admin console offers create and
//! delete only, never edit-in-place. Deleting a category cascades to its
//! plans inside one transaction.

use rusqlite::{params, OptionalExtension, Result};

use crate::core::error::{AppError, AppResult};
use crate::storage::db::DbConnection;

/// A plan grouping, e.g. "Movies".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A purchasable, time-boxed membership offering tied to one destination chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub invite_link: String,
    /// Opaque display string, shown to buyers as entered
    pub price: String,
    pub duration_days: i64,
    pub target_chat_id: i64,
}

/// Plan fields collected by the admin form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlan {
    pub category_id: i64,
    pub name: String,
    pub invite_link: String,
    pub price: String,
    pub duration_days: i64,
    pub target_chat_id: i64,
}

pub fn create_category(conn: &DbConnection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

pub fn get_category(conn: &DbConnection, id: i64) -> Result<Option<Category>> {
    conn.query_row(
        "SELECT id, name FROM categories WHERE id = ?1",
        params![id],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn list_categories(conn: &DbConnection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Delete a category and every plan referencing it.
///
/// Returns the number of plans removed alongside the category.
pub fn delete_category(conn: &mut DbConnection, id: i64) -> Result<usize> {
    let tx = conn.transaction()?;
    let plans = tx.execute("DELETE FROM plans WHERE category_id = ?1", params![id])?;
    tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(plans)
}

/// Insert a plan. The referenced category must already exist.
pub fn create_plan(conn: &DbConnection, plan: &NewPlan) -> AppResult<i64> {
    if get_category(conn, plan.category_id)?.is_none() {
        return Err(AppError::Validation(format!(
            "category {} does not exist",
            plan.category_id
        )));
    }

    conn.execute(
        "INSERT INTO plans (category_id, name, invite_link, price, duration_days, target_chat_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            plan.category_id,
            plan.name,
            plan.invite_link,
            plan.price,
            plan.duration_days,
            plan.target_chat_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn plan_from_row(row: &rusqlite::Row<'_>) -> Result<Plan> {
    Ok(Plan {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
        invite_link: row.get(3)?,
        price: row.get(4)?,
        duration_days: row.get(5)?,
        target_chat_id: row.get(6)?,
    })
}

const PLAN_COLUMNS: &str = "id, category_id, name, invite_link, price, duration_days, target_chat_id";

pub fn get_plan(conn: &DbConnection, id: i64) -> Result<Option<Plan>> {
    conn.query_row(
        &format!("SELECT {} FROM plans WHERE id = ?1", PLAN_COLUMNS),
        params![id],
        plan_from_row,
    )
    .optional()
}

pub fn list_plans(conn: &DbConnection, category_id: i64) -> Result<Vec<Plan>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM plans WHERE category_id = ?1 ORDER BY id",
        PLAN_COLUMNS
    ))?;
    let rows = stmt.query_map(params![category_id], plan_from_row)?;
    rows.collect()
}

pub fn list_all_plans(conn: &DbConnection) -> Result<Vec<Plan>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM plans ORDER BY id", PLAN_COLUMNS))?;
    let rows = stmt.query_map([], plan_from_row)?;
    rows.collect()
}

/// Case-insensitive lookup by display name, used by manual grants.
pub fn find_plan_by_name(conn: &DbConnection, name: &str) -> Result<Option<Plan>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM plans WHERE name = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
            PLAN_COLUMNS
        ),
        params![name],
        plan_from_row,
    )
    .optional()
}

pub fn delete_plan(conn: &DbConnection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM plans WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}
