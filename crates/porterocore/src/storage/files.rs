//! Indexed media catalog.
//!
//! Rows are keyed by an opaque `content_id` (namespaced by transport:
//! `bot:` for live Bot API updates, `mtp:` for MTProto backfill), so
//! re-indexing the same content is idempotent — the second upsert wins on
//! metadata.

use rusqlite::{params, OptionalExtension, Result};

use crate::storage::db::DbConnection;

/// A catalog entry pointing at an archived media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    /// Immutable key from the origin store
    pub content_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub caption: String,
    /// Message id inside the storage channel; the watch link dereferences this
    pub msg_id: i64,
    pub chat_id: i64,
    pub mime_type: Option<String>,
}

/// Insert or refresh a catalog entry. Keyed by content_id.
pub fn upsert_file(conn: &DbConnection, file: &IndexedFile) -> Result<()> {
    conn.execute(
        "INSERT INTO indexed_files (content_id, file_name, file_size, caption, msg_id, chat_id, mime_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(content_id) DO UPDATE SET
             file_name = excluded.file_name,
             file_size = excluded.file_size,
             caption = excluded.caption,
             msg_id = excluded.msg_id,
             chat_id = excluded.chat_id,
             mime_type = excluded.mime_type",
        params![
            file.content_id,
            file.file_name,
            file.file_size,
            file.caption,
            file.msg_id,
            file.chat_id,
            file.mime_type
        ],
    )?;
    Ok(())
}

fn file_from_row(row: &rusqlite::Row<'_>) -> Result<IndexedFile> {
    Ok(IndexedFile {
        content_id: row.get(0)?,
        file_name: row.get(1)?,
        file_size: row.get(2)?,
        caption: row.get(3)?,
        msg_id: row.get(4)?,
        chat_id: row.get(5)?,
        mime_type: row.get(6)?,
    })
}

const FILE_COLUMNS: &str = "content_id, file_name, file_size, caption, msg_id, chat_id, mime_type";

pub fn get_file_by_content_id(conn: &DbConnection, content_id: &str) -> Result<Option<IndexedFile>> {
    conn.query_row(
        &format!("SELECT {} FROM indexed_files WHERE content_id = ?1", FILE_COLUMNS),
        params![content_id],
        file_from_row,
    )
    .optional()
}

pub fn get_file_by_msg_id(conn: &DbConnection, msg_id: i64) -> Result<Option<IndexedFile>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM indexed_files WHERE msg_id = ?1 ORDER BY indexed_at DESC LIMIT 1",
            FILE_COLUMNS
        ),
        params![msg_id],
        file_from_row,
    )
    .optional()
}

/// Escape LIKE wildcards in a user query.
fn escape_like(query: &str) -> String {
    query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Case-insensitive substring search over display names, paged.
pub fn search_files(conn: &DbConnection, query: &str, limit: i64, offset: i64) -> Result<Vec<IndexedFile>> {
    let pattern = format!("%{}%", escape_like(query));
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM indexed_files WHERE file_name LIKE ?1 ESCAPE '\\' ORDER BY msg_id DESC LIMIT ?2 OFFSET ?3",
        FILE_COLUMNS
    ))?;
    let rows = stmt.query_map(params![pattern, limit, offset], file_from_row)?;
    rows.collect()
}

pub fn count_files(conn: &DbConnection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM indexed_files", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_escaping_neutralizes_wildcards() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("plain"), "plain");
    }
}
