//! Media catalog population.
//!
//! Two paths feed the same upsert: the live listener (channel posts carrying
//! a document, video or audio) and the history backfill, which walks a
//! message-id range over MTProto in batches. Content ids are namespaced by
//! transport (`bot:` / `mtp:`) so both paths stay idempotent on their own
//! keys.

use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{Message, MessageId};

use porterocore::core::utils::generated_file_name;
use porterocore::core::{config, AppResult};
use porterocore::storage::files::{upsert_file, IndexedFile};
use porterocore::storage::{get_connection, DbPool};

use crate::mtproto::{media, MediaInfo, MtProtoClient};

/// Extract an indexable file from a live Telegram message, if it carries
/// supported media. Smart name detection: a missing filename becomes
/// `Video_<size>.mp4`.
pub fn extract_indexed_file(msg: &Message) -> Option<IndexedFile> {
    let caption = msg.caption().unwrap_or("").to_string();

    let (unique_id, file_name, file_size, mime_type) = if let Some(doc) = msg.document() {
        (
            doc.file.unique_id.0.clone(),
            doc.file_name.clone(),
            doc.file.size as i64,
            doc.mime_type.as_ref().map(|m| m.to_string()),
        )
    } else if let Some(video) = msg.video() {
        (
            video.file.unique_id.0.clone(),
            video.file_name.clone(),
            video.file.size as i64,
            video.mime_type.as_ref().map(|m| m.to_string()),
        )
    } else if let Some(audio) = msg.audio() {
        (
            audio.file.unique_id.0.clone(),
            audio.file_name.clone(),
            audio.file.size as i64,
            audio.mime_type.as_ref().map(|m| m.to_string()),
        )
    } else {
        return None;
    };

    Some(IndexedFile {
        content_id: format!("bot:{}", unique_id),
        file_name: file_name.unwrap_or_else(|| generated_file_name(file_size)),
        file_size,
        caption,
        msg_id: msg.id.0 as i64,
        chat_id: msg.chat.id.0,
        mime_type,
    })
}

/// Live listener: upsert a storage-channel post on arrival.
pub fn index_channel_post(db_pool: &Arc<DbPool>, msg: &Message) -> AppResult<Option<IndexedFile>> {
    let Some(file) = extract_indexed_file(msg) else {
        return Ok(None);
    };

    let conn = get_connection(db_pool)?;
    upsert_file(&conn, &file)?;
    log::info!("Indexed '{}' ({} bytes, msg {})", file.file_name, file.file_size, file.msg_id);
    Ok(Some(file))
}

fn indexed_file_from_media(info: &MediaInfo, chat_id: i64) -> IndexedFile {
    IndexedFile {
        content_id: format!("mtp:{}", info.id),
        file_name: info.display_name(),
        file_size: info.size,
        caption: info.caption.clone().unwrap_or_default(),
        msg_id: info.message_id as i64,
        chat_id,
        mime_type: info.mime_type.clone(),
    }
}

/// Outcome of a backfill run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    /// Message ids walked
    pub scanned: i64,
    /// Media rows upserted
    pub indexed: i64,
    /// Batches that failed and were skipped
    pub failed_batches: i64,
}

impl BackfillReport {
    pub fn render(&self) -> String {
        format!(
            "{} ids scanned, {} files indexed, {} batches failed",
            self.scanned, self.indexed, self.failed_batches
        )
    }
}

/// Walk the storage channel's history from `from` up to `upto` (inclusive)
/// and upsert every media message.
///
/// Bots cannot page through history, so the walk is a plain id range fetched
/// in batches of [`config::backfill::BATCH_SIZE`]; ids that never existed
/// simply return nothing. A failing batch is counted and skipped, never
/// fatal. When `status` is given, the referenced message is edited with
/// progress every [`config::backfill::PROGRESS_EVERY`] ids.
pub async fn run_backfill(
    client: &MtProtoClient,
    db_pool: &Arc<DbPool>,
    chat_id: i64,
    from: i64,
    upto: i64,
    status: Option<(&Bot, ChatId, MessageId)>,
) -> AppResult<BackfillReport> {
    let mut report = BackfillReport::default();
    let mut next_progress = config::backfill::PROGRESS_EVERY;

    log::info!("Backfill started: chat {}, ids {}..={}", chat_id, from, upto);

    let mut batch_start = from.max(1);
    while batch_start <= upto {
        let batch_end = (batch_start + config::backfill::BATCH_SIZE as i64 - 1).min(upto);
        let ids: Vec<i32> = (batch_start..=batch_end).filter_map(|id| i32::try_from(id).ok()).collect();

        match media::get_messages_media(client, chat_id, &ids).await {
            Ok(media_list) => {
                let conn = get_connection(db_pool)?;
                for info in &media_list {
                    upsert_file(&conn, &indexed_file_from_media(info, chat_id))?;
                    report.indexed += 1;
                }
            }
            Err(e) => {
                report.failed_batches += 1;
                log::warn!("Backfill batch {}..={} failed: {}", batch_start, batch_end, e);
            }
        }

        report.scanned += batch_end - batch_start + 1;

        if report.scanned >= next_progress {
            next_progress += config::backfill::PROGRESS_EVERY;
            log::info!("Backfill progress: {}", report.render());
            if let Some((bot, status_chat, status_msg)) = status {
                let _ = bot
                    .edit_message_text(status_chat, status_msg, format!("Backfill: {}", report.render()))
                    .await;
            }
        }

        batch_start = batch_end + 1;
    }

    log::info!("Backfill finished: {}", report.render());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mtproto::MediaType;
    use pretty_assertions::assert_eq;

    #[test]
    fn media_info_maps_to_catalog_row() {
        let info = MediaInfo {
            message_id: 77,
            date: 0,
            media_type: MediaType::Document,
            id: 123456,
            access_hash: 0,
            file_reference: vec![],
            dc_id: 2,
            size: 500_000_000,
            filename: Some("movie.mkv".to_string()),
            mime_type: Some("video/x-matroska".to_string()),
            caption: Some("1080p remux".to_string()),
        };

        let row = indexed_file_from_media(&info, -1001234567890);
        assert_eq!(row.content_id, "mtp:123456");
        assert_eq!(row.file_name, "movie.mkv");
        assert_eq!(row.msg_id, 77);
        assert_eq!(row.chat_id, -1001234567890);
        assert_eq!(row.caption, "1080p remux");
    }
}
