//! Media lookup and chunked streaming over MTProto.
//!
//! Bots cannot use messages.getHistory, but they can fetch specific message
//! ids with channels.getMessages and pull file bytes with upload.getFile.
//! Backfill and the relay are both built on those two calls.

use super::client::MtProtoClient;
use super::error::MtProtoError;
use bytes::Bytes;
use futures_util::stream::Stream;
use grammers_tl_types as tl;
use std::sync::Arc;

/// Chunk size for file downloads (1MB)
const CHUNK_SIZE: i64 = 1024 * 1024;

/// Type of media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Document,
    Photo,
}

/// Information about media extracted from a message
#[derive(Debug, Clone)]
pub struct MediaInfo {
    /// Message id containing this media
    pub message_id: i32,
    /// Unix timestamp of the message
    pub date: i32,
    /// Type of media
    pub media_type: MediaType,
    /// Document/Photo id
    pub id: i64,
    /// Access hash
    pub access_hash: i64,
    /// Fresh file reference
    pub file_reference: Vec<u8>,
    /// Datacenter id
    pub dc_id: i32,
    /// File size in bytes
    pub size: i64,
    /// Original filename (if available)
    pub filename: Option<String>,
    /// MIME type
    pub mime_type: Option<String>,
    /// Message text accompanying the media
    pub caption: Option<String>,
}

impl MediaInfo {
    /// Display name, falling back to a size-based generated one.
    pub fn display_name(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| porterocore::core::utils::generated_file_name(self.size))
    }

    fn input_location(&self) -> tl::enums::InputFileLocation {
        match self.media_type {
            MediaType::Document => {
                tl::enums::InputFileLocation::InputDocumentFileLocation(tl::types::InputDocumentFileLocation {
                    id: self.id,
                    access_hash: self.access_hash,
                    file_reference: self.file_reference.clone(),
                    thumb_size: String::new(),
                })
            }
            MediaType::Photo => {
                tl::enums::InputFileLocation::InputPhotoFileLocation(tl::types::InputPhotoFileLocation {
                    id: self.id,
                    access_hash: self.access_hash,
                    file_reference: self.file_reference.clone(),
                    thumb_size: "y".to_string(), // largest size
                })
            }
        }
    }
}

/// Bot API channel ids carry a -100 prefix; MTProto wants the bare id.
pub fn bare_channel_id(chat_id: i64) -> i64 {
    if chat_id <= -1_000_000_000_000 {
        -chat_id - 1_000_000_000_000
    } else {
        chat_id.abs()
    }
}

fn input_channel(chat_id: i64) -> tl::enums::InputChannel {
    // For channels the bot is a member of, access_hash of 0 works
    tl::enums::InputChannel::Channel(tl::types::InputChannel {
        channel_id: bare_channel_id(chat_id),
        access_hash: 0,
    })
}

/// Fetch specific messages of the storage channel and extract their media.
///
/// Ids without a message, or messages without media, are silently skipped;
/// the result is ordered as Telegram returned it.
pub async fn get_messages_media(
    client: &MtProtoClient,
    chat_id: i64,
    message_ids: &[i32],
) -> Result<Vec<MediaInfo>, MtProtoError> {
    let input_messages: Vec<_> = message_ids
        .iter()
        .map(|&id| tl::enums::InputMessage::Id(tl::types::InputMessageId { id }))
        .collect();

    let messages = client
        .inner()
        .invoke(&tl::functions::channels::GetMessages {
            channel: input_channel(chat_id),
            id: input_messages,
        })
        .await
        .map_err(MtProtoError::Invocation)?;

    let message_list = match messages {
        tl::enums::messages::Messages::Messages(m) => m.messages,
        tl::enums::messages::Messages::Slice(m) => m.messages,
        tl::enums::messages::Messages::ChannelMessages(m) => m.messages,
        tl::enums::messages::Messages::NotModified(_) => vec![],
    };

    let mut media_list = Vec::new();
    for msg in message_list {
        if let tl::enums::Message::Message(message) = msg {
            if let Some(media) = &message.media {
                if let Some(info) = extract_media_info(media, message.id, message.date, &message.message) {
                    media_list.push(info);
                }
            }
        }
    }

    Ok(media_list)
}

/// Fetch one message's media, for the relay.
pub async fn get_media(client: &MtProtoClient, chat_id: i64, message_id: i32) -> Result<MediaInfo, MtProtoError> {
    let media = get_messages_media(client, chat_id, &[message_id]).await?;
    media.into_iter().next().ok_or(MtProtoError::MessageNotFound)
}

/// Extract media information from a MessageMedia
fn extract_media_info(
    media: &tl::enums::MessageMedia,
    message_id: i32,
    date: i32,
    caption: &str,
) -> Option<MediaInfo> {
    let caption = if caption.is_empty() {
        None
    } else {
        Some(caption.to_string())
    };

    match media {
        tl::enums::MessageMedia::Document(doc_media) => {
            if let Some(tl::enums::Document::Document(doc)) = &doc_media.document {
                // Extract filename from attributes
                let mut filename = None;
                for attr in &doc.attributes {
                    match attr {
                        tl::enums::DocumentAttribute::Filename(f) => {
                            filename = Some(f.file_name.clone());
                        }
                        tl::enums::DocumentAttribute::Audio(a) => {
                            if filename.is_none() {
                                filename = a.title.clone();
                            }
                        }
                        _ => {}
                    }
                }

                return Some(MediaInfo {
                    message_id,
                    date,
                    media_type: MediaType::Document,
                    id: doc.id,
                    access_hash: doc.access_hash,
                    file_reference: doc.file_reference.clone(),
                    dc_id: doc.dc_id,
                    size: doc.size,
                    filename,
                    mime_type: Some(doc.mime_type.clone()),
                    caption,
                });
            }
        }
        tl::enums::MessageMedia::Photo(photo_media) => {
            if let Some(tl::enums::Photo::Photo(photo)) = &photo_media.photo {
                // Largest size
                let size = photo
                    .sizes
                    .iter()
                    .filter_map(|s| match s {
                        tl::enums::PhotoSize::Size(ps) => Some(ps.size as i64),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(0);

                return Some(MediaInfo {
                    message_id,
                    date,
                    media_type: MediaType::Photo,
                    id: photo.id,
                    access_hash: photo.access_hash,
                    file_reference: photo.file_reference.clone(),
                    dc_id: photo.dc_id,
                    size,
                    filename: None,
                    mime_type: Some("image/jpeg".to_string()),
                    caption,
                });
            }
        }
        _ => {}
    }
    None
}

/// Stream a file's bytes chunk by chunk using upload.getFile.
///
/// The stream pulls 1MB chunks on demand; nothing is buffered beyond the
/// chunk in flight. Errors surface as `io::Error` so the stream can feed an
/// HTTP body directly.
pub fn stream_media(
    client: Arc<MtProtoClient>,
    media: MediaInfo,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let location = media.input_location();

    futures_util::stream::try_unfold(
        (client, location, 0i64, false),
        |(client, location, offset, done)| async move {
            if done {
                return Ok(None);
            }

            let result = client
                .inner()
                .invoke(&tl::functions::upload::GetFile {
                    precise: false,
                    cdn_supported: false,
                    location: location.clone(),
                    offset,
                    limit: CHUNK_SIZE as i32,
                })
                .await
                .map_err(|e| std::io::Error::other(format!("upload.getFile failed: {}", e)))?;

            match result {
                tl::enums::upload::File::File(file) => {
                    if file.bytes.is_empty() {
                        return Ok(None);
                    }
                    let chunk_len = file.bytes.len() as i64;
                    // A short chunk means we just read the tail
                    let finished = chunk_len < CHUNK_SIZE;
                    Ok(Some((
                        Bytes::from(file.bytes),
                        (client, location, offset + chunk_len, finished),
                    )))
                }
                tl::enums::upload::File::CdnRedirect(_) => {
                    Err(std::io::Error::other("CDN redirect not supported"))
                }
            }
        },
    )
}
