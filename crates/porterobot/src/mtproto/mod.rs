//! MTProto access to the storage channel via grammers.
//!
//! The Bot API cannot fetch arbitrary archived messages or stream files
//! without a size cap; this module covers both: message lookup by id
//! (`channels.getMessages`) and chunked file download (`upload.getFile`).

pub mod client;
pub mod error;
pub mod media;

pub use client::MtProtoClient;
pub use error::MtProtoError;
pub use media::{MediaInfo, MediaType};
