//! Portero — Telegram bot for private-channel media indexing, fast-link
//! relay and timed channel memberships.
//!
//! # Module Structure
//!
//! - `telegram`: dispatcher schema, commands, purchase flow, admin console
//! - `mtproto`: raw channel access (message fetch, chunked download)
//! - `relay`: HTTP server streaming archived media by message reference
//! - `indexer`: live channel listener and history backfill
//! - `sweeper`: expiry-driven membership eviction
//! - `autodelete`: cancellable delayed deletion of ephemeral messages

pub mod autodelete;
pub mod cli;
pub mod indexer;
pub mod mtproto;
pub mod relay;
pub mod sweeper;
pub mod telegram;
