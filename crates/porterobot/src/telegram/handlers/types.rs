//! Handler types, dependencies, and user bookkeeping helpers

use std::sync::Arc;

use teloxide::types::Message;

use porterocore::approval::SessionStore;
use porterocore::forms::FormStore;
use porterocore::storage::db::{self, DbPool};
use porterocore::storage::get_connection;

use crate::autodelete::AutoDeleteQueue;
use crate::mtproto::MtProtoClient;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub sessions: Arc<SessionStore>,
    pub forms: Arc<FormStore>,
    pub autodelete: Arc<AutoDeleteQueue>,
    pub mtproto: Arc<MtProtoClient>,
}

/// User info extracted from an incoming message
#[derive(Clone)]
pub struct UserInfo {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl UserInfo {
    pub fn from_message(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id.0,
            username: msg.from.as_ref().and_then(|u| u.username.clone()),
            first_name: msg.from.as_ref().map(|u| u.first_name.clone()),
        }
    }

    /// "@username" when available, else the first name, else the id.
    pub fn display(&self) -> String {
        if let Some(username) = &self.username {
            format!("@{}", username)
        } else if let Some(first_name) = &self.first_name {
            first_name.clone()
        } else {
            self.chat_id.to_string()
        }
    }
}

/// Record the sender in the users table so broadcasts can reach them.
/// Failures are logged, never surfaced to the user.
pub fn record_user(db_pool: &Arc<DbPool>, user: &UserInfo) {
    match get_connection(db_pool) {
        Ok(conn) => {
            if let Err(e) = db::add_user(&conn, user.chat_id, user.username.as_deref()) {
                log::warn!("Failed to record user {}: {}", user.chat_id, e);
            }
        }
        Err(e) => log::warn!("No DB connection to record user {}: {}", user.chat_id, e),
    }
}
