//! Authorization policy
//!
//! Access rules for each collection, written as plain predicates so each can
//! be tested on its own. [`AccessPolicy::authorize`] turns a denied
//! predicate into a [`PolicyError`].

use super::principal::{ChatDoc, MessageDoc, MessageScope, Principal, ProjectAccess};
use crate::error::PolicyError;

/// Message fields a reader may change
pub const MESSAGE_WRITABLE_FIELDS: &[&str] = &["reactions", "readBy", "status"];

/// Chat fields a participant may change
pub const CHAT_WRITABLE_FIELDS: &[&str] = &["lastMessage", "lastMessageAt", "lastMessageSender"];

pub fn can_read_user(principal: &Principal) -> bool {
    principal.uid.is_some()
}

pub fn can_write_user(principal: &Principal, user_id: &str) -> bool {
    principal.is(user_id)
}

pub fn can_read_project(principal: &Principal, project: &ProjectAccess) -> bool {
    project.is_participant(principal)
}

pub fn can_write_project(principal: &Principal, project: &ProjectAccess) -> bool {
    project.is_owner(principal)
}

pub fn can_read_message(principal: &Principal, message: &MessageDoc) -> bool {
    match &message.scope {
        MessageScope::Project(project) => project.is_participant(principal),
        MessageScope::Direct(chat) => chat.includes(principal),
    }
}

pub fn can_create_message(principal: &Principal, message: &MessageDoc) -> bool {
    principal.is(&message.sender_id) && can_read_message(principal, message)
}

pub fn can_update_message(principal: &Principal, message: &MessageDoc, changed: &[&str]) -> bool {
    can_read_message(principal, message) && only_fields(changed, MESSAGE_WRITABLE_FIELDS)
}

pub fn can_read_chat(principal: &Principal, chat: &ChatDoc) -> bool {
    chat.includes(principal)
}

pub fn can_update_chat(principal: &Principal, chat: &ChatDoc, changed: &[&str]) -> bool {
    chat.includes(principal) && only_fields(changed, CHAT_WRITABLE_FIELDS)
}

pub fn can_read_files(principal: &Principal, project: &ProjectAccess) -> bool {
    project.is_participant(principal)
}

pub fn can_write_files(principal: &Principal, project: &ProjectAccess) -> bool {
    project.is_participant(principal)
}

fn only_fields(changed: &[&str], allowed: &[&str]) -> bool {
    changed.iter().all(|f| allowed.contains(f))
}

/// An operation on a protected document
#[derive(Debug, Clone, Copy)]
pub enum AccessRequest<'a> {
    ReadUser,
    WriteUser { user_id: &'a str },
    ReadProject(&'a ProjectAccess),
    WriteProject(&'a ProjectAccess),
    ReadMessage(&'a MessageDoc),
    CreateMessage(&'a MessageDoc),
    UpdateMessage { message: &'a MessageDoc, changed: &'a [&'a str] },
    ReadChat(&'a ChatDoc),
    UpdateChat { chat: &'a ChatDoc, changed: &'a [&'a str] },
    ReadFiles(&'a ProjectAccess),
    WriteFiles(&'a ProjectAccess),
}

impl AccessRequest<'_> {
    fn operation(&self) -> &'static str {
        match self {
            AccessRequest::ReadUser
            | AccessRequest::ReadProject(_)
            | AccessRequest::ReadMessage(_)
            | AccessRequest::ReadChat(_)
            | AccessRequest::ReadFiles(_) => "read",
            AccessRequest::CreateMessage(_) => "create",
            AccessRequest::UpdateMessage { .. } | AccessRequest::UpdateChat { .. } => "update",
            AccessRequest::WriteUser { .. }
            | AccessRequest::WriteProject(_)
            | AccessRequest::WriteFiles(_) => "write",
        }
    }

    fn resource(&self) -> String {
        match self {
            AccessRequest::ReadUser => "users".to_string(),
            AccessRequest::WriteUser { user_id } => format!("users/{user_id}"),
            AccessRequest::ReadProject(p) | AccessRequest::WriteProject(p) => {
                format!("projects/{}", p.project_id)
            }
            AccessRequest::ReadMessage(_)
            | AccessRequest::CreateMessage(_)
            | AccessRequest::UpdateMessage { .. } => "messages".to_string(),
            AccessRequest::ReadChat(_) | AccessRequest::UpdateChat { .. } => "chats".to_string(),
            AccessRequest::ReadFiles(p) | AccessRequest::WriteFiles(p) => {
                format!("files/{}", p.project_id)
            }
        }
    }

    fn changed_fields(&self) -> Option<(&[&str], &'static [&'static str])> {
        match self {
            AccessRequest::UpdateMessage { changed, .. } => Some((*changed, MESSAGE_WRITABLE_FIELDS)),
            AccessRequest::UpdateChat { changed, .. } => Some((*changed, CHAT_WRITABLE_FIELDS)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn allows(&self, principal: &Principal, request: &AccessRequest<'_>) -> bool {
        match *request {
            AccessRequest::ReadUser => can_read_user(principal),
            AccessRequest::WriteUser { user_id } => can_write_user(principal, user_id),
            AccessRequest::ReadProject(p) => can_read_project(principal, p),
            AccessRequest::WriteProject(p) => can_write_project(principal, p),
            AccessRequest::ReadMessage(m) => can_read_message(principal, m),
            AccessRequest::CreateMessage(m) => can_create_message(principal, m),
            AccessRequest::UpdateMessage { message, changed } => {
                can_update_message(principal, message, changed)
            }
            AccessRequest::ReadChat(c) => can_read_chat(principal, c),
            AccessRequest::UpdateChat { chat, changed } => can_update_chat(principal, chat, changed),
            AccessRequest::ReadFiles(p) => can_read_files(principal, p),
            AccessRequest::WriteFiles(p) => can_write_files(principal, p),
        }
    }

    pub fn authorize(&self, principal: &Principal, request: &AccessRequest<'_>) -> Result<(), PolicyError> {
        if self.allows(principal, request) {
            return Ok(());
        }

        let Some(uid) = principal.uid.as_deref() else {
            return Err(PolicyError::Unauthenticated);
        };

        if let Some((changed, allowed)) = request.changed_fields() {
            if let Some(field) = changed.iter().find(|f| !allowed.contains(*f)) {
                return Err(PolicyError::FieldNotWritable(field.to_string()));
            }
        }

        Err(PolicyError::Forbidden {
            principal: uid.to_string(),
            operation: request.operation().to_string(),
            resource: request.resource(),
        })
    }
}
