//! Principals and the documents access rules are evaluated against

use std::collections::HashSet;

/// The caller of an operation; `uid` is `None` when not signed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: Option<String>,
}

impl Principal {
    pub fn signed_in(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { uid: None }
    }

    pub fn is(&self, uid: &str) -> bool {
        self.uid.as_deref() == Some(uid)
    }

    /// Identifier used for logging and rate limiting
    pub fn key(&self) -> &str {
        self.uid.as_deref().unwrap_or("anonymous")
    }
}

/// Ownership and membership of a project
#[derive(Debug, Clone, Default)]
pub struct ProjectAccess {
    pub project_id: String,
    pub owner_id: String,
    pub member_ids: HashSet<String>,
}

impl ProjectAccess {
    pub fn new(project_id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            owner_id: owner_id.into(),
            member_ids: HashSet::new(),
        }
    }

    pub fn with_member(mut self, uid: impl Into<String>) -> Self {
        self.member_ids.insert(uid.into());
        self
    }

    pub fn is_owner(&self, principal: &Principal) -> bool {
        principal.is(&self.owner_id)
    }

    pub fn is_participant(&self, principal: &Principal) -> bool {
        match principal.uid.as_deref() {
            Some(uid) => uid == self.owner_id || self.member_ids.contains(uid),
            None => false,
        }
    }
}

/// Where a message was posted
#[derive(Debug, Clone)]
pub enum MessageScope {
    Project(ProjectAccess),
    Direct(ChatDoc),
}

#[derive(Debug, Clone)]
pub struct MessageDoc {
    pub sender_id: String,
    pub scope: MessageScope,
}

#[derive(Debug, Clone, Default)]
pub struct ChatDoc {
    pub participants: HashSet<String>,
}

impl ChatDoc {
    pub fn between<I, S>(participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            participants: participants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn includes(&self, principal: &Principal) -> bool {
        principal
            .uid
            .as_deref()
            .is_some_and(|uid| self.participants.contains(uid))
    }
}
