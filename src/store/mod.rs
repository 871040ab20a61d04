//! Persistence collaborators. The policy engine never calls these; handlers
//! read a record, ask the engine, then write the engine's answer back here.

pub mod memory;
pub mod mysql;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::announcement::{Announcement, AnnouncementId, NewAnnouncement};
use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument};
use crate::model::leave_request::{
    LeaveFilter, LeaveId, LeavePatch, LeaveRequest, LeaveStatus, NewLeaveRequest,
};
use crate::model::user::{NewUser, User, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("leave request {id} is {found}, expected {expected}")]
    Conflict {
        id: LeaveId,
        expected: LeaveStatus,
        found: LeaveStatus,
    },

    #[error("session {0} has ended")]
    SessionEnded(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    /// Fails with `Duplicate` when the username or email is taken.
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, StoreError>;
    async fn usernames(&self) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn get_by_id(&self, id: LeaveId) -> Result<Option<LeaveRequest>, StoreError>;
    async fn list(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, StoreError>;
    async fn create(&self, leave: NewLeaveRequest) -> Result<LeaveRequest, StoreError>;
    /// Applies `patch` only while the stored status is still `expected`;
    /// otherwise fails with `Conflict`.
    async fn patch(
        &self,
        id: LeaveId,
        expected: LeaveStatus,
        patch: LeavePatch,
    ) -> Result<LeaveRequest, StoreError>;
    /// Removes `id` only while its status is still `expected`; `Ok(false)`
    /// when it is already gone.
    async fn delete(&self, id: LeaveId, expected: LeaveStatus) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_by_id(&self, id: DocumentId) -> Result<Option<Document>, StoreError>;
    async fn list(&self, search: Option<&str>) -> Result<Vec<Document>, StoreError>;
    async fn create(
        &self,
        owner_id: UserId,
        doc: NewDocument,
        now: DateTime<Utc>,
    ) -> Result<Document, StoreError>;
    async fn patch(&self, id: DocumentId, patch: DocumentPatch) -> Result<Document, StoreError>;
    async fn delete(&self, id: DocumentId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn get_by_id(&self, id: AnnouncementId) -> Result<Option<Announcement>, StoreError>;
    async fn list(&self) -> Result<Vec<Announcement>, StoreError>;
    async fn create(&self, announcement: NewAnnouncement) -> Result<Announcement, StoreError>;
    /// Replaces the content of `id`, keeping its author and creation date.
    async fn update(
        &self,
        id: AnnouncementId,
        announcement: NewAnnouncement,
    ) -> Result<Announcement, StoreError>;
    async fn delete(&self, id: AnnouncementId) -> Result<bool, StoreError>;
}

/// All stores the HTTP layer needs, shared as app data.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub leaves: Arc<dyn LeaveStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub announcements: Arc<dyn AnnouncementStore>,
}

impl Stores {
    pub fn memory() -> Self {
        Self::from_backend(Arc::new(memory::MemoryStore::new()))
    }

    pub fn mysql(pool: sqlx::MySqlPool) -> Self {
        Self::from_backend(Arc::new(mysql::MySqlStore::new(pool)))
    }

    fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserStore + LeaveStore + DocumentStore + AnnouncementStore + 'static,
    {
        Self {
            users: backend.clone(),
            leaves: backend.clone(),
            documents: backend.clone(),
            announcements: backend,
        }
    }
}
