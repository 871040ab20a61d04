use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::announcement::{Announcement, AnnouncementId, NewAnnouncement};
use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument};
use crate::model::leave_request::{
    LeaveFilter, LeaveId, LeavePatch, LeaveRequest, LeaveStatus, NewLeaveRequest,
};
use crate::model::user::{NewUser, User, UserId};
use crate::store::{AnnouncementStore, DocumentStore, LeaveStore, StoreError, UserStore};

#[derive(Default)]
struct Tables {
    next_id: u64,
    users: BTreeMap<UserId, User>,
    leaves: BTreeMap<LeaveId, LeaveRequest>,
    documents: BTreeMap<DocumentId, Document>,
    announcements: BTreeMap<AnnouncementId, Announcement>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local backend used by tests and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read().users.values().cloned().collect())
    }

    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        let mut tables = self.write();
        if let Some(taken) = tables.users.values().find(|u| {
            u.username.eq_ignore_ascii_case(&user.username)
                || u.email.eq_ignore_ascii_case(&user.email)
        }) {
            return Err(StoreError::Duplicate(format!("user {}", taken.username)));
        }

        let id = tables.next_id();
        let stored = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            department: user.department,
            is_active: true,
            created_at: now,
        };
        tables.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn usernames(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read().users.values().map(|u| u.username.clone()).collect())
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn get_by_id(&self, id: LeaveId) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.read().leaves.get(&id).cloned())
    }

    async fn list(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, StoreError> {
        let mut leaves: Vec<_> = self
            .read()
            .leaves
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        leaves.sort_by(|a, b| b.applied_date.cmp(&a.applied_date).then(b.id.cmp(&a.id)));
        Ok(leaves)
    }

    async fn create(&self, leave: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        let mut tables = self.write();
        let id = tables.next_id();
        let stored = leave.with_id(id);
        tables.leaves.insert(id, stored.clone());
        Ok(stored)
    }

    async fn patch(
        &self,
        id: LeaveId,
        expected: LeaveStatus,
        patch: LeavePatch,
    ) -> Result<LeaveRequest, StoreError> {
        let mut tables = self.write();
        let leave = tables.leaves.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "leave request",
            id,
        })?;
        if leave.status != expected {
            return Err(StoreError::Conflict {
                id,
                expected,
                found: leave.status,
            });
        }
        patch.apply_to(leave);
        Ok(leave.clone())
    }

    async fn delete(&self, id: LeaveId, expected: LeaveStatus) -> Result<bool, StoreError> {
        let mut tables = self.write();
        match tables.leaves.get(&id).map(|l| l.status) {
            None => Ok(false),
            Some(found) if found != expected => Err(StoreError::Conflict {
                id,
                expected,
                found,
            }),
            Some(_) => Ok(tables.leaves.remove(&id).is_some()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_by_id(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.read().documents.get(&id).cloned())
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .read()
            .documents
            .values()
            .filter(|d| search.is_none_or(|term| d.matches_search(term)))
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        owner_id: UserId,
        doc: NewDocument,
        now: DateTime<Utc>,
    ) -> Result<Document, StoreError> {
        let mut tables = self.write();
        let id = tables.next_id();
        let stored = Document {
            id,
            owner_id,
            is_public: doc.is_public,
            title: doc.title,
            description: doc.description,
            file_name: doc.file_name,
            file_size: doc.file_size,
            file_type: doc.file_type,
            download_url: doc.download_url,
            tags: doc.tags,
            uploaded_date: now,
        };
        tables.documents.insert(id, stored.clone());
        Ok(stored)
    }

    async fn patch(&self, id: DocumentId, patch: DocumentPatch) -> Result<Document, StoreError> {
        let mut tables = self.write();
        let doc = tables.documents.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "document",
            id,
        })?;
        patch.apply_to(doc);
        Ok(doc.clone())
    }

    async fn delete(&self, id: DocumentId) -> Result<bool, StoreError> {
        Ok(self.write().documents.remove(&id).is_some())
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn get_by_id(&self, id: AnnouncementId) -> Result<Option<Announcement>, StoreError> {
        Ok(self.read().announcements.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Announcement>, StoreError> {
        let mut all: Vec<_> = self.read().announcements.values().cloned().collect();
        all.sort_by(|a, b| b.created_date.cmp(&a.created_date).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    async fn create(&self, announcement: NewAnnouncement) -> Result<Announcement, StoreError> {
        let mut tables = self.write();
        let id = tables.next_id();
        let stored = announcement.with_id(id);
        tables.announcements.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        id: AnnouncementId,
        announcement: NewAnnouncement,
    ) -> Result<Announcement, StoreError> {
        let mut tables = self.write();
        let existing = tables
            .announcements
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "announcement",
                id,
            })?;
        let (owner_id, created_date) = (existing.owner_id, existing.created_date);
        *existing = NewAnnouncement {
            owner_id,
            created_date,
            ..announcement
        }
        .with_id(id);
        Ok(existing.clone())
    }

    async fn delete(&self, id: AnnouncementId) -> Result<bool, StoreError> {
        Ok(self.write().announcements.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::leave_request::{LeaveType, NewLeaveRequest};
    use crate::model::role::Role;
    use crate::model::user::NewUser;
    use crate::store::{StoreError, Stores};
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn new_leave(owner_id: u64) -> NewLeaveRequest {
        NewLeaveRequest {
            owner_id,
            leave_type: LeaveType::Sick,
            start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            reason: "flu".into(),
            status: LeaveStatus::Pending,
            applied_date: Utc::now(),
        }
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            role: Role::Employee,
            department: "Sales".into(),
        }
    }

    #[actix_web::test]
    async fn status_guarded_patch_detects_races() {
        let stores = Stores::memory();
        let leave = stores.leaves.create(new_leave(1)).await.unwrap();

        let approve = LeavePatch {
            status: Some(LeaveStatus::Approved),
            ..LeavePatch::default()
        };
        let reject = LeavePatch {
            status: Some(LeaveStatus::Rejected),
            ..LeavePatch::default()
        };

        let first = stores
            .leaves
            .patch(leave.id, LeaveStatus::Pending, approve)
            .await
            .unwrap();
        assert_eq!(first.status, LeaveStatus::Approved);

        let second = stores
            .leaves
            .patch(leave.id, LeaveStatus::Pending, reject)
            .await;
        assert!(matches!(
            second,
            Err(StoreError::Conflict {
                found: LeaveStatus::Approved,
                ..
            })
        ));
    }

    #[actix_web::test]
    async fn delete_refuses_a_request_decided_meanwhile() {
        let stores = Stores::memory();
        let leave = stores.leaves.create(new_leave(1)).await.unwrap();

        let approve = LeavePatch {
            status: Some(LeaveStatus::Approved),
            ..LeavePatch::default()
        };
        stores
            .leaves
            .patch(leave.id, LeaveStatus::Pending, approve)
            .await
            .unwrap();

        let result = stores.leaves.delete(leave.id, LeaveStatus::Pending).await;
        assert!(matches!(
            result,
            Err(StoreError::Conflict {
                expected: LeaveStatus::Pending,
                found: LeaveStatus::Approved,
                ..
            })
        ));
        assert!(stores.leaves.get_by_id(leave.id).await.unwrap().is_some());

        let removed = stores.leaves.delete(leave.id, LeaveStatus::Approved).await;
        assert!(matches!(removed, Ok(true)));
        let again = stores.leaves.delete(leave.id, LeaveStatus::Approved).await;
        assert!(matches!(again, Ok(false)));
    }

    #[actix_web::test]
    async fn patching_a_missing_leave_is_not_found() {
        let stores = Stores::memory();
        let result = stores
            .leaves
            .patch(42, LeaveStatus::Pending, LeavePatch::default())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { id: 42, .. })));
    }

    #[actix_web::test]
    async fn list_filters_by_owner() {
        let stores = Stores::memory();
        stores.leaves.create(new_leave(1)).await.unwrap();
        stores.leaves.create(new_leave(2)).await.unwrap();

        let filter = LeaveFilter {
            owner_id: Some(2),
            ..LeaveFilter::default()
        };
        let mine = stores.leaves.list(&filter).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].owner_id, 2);
    }

    #[actix_web::test]
    async fn usernames_and_emails_are_unique() {
        let stores = Stores::memory();
        stores
            .users
            .create(new_user("jdoe", "jdoe@company.com"), Utc::now())
            .await
            .unwrap();

        let clash = stores
            .users
            .create(new_user("JDoe", "other@company.com"), Utc::now())
            .await;
        assert!(matches!(clash, Err(StoreError::Duplicate(_))));

        let found = stores.users.find_by_username("JDOE").await.unwrap();
        assert!(found.is_some());
    }
}
