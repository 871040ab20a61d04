use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures_util::TryStreamExt;
use sqlx::{FromRow, MySqlPool};

use crate::model::announcement::{
    Announcement, AnnouncementId, AnnouncementKind, NewAnnouncement,
};
use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument};
use crate::model::leave_request::{
    LeaveFilter, LeaveId, LeavePatch, LeaveRequest, LeaveStatus, NewLeaveRequest,
};
use crate::model::user::{NewUser, User, UserId};
use crate::store::{AnnouncementStore, DocumentStore, LeaveStore, StoreError, UserStore};
use crate::utils::db_utils::{SqlUpdate, SqlValue};

/// MySQL backend. Schema lives in `schema.sql`.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn parse<T: std::str::FromStr>(column: &str, raw: &str) -> Result<T, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("{} = {:?}", column, raw)))
}

fn is_duplicate(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23000"))
}

/* =========================
Users
========================= */

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, \
                            department, is_active, created_at";

#[derive(FromRow)]
struct UserRow {
    id: u64,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role: String,
    department: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            role: parse("role", &row.role)?,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            department: row.department,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users
                (username, email, password_hash, first_name, last_name, role, department, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, TRUE, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_ref())
        .bind(&user.department)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_duplicate(&e) {
                StoreError::Duplicate(format!("user {}", user.username))
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(User {
            id: result.last_insert_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            department: user.department,
            is_active: true,
            created_at: now,
        })
    }

    async fn usernames(&self) -> Result<Vec<String>, StoreError> {
        let mut stream = sqlx::query_as::<_, (String,)>("SELECT username FROM users").fetch(&self.pool);
        let mut names = Vec::new();
        while let Some((username,)) = stream.try_next().await? {
            names.push(username);
        }
        Ok(names)
    }
}

/* =========================
Leave requests
========================= */

const LEAVE_COLUMNS: &str = "id, owner_id, leave_type, start_date, end_date, reason, status, \
                             applied_date, approved_by, approved_date, comments";

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    owner_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    status: String,
    applied_date: DateTime<Utc>,
    approved_by: Option<u64>,
    approved_date: Option<DateTime<Utc>>,
    comments: Option<String>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            owner_id: row.owner_id,
            leave_type: parse("leave_type", &row.leave_type)?,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status: parse("status", &row.status)?,
            applied_date: row.applied_date,
            approved_by: row.approved_by,
            approved_date: row.approved_date,
            comments: row.comments,
        })
    }
}

impl MySqlStore {
    async fn fetch_leave(&self, id: LeaveId) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {} FROM leave_requests WHERE id = ?", LEAVE_COLUMNS);
        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }
}

#[async_trait]
impl LeaveStore for MySqlStore {
    async fn get_by_id(&self, id: LeaveId) -> Result<Option<LeaveRequest>, StoreError> {
        self.fetch_leave(id).await
    }

    async fn list(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(owner_id) = filter.owner_id {
            where_sql.push_str(" AND owner_id = ?");
            args.push(owner_id.into());
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(status.as_ref().into());
        }
        if let Some(leave_type) = filter.leave_type {
            where_sql.push_str(" AND leave_type = ?");
            args.push(leave_type.as_ref().into());
        }
        if let Some(term) = filter.search.as_deref() {
            where_sql.push_str(" AND LOWER(reason) LIKE ?");
            args.push(format!("%{}%", term.to_lowercase()).into());
        }

        let sql = format!(
            "SELECT {} FROM leave_requests{} ORDER BY applied_date DESC, id DESC",
            LEAVE_COLUMNS, where_sql
        );
        let mut query = sqlx::query_as::<_, LeaveRow>(&sql);
        for arg in args {
            query = match arg {
                SqlValue::U64(v) => query.bind(v),
                SqlValue::String(v) => query.bind(v),
                other => {
                    return Err(StoreError::Corrupt(format!(
                        "unsupported filter value {:?}",
                        other
                    )));
                }
            };
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect()
    }

    async fn create(&self, leave: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (owner_id, leave_type, start_date, end_date, reason, status, applied_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(leave.owner_id)
        .bind(leave.leave_type.as_ref())
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(&leave.reason)
        .bind(leave.status.as_ref())
        .bind(leave.applied_date)
        .execute(&self.pool)
        .await?;

        Ok(leave.with_id(result.last_insert_id()))
    }

    async fn patch(
        &self,
        id: LeaveId,
        expected: LeaveStatus,
        patch: LeavePatch,
    ) -> Result<LeaveRequest, StoreError> {
        let update = SqlUpdate::new("leave_requests")
            .set_some("leave_type", patch.leave_type.map(|t| t.as_ref().to_string()))
            .set_some("start_date", patch.start_date)
            .set_some("end_date", patch.end_date)
            .set_some("reason", patch.reason)
            .set_some("status", patch.status.map(|s| s.as_ref().to_string()))
            .set_some("approved_by", patch.approved_by)
            .set_some("approved_date", patch.approved_date)
            .set_some("comments", patch.comments)
            .where_eq("id", id)
            .where_eq("status", expected.as_ref());

        let affected = if update.is_empty() {
            0
        } else {
            update.execute(&self.pool).await?
        };

        // Zero rows means missing, raced, or a no-op write; the reread tells
        // them apart.
        let current = self.fetch_leave(id).await?.ok_or(StoreError::NotFound {
            entity: "leave request",
            id,
        })?;
        if affected == 0 && current.status != expected {
            return Err(StoreError::Conflict {
                id,
                expected,
                found: current.status,
            });
        }
        Ok(current)
    }

    async fn delete(&self, id: LeaveId, expected: LeaveStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM leave_requests WHERE id = ? AND status = ?")
            .bind(id)
            .bind(expected.as_ref())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }

        match self.fetch_leave(id).await? {
            Some(current) if current.status != expected => Err(StoreError::Conflict {
                id,
                expected,
                found: current.status,
            }),
            _ => Ok(false),
        }
    }
}

/* =========================
Documents
========================= */

const DOCUMENT_COLUMNS: &str = "id, owner_id, is_public, title, description, file_name, file_size, \
                                file_type, download_url, tags, uploaded_date";

#[derive(FromRow)]
struct DocumentRow {
    id: u64,
    owner_id: u64,
    is_public: bool,
    title: String,
    description: String,
    file_name: String,
    file_size: u64,
    file_type: String,
    download_url: String,
    tags: String,
    uploaded_date: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let tags = serde_json::from_str(&row.tags)
            .map_err(|e| StoreError::Corrupt(format!("tags of document {}: {}", row.id, e)))?;
        Ok(Document {
            id: row.id,
            owner_id: row.owner_id,
            is_public: row.is_public,
            title: row.title,
            description: row.description,
            file_name: row.file_name,
            file_size: row.file_size,
            file_type: row.file_type,
            download_url: row.download_url,
            tags,
            uploaded_date: row.uploaded_date,
        })
    }
}

fn encode_tags(tags: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(tags).map_err(|e| StoreError::Corrupt(format!("tags: {}", e)))
}

impl MySqlStore {
    async fn fetch_document(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
        sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Document::try_from)
            .transpose()
    }
}

#[async_trait]
impl DocumentStore for MySqlStore {
    async fn get_by_id(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        self.fetch_document(id).await
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Document>, StoreError> {
        let rows = match search {
            Some(term) => {
                let sql = format!(
                    "SELECT {} FROM documents \
                     WHERE LOWER(title) LIKE ? OR LOWER(description) LIKE ? OR LOWER(tags) LIKE ? \
                     ORDER BY uploaded_date DESC",
                    DOCUMENT_COLUMNS
                );
                let pattern = format!("%{}%", term.to_lowercase());
                sqlx::query_as::<_, DocumentRow>(&sql)
                    .bind(&pattern)
                    .bind(&pattern)
                    .bind(&pattern)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM documents ORDER BY uploaded_date DESC",
                    DOCUMENT_COLUMNS
                );
                sqlx::query_as::<_, DocumentRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(Document::try_from).collect()
    }

    async fn create(
        &self,
        owner_id: UserId,
        doc: NewDocument,
        now: DateTime<Utc>,
    ) -> Result<Document, StoreError> {
        let tags = encode_tags(&doc.tags)?;
        let result = sqlx::query(
            r#"
            INSERT INTO documents
                (owner_id, is_public, title, description, file_name, file_size, file_type, download_url, tags, uploaded_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner_id)
        .bind(doc.is_public)
        .bind(&doc.title)
        .bind(&doc.description)
        .bind(&doc.file_name)
        .bind(doc.file_size)
        .bind(&doc.file_type)
        .bind(&doc.download_url)
        .bind(tags)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Document {
            id: result.last_insert_id(),
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
        })
    }

    async fn patch(&self, id: DocumentId, patch: DocumentPatch) -> Result<Document, StoreError> {
        let tags = patch.tags.as_deref().map(encode_tags).transpose()?;
        let update = SqlUpdate::new("documents")
            .set_some("title", patch.title)
            .set_some("description", patch.description)
            .set_some("tags", tags)
            .set_some("is_public", patch.is_public)
            .where_eq("id", id);
        if !update.is_empty() {
            update.execute(&self.pool).await?;
        }

        self.fetch_document(id).await?.ok_or(StoreError::NotFound {
            entity: "document",
            id,
        })
    }

    async fn delete(&self, id: DocumentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/* =========================
Announcements
========================= */

const ANNOUNCEMENT_COLUMNS: &str = "id, owner_id, target_audience, is_active, title, content, \
                                    priority, is_event, event_date, start_time, end_time, \
                                    location, created_date";

#[derive(FromRow)]
struct AnnouncementRow {
    id: u64,
    owner_id: u64,
    target_audience: String,
    is_active: bool,
    title: String,
    content: String,
    priority: String,
    is_event: bool,
    event_date: Option<NaiveDate>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    location: Option<String>,
    created_date: DateTime<Utc>,
}

impl TryFrom<AnnouncementRow> for Announcement {
    type Error = StoreError;

    fn try_from(row: AnnouncementRow) -> Result<Self, Self::Error> {
        let kind = if row.is_event {
            match (row.event_date, row.start_time, row.end_time, row.location) {
                (Some(event_date), Some(start_time), Some(end_time), Some(location)) => {
                    AnnouncementKind::Event {
                        event_date,
                        start_time,
                        end_time,
                        location,
                    }
                }
                _ => {
                    return Err(StoreError::Corrupt(format!(
                        "announcement {} is an event without a schedule",
                        row.id
                    )));
                }
            }
        } else {
            AnnouncementKind::Plain
        };

        Ok(Announcement {
            id: row.id,
            owner_id: row.owner_id,
            target_audience: parse("target_audience", &row.target_audience)?,
            is_active: row.is_active,
            title: row.title,
            content: row.content,
            priority: parse("priority", &row.priority)?,
            kind,
            created_date: row.created_date,
        })
    }
}

/// Event columns of an announcement kind, all NULL for plain notices.
fn event_columns(
    kind: &AnnouncementKind,
) -> (Option<NaiveDate>, Option<NaiveTime>, Option<NaiveTime>, Option<String>) {
    match kind {
        AnnouncementKind::Plain => (None, None, None, None),
        AnnouncementKind::Event {
            event_date,
            start_time,
            end_time,
            location,
        } => (
            Some(*event_date),
            Some(*start_time),
            Some(*end_time),
            Some(location.clone()),
        ),
    }
}

impl MySqlStore {
    async fn fetch_announcement(
        &self,
        id: AnnouncementId,
    ) -> Result<Option<Announcement>, StoreError> {
        let sql = format!("SELECT {} FROM announcements WHERE id = ?", ANNOUNCEMENT_COLUMNS);
        sqlx::query_as::<_, AnnouncementRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Announcement::try_from)
            .transpose()
    }
}

#[async_trait]
impl AnnouncementStore for MySqlStore {
    async fn get_by_id(&self, id: AnnouncementId) -> Result<Option<Announcement>, StoreError> {
        self.fetch_announcement(id).await
    }

    async fn list(&self) -> Result<Vec<Announcement>, StoreError> {
        let sql = format!(
            "SELECT {} FROM announcements ORDER BY created_date DESC, id DESC",
            ANNOUNCEMENT_COLUMNS
        );
        sqlx::query_as::<_, AnnouncementRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Announcement::try_from)
            .collect()
    }

    async fn create(&self, announcement: NewAnnouncement) -> Result<Announcement, StoreError> {
        let (event_date, start_time, end_time, location) = event_columns(&announcement.kind);
        let result = sqlx::query(
            r#"
            INSERT INTO announcements
                (owner_id, target_audience, is_active, title, content, priority,
                 is_event, event_date, start_time, end_time, location, created_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(announcement.owner_id)
        .bind(announcement.target_audience.as_ref())
        .bind(announcement.is_active)
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(announcement.priority.as_ref())
        .bind(announcement.kind.is_event())
        .bind(event_date)
        .bind(start_time)
        .bind(end_time)
        .bind(location)
        .bind(announcement.created_date)
        .execute(&self.pool)
        .await?;

        Ok(announcement.with_id(result.last_insert_id()))
    }

    async fn update(
        &self,
        id: AnnouncementId,
        announcement: NewAnnouncement,
    ) -> Result<Announcement, StoreError> {
        let (event_date, start_time, end_time, location) = event_columns(&announcement.kind);
        SqlUpdate::new("announcements")
            .set("target_audience", announcement.target_audience.as_ref())
            .set("is_active", announcement.is_active)
            .set("title", announcement.title)
            .set("content", announcement.content)
            .set("priority", announcement.priority.as_ref())
            .set("is_event", announcement.kind.is_event())
            .set("event_date", event_date)
            .set("start_time", start_time)
            .set("end_time", end_time)
            .set("location", location)
            .where_eq("id", id)
            .execute(&self.pool)
            .await?;

        self.fetch_announcement(id).await?.ok_or(StoreError::NotFound {
            entity: "announcement",
            id,
        })
    }

    async fn delete(&self, id: AnnouncementId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
