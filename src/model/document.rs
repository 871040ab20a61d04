use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::user::UserId;

pub type DocumentId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Document {
    #[schema(example = 1)]
    pub id: DocumentId,
    /// Uploader of the document.
    #[schema(example = 2)]
    pub owner_id: UserId,
    #[schema(example = true)]
    pub is_public: bool,
    #[schema(example = "Employee Handbook 2026")]
    pub title: String,
    #[schema(example = "Company policies and procedures")]
    pub description: String,
    #[schema(example = "employee-handbook-2026.pdf")]
    pub file_name: String,
    #[schema(example = 2048576)]
    pub file_size: u64,
    #[schema(example = "application/pdf")]
    pub file_type: String,
    #[schema(example = "/assets/documents/employee-handbook-2026.pdf")]
    pub download_url: String,
    pub tags: Vec<String>,
    #[schema(format = "date-time", value_type = String)]
    pub uploaded_date: DateTime<Utc>,
}

impl Document {
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&term))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Upload payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewDocument {
    #[schema(example = "IT Security Guidelines")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "it-security-guidelines.pdf")]
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[schema(example = "application/pdf")]
    pub file_type: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.is_public.is_none()
    }

    pub fn apply_to(&self, doc: &mut Document) {
        if let Some(v) = &self.title {
            doc.title = v.clone();
        }
        if let Some(v) = &self.description {
            doc.description = v.clone();
        }
        if let Some(v) = &self.tags {
            doc.tags = v.clone();
        }
        if let Some(v) = self.is_public {
            doc.is_public = v;
        }
    }
}

/// Human readable size, e.g. `1.5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
