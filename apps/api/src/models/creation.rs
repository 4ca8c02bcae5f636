use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tag persisted in `creations.type`. Background and object removal are stored as `image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreationType {
    Article,
    BlogTitle,
    Image,
    ResumeReview,
}

impl CreationType {
    pub fn as_str(self) -> &'static str {
        match self {
            CreationType::Article => "article",
            CreationType::BlogTitle => "blog-title",
            CreationType::Image => "image",
            CreationType::ResumeReview => "resume-review",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreationRow {
    pub id: Uuid,
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub creation_type: String,
    pub publish: bool,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by a generation handler; the store assigns the rest.
#[derive(Debug, Clone)]
pub struct NewCreation {
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    pub creation_type: CreationType,
    pub publish: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_type_tags() {
        assert_eq!(CreationType::BlogTitle.as_str(), "blog-title");
        assert_eq!(CreationType::ResumeReview.as_str(), "resume-review");
        assert_eq!(
            serde_json::to_string(&CreationType::BlogTitle).unwrap(),
            "\"blog-title\""
        );
    }

    #[test]
    fn test_row_serializes_type_field() {
        let now = Utc::now();
        let row = CreationRow {
            id: Uuid::new_v4(),
            user_id: "user_1".into(),
            prompt: "p".into(),
            content: "c".into(),
            creation_type: CreationType::Article.as_str().into(),
            publish: false,
            likes: vec![],
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["type"], "article");
        assert!(value.get("creation_type").is_none());
    }
}
