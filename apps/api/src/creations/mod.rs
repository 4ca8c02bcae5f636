//! Creation Records: persistence, public feed, and the like toggle.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::creation::{CreationRow, NewCreation};

pub mod handlers;
pub mod postgres;

pub use postgres::PgCreationStore;

/// Result of flipping a user's membership in a creation's `likes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    Unliked,
}

impl LikeOutcome {
    pub fn message(self) -> &'static str {
        match self {
            LikeOutcome::Liked => "Creation liked",
            LikeOutcome::Unliked => "Creation unliked",
        }
    }
}

/// Carried in `AppState` as `Arc<dyn CreationStore>`.
#[async_trait]
pub trait CreationStore: Send + Sync {
    async fn insert(&self, creation: NewCreation) -> Result<CreationRow, sqlx::Error>;

    /// The user's creations, newest first.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<CreationRow>, sqlx::Error>;

    /// Every creation with `publish = true`, newest first.
    async fn list_published(&self) -> Result<Vec<CreationRow>, sqlx::Error>;

    /// Atomically inverts `user_id`'s membership in the creation's likes and
    /// refreshes `updated_at`. `None` if the creation does not exist.
    async fn toggle_like(&self, id: Uuid, user_id: &str)
        -> Result<Option<LikeOutcome>, sqlx::Error>;
}

/// Set semantics over the stored array: removes every occurrence or appends once.
/// Mirrors the single-statement toggle in `postgres.rs` for the in-memory store.
#[cfg(test)]
pub fn toggle_membership(likes: &mut Vec<String>, user_id: &str) -> LikeOutcome {
    if likes.iter().any(|id| id == user_id) {
        likes.retain(|id| id != user_id);
        LikeOutcome::Unliked
    } else {
        likes.push(user_id.to_string());
        LikeOutcome::Liked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut likes = vec!["other".to_string()];

        assert_eq!(toggle_membership(&mut likes, "u1"), LikeOutcome::Liked);
        assert_eq!(likes, vec!["other", "u1"]);

        assert_eq!(toggle_membership(&mut likes, "u1"), LikeOutcome::Unliked);
        assert_eq!(likes, vec!["other"]);

        assert_eq!(toggle_membership(&mut likes, "u1"), LikeOutcome::Liked);
        assert_eq!(likes.iter().filter(|id| *id == "u1").count(), 1);
    }

    #[test]
    fn test_toggle_collapses_legacy_duplicates() {
        let mut likes = vec!["u1".to_string(), "u2".to_string(), "u1".to_string()];
        assert_eq!(toggle_membership(&mut likes, "u1"), LikeOutcome::Unliked);
        assert_eq!(likes, vec!["u2"]);
    }

    #[test]
    fn test_messages_are_distinct() {
        assert_ne!(LikeOutcome::Liked.message(), LikeOutcome::Unliked.message());
    }
}
