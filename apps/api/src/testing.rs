//! In-memory stand-ins for every external collaborator, used by unit and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::auth::{AuthError, Identity, IdentityProvider, Plan};
use crate::creations::{toggle_membership, CreationStore, LikeOutcome};
use crate::imaging::{ImageError, ImageProvider};
use crate::llm_client::{LlmError, TextGenerator};
use crate::models::creation::{CreationRow, CreationType, NewCreation};
use crate::routes::build_router;
use crate::state::AppState;
use crate::upload::UploadedFile;
use crate::usage::{EntitlementError, EntitlementStore, UsageGate, FREE_USAGE_LIMIT};

// ────────────────────────────────────────────────────────────────────────────
// Entitlements
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryEntitlementStore {
    counters: Mutex<HashMap<String, u32>>,
    failing: bool,
    calls: AtomicUsize,
}

impl MemoryEntitlementStore {
    /// Every operation errors, as if the store were unreachable.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn set(&self, user_id: &str, usage: u32) {
        self.counters
            .lock()
            .unwrap()
            .insert(user_id.to_string(), usage);
    }

    pub fn get(&self, user_id: &str) -> Option<u32> {
        self.counters.lock().unwrap().get(user_id).copied()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), EntitlementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(EntitlementError::InvalidCounter(-1));
        }
        Ok(())
    }
}

#[async_trait]
impl EntitlementStore for MemoryEntitlementStore {
    async fn free_usage(&self, user_id: &str) -> Result<Option<u32>, EntitlementError> {
        self.enter()?;
        Ok(self.get(user_id))
    }

    async fn initialize_free_usage(&self, user_id: &str) -> Result<(), EntitlementError> {
        self.enter()?;
        self.counters
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_insert(0);
        Ok(())
    }

    async fn reserve_free_usage(
        &self,
        user_id: &str,
        ceiling: u32,
    ) -> Result<Option<u32>, EntitlementError> {
        self.enter()?;
        let mut counters = self.counters.lock().unwrap();
        let counter = counters.entry(user_id.to_string()).or_insert(0);
        if *counter >= ceiling {
            return Ok(None);
        }
        *counter += 1;
        Ok(Some(*counter))
    }

    async fn release_free_usage(&self, user_id: &str) -> Result<(), EntitlementError> {
        self.enter()?;
        if let Some(counter) = self.counters.lock().unwrap().get_mut(user_id) {
            *counter = counter.saturating_sub(1);
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Creations
// ────────────────────────────────────────────────────────────────────────────

pub struct MemoryCreationStore {
    rows: Mutex<Vec<CreationRow>>,
    epoch: DateTime<Utc>,
}

impl Default for MemoryCreationStore {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            epoch: Utc::now(),
        }
    }
}

impl MemoryCreationStore {
    /// Rows in insertion order.
    pub fn all(&self) -> Vec<CreationRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, user_id: &str, creation_type: CreationType, publish: bool) -> CreationRow {
        self.push(NewCreation {
            user_id: user_id.to_string(),
            prompt: "seeded".to_string(),
            content: "seeded content".to_string(),
            creation_type,
            publish,
        })
    }

    /// Each row is one second newer than the previous, so ordering is deterministic.
    fn push(&self, creation: NewCreation) -> CreationRow {
        let mut rows = self.rows.lock().unwrap();
        let created_at = self.epoch + Duration::seconds(rows.len() as i64);
        let row = CreationRow {
            id: Uuid::new_v4(),
            user_id: creation.user_id,
            prompt: creation.prompt,
            content: creation.content,
            creation_type: creation.creation_type.as_str().to_string(),
            publish: creation.publish,
            likes: Vec::new(),
            created_at,
            updated_at: created_at,
        };
        rows.push(row.clone());
        row
    }

    fn newest_first(mut rows: Vec<CreationRow>) -> Vec<CreationRow> {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl CreationStore for MemoryCreationStore {
    async fn insert(&self, creation: NewCreation) -> Result<CreationRow, sqlx::Error> {
        Ok(self.push(creation))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<CreationRow>, sqlx::Error> {
        let rows = self
            .all()
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        Ok(Self::newest_first(rows))
    }

    async fn list_published(&self) -> Result<Vec<CreationRow>, sqlx::Error> {
        let rows = self.all().into_iter().filter(|r| r.publish).collect();
        Ok(Self::newest_first(rows))
    }

    async fn toggle_like(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<LikeOutcome>, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        let outcome = toggle_membership(&mut row.likes, user_id);
        row.updated_at = Utc::now();
        Ok(Some(outcome))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Identity
// ────────────────────────────────────────────────────────────────────────────

/// Accepts tokens of the form `free:<user_id>` or `premium:<user_id>`.
pub struct StaticIdentityProvider;

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let (plan, user_id) = match token.split_once(':') {
            Some(("free", id)) => (Plan::Free, id),
            Some(("premium", id)) => (Plan::Premium, id),
            _ => return Err(AuthError::InvalidToken(token.to_string())),
        };
        Ok(Identity {
            user_id: user_id.to_string(),
            plan,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Providers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubTextGenerator {
    calls: Mutex<Vec<(String, u32)>>,
    fail_next: AtomicBool,
}

impl StubTextGenerator {
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TextGenerator for StubTextGenerator {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), max_tokens));
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(LlmError::Api {
                status: 503,
                message: "model overloaded".to_string(),
            });
        }
        Ok("generated text".to_string())
    }
}

#[derive(Default)]
pub struct StubImageProvider {
    calls: AtomicUsize,
    removed_objects: Mutex<Vec<String>>,
    reject_next: AtomicBool,
}

impl StubImageProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn removed_objects(&self) -> Vec<String> {
        self.removed_objects.lock().unwrap().clone()
    }

    pub fn reject_next(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    fn enter(&self) -> Result<(), ImageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(ImageError::Rejected {
                status: 400,
                message: "Invalid transformation".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ImageProvider for StubImageProvider {
    async fn generate(&self, _prompt: &str) -> Result<String, ImageError> {
        self.enter()?;
        Ok("https://images.test/generated.png".to_string())
    }

    async fn remove_background(&self, _image: &UploadedFile) -> Result<String, ImageError> {
        self.enter()?;
        Ok("https://images.test/e_background_removal/upload.png".to_string())
    }

    async fn remove_object(
        &self,
        _image: &UploadedFile,
        object: &str,
    ) -> Result<String, ImageError> {
        self.enter()?;
        self.removed_objects.lock().unwrap().push(object.to_string());
        Ok(format!(
            "https://images.test/e_gen_remove:prompt_{object}/upload.png"
        ))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Harness
// ────────────────────────────────────────────────────────────────────────────

pub struct TestHarness {
    pub state: AppState,
    pub entitlements: Arc<MemoryEntitlementStore>,
    pub creations: Arc<MemoryCreationStore>,
    pub text: Arc<StubTextGenerator>,
    pub images: Arc<StubImageProvider>,
}

impl TestHarness {
    pub fn new() -> Self {
        let entitlements = Arc::new(MemoryEntitlementStore::default());
        let creations = Arc::new(MemoryCreationStore::default());
        let text = Arc::new(StubTextGenerator::default());
        let images = Arc::new(StubImageProvider::default());

        let state = AppState {
            identity: Arc::new(StaticIdentityProvider),
            usage: UsageGate::new(entitlements.clone(), FREE_USAGE_LIMIT),
            creations: creations.clone(),
            text: text.clone(),
            images: images.clone(),
        };

        Self {
            state,
            entitlements,
            creations,
            text,
            images,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn png(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: Some(name.to_string()),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\nfake"),
        }
    }
}
