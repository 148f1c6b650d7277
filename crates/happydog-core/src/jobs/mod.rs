// ── Job Orchestrator (C8) ───────────────────────────────────────────────
// Cartoon-generation job lifecycle, cooperative cancellation, bounded
// worker pool (spec.md §4.8). Worker pool sizing and the abort-handle
// bookkeeping are grounded in the teacher's `EngineState::run_semaphore`
// and `EngineState::active_runs` (`engine/state.rs`); unlike the teacher's
// `engine_chat_abort`, the registry here is introspection-only — this
// system's cancellation is purely cooperative (spec.md §5), so no code
// path ever calls `.abort()` on a held handle.

mod circuit;
mod model;

pub use circuit::CircuitBreaker;
pub use model::{testing as fakes, ImageAnalysisClient, ImageGenerationClient};

use crate::clock;
use crate::docstore::DocStore;
use crate::error::{CoreError, CoreResult};
use crate::model::{CartoonJob, JobStatus, NotificationType};
use crate::notifications::NotificationService;
use crate::objectstore::ObjectStore;
use crate::social::SocialGraphService;
use parking_lot::Mutex as PLMutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;

const MAX_USER_TEXT_CHARS: usize = 500;
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Builds the fixed cartoon prompt per spec.md §6.5.
fn build_prompt(analysis: &str, user_text: Option<&str>) -> String {
    let theme = match user_text {
        Some(text) if !text.is_empty() => format!("User's story theme: {text}"),
        _ => "Create a heartwarming daily adventure story.".to_string(),
    };
    format!(
        "Create a 4-panel comic strip in a single image based on this description: {analysis}\n\n\
         Requirements:\n\
         - 2x2 grid layout\n\
         - sequential story\n\
         - cute, family-friendly cartoon style\n\
         - consistent characters/setting\n\
         - bright cheerful colors\n\
         {theme}"
    )
}

pub struct JobOrchestrator {
    store: Arc<DocStore>,
    objects: Arc<ObjectStore>,
    social: Arc<SocialGraphService>,
    notifications: Arc<NotificationService>,
    analysis_client: Arc<dyn ImageAnalysisClient>,
    generation_client: Arc<dyn ImageGenerationClient>,
    circuit: Arc<CircuitBreaker>,
    semaphore: Arc<Semaphore>,
    /// Bookkeeping only — see module doc. Never `.abort()`-ed.
    active_runs: Arc<PLMutex<HashMap<String, AbortHandle>>>,
    queue_timeout: Duration,
    transaction_max_retries: u32,
    transaction_backoff_base_ms: u64,
    transaction_backoff_cap_ms: u64,
}

impl JobOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<DocStore>,
        objects: Arc<ObjectStore>,
        social: Arc<SocialGraphService>,
        notifications: Arc<NotificationService>,
        analysis_client: Arc<dyn ImageAnalysisClient>,
        generation_client: Arc<dyn ImageGenerationClient>,
        config: &crate::config::Config,
    ) -> Self {
        JobOrchestrator {
            store,
            objects,
            social,
            notifications,
            analysis_client,
            generation_client,
            circuit: Arc::new(CircuitBreaker::new(
                config.circuit_failure_threshold,
                config.circuit_window_secs,
                config.circuit_open_secs,
            )),
            semaphore: Arc::new(Semaphore::new(config.job_pool_size)),
            active_runs: Arc::new(PLMutex::new(HashMap::new())),
            queue_timeout: Duration::from_secs(config.job_queue_timeout_secs),
            transaction_max_retries: config.transaction_max_retries,
            transaction_backoff_base_ms: config.transaction_backoff_base_ms,
            transaction_backoff_cap_ms: config.transaction_backoff_cap_ms,
        }
    }

    pub fn active_job_count(&self) -> usize {
        self.active_runs.lock().len()
    }

    /// Submit a cartoon job from an already-uploaded `CartoonSources` key.
    /// Blocks up to `job_queue_timeout_secs` for a free worker-pool slot; on
    /// timeout returns `Overloaded` WITHOUT writing a job document, so a
    /// rejected submission never leaves an orphaned PROCESSING row.
    pub async fn submit(
        self: &Arc<Self>,
        user_id: &str,
        source_key: &str,
        user_text: Option<String>,
    ) -> CoreResult<CartoonJob> {
        if let Some(text) = &user_text {
            if text.chars().count() > MAX_USER_TEXT_CHARS {
                return Err(CoreError::validation(format!(
                    "user_text must be at most {MAX_USER_TEXT_CHARS} characters"
                )));
            }
        }
        if !self.objects.exists(source_key) {
            return Err(CoreError::not_found(format!("uploaded object not found: {source_key}")));
        }

        let permit = match tokio::time::timeout(self.queue_timeout, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(CoreError::Other("job worker pool semaphore closed".into())),
            Err(_) => {
                return Err(CoreError::Overloaded(
                    "cartoon job worker pool is at capacity, try again later".into(),
                ))
            }
        };

        let original_image_url = self.objects.make_public(source_key)?;
        let now = clock::now();
        let job = CartoonJob {
            job_id: clock::new_uuid(),
            user_id: user_id.to_string(),
            status: JobStatus::Processing,
            original_image_url,
            user_text,
            result_image_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.store.set("cartoon_jobs", &job.job_id, &now.to_rfc3339(), &job)?;

        let orchestrator = self.clone();
        let job_id = job.job_id.clone();
        let join_handle = tokio::spawn(async move {
            orchestrator.run_worker(job_id.clone()).await;
            orchestrator.active_runs.lock().remove(&job_id);
            drop(permit);
        });
        self.active_runs.lock().insert(job.job_id.clone(), join_handle.abort_handle());

        Ok(job)
    }

    /// `NotFound` (never `Forbidden`) for a non-owner caller — existence is
    /// not disclosed (spec.md §4.8 "Visibility").
    pub fn get_job(&self, job_id: &str, caller_user_id: &str) -> CoreResult<CartoonJob> {
        let job: CartoonJob = self
            .store
            .get("cartoon_jobs", job_id)?
            .ok_or_else(|| CoreError::not_found(format!("job {job_id} not found")))?;
        if job.user_id != caller_user_id {
            return Err(CoreError::not_found(format!("job {job_id} not found")));
        }
        Ok(job)
    }

    /// Ownership mismatch is `Forbidden` here (unlike `get_job`) and a
    /// non-PROCESSING current state is `Conflict` — grounded in the
    /// original `cancel_cartoon_job` route's
    /// `PermissionError→403` / `ValueError→409` / `FileNotFoundError→404`
    /// mapping.
    pub fn cancel(&self, job_id: &str, caller_user_id: &str) -> CoreResult<CartoonJob> {
        self.store.transaction(
            self.transaction_max_retries,
            self.transaction_backoff_base_ms,
            self.transaction_backoff_cap_ms,
            |tx| {
                let mut job: CartoonJob = tx
                    .get("cartoon_jobs", job_id)?
                    .ok_or_else(|| CoreError::not_found(format!("job {job_id} not found")))?;
                if job.user_id != caller_user_id {
                    return Err(CoreError::forbidden("caller does not own this job"));
                }
                if job.status != JobStatus::Processing {
                    return Err(CoreError::conflict(format!(
                        "job {job_id} is not PROCESSING (current state: {:?})",
                        job.status
                    )));
                }
                job.status = JobStatus::Canceling;
                job.updated_at = clock::now();
                tx.set("cartoon_jobs", job_id, &job.created_at.to_rfc3339(), &job)?;
                Ok(job)
            },
        )
    }

    /// Conditional transition: does nothing and returns `Ok(None)` if the
    /// job is already terminal (spec.md's "CANCELING from a terminal state
    /// is a no-op returning the current state").
    fn finalize(&self, job_id: &str, mutate: impl FnOnce(&mut CartoonJob)) -> CoreResult<Option<CartoonJob>> {
        self.store.transaction(
            self.transaction_max_retries,
            self.transaction_backoff_base_ms,
            self.transaction_backoff_cap_ms,
            |tx| {
                let mut job: CartoonJob = match tx.get("cartoon_jobs", job_id)? {
                    Some(job) => job,
                    None => return Ok(None),
                };
                if job.status.is_terminal() {
                    return Ok(None);
                }
                mutate(&mut job);
                job.updated_at = clock::now();
                tx.set("cartoon_jobs", job_id, &job.created_at.to_rfc3339(), &job)?;
                Ok(Some(job))
            },
        )
    }

    fn finalize_failed(&self, job_id: &str, user_id: &str, reason: &str) {
        let message = truncate_chars(reason, MAX_ERROR_MESSAGE_CHARS);
        let result = self.finalize(job_id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(message.clone());
        });
        match result {
            Ok(Some(_)) => {
                self.notifications.notify_from_system(
                    user_id,
                    NotificationType::CartoonFailed,
                    job_id,
                    Some(message),
                );
            }
            Ok(None) => {}
            Err(e) => log::warn!("[jobs] failed to persist FAILED transition for {job_id}: {e}"),
        }
    }

    /// Runs the full pipeline for one job: two cooperative-cancellation
    /// checkpoints, analysis, prompt composition, generation, and the
    /// success/failure fan-out (spec.md §4.8 "Execution").
    async fn run_worker(&self, job_id: String) {
        let job: CartoonJob = match self.store.get("cartoon_jobs", &job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                log::warn!("[jobs] worker picked up missing job {job_id}");
                return;
            }
            Err(e) => {
                log::warn!("[jobs] failed to read job {job_id} at worker start: {e}");
                return;
            }
        };

        // Checkpoint 1 — before image analysis.
        if job.status == JobStatus::Canceling {
            self.finalize_failed(&job_id, &job.user_id, "canceled by user");
            return;
        }

        let source_key = self.objects.key_from_public_url(&job.original_image_url).map(str::to_string);
        let image_bytes = match source_key.as_deref().map(|key| self.objects.download(key)) {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                self.finalize_failed(&job_id, &job.user_id, &e.to_string());
                return;
            }
            None => {
                self.finalize_failed(&job_id, &job.user_id, "source image key could not be resolved");
                return;
            }
        };

        let analysis = match self.analysis_client.analyze(&image_bytes).await {
            Ok(description) => description,
            Err(e) => {
                self.finalize_failed(&job_id, &job.user_id, &e.to_string());
                return;
            }
        };

        // Checkpoint 2 — between analysis and generation.
        let current_status = match self.store.get::<CartoonJob>("cartoon_jobs", &job_id) {
            Ok(Some(job)) => job.status,
            _ => job.status,
        };
        if current_status == JobStatus::Canceling {
            self.finalize_failed(&job_id, &job.user_id, "canceled by user");
            return;
        }

        let prompt = build_prompt(&analysis, job.user_text.as_deref());

        if !self.circuit.allow_request() {
            self.finalize_failed(&job_id, &job.user_id, "image generation temporarily unavailable, please retry shortly");
            return;
        }

        let generated_url = match self.generation_client.generate(&prompt).await {
            Ok(url) => {
                self.circuit.record_success();
                url
            }
            Err(e) => {
                self.circuit.record_failure();
                self.finalize_failed(&job_id, &job.user_id, &e.to_string());
                return;
            }
        };

        let caption = match job.user_text.as_deref() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => "My cartoon creation!".to_string(),
        };
        let post = match self.social.create_post_with_image_urls(&job.user_id, &caption, &[generated_url.clone()]) {
            Ok(post) => post,
            Err(e) => {
                self.finalize_failed(&job_id, &job.user_id, &e.to_string());
                return;
            }
        };

        let result = self.finalize(&job_id, |job| {
            job.status = JobStatus::Completed;
            job.result_image_url = Some(generated_url.clone());
        });
        match result {
            Ok(Some(_)) => {
                self.notifications.notify_from_system(
                    &job.user_id,
                    NotificationType::CartoonSuccess,
                    &job_id,
                    Some(post.post_id.clone()),
                );
            }
            Ok(None) => {}
            Err(e) => log::warn!("[jobs] failed to persist COMPLETED transition for {job_id}: {e}"),
        }
    }
}
