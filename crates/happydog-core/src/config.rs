// ── Core configuration ──────────────────────────────────────────────────
// Typed tunables, loaded from environment variables with sane defaults.
// Mirrors the teacher's `EngineConfig` (load-with-fallback-to-default);
// unlike the teacher this core has no document to persist config into at
// this layer, so `from_env()` is the only loader — the out-of-scope HTTP
// layer owns restart-time config plumbing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// L2 distance at or below which a new embedding is classified DUPLICATE.
    pub duplicate_threshold: f32,
    /// L2 distance at or above which a new embedding is classified INVALID_IMAGE.
    pub outlier_threshold: f32,
    /// Fixed embedding dimension (D) for the biometric VectorIndex.
    pub vector_dimension: usize,
    /// Bounded worker pool size for the Job Orchestrator.
    pub job_pool_size: usize,
    /// How long a job submission blocks for a free pool slot before failing
    /// `Overloaded`.
    pub job_queue_timeout_secs: u64,
    /// `in`-clause chunk size for read-side like batching.
    pub like_batch_chunk_size: usize,
    /// Default / max page size for the post feed.
    pub feed_page_size_default: i64,
    pub feed_page_size_max: i64,
    /// Max retries for a DocStore transaction under contention.
    pub transaction_max_retries: u32,
    pub transaction_backoff_base_ms: u64,
    pub transaction_backoff_cap_ms: u64,
    /// Consecutive third-party generation failures within the window that
    /// trip the circuit breaker, and how long it stays open.
    pub circuit_failure_threshold: u32,
    pub circuit_window_secs: u64,
    pub circuit_open_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            duplicate_threshold: 0.7,
            outlier_threshold: 1.2,
            vector_dimension: 512,
            job_pool_size: 4,
            job_queue_timeout_secs: 30,
            like_batch_chunk_size: 30,
            feed_page_size_default: 10,
            feed_page_size_max: 100,
            transaction_max_retries: 5,
            transaction_backoff_base_ms: 20,
            transaction_backoff_cap_ms: 250,
            circuit_failure_threshold: 5,
            circuit_window_secs: 60,
            circuit_open_secs: 30,
        }
    }
}

impl Config {
    /// Load from environment, falling back to defaults for anything unset
    /// or unparsable (a warning is logged on parse failure, never a panic —
    /// matches the teacher's tolerant `unwrap_or_default()` config style).
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        Self::apply_env_f32(&mut cfg.duplicate_threshold, "HAPPYDOG_DUPLICATE_THRESHOLD");
        Self::apply_env_f32(&mut cfg.outlier_threshold, "HAPPYDOG_OUTLIER_THRESHOLD");
        Self::apply_env_usize(&mut cfg.vector_dimension, "HAPPYDOG_VECTOR_DIMENSION");
        Self::apply_env_usize(&mut cfg.job_pool_size, "HAPPYDOG_JOB_POOL_SIZE");
        Self::apply_env_u64(&mut cfg.job_queue_timeout_secs, "HAPPYDOG_JOB_QUEUE_TIMEOUT_SECS");
        Self::apply_env_usize(&mut cfg.like_batch_chunk_size, "HAPPYDOG_LIKE_BATCH_CHUNK_SIZE");
        cfg
    }

    fn apply_env_f32(slot: &mut f32, key: &str) {
        if let Ok(raw) = std::env::var(key) {
            match raw.parse() {
                Ok(v) => *slot = v,
                Err(_) => log::warn!("[config] could not parse {key}={raw:?} as f32, keeping default"),
            }
        }
    }

    fn apply_env_usize(slot: &mut usize, key: &str) {
        if let Ok(raw) = std::env::var(key) {
            match raw.parse() {
                Ok(v) => *slot = v,
                Err(_) => log::warn!("[config] could not parse {key}={raw:?} as usize, keeping default"),
            }
        }
    }

    fn apply_env_u64(slot: &mut u64, key: &str) {
        if let Ok(raw) = std::env::var(key) {
            match raw.parse() {
                Ok(v) => *slot = v,
                Err(_) => log::warn!("[config] could not parse {key}={raw:?} as u64, keeping default"),
            }
        }
    }
}
