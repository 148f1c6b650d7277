// ── Social Graph Service (C6) ───────────────────────────────────────────
// Posts, comments, likes, counters, mentions — spec.md §4.6.1–§4.6.7. All
// cross-entity mutations go through `DocStore::transaction`; the service
// struct is deliberately thin (mirrors the teacher's style of small service
// structs over `Arc<DocStore>` + collaborators, see `engine/sessions` callers)
// and the bulk of the logic lives in per-operation submodules.

mod comments;
mod likes;
mod mentions;
mod posts;

pub use likes::LikeToggleResult;
pub use posts::{FeedPage, PostView};

use crate::config::Config;
use crate::docstore::DocStore;
use crate::notifications::NotificationService;
use crate::objectstore::ObjectStore;
use std::sync::Arc;

pub struct SocialGraphService {
    pub(crate) store: Arc<DocStore>,
    pub(crate) objects: Arc<ObjectStore>,
    pub(crate) notifications: Arc<NotificationService>,
    pub(crate) like_batch_chunk_size: usize,
    pub(crate) feed_page_size_default: i64,
    pub(crate) feed_page_size_max: i64,
    pub(crate) transaction_max_retries: u32,
    pub(crate) transaction_backoff_base_ms: u64,
    pub(crate) transaction_backoff_cap_ms: u64,
}

impl SocialGraphService {
    pub fn new(
        store: Arc<DocStore>,
        objects: Arc<ObjectStore>,
        notifications: Arc<NotificationService>,
        config: &Config,
    ) -> Self {
        SocialGraphService {
            store,
            objects,
            notifications,
            like_batch_chunk_size: config.like_batch_chunk_size,
            feed_page_size_default: config.feed_page_size_default,
            feed_page_size_max: config.feed_page_size_max,
            transaction_max_retries: config.transaction_max_retries,
            transaction_backoff_base_ms: config.transaction_backoff_base_ms,
            transaction_backoff_cap_ms: config.transaction_backoff_cap_ms,
        }
    }

    fn run_transaction<T>(&self, f: impl FnMut(&crate::docstore::Tx) -> crate::error::CoreResult<T>) -> crate::error::CoreResult<T> {
        self.store.transaction(
            self.transaction_max_retries,
            self.transaction_backoff_base_ms,
            self.transaction_backoff_cap_ms,
            f,
        )
    }
}
