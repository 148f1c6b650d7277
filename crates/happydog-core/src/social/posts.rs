// Post creation, feed, mutation, deletion — spec.md §4.6.1–§4.6.3.

use super::SocialGraphService;
use crate::clock;
use crate::docstore::{Filter, QueryPage};
use crate::error::{CoreError, CoreResult};
use crate::model::{Pet, PetSnapshot, Post, User, UserSnapshot};

const MAX_POST_TEXT_CHARS: usize = 2000;

pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub next_cursor: Option<String>,
}

/// A feed entry with the viewer-specific `is_liked` flag layered on — never
/// persisted, computed per request (spec.md §4.6.2).
pub struct PostView {
    pub post: Post,
    pub is_liked: bool,
}

impl SocialGraphService {
    /// Create a post from 1..N already-uploaded file paths. The caller's
    /// pet is resolved as "the first pet owned by this user" — spec.md's
    /// flagged one-pet-per-user assumption on this surface only (§9 open
    /// question; preserved as-is, not inferred away).
    pub fn create_post(&self, user_id: &str, text: &str, file_paths: &[String]) -> CoreResult<Post> {
        if text.is_empty() || text.chars().count() > MAX_POST_TEXT_CHARS {
            return Err(CoreError::validation(format!(
                "post text must be 1..{MAX_POST_TEXT_CHARS} characters"
            )));
        }
        if file_paths.is_empty() {
            return Err(CoreError::validation("post requires at least one image"));
        }

        let user: User = self
            .store
            .get("users", user_id)?
            .ok_or_else(|| CoreError::not_found(format!("user {user_id} not found")))?;
        let pet = self.first_pet_for_user(user_id)?
            .ok_or_else(|| CoreError::not_found(format!("user {user_id} has no registered pet")))?;

        let mut image_urls = Vec::with_capacity(file_paths.len());
        for key in file_paths {
            if !self.objects.exists(key) {
                return Err(CoreError::not_found(format!("uploaded object not found: {key}")));
            }
            image_urls.push(self.objects.make_public(key)?);
        }

        self.assemble_and_write_post(user, pet, text, image_urls)
    }

    /// Create a post from image URLs that are already public — used by the
    /// cartoon job orchestrator, whose generated image comes back from the
    /// upstream provider as an externally-hosted URL that never passed
    /// through this store's own object namespace (spec.md §4.8 on-success
    /// step).
    pub fn create_post_with_image_urls(&self, user_id: &str, text: &str, image_urls: &[String]) -> CoreResult<Post> {
        if text.is_empty() || text.chars().count() > MAX_POST_TEXT_CHARS {
            return Err(CoreError::validation(format!(
                "post text must be 1..{MAX_POST_TEXT_CHARS} characters"
            )));
        }
        if image_urls.is_empty() {
            return Err(CoreError::validation("post requires at least one image"));
        }

        let user: User = self
            .store
            .get("users", user_id)?
            .ok_or_else(|| CoreError::not_found(format!("user {user_id} not found")))?;
        let pet = self.first_pet_for_user(user_id)?
            .ok_or_else(|| CoreError::not_found(format!("user {user_id} has no registered pet")))?;

        self.assemble_and_write_post(user, pet, text, image_urls.to_vec())
    }

    fn assemble_and_write_post(&self, user: User, pet: Pet, text: &str, image_urls: Vec<String>) -> CoreResult<Post> {
        let now = clock::now();
        let post = Post {
            post_id: clock::new_uuid(),
            author: UserSnapshot::from(&user),
            pet: PetSnapshot::from(&pet),
            image_urls,
            text: text.to_string(),
            like_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.set("posts", &post.post_id, &now.to_rfc3339(), &post)?;
        Ok(post)
    }

    fn first_pet_for_user(&self, user_id: &str) -> CoreResult<Option<Pet>> {
        let page: QueryPage<Pet> =
            self.store.query("pets", &[Filter::eq("owner_user_id", user_id)], 1, None)?;
        Ok(page.docs.into_iter().next())
    }

    /// Ordered by `created_at DESC`. `viewer_id = None` yields `is_liked =
    /// false` uniformly; otherwise one batched Like existence check is
    /// issued (chunked, §4.6.7) to avoid an N+1 read per post.
    pub fn feed(&self, limit: Option<i64>, cursor: Option<&str>, viewer_id: Option<&str>) -> CoreResult<FeedPage> {
        let limit = limit.unwrap_or(self.feed_page_size_default).min(self.feed_page_size_max).max(1);
        let page: QueryPage<Post> = self.store.query("posts", &[], limit, cursor)?;

        let liked_ids = match viewer_id {
            Some(viewer) => {
                let subject_ids: Vec<&str> = page.docs.iter().map(|p| p.post_id.as_str()).collect();
                self.batch_liked_subject_ids(viewer, crate::model::SubjectType::Post, &subject_ids)?
            }
            None => Default::default(),
        };

        let posts = page
            .docs
            .into_iter()
            .map(|post| {
                let is_liked = liked_ids.contains(&post.post_id);
                PostView { post, is_liked }
            })
            .collect();

        Ok(FeedPage { posts, next_cursor: page.next_cursor })
    }

    /// Only the author may edit `text`; all other fields are immutable.
    pub fn update_post_text(&self, post_id: &str, caller_id: &str, text: &str) -> CoreResult<Post> {
        if text.is_empty() || text.chars().count() > MAX_POST_TEXT_CHARS {
            return Err(CoreError::validation(format!(
                "post text must be 1..{MAX_POST_TEXT_CHARS} characters"
            )));
        }
        self.run_transaction(|tx| {
            let mut post: Post = tx
                .get("posts", post_id)?
                .ok_or_else(|| CoreError::not_found(format!("post {post_id} not found")))?;
            if post.author.user_id != caller_id {
                return Err(CoreError::forbidden("only the author may edit this post"));
            }
            post.text = text.to_string();
            post.updated_at = clock::now();
            tx.set("posts", post_id, &post.created_at.to_rfc3339(), &post)?;
            Ok(post)
        })
    }

    /// Only the author may delete. Comments/likes referencing the post are
    /// NOT cascaded (spec.md §4.6.3, §9) — they become orphans swept by an
    /// out-of-scope background task. Media deletion is best-effort, after
    /// commit.
    pub fn delete_post(&self, post_id: &str, caller_id: &str) -> CoreResult<()> {
        let post: Post = self.run_transaction(|tx| {
            let post: Post = tx
                .get("posts", post_id)?
                .ok_or_else(|| CoreError::not_found(format!("post {post_id} not found")))?;
            if post.author.user_id != caller_id {
                return Err(CoreError::forbidden("only the author may delete this post"));
            }
            tx.delete("posts", post_id)?;
            Ok(post)
        })?;

        for url in &post.image_urls {
            if let Some(key) = self.objects.key_from_public_url(url) {
                self.objects.delete_best_effort(key);
            }
        }
        Ok(())
    }
}
