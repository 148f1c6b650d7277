// Like toggle and read-side like batching — spec.md §4.6.6–§4.6.7.

use super::SocialGraphService;
use crate::clock;
use crate::error::CoreResult;
use crate::model::{Comment, Like, NotificationType, Post, SubjectType};
use std::collections::HashSet;

/// Outcome of a like toggle: whether the subject is now liked by the caller,
/// and its post-toggle `like_count`.
pub struct LikeToggleResult {
    pub liked: bool,
    pub like_count: i64,
}

impl SocialGraphService {
    /// Toggle a like on a Post or Comment. The Like id is deterministic
    /// (`compose_like_id`), so existence of the Like doc alone tells us
    /// which branch to take — no separate lookup needed.
    pub fn toggle_like(
        &self,
        caller_id: &str,
        subject_type: SubjectType,
        subject_id: &str,
    ) -> CoreResult<LikeToggleResult> {
        let like_id = clock::compose_like_id(subject_type.as_str(), caller_id, subject_id);
        let collection = subject_collection(subject_type);

        let (liked, like_count, subject_author) = self.run_transaction(|tx| {
            let existing: Option<Like> = tx.get("likes", &like_id)?;
            match existing {
                Some(_) => {
                    tx.delete("likes", &like_id)?;
                    let count = tx.atomic_increment(collection, subject_id, "like_count", -1)?;
                    let author = subject_author_id(tx, subject_type, subject_id)?;
                    Ok((false, count, author))
                }
                None => {
                    let like = Like {
                        like_id: like_id.clone(),
                        user_id: caller_id.to_string(),
                        subject_id: subject_id.to_string(),
                        subject_type,
                        created_at: clock::now(),
                    };
                    tx.set("likes", &like_id, &like.created_at.to_rfc3339(), &like)?;
                    let count = tx.atomic_increment(collection, subject_id, "like_count", 1)?;
                    let author = subject_author_id(tx, subject_type, subject_id)?;
                    Ok((true, count, author))
                }
            }
        })?;

        if liked {
            if let Some(author_id) = subject_author {
                if author_id != caller_id {
                    let notification_type = match subject_type {
                        SubjectType::Post => NotificationType::PostLike,
                        SubjectType::Comment => NotificationType::CommentLike,
                    };
                    self.notifications.notify(&author_id, caller_id, notification_type, subject_id, None);
                }
            }
        }

        Ok(LikeToggleResult { liked, like_count })
    }

    /// Build candidate Like ids deterministically for `subject_ids` and
    /// issue chunked `in`-style lookups (≤ configured chunk size per batch,
    /// default 30) to avoid one read per post on feed rendering.
    pub fn batch_liked_subject_ids(
        &self,
        viewer_id: &str,
        subject_type: SubjectType,
        subject_ids: &[&str],
    ) -> CoreResult<HashSet<String>> {
        let mut liked = HashSet::new();
        for chunk in subject_ids.chunks(self.like_batch_chunk_size) {
            for &subject_id in chunk {
                let like_id = clock::compose_like_id(subject_type.as_str(), viewer_id, subject_id);
                let exists: Option<Like> = self.store.get("likes", &like_id)?;
                if exists.is_some() {
                    liked.insert(subject_id.to_string());
                }
            }
        }
        Ok(liked)
    }
}

fn subject_collection(subject_type: SubjectType) -> &'static str {
    match subject_type {
        SubjectType::Post => "posts",
        SubjectType::Comment => "comments",
    }
}

fn subject_author_id(tx: &crate::docstore::Tx, subject_type: SubjectType, subject_id: &str) -> CoreResult<Option<String>> {
    match subject_type {
        SubjectType::Post => {
            let post: Option<Post> = tx.get("posts", subject_id)?;
            Ok(post.map(|p| p.author.user_id))
        }
        SubjectType::Comment => {
            let comment: Option<Comment> = tx.get("comments", subject_id)?;
            Ok(comment.map(|c| c.author.user_id))
        }
    }
}
