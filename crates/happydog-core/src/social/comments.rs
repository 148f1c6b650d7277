// Comment creation (with mention fan-out) and deletion — spec.md §4.6.4–§4.6.5.

use super::mentions;
use super::SocialGraphService;
use crate::clock;
use crate::docstore::Filter;
use crate::error::{CoreError, CoreResult};
use crate::model::{Comment, NotificationType, Post, User, UserSnapshot};

const MAX_COMMENT_TEXT_CHARS: usize = 2000;

impl SocialGraphService {
    /// Assert the parent Post exists, write the Comment, bump
    /// `Post.comment_count`, all in one transaction. After commit: notify
    /// the post author (unless self), then resolve `@nickname` mentions and
    /// notify each mentionee once (deduped, excluding self and the post
    /// author if already notified via the COMMENT path is fine — spec.md
    /// treats COMMENT and MENTION as distinct notification types, so both
    /// may fire for the same recipient).
    pub fn create_comment(&self, post_id: &str, author_id: &str, text: &str) -> CoreResult<Comment> {
        if text.is_empty() || text.chars().count() > MAX_COMMENT_TEXT_CHARS {
            return Err(CoreError::validation(format!(
                "comment text must be 1..{MAX_COMMENT_TEXT_CHARS} characters"
            )));
        }
        let author: User = self
            .store
            .get("users", author_id)?
            .ok_or_else(|| CoreError::not_found(format!("user {author_id} not found")))?;

        let (comment, post_author_id) = self.run_transaction(|tx| {
            let post: Post = tx
                .get("posts", post_id)?
                .ok_or_else(|| CoreError::not_found(format!("post {post_id} not found")))?;
            let comment = Comment {
                comment_id: clock::new_uuid(),
                post_id: post_id.to_string(),
                author: UserSnapshot::from(&author),
                text: text.to_string(),
                like_count: 0,
                created_at: clock::now(),
            };
            tx.set("comments", &comment.comment_id, &comment.created_at.to_rfc3339(), &comment)?;
            tx.atomic_increment("posts", post_id, "comment_count", 1)?;
            Ok((comment, post.author.user_id))
        })?;

        self.notifications.notify(&post_author_id, author_id, NotificationType::Comment, post_id, Some(text.to_string()));

        let mentioned_nicknames = mentions::extract_mentioned_nicknames(text);
        let mut notified: std::collections::HashSet<String> = std::collections::HashSet::new();
        for nickname in mentioned_nicknames {
            if nickname == author.nickname {
                continue;
            }
            let mentionee = self.find_user_by_nickname(&nickname)?;
            if let Some(user) = mentionee {
                if user.user_id == author_id || !notified.insert(user.user_id.clone()) {
                    continue;
                }
                self.notifications.notify(&user.user_id, author_id, NotificationType::Mention, &comment.comment_id, None);
            }
        }

        Ok(comment)
    }

    fn find_user_by_nickname(&self, nickname: &str) -> CoreResult<Option<User>> {
        let page = self.store.query("users", &[Filter::eq("nickname", nickname)], 1, None)?;
        Ok(page.docs.into_iter().next())
    }

    /// Caller must be the comment's author. Transaction: delete Comment,
    /// decrement `Post.comment_count`.
    pub fn delete_comment(&self, comment_id: &str, caller_id: &str) -> CoreResult<()> {
        self.run_transaction(|tx| {
            let comment: Comment = tx
                .get("comments", comment_id)?
                .ok_or_else(|| CoreError::not_found(format!("comment {comment_id} not found")))?;
            if comment.author.user_id != caller_id {
                return Err(CoreError::forbidden("only the author may delete this comment"));
            }
            tx.delete("comments", comment_id)?;
            tx.atomic_increment("posts", &comment.post_id, "comment_count", -1)?;
            Ok(())
        })
    }
}
