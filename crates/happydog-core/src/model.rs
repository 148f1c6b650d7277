// ── Shared data model (spec.md §3) ──────────────────────────────────────
// All timestamps are UTC instants; all IDs are opaque strings unless noted.

use crate::clock::{Date, Instant};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Weight,
    Water,
    Activity,
    Meal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    Post,
    Comment,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Post => "post",
            SubjectType::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationType {
    PostLike,
    CommentLike,
    Comment,
    Mention,
    CartoonSuccess,
    CartoonFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Processing,
    Canceling,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The system sender used for CartoonJob terminal-transition notifications.
pub const SYSTEM_SENDER_ID: &str = "system:happydog";
pub const SYSTEM_SENDER_NICKNAME: &str = "HappyDog";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub external_sub: String,
    pub email: String,
    pub nickname: String,
    pub profile_image_url: Option<String>,
    pub fcm_token: Option<String>,
    pub joined_at: Instant,
}

/// Denormalized snapshot of a User, embedded into Post/Comment/Notification
/// at creation time. Deliberately not refreshed on profile change — see
/// spec.md §3 "Denormalization discipline".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub user_id: String,
    pub nickname: String,
    pub profile_image_url: Option<String>,
}

impl From<&User> for UserSnapshot {
    fn from(u: &User) -> Self {
        UserSnapshot {
            user_id: u.user_id.clone(),
            nickname: u.nickname.clone(),
            profile_image_url: u.profile_image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    pub pet_id: String,
    pub owner_user_id: String,
    pub name: String,
    pub gender: Gender,
    pub breed: String,
    pub birthdate: Date,
    pub initial_weight_kg: f64,
    pub is_verified: bool,
    pub nose_print_url: Option<String>,
    pub vector_index_id: Option<u32>,
    pub fur_color: Option<String>,
    pub health_concerns: Vec<String>,
}

/// Denormalized snapshot of a Pet, embedded into Post at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetSnapshot {
    pub pet_id: String,
    pub name: String,
    pub breed: String,
}

impl From<&Pet> for PetSnapshot {
    fn from(p: &Pet) -> Self {
        PetSnapshot { pet_id: p.pet_id.clone(), name: p.name.clone(), breed: p.breed.clone() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetCareSettings {
    pub pet_id: String,
    pub goal_weight_kg: f64,
    pub water_bowl_capacity_ml: i64,
    pub water_increment_ml: i64,
    pub goal_activity_minutes: i64,
    pub activity_increment_minutes: i64,
    pub goal_meal_count: i64,
    pub meal_increment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareRecord {
    pub log_id: String,
    pub pet_id: String,
    pub record_type: RecordType,
    pub event_time: Instant,
    pub search_date: Date,
    pub data: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub author: UserSnapshot,
    pub pet: PetSnapshot,
    pub image_urls: Vec<String>,
    pub text: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: Instant,
    pub updated_at: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub post_id: String,
    pub author: UserSnapshot,
    pub text: String,
    pub like_count: i64,
    pub created_at: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub like_id: String,
    pub user_id: String,
    pub subject_id: String,
    pub subject_type: SubjectType,
    pub created_at: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: String,
    pub recipient_id: String,
    pub sender: UserSnapshot,
    pub notification_type: NotificationType,
    pub target_id: String,
    pub target_summary: Option<String>,
    pub is_read: bool,
    pub created_at: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartoonJob {
    pub job_id: String,
    pub user_id: String,
    pub status: JobStatus,
    pub original_image_url: String,
    pub user_text: Option<String>,
    pub result_image_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Instant,
    pub updated_at: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedToken {
    pub jti: String,
    pub revoked_at: Instant,
    pub expires_at: Instant,
}
