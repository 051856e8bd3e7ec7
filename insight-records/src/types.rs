//! Entities persisted in the state document.
//!
//! Field names serialize in camelCase to stay compatible with state
//! documents written by the web client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State document key holding `Vec<User>`.
pub const USERS_KEY: &str = "users";
/// State document key holding `Vec<AssessmentResult>`, newest first.
pub const RESULTS_KEY: &str = "results";
/// State document key holding the signed-in `User` (never with a password hash).
pub const SESSION_KEY: &str = "current_session";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Guest,
    Student,
    #[serde(rename = "Faculty/Staff")]
    FacultyStaff,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    pub role: Role,
    /// Argon2id hash; stripped from sessions and from anything returned to
    /// callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Copy without credential material.
    pub fn sanitized(&self) -> User {
        User {
            password_hash: None,
            ..self.clone()
        }
    }
}

/// Input for [`crate::Records::signup`].
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
    pub institution: Option<String>,
}

/// Partial update for [`crate::Records::update_user`]. `None` leaves the
/// field unchanged.
#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub institution: Option<String>,
    pub role: Option<Role>,
}

/// Scoring dimension of a question.
///
/// Deserialization is lenient: case is ignored and unknown or missing labels
/// fall back to `Knowledge`, since question sets come from generated content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum QuestionType {
    #[default]
    Knowledge,
    Attitude,
    Engagement,
    Exposure,
}

impl From<String> for QuestionType {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "attitude" => QuestionType::Attitude,
            "engagement" => QuestionType::Engagement,
            "exposure" => QuestionType::Exposure,
            _ => QuestionType::Knowledge,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// Per-dimension scores, each 0–25, and their sum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentScores {
    pub knowledge: u32,
    pub attitude: u32,
    pub engagement: u32,
    pub exposure: u32,
    pub total: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub id: String,
    pub user_id: String,
    pub scores: AssessmentScores,
    pub dept: String,
    pub timestamp: DateTime<Utc>,
}
