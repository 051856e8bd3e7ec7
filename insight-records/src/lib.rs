//! Application records for SDG-Insight.
//!
//! Users, the signed-in session, and scored assessment results, all kept as
//! plain JSON values inside the sealed state document via
//! [`insight_store::KvStore`]. Passwords are stored as Argon2id hashes and
//! never leave this crate.

mod error;
mod records;
mod scoring;
mod types;

pub use error::{RecordsError, RecordsResult};
pub use records::Records;
pub use scoring::score_assessment;
pub use types::{
    AssessmentResult, AssessmentScores, NewUser, Question, QuestionType, RESULTS_KEY, Role,
    SESSION_KEY, USERS_KEY, User, UserUpdate,
};
