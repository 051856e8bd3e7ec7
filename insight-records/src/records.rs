//! Account, session, and assessment operations over the key-value store.

use crate::error::{RecordsError, RecordsResult};
use crate::scoring::score_assessment;
use crate::types::{
    AssessmentResult, NewUser, Question, RESULTS_KEY, Role, SESSION_KEY, USERS_KEY, User,
    UserUpdate,
};
use chrono::Utc;
use insight_crypto::{KdfParams, hash_password, verify_password};
use insight_store::KvStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Application records kept in the sealed state document.
///
/// Every operation makes sure the store is initialized first, so callers
/// never observe the uninitialized state through this API.
pub struct Records {
    store: Arc<KvStore>,
    kdf: KdfParams,
}

impl Records {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self::with_kdf(store, KdfParams::default())
    }

    pub fn with_kdf(store: Arc<KvStore>, kdf: KdfParams) -> Self {
        Self { store, kdf }
    }

    async fn ensure_ready(&self) -> RecordsResult<()> {
        self.store.init().await?;
        Ok(())
    }

    async fn users(&self) -> Vec<User> {
        self.store.get(USERS_KEY).await.unwrap_or_default()
    }

    async fn results(&self) -> Vec<AssessmentResult> {
        self.store.get(RESULTS_KEY).await.unwrap_or_default()
    }

    async fn create_session(&self, user: &User) -> RecordsResult<()> {
        self.store.set(SESSION_KEY, &user.sanitized()).await?;
        Ok(())
    }

    // ── Authentication ──

    /// Registers a user and signs them in. Emails are unique, compared
    /// case-insensitively.
    pub async fn signup(&self, new_user: NewUser) -> RecordsResult<User> {
        self.ensure_ready().await?;
        let NewUser {
            email,
            full_name,
            role,
            password,
            institution,
        } = new_user;

        // Hash outside the store lock; only the uniqueness check and the
        // insert need to be atomic.
        let kdf = self.kdf.clone();
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password(&password, &kdf)).await??;

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.trim().to_string(),
            full_name,
            institution,
            role,
            password_hash: Some(password_hash),
            created_at: Utc::now(),
        };
        let user = self
            .store
            .update(USERS_KEY, |users: Option<Vec<User>>| {
                let mut users = users.unwrap_or_default();
                if users.iter().any(|u| same_email(&u.email, &user.email)) {
                    return Err(RecordsError::UserExists(email));
                }
                users.push(user.clone());
                Ok((users, user))
            })
            .await?;
        self.create_session(&user).await?;

        info!(user_id = %user.id, role = ?user.role, "user signed up");
        Ok(user.sanitized())
    }

    pub async fn login(&self, email: &str, password: &str) -> RecordsResult<User> {
        self.ensure_ready().await?;
        let user = self
            .users()
            .await
            .into_iter()
            .find(|u| same_email(&u.email, email))
            .ok_or(RecordsError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .clone()
            .ok_or(RecordsError::InvalidCredentials)?;
        let password = password.to_string();
        let verified =
            tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await??;
        if !verified {
            return Err(RecordsError::InvalidCredentials);
        }

        self.create_session(&user).await?;
        debug!(user_id = %user.id, "user logged in");
        Ok(user.sanitized())
    }

    pub async fn logout(&self) -> RecordsResult<()> {
        self.ensure_ready().await?;
        self.store.remove(SESSION_KEY).await?;
        Ok(())
    }

    pub async fn current_user(&self) -> RecordsResult<Option<User>> {
        self.ensure_ready().await?;
        Ok(self.store.get(SESSION_KEY).await)
    }

    /// Starts an anonymous session that is not added to the user list.
    pub async fn start_guest_session(&self) -> RecordsResult<User> {
        self.ensure_ready().await?;
        let guest = User {
            id: format!("guest_{}", uuid::Uuid::new_v4().simple()),
            email: "guest@session.local".to_string(),
            full_name: "Guest User".to_string(),
            institution: None,
            role: Role::Guest,
            password_hash: None,
            created_at: Utc::now(),
        };
        self.create_session(&guest).await?;
        Ok(guest)
    }

    /// Applies `update` to a registered user, or to the current guest
    /// session if `user_id` is not registered. Refreshes the session.
    pub async fn update_user(&self, user_id: &str, update: UserUpdate) -> RecordsResult<User> {
        self.ensure_ready().await?;

        let registered = self
            .store
            .update(USERS_KEY, |users: Option<Vec<User>>| {
                let mut users = users.unwrap_or_default();
                if let Some(email) = &update.email {
                    if users
                        .iter()
                        .any(|u| u.id != user_id && same_email(&u.email, email))
                    {
                        return Err(RecordsError::UserExists(email.clone()));
                    }
                }
                let updated = users.iter_mut().find(|u| u.id == user_id).map(|user| {
                    apply_update(user, update.clone());
                    user.clone()
                });
                Ok((users, updated))
            })
            .await?;

        let updated = match registered {
            Some(user) => user,
            None => {
                let mut session: User = self
                    .current_user()
                    .await?
                    .filter(|u| u.id == user_id)
                    .ok_or_else(|| RecordsError::IdentityNotFound(user_id.to_string()))?;
                apply_update(&mut session, update);
                session
            }
        };

        self.create_session(&updated).await?;
        Ok(updated.sanitized())
    }

    /// Registered users, without password hashes.
    pub async fn all_users(&self) -> RecordsResult<Vec<User>> {
        self.ensure_ready().await?;
        Ok(self.users().await.iter().map(User::sanitized).collect())
    }

    // ── Assessments ──

    /// Scores `answers` and prepends the result to the stored results.
    pub async fn save_assessment(
        &self,
        user_id: &str,
        dept: &str,
        questions: &[Question],
        answers: &HashMap<u32, String>,
    ) -> RecordsResult<AssessmentResult> {
        self.ensure_ready().await?;
        let result = AssessmentResult {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            scores: score_assessment(questions, answers),
            dept: dept.to_string(),
            timestamp: Utc::now(),
        };

        self.store
            .update(RESULTS_KEY, |results: Option<Vec<AssessmentResult>>| {
                let mut results = results.unwrap_or_default();
                results.insert(0, result.clone());
                Ok::<_, RecordsError>((results, ()))
            })
            .await?;

        info!(result_id = %result.id, total = result.scores.total, "assessment saved");
        Ok(result)
    }

    /// Results for one user, newest first.
    pub async fn history(&self, user_id: &str) -> RecordsResult<Vec<AssessmentResult>> {
        self.ensure_ready().await?;
        Ok(self
            .results()
            .await
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    pub async fn all_results(&self) -> RecordsResult<Vec<AssessmentResult>> {
        self.ensure_ready().await?;
        Ok(self.results().await)
    }

    /// Deletes a result by id. Unknown ids are ignored.
    pub async fn delete_result(&self, result_id: &str) -> RecordsResult<()> {
        self.ensure_ready().await?;
        self.store
            .update(RESULTS_KEY, |results: Option<Vec<AssessmentResult>>| {
                let mut results = results.unwrap_or_default();
                results.retain(|r| r.id != result_id);
                Ok::<_, RecordsError>((results, ()))
            })
            .await
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn apply_update(user: &mut User, update: UserUpdate) {
    if let Some(email) = update.email {
        user.email = email.trim().to_string();
    }
    if let Some(full_name) = update.full_name {
        user.full_name = full_name;
    }
    if let Some(institution) = update.institution {
        user.institution = Some(institution);
    }
    if let Some(role) = update.role {
        user.role = role;
    }
}
