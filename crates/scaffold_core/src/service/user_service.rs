//! User use-case service.
//!
//! # Invariants
//! - Email addresses are unique across users.
//! - Lookups by id raise `DataError::not_exist` instead of returning `None`.

use crate::crud::{EntityId, UpdateInput};
use crate::exceptions::{DataError, KeyAttr};
use crate::model::user::{User, UserCreate, UserCrud, UserUpdate, USERS};
use crate::service::ServiceResult;
use crate::session::Session;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;

const SUBJECT: &str = "user";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern must compile")
});

/// Use-case service for users.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserService {
    crud: UserCrud,
}

impl UserService {
    pub fn new() -> Self {
        Self { crud: USERS }
    }

    /// Creates a user and commits.
    ///
    /// # Errors
    /// - `DataError` check (400) for a malformed email.
    /// - `DataError` exist (409) when the email is already registered.
    pub fn register(&self, session: &mut Session<'_>, obj_in: &UserCreate) -> ServiceResult<User> {
        let mut user = self.register_flush(session, obj_in)?;
        session.commit()?;
        session.refresh(&mut user)?;
        info!("event=user_register module=service status=ok id={:?}", user.id);
        Ok(user)
    }

    /// Same checks as [`UserService::register`], flush only.
    pub fn register_flush(
        &self,
        session: &mut Session<'_>,
        obj_in: &UserCreate,
    ) -> ServiceResult<User> {
        check_email(&obj_in.email)?;
        self.ensure_email_free(session, &obj_in.email)?;
        Ok(self.crud.create_flush(session, obj_in)?)
    }

    pub fn get(&self, session: &mut Session<'_>, id: EntityId) -> ServiceResult<User> {
        self.crud
            .get(session, id)?
            .ok_or_else(|| DataError::not_exist(SUBJECT, vec![KeyAttr::new("id", id)]).into())
    }

    pub fn list(&self, session: &mut Session<'_>, skip: u64, limit: u64) -> ServiceResult<Vec<User>> {
        Ok(self.crud.get_multi(session, skip, limit)?)
    }

    /// Applies a partial update to an existing user.
    pub fn update(
        &self,
        session: &mut Session<'_>,
        id: EntityId,
        obj_in: UserUpdate,
    ) -> ServiceResult<User> {
        let current = self.get(session, id)?;
        if let Some(email) = obj_in.email.as_deref() {
            check_email(email)?;
            if email != current.email {
                self.ensure_email_free(session, email)?;
            }
        }
        Ok(self.crud.update(session, current, UpdateInput::Shape(obj_in))?)
    }

    /// Deletes a user after confirming it exists.
    pub fn remove(&self, session: &mut Session<'_>, id: EntityId) -> ServiceResult<User> {
        self.get(session, id)?;
        let removed = self.crud.remove(session, id)?;
        info!("event=user_remove module=service status=ok id={id}");
        Ok(removed)
    }

    fn ensure_email_free(&self, session: &mut Session<'_>, email: &str) -> ServiceResult<()> {
        let existing = session
            .query::<User>()
            .filter_by("email", email)
            .first()?;
        if existing.is_some() {
            return Err(DataError::exist(SUBJECT, vec![KeyAttr::new("email", email)]).into());
        }
        Ok(())
    }
}

fn check_email(email: &str) -> Result<(), DataError> {
    if EMAIL_PATTERN.is_match(email) {
        return Ok(());
    }
    Err(DataError::check(SUBJECT)
        .with_message(format!("invalid email address `{email}`"))
        .with_detail("email must look like name@domain.tld"))
}

#[cfg(test)]
mod tests {
    use super::check_email;

    #[test]
    fn check_email_accepts_plain_addresses() {
        assert!(check_email("a@b.com").is_ok());
    }

    #[test]
    fn check_email_rejects_missing_domain() {
        let err = check_email("not-an-email").expect_err("malformed email should fail");
        assert_eq!(err.status_code(), 400);
        assert!(err.message().contains("not-an-email"));
    }
}
