use axum::http::Method;
use uuid::Uuid;

use crate::error::ApiError;

/// Author-or-read-only: safe methods always pass, anything else needs an
/// authenticated caller who is the resource's recorded author.
pub fn check_author(method: &Method, actor: Option<Uuid>, author_id: &str) -> Result<(), ApiError> {
    if method.is_safe() {
        return Ok(());
    }

    let actor = actor.ok_or(ApiError::Unauthenticated)?;
    if is_same_user(actor, author_id) {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied)
    }
}

/// Ids are stored as hyphenated lowercase UUID text.
pub(crate) fn is_same_user(actor: Uuid, stored_id: &str) -> bool {
    stored_id.parse::<Uuid>().is_ok_and(|id| id == actor)
}
