//! Relationship-integrity rules checked before a write.
//!
//! Each check is a read against current state; the write that follows takes
//! the store lock separately, so two racing requests can both pass. The
//! storage UNIQUE/CHECK constraints catch the loser (see `ApiError::from_write`).

use axum::http::Method;
use uuid::Uuid;

use news_db::RelationStore;
use news_db::models::ChannelRow;
use news_types::models::Emoji;

use crate::error::ApiError;
use crate::policy::is_same_user;

/// Create/remove rules for a relationship that is toggled rather than updated.
pub trait RelationshipValidator {
    type Target: ?Sized;

    fn validate_create(&self, actor: Uuid, target: &Self::Target) -> Result<(), ApiError>;

    fn validate_remove(&self, actor: Uuid, target: &Self::Target) -> Result<(), ApiError>;
}

/// Follower → followed user.
pub struct FollowValidator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: RelationStore + ?Sized> FollowValidator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: RelationStore + ?Sized> RelationshipValidator for FollowValidator<'_, S> {
    type Target = Uuid;

    fn validate_create(&self, follower: Uuid, followed: &Uuid) -> Result<(), ApiError> {
        // Before the existence check: storage could never hold this row anyway.
        if follower == *followed {
            return Err(ApiError::SelfFollow);
        }
        if self.store.follow_exists(&follower.to_string(), &followed.to_string())? {
            return Err(ApiError::DuplicateFollow);
        }
        Ok(())
    }

    fn validate_remove(&self, follower: Uuid, followed: &Uuid) -> Result<(), ApiError> {
        if !self.store.follow_exists(&follower.to_string(), &followed.to_string())? {
            return Err(ApiError::NotFollowing);
        }
        Ok(())
    }
}

/// User → emoji. A user holds each emoji at most once across all posts.
pub struct ReactionValidator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: RelationStore + ?Sized> ReactionValidator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: RelationStore + ?Sized> RelationshipValidator for ReactionValidator<'_, S> {
    type Target = Emoji;

    fn validate_create(&self, user: Uuid, emoji: &Emoji) -> Result<(), ApiError> {
        if self.store.reaction_exists(&user.to_string(), *emoji)? {
            return Err(ApiError::DuplicateReaction(*emoji));
        }
        Ok(())
    }

    fn validate_remove(&self, user: Uuid, emoji: &Emoji) -> Result<(), ApiError> {
        if !self.store.reaction_exists(&user.to_string(), *emoji)? {
            return Err(ApiError::NoReaction(*emoji));
        }
        Ok(())
    }
}

/// A post may only live in a channel its author owns.
///
/// Creating (POST) into someone else's channel is a validation error (400);
/// moving a post there on update is a permission error (403).
pub fn validate_channel_write(actor: Uuid, channel: &ChannelRow, method: &Method) -> Result<(), ApiError> {
    if is_same_user(actor, &channel.author_id) {
        return Ok(());
    }
    if *method == Method::POST {
        Err(ApiError::ForbiddenChannel)
    } else {
        Err(ApiError::PermissionDenied)
    }
}
