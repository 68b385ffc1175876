pub mod auth;
pub mod channels;
pub mod comments;
mod convert;
pub mod error;
pub mod extract;
pub mod follows;
pub mod identity;
pub mod policy;
pub mod posts;
pub mod reactions;
pub mod replies;
pub mod state;
pub mod validators;

use axum::{
    Router,
    routing::{get, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All routes, mounted under `/api/v1`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route(
            "/channels",
            get(channels::list_channels).post(channels::create_channel),
        )
        .route(
            "/channels/{channel_id}",
            get(channels::get_channel)
                .put(channels::update_channel)
                .patch(channels::update_channel)
                .delete(channels::delete_channel),
        )
        .route(
            "/channels/{channel_id}/subscribe",
            post(follows::subscribe).delete(follows::unsubscribe),
        )
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{post_id}",
            get(posts::get_post)
                .put(posts::update_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/posts/{post_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/posts/{post_id}/comments/{comment_id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/posts/{post_id}/comments/{comment_id}/replies",
            get(replies::list_replies).post(replies::create_reply),
        )
        .route(
            "/posts/{post_id}/comments/{comment_id}/replies/{reply_id}",
            get(replies::get_reply)
                .put(replies::update_reply)
                .patch(replies::update_reply)
                .delete(replies::delete_reply),
        )
        .route(
            "/posts/{post_id}/reactions",
            get(reactions::list_reactions)
                .post(reactions::add_reaction)
                .delete(reactions::remove_reaction),
        )
        .route("/users/subscriptions", get(follows::list_subscriptions))
        .route("/users/subscriptions/feed", get(follows::feed))
        .route("/users/follows", get(follows::list_follows))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}
