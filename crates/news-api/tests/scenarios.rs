use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use news_api::{AppState, AppStateInner, auth::create_token};
use news_db::Database;

const SECRET: &str = "test-secret";

struct TestApp {
    state: AppState,
    router: Router,
}

struct User {
    token: String,
}

impl TestApp {
    fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::new(db, SECRET, 1);
        let router = news_api::router(state.clone());
        Self { state, router }
    }

    /// Insert a user directly, skipping password hashing.
    fn user(&self, username: &str) -> User {
        let id = Uuid::new_v4();
        self.state.db.create_user(&id.to_string(), username, "unused").unwrap();
        User {
            token: create_token(SECRET, 1, id, username).unwrap(),
        }
    }

    async fn send(&self, method: Method, uri: &str, user: Option<&User>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(format!("/api/v1{uri}"));
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn channel(&self, owner: &User, title: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/channels",
                Some(owner),
                Some(json!({ "title": title, "description": "about things" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn post(&self, author: &User, channel: &str, text: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/posts",
                Some(author),
                Some(json!({ "text": text, "channel": channel })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new();
    let creds = json!({ "username": "reporter", "password": "correct horse" });

    let (status, body) = app.send(Method::POST, "/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].is_string());

    let (status, _) = app.send(Method::POST, "/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.send(Method::POST, "/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "reporter");

    let wrong = json!({ "username": "reporter", "password": "wrong password" });
    let (status, _) = app.send(Method::POST, "/auth/login", None, Some(wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn username_length_counts_characters() {
    let app = TestApp::new();

    // 17 characters, 33 bytes
    let creds = json!({ "username": "Вероника_Шакалова", "password": "пароль-пароль" });
    let (status, body) = app.send(Method::POST, "/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app.send(Method::POST, "/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "Вероника_Шакалова");

    let long = json!({ "username": "ж".repeat(33), "password": "long enough" });
    let (status, body) = app.send(Method::POST, "/auth/register", None, Some(long)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username must be between 3 and 32 characters");
}

#[tokio::test]
async fn subscribing_twice_is_a_duplicate_follow() {
    let app = TestApp::new();
    let a = app.user("alice");
    let b = app.user("bob");
    let c = app.channel(&a, "Alice daily").await;

    let uri = format!("/channels/{c}/subscribe");
    let (status, body) = app.send(Method::POST, &uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "user": "bob", "following": "alice" }));

    let (status, body) = app.send(Method::POST, &uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You are already subscribed to this author");
}

#[tokio::test]
async fn subscribing_to_own_channel_is_a_self_follow() {
    let app = TestApp::new();
    let a = app.user("alice");
    let c = app.channel(&a, "Alice daily").await;

    let (status, body) = app
        .send(Method::POST, &format!("/channels/{c}/subscribe"), Some(&a), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You cannot subscribe to yourself");
}

#[tokio::test]
async fn unsubscribe_requires_an_existing_follow() {
    let app = TestApp::new();
    let a = app.user("alice");
    let b = app.user("bob");
    let c = app.channel(&a, "Alice daily").await;
    let uri = format!("/channels/{c}/subscribe");

    let (status, body) = app.send(Method::DELETE, &uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You are not subscribed to this author");

    app.send(Method::POST, &uri, Some(&b), None).await;
    let (status, _) = app.send(Method::DELETE, &uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, follows) = app.send(Method::GET, "/users/follows", Some(&b), None).await;
    assert_eq!(follows, json!([]));
}

#[tokio::test]
async fn only_the_channel_owner_may_publish() {
    let app = TestApp::new();
    let a = app.user("alice");
    let b = app.user("bob");
    let c = app.channel(&a, "Alice daily").await;

    app.post(&a, &c, "first!").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/posts",
            Some(&b),
            Some(json!({ "text": "sneaky", "channel": c })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You can only publish into your own channel");

    let missing = Uuid::new_v4();
    let (status, _) = app
        .send(
            Method::POST,
            "/posts",
            Some(&a),
            Some(json!({ "text": "lost", "channel": missing })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn moving_a_post_into_a_foreign_channel_is_forbidden() {
    let app = TestApp::new();
    let a = app.user("alice");
    let b = app.user("bob");
    let ca = app.channel(&a, "Alice daily").await;
    let cb = app.channel(&b, "Bob weekly").await;
    let p = app.post(&a, &ca, "hello").await;

    let (status, _) = app
        .send(Method::PATCH, &format!("/posts/{p}"), Some(&a), Some(json!({ "channel": cb })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::PUT, &format!("/posts/{p}"), Some(&b), Some(json!({ "text": "mine now" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::PUT, &format!("/posts/{p}"), Some(&a), Some(json!({ "text": "edited" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "edited");
    assert_eq!(body["channel"], ca.as_str());
}

#[tokio::test]
async fn reacting_with_the_same_emoji_twice_fails() {
    let app = TestApp::new();
    let a = app.user("alice");
    let c = app.channel(&a, "Alice daily").await;
    let p = app.post(&a, &c, "hot take").await;
    let q = app.post(&a, &c, "another").await;

    let fire = json!({ "emoji": "Fire" });
    let (status, body) = app
        .send(Method::POST, &format!("/posts/{p}/reactions"), Some(&a), Some(fire.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["emoji"], "Fire");

    // Uniqueness is per user and emoji, not per post
    let (status, body) = app
        .send(Method::POST, &format!("/posts/{q}/reactions"), Some(&a), Some(fire.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You have already reacted with Fire");

    let (_, groups) = app.send(Method::GET, &format!("/posts/{p}/reactions"), None, None).await;
    assert_eq!(groups[0]["emoji"], "Fire");
    assert_eq!(groups[0]["count"], 1);

    let uri = format!("/posts/{p}/reactions");
    let (status, _) = app.send(Method::DELETE, &uri, Some(&a), Some(fire.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send(Method::DELETE, &uri, Some(&a), Some(fire)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You have no Fire reaction to remove");
}

#[tokio::test]
async fn unknown_emoji_is_rejected() {
    let app = TestApp::new();
    let a = app.user("alice");
    let c = app.channel(&a, "Alice daily").await;
    let p = app.post(&a, &c, "hot take").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/posts/{p}/reactions"),
            Some(&a),
            Some(json!({ "emoji": "Party" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("unknown variant `Party`"), "{body}");
}

#[tokio::test]
async fn malformed_input_gets_a_detail_body() {
    let app = TestApp::new();
    let a = app.user("alice");

    let (status, body) = app
        .send(Method::POST, "/channels", Some(&a), Some(json!({ "title": "t" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("missing field `description`"), "{body}");

    let (status, body) = app.send(Method::GET, "/posts?limit=lots", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn ids_that_are_not_uuids_are_not_found() {
    let app = TestApp::new();
    let a = app.user("alice");
    let c = app.channel(&a, "Alice daily").await;
    let p = app.post(&a, &c, "hello").await;

    let (status, body) = app.send(Method::POST, "/channels/42/subscribe", Some(&a), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Channel not found");

    let (status, body) = app.send(Method::GET, "/posts/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Post not found");

    let (status, body) = app
        .send(Method::GET, &format!("/posts/{p}/comments/7/replies"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().ends_with("not found"), "{body}");
}

#[tokio::test]
async fn comments_and_replies_respect_authorship() {
    let app = TestApp::new();
    let a = app.user("alice");
    let b = app.user("bob");
    let c = app.channel(&a, "Alice daily").await;
    let p = app.post(&a, &c, "discuss").await;

    let (status, _) = app
        .send(Method::POST, &format!("/posts/{p}/comments"), None, Some(json!({ "text": "anon" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, comment) = app
        .send(Method::POST, &format!("/posts/{p}/comments"), Some(&b), Some(json!({ "text": "nice" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"], "bob");
    let m = comment["id"].as_str().unwrap().to_string();

    let comment_uri = format!("/posts/{p}/comments/{m}");
    let (status, _) = app
        .send(Method::PUT, &comment_uri, Some(&a), Some(json!({ "text": "edited by alice" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::PUT, &comment_uri, Some(&b), Some(json!({ "text": "very nice" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "very nice");
    assert_eq!(body["post"], p.as_str());

    let replies_uri = format!("{comment_uri}/replies");
    let (status, reply) = app
        .send(Method::POST, &replies_uri, Some(&a), Some(json!({ "text": "thanks" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let r = reply["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::DELETE, &format!("{replies_uri}/{r}"), Some(&b), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = app.send(Method::GET, &replies_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    // The comment does not belong to another post
    let other = app.post(&a, &c, "elsewhere").await;
    let (status, _) = app
        .send(Method::GET, &format!("/posts/{other}/comments/{m}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::DELETE, &comment_uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::GET, &format!("{replies_uri}/{r}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subscription_feed_lists_followed_channels_posts() {
    let app = TestApp::new();
    let a = app.user("alice");
    let b = app.user("bob");
    let carol = app.user("carol");
    let ca = app.channel(&a, "Alice daily").await;
    let cc = app.channel(&carol, "Carol's corner").await;
    app.post(&a, &ca, "from alice").await;
    app.post(&carol, &cc, "from carol").await;

    app.send(Method::POST, &format!("/channels/{ca}/subscribe"), Some(&b), None).await;

    let (status, subs) = app.send(Method::GET, "/users/subscriptions", Some(&b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(subs.as_array().unwrap().len(), 1);
    assert_eq!(subs[0]["title"], "Alice daily");

    let (status, feed) = app.send(Method::GET, "/users/subscriptions/feed", Some(&b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["count"], 1);
    assert_eq!(feed["results"][0]["text"], "from alice");

    let (status, _) = app.send(Method::GET, "/users/subscriptions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleting_a_channel_removes_its_posts() {
    let app = TestApp::new();
    let a = app.user("alice");
    let b = app.user("bob");
    let c = app.channel(&a, "Alice daily").await;
    let p = app.post(&a, &c, "soon gone").await;

    let (status, _) = app.send(Method::DELETE, &format!("/channels/{c}"), Some(&b), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::DELETE, &format!("/channels/{c}"), Some(&a), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::GET, &format!("/posts/{p}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn channel_titles_are_unique() {
    let app = TestApp::new();
    let a = app.user("alice");
    let b = app.user("bob");
    app.channel(&a, "Headlines").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/channels",
            Some(&b),
            Some(json!({ "title": "Headlines", "description": "mine" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "A channel with this title already exists");

    let (status, page) = app.send(Method::GET, "/channels?limit=500", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert_eq!(page["limit"], 100);
}
