use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use futures_util::{SinkExt, StreamExt};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tower::ServiceExt;

use wanderhub::{
    auth::TokenSigner,
    db,
    images::ImageStore,
    realtime::{ConnectionHandle, Relay, ServerEvent},
    AppState,
};

const BOUNDARY: &str = "wanderhub-test-boundary";

struct Harness {
    app: Router,
    state: AppState,
    _dir: TempDir,
}

struct Account {
    id: String,
    token: String,
}

impl Harness {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let state = AppState {
            db_pool: db::connect(&url).await.unwrap(),
            tokens: TokenSigner::new("test-secret"),
            images: ImageStore::local(dir.path().join("uploads"), "http://localhost:8090"),
            relay: Relay::default(),
        };
        let app = wanderhub::app(state.clone(), None);
        Self { app, state, _dir: dir }
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.call(request.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.bare(Method::GET, uri, token).await
    }

    async fn bare(&self, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.call(request.body(Body::empty()).unwrap()).await
    }

    async fn form(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(multipart_body(fields, files)))
            .unwrap();
        self.call(request).await
    }

    async fn signup(&self, name: &str) -> Account {
        let email = format!("{}@example.com", name.to_lowercase());
        let (status, body) = self
            .json(Method::POST, "/api/user/register", None, json!({ "name": name, "email": email, "password": "password123" }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);

        let (status, body) = self
            .json(Method::POST, "/api/user/login", None, json!({ "email": email, "password": "password123" }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        Account {
            id: body["user"]["id"].as_str().unwrap().to_owned(),
            token: body["token"].as_str().unwrap().to_owned(),
        }
    }

    async fn send(&self, from: &Account, to: &Account, text: &str) -> (StatusCode, Value) {
        let uri = format!("/api/chat/send/{}", to.id);
        self.json(Method::POST, &uri, Some(&from.token), json!({ "message": text })).await
    }

    async fn add_listing(&self, owner: &Account, title: &str, category: &str) -> String {
        let (status, body) = self
            .form(
                Method::POST,
                "/api/listing/add",
                &owner.token,
                &[("title", title), ("description", "Steps from the sea"), ("category", category), ("country", "India"), ("location", "Goa")],
                &[("image1", "front.png", &b"png-bytes"[..])],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["listing"]["id"].as_str().unwrap().to_owned()
    }
}

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn titles(body: &Value) -> Vec<String> {
    body["listings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["title"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn listing_shows_up_in_search_and_filters_exclude_it() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    h.add_listing(&alice, "Beach House", "Beach").await;

    let (status, body) = h.get("/api/listing/list", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Beach House"]);
    assert_eq!(body["pagination"], json!({ "totalListings": 1, "totalPages": 1, "currentPage": 1, "limit": 8 }));

    let listing = &body["listings"][0];
    assert_eq!(listing["owner"]["name"], "alice");
    assert_eq!(listing["images"].as_array().unwrap().len(), 1);
    assert!(listing["images"][0].as_str().unwrap().starts_with("http://localhost:8090/uploads/"));

    let (_, body) = h.get("/api/listing/list?category=Mountain", None).await;
    assert!(titles(&body).is_empty());
    assert_eq!(body["pagination"]["totalListings"], 0);

    let (_, body) = h.get("/api/listing/list?search=beach&country=India", None).await;
    assert_eq!(titles(&body), vec!["Beach House"]);

    let (_, body) = h.get("/api/listing/list?search=50%25", None).await;
    assert!(titles(&body).is_empty());
}

#[tokio::test]
async fn search_paginates() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    for i in 1..=5 {
        h.add_listing(&alice, &format!("Cabin {i}"), "Forest").await;
    }

    let (_, body) = h.get("/api/listing/list?page=2&limit=2", None).await;
    assert_eq!(titles(&body), vec!["Cabin 3", "Cabin 4"]);
    assert_eq!(body["pagination"], json!({ "totalListings": 5, "totalPages": 3, "currentPage": 2, "limit": 2 }));

    let (_, body) = h.get("/api/listing/list?page=9&limit=2", None).await;
    assert!(titles(&body).is_empty());

    let (status, body) = h.get("/api/listing/list?page=9223372036854775807", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(titles(&body).is_empty());
    assert_eq!(body["pagination"]["totalListings"], 5);
}

#[tokio::test]
async fn listing_without_title_is_rejected() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;

    let (status, body) = h
        .form(Method::POST, "/api/listing/add", &alice.token, &[("title", "  "), ("category", "Beach")], &[])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "message": "Title is required" }));
}

#[tokio::test]
async fn only_owner_edits_and_blank_fields_are_kept() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;
    let id = h.add_listing(&alice, "Beach House", "Beach").await;
    let uri = format!("/api/listing/{id}/edit");

    let (status, body) = h.form(Method::PUT, &uri, &bob.token, &[("title", "Mine now")], &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (_, before) = h.get(&format!("/api/listing/{id}"), Some(&alice.token)).await;
    let old_images = before["listing"]["images"].clone();

    let (status, body) = h
        .form(Method::PUT, &uri, &alice.token, &[("title", "Beach Villa"), ("location", "")], &[])
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["listing"]["title"], "Beach Villa");
    assert_eq!(body["listing"]["location"], "Goa");
    assert_eq!(body["listing"]["images"], old_images);

    let (status, body) = h
        .form(Method::PUT, &uri, &alice.token, &[], &[("image1", "a.jpg", &b"a"[..]), ("image3", "c.jpg", &b"c"[..])])
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let images = body["listing"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_ne!(Value::Array(images.clone()), old_images);

    let (status, _) = h.form(Method::PUT, "/api/listing/nope/edit", &alice.token, &[], &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_listing_is_owner_only_and_keeps_reviews() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;
    let id = h.add_listing(&alice, "Beach House", "Beach").await;
    let (status, _) = h
        .json(Method::POST, &format!("/api/review/{id}"), Some(&bob.token), json!({ "rating": 4, "comment": "Nice" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = h.bare(Method::DELETE, &format!("/api/listing/{id}"), Some(&bob.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = h.bare(Method::DELETE, &format!("/api/listing/{id}"), Some(&alice.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "message": "Listing deleted successfully" }));

    let (status, _) = h.get(&format!("/api/listing/{id}"), Some(&alice.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = h.get(&format!("/api/review/{id}"), None).await;
    assert_eq!(body["reviews"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn my_listings_are_only_mine() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;
    h.add_listing(&alice, "Beach House", "Beach").await;
    h.add_listing(&bob, "Hill Hut", "Mountain").await;

    let (status, body) = h.get("/api/listing/user/me", Some(&bob.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Hill Hut"]);
}

#[tokio::test]
async fn deleting_a_review_pulls_it_from_the_listing() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;
    let listing_id = h.add_listing(&alice, "Beach House", "Beach").await;

    let (status, body) = h
        .json(Method::POST, &format!("/api/review/{listing_id}"), Some(&bob.token), json!({ "rating": 5, "comment": "Loved it" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let review_id = body["review"]["id"].as_str().unwrap().to_owned();
    assert_eq!(body["review"]["author"]["name"], "bob");

    let (_, body) = h.get(&format!("/api/listing/{listing_id}"), Some(&alice.token)).await;
    assert_eq!(body["listing"]["reviews"][0]["id"], review_id.as_str());

    let (status, _) = h.bare(Method::DELETE, &format!("/api/review/{review_id}"), Some(&alice.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h.bare(Method::DELETE, &format!("/api/review/{review_id}"), Some(&bob.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = h.get(&format!("/api/listing/{listing_id}"), Some(&alice.token)).await;
    assert_eq!(body["listing"]["reviews"], json!([]));

    let (status, _) = h.bare(Method::DELETE, &format!("/api/review/{review_id}"), Some(&bob.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn review_input_is_validated() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let listing_id = h.add_listing(&alice, "Beach House", "Beach").await;
    let uri = format!("/api/review/{listing_id}");

    for bad in [json!({ "comment": "no rating" }), json!({ "rating": 3, "comment": "" }), json!({ "rating": 6, "comment": "too good" }), json!({ "rating": 0, "comment": "bad" })] {
        let (status, body) = h.json(Method::POST, &uri, Some(&alice.token), bad.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad} -> {body}");
    }

    let (status, _) = h.json(Method::POST, &uri, Some(&alice.token), json!({ "rating": "4", "comment": "string rating" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = h.json(Method::POST, "/api/review/missing", Some(&alice.token), json!({ "rating": 4, "comment": "x" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_is_rejected_twice_and_unfollow_needs_a_follow() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;
    let follow = format!("/api/user/follow/{}", bob.id);
    let unfollow = format!("/api/user/unfollow/{}", bob.id);

    let (status, _) = h.bare(Method::POST, &unfollow, Some(&alice.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.bare(Method::POST, &follow, Some(&alice.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = h.bare(Method::POST, &follow, Some(&alice.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You are already following this user");

    let (_, body) = h.get("/api/user/profile", Some(&alice.token)).await;
    assert_eq!(body["user"]["following"][0]["id"], bob.id.as_str());
    assert!(body["user"].get("passwordHash").is_none());
    let (_, body) = h.get("/api/user/profile", Some(&bob.token)).await;
    assert_eq!(body["user"]["followers"][0]["id"], alice.id.as_str());

    let (status, _) = h.bare(Method::POST, &unfollow, Some(&alice.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = h.get("/api/user/profile", Some(&bob.token)).await;
    assert_eq!(body["user"]["followers"], json!([]));

    let (status, _) = h.bare(Method::POST, &format!("/api/user/follow/{}", alice.id), Some(&alice.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h.bare(Method::POST, "/api/user/follow/ghost", Some(&alice.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_and_login_are_validated() {
    let h = Harness::new().await;
    h.signup("alice").await;

    for (body, message) in [
        (json!({ "name": "x", "email": "alice@example.com", "password": "password123" }), "User already exists"),
        (json!({ "name": "x", "email": "not-an-email", "password": "password123" }), "Invalid email"),
        (json!({ "name": "x", "email": "x@example.com", "password": "short" }), "Password must be at least 8 characters"),
        (json!({ "name": "", "email": "y@example.com", "password": "password123" }), "Name is required"),
    ] {
        let (status, got) = h.json(Method::POST, "/api/user/register", None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(got, json!({ "success": false, "message": message }));
    }

    let (status, _) = h
        .json(Method::POST, "/api/user/login", None, json!({ "email": "alice@example.com", "password": "wrong-password" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = h
        .json(Method::POST, "/api/user/login", None, json!({ "email": "nobody@example.com", "password": "password123" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;

    let (status, body) = h.get("/api/user/profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let forged = TokenSigner::new("other-secret").issue(&alice.id);
    let (status, _) = h.get("/api/user/profile", Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let orphaned = h.state.tokens.issue("no-such-user");
    let (status, body) = h
        .form(Method::POST, "/api/listing/add", &orphaned, &[("title", "Ghost House")], &[])
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    let (status, _) = h
        .json(Method::POST, &format!("/api/chat/send/{}", alice.id), Some(&orphaned), json!({ "message": "boo" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = h.get(&format!("/api/user/{}", alice.id), Some(&alice.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn sent_message_is_stored_and_pushed_to_a_connected_receiver() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    h.state.relay.identify(&bob.id, ConnectionHandle::new(tx));

    let (status, body) = h
        .json(Method::POST, &format!("/api/chat/send/{}", bob.id), Some(&alice.token), json!({ "message": "hi" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["sender"], alice.id.as_str());
    assert_eq!(body["data"]["message"], "hi");

    let ServerEvent::ReceiveMessage(notice) = rx.try_recv().unwrap();
    assert_eq!(notice.sender, alice.id);
    assert_eq!(notice.message, "hi");
    assert_eq!(
        serde_json::to_value(&ServerEvent::ReceiveMessage(notice)).unwrap()["data"]["createdAt"],
        body["data"]["createdAt"]
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn offline_receiver_still_gets_the_message_in_history() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;

    for (from, to, text) in [(&alice, &bob, "one"), (&alice, &bob, "two"), (&bob, &alice, "three")] {
        let (status, _) = h.send(from, to, text).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = h.get(&format!("/api/chat/conversation/{}", alice.id), Some(&bob.token)).await;
    let texts: Vec<&str> = body["messages"].as_array().unwrap().iter().map(|m| m["message"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn empty_message_or_unknown_receiver_is_rejected() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;

    let (status, body) = h
        .json(Method::POST, &format!("/api/chat/send/{}", bob.id), Some(&alice.token), json!({ "message": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Message is required");

    let (status, _) = h
        .json(Method::POST, "/api/chat/send/ghost", Some(&alice.token), json!({ "message": "hello?" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = h.get(&format!("/api/chat/conversation/{}", bob.id), Some(&alice.token)).await;
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn my_chats_lists_each_counterpart_once_with_the_last_message() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;
    let carol = h.signup("carol").await;

    h.send(&alice, &bob, "hi bob").await;
    h.send(&carol, &alice, "hi alice").await;
    h.send(&bob, &alice, "hey alice").await;

    let (status, body) = h.get("/api/chat/my-chats", Some(&alice.token)).await;
    assert_eq!(status, StatusCode::OK);
    let chats = body["chats"].as_array().unwrap();
    assert_eq!(chats.len(), 2);
    assert_eq!(chats[0]["user"]["name"], "bob");
    assert_eq!(chats[0]["lastMessage"], "hey alice");
    assert_eq!(chats[1]["user"]["name"], "carol");
    assert_eq!(chats[1]["lastMessage"], "hi alice");
}

async fn wait_for_presence(h: &Harness, user_id: &str, online: bool) {
    timeout(Duration::from_secs(5), async {
        while h.state.relay.presence().lookup(user_id).is_some() != online {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn joined_socket_receives_messages_sent_over_http() {
    let h = Harness::new().await;
    let alice = h.signup("alice").await;
    let bob = h.signup("bob").await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(axum::serve(listener, h.app.clone()).into_future());

    let (mut socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    socket
        .send(Message::Text(json!({ "event": "join", "data": bob.id }).to_string().into()))
        .await
        .unwrap();
    wait_for_presence(&h, &bob.id, true).await;

    socket.send(Message::Text("not a frame".to_owned().into())).await.unwrap();

    let (status, _) = h.send(&alice, &bob, "see you at the beach").await;
    assert_eq!(status, StatusCode::CREATED);

    let frame = timeout(Duration::from_secs(5), socket.next()).await.unwrap().unwrap().unwrap();
    let Message::Text(text) = frame else {
        panic!("expected a text frame, got {frame:?}");
    };
    let event: Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(event["event"], "receiveMessage");
    assert_eq!(event["data"]["sender"], alice.id.as_str());
    assert_eq!(event["data"]["message"], "see you at the beach");

    socket.close(None).await.unwrap();
    wait_for_presence(&h, &bob.id, false).await;

    server.abort();
}
