//! End-to-end tests for the feed cache over the HTTP transport.
//!
//! Each test starts its own wiremock server, so the engine, the reqwest
//! client and the JSON envelopes are exercised together.

use farmfeed::model::Role;
use farmfeed::{
    Author, EngineSettings, ErrorKind, Feed, FeedCacheEngine, HttpFeedApi, Outcome, PageRequest,
    PostDraft, PostFilter, SkipReason, StoryFilter,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn viewer() -> Author {
    Author {
        id: "me".to_string(),
        name: "Viewer".to_string(),
        avatar: None,
        verified: false,
        role: Role::User,
    }
}

fn post_json(id: &str, author: &str, minute: u32) -> Value {
    json!({
        "_id": id,
        "author": { "_id": author, "name": format!("Farmer {author}") },
        "content": format!("post {id}"),
        "createdAt": format!("2024-03-01T10:{minute:02}:00Z"),
        "likes": []
    })
}

fn posts(range: std::ops::Range<u32>) -> Vec<Value> {
    range
        .map(|i| post_json(&format!("p{i}"), "u1", 59 - i))
        .collect()
}

fn story_json(id: &str, category: &str, day: u32) -> Value {
    json!({
        "_id": id,
        "author": { "_id": "u1", "name": "Asha" },
        "title": format!("Story {id}"),
        "content": "word ".repeat(400),
        "category": category,
        "createdAt": format!("2024-03-{day:02}T08:00:00Z")
    })
}

async fn engine(server: &MockServer) -> FeedCacheEngine<HttpFeedApi> {
    let api = HttpFeedApi::new(&format!("{}/api", server.uri()), None)
        .unwrap()
        .with_retry_base_delay(Duration::ZERO)
        .with_max_retries(0);
    FeedCacheEngine::new(Arc::new(api), EngineSettings::new(viewer()))
}

async fn mount_posts_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": posts(0..10) })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": posts(10..14) })))
        .mount(server)
        .await;
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_two_pages_then_exhausted() {
    let server = MockServer::start().await;
    mount_posts_pages(&server).await;
    let engine = engine(&server).await;

    engine.fetch_posts(PageRequest::first()).await.unwrap();
    let second = engine.load_more_posts().await.unwrap().applied().unwrap();
    assert_eq!(second.received, 4);
    assert!(!second.has_more);

    assert_eq!(
        engine.load_more_posts().await.unwrap(),
        Outcome::Skipped(SkipReason::Exhausted)
    );
    assert_eq!(engine.visible_posts(&PostFilter::new()).len(), 14);
    assert_eq!(engine.page(Feed::Posts), 2);
    assert!(engine.last_fetched_at(Feed::Posts).is_some());
    // The exhausted load never reached the server.
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_server_has_more_false_stops_full_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": posts(0..10),
            "pagination": { "page": 1, "hasMore": false }
        })))
        .mount(&server)
        .await;
    let engine = engine(&server).await;

    engine.fetch_posts(PageRequest::first()).await.unwrap();
    assert!(!engine.has_more(Feed::Posts));
}

#[tokio::test]
async fn test_overlapping_pages_are_deduplicated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": posts(0..10) })))
        .mount(&server)
        .await;
    // A new post shifted the window by one.
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": posts(9..13) })))
        .mount(&server)
        .await;
    let engine = engine(&server).await;

    engine.fetch_posts(PageRequest::first()).await.unwrap();
    let second = engine.load_more_posts().await.unwrap().applied().unwrap();
    assert_eq!(second.received, 4);
    assert_eq!(second.inserted, 3);
    assert_eq!(engine.visible_posts(&PostFilter::new()).len(), 13);
}

#[tokio::test]
async fn test_stories_filtered_and_sorted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stories"))
        .and(query_param("limit", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                story_json("s1", "irrigation", 2),
                story_json("s2", "livestock", 5),
                story_json("s3", "irrigation", 9)
            ]
        })))
        .mount(&server)
        .await;
    let engine = engine(&server).await;

    engine.fetch_stories(PageRequest::first()).await.unwrap();
    let visible: Vec<String> = engine
        .visible_stories(&StoryFilter::new().category("irrigation"))
        .iter()
        .map(|e| e.id().to_string())
        .collect();
    assert_eq!(visible, vec!["s3", "s1"]);
    assert_eq!(engine.story("s1").unwrap().value().read_time(), 2);
}

#[tokio::test]
async fn test_story_detail_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stories/s7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": story_json("s7", "soil", 1) })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let engine = engine(&server).await;

    engine.fetch_story_by_id("s7").await.unwrap();
    let again = engine.fetch_story_by_id("s7").await.unwrap().applied().unwrap();
    assert_eq!(again.title, "Story s7");
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_create_post_multipart() {
    let server = MockServer::start().await;
    mount_posts_pages(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/posts"))
        .and(body_string_contains("Fresh tomatoes"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "data": post_json("server-1", "me", 59) })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let engine = engine(&server).await;
    engine.fetch_posts(PageRequest::first()).await.unwrap();

    let created = engine
        .create_post(PostDraft::new("Fresh tomatoes").with_tag("harvest"))
        .await
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(created.id, "server-1");

    let visible = engine.visible_posts(&PostFilter::new());
    assert_eq!(visible.len(), 11);
    assert_eq!(visible[0].id(), "server-1");
    assert!(!visible[0].is_temporary());
    assert!(engine.can_delete_post("server-1"));
}

#[tokio::test]
async fn test_like_applies_server_likes() {
    let server = MockServer::start().await;
    mount_posts_pages(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/posts/p3/like"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "likes": ["u4", "me"] } })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let engine = engine(&server).await;
    engine.fetch_posts(PageRequest::first()).await.unwrap();

    engine.like_post("p3").await.unwrap();
    let post = engine.post("p3").unwrap().into_inner();
    assert_eq!(post.likes, vec!["u4".to_string(), "me".to_string()]);
}

#[tokio::test]
async fn test_comment_appended() {
    let server = MockServer::start().await;
    mount_posts_pages(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/posts/p0/comments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {
                "_id": "c1",
                "author": { "_id": "me", "name": "Viewer" },
                "content": "Great yield",
                "createdAt": "2024-03-02T10:00:00Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let engine = engine(&server).await;
    engine.fetch_posts(PageRequest::first()).await.unwrap();

    engine.add_comment("p0", "Great yield").await.unwrap();
    let comments = engine.post("p0").unwrap().into_inner().comments;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].content, "Great yield");
}

#[tokio::test]
async fn test_forbidden_delete_surfaces_backend_message() {
    let server = MockServer::start().await;
    mount_posts_pages(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/api/posts/p2"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "Not your post" })),
        )
        .mount(&server)
        .await;
    let engine = engine(&server).await;
    engine.fetch_posts(PageRequest::first()).await.unwrap();

    let err = engine.delete_post("p2").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "Not your post");
    assert!(engine.post("p2").is_some());
    assert_eq!(engine.error().unwrap().message, "Not your post");
}

#[tokio::test]
async fn test_failed_page_keeps_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": posts(0..10) })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let engine = engine(&server).await;

    engine.fetch_posts(PageRequest::first()).await.unwrap();
    let err = engine.load_more_posts().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(engine.page(Feed::Posts), 1);
    assert!(engine.has_more(Feed::Posts));
    assert!(!engine.is_loading(Feed::Posts));
}
