mod common;

use attendance_core::domain::Role;
use axum::http::{Method, StatusCode};
use common::{RecordingChat, TestApp};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn assistant_is_unavailable_without_a_key() {
    let app = TestApp::new();
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/assistant/chat",
            Some(&cookie),
            Some(json!({ "messages": [{ "role": "user", "content": "hi" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn employee_chat_sends_a_grounded_prompt() {
    let chat = Arc::new(RecordingChat::default());
    let app = TestApp::with_chat(chat.clone());
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/admin/knowledge",
            Some(&cookie),
            Some(json!({ "title": "x", "content": "y" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::POST,
            "/assistant/chat",
            Some(&cookie),
            Some(json!({ "messages": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" },
                { "role": "user", "content": "how much leave do I have?" }
            ] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Here is what I found.");
    assert_eq!(*chat.last_turns.lock().await, 3);

    let prompt = chat.last_prompt.lock().await.clone().unwrap();
    assert!(prompt.contains("Employee: Asha"));
    assert!(prompt.contains("Not checked in today"));
    assert!(prompt.contains("Annual leave:"));
}

#[tokio::test]
async fn malformed_conversations_are_rejected() {
    let chat = Arc::new(RecordingChat::default());
    let app = TestApp::with_chat(chat.clone());
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;

    for messages in [
        json!([]),
        json!([{ "role": "assistant", "content": "hello" }]),
        json!([{ "role": "user", "content": "a".repeat(4001) }]),
    ] {
        let (status, _) = app
            .request(
                Method::POST,
                "/assistant/chat",
                Some(&cookie),
                Some(json!({ "messages": messages })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert!(chat.last_prompt.lock().await.is_none());
}

#[tokio::test]
async fn insights_cover_the_whole_team() {
    let chat = Arc::new(RecordingChat::default());
    let app = TestApp::with_chat(chat.clone());
    let admin = app.seed_employee("Meera", Role::Admin, "password1").await;
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let admin_cookie = app.cookie_for(&admin).await;
    let cookie = app.cookie_for(&asha).await;
    let question = json!({ "messages": [{ "role": "user", "content": "who is late most often?" }] });

    let (status, _) = app
        .request(Method::POST, "/admin/insights/chat", Some(&cookie), Some(question.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::POST, "/admin/insights/chat", Some(&admin_cookie), Some(question))
        .await;
    assert_eq!(status, StatusCode::OK);

    let prompt = chat.last_prompt.lock().await.clone().unwrap();
    assert!(prompt.contains("Meera (meera@corp.in)"));
    assert!(prompt.contains("Asha (asha@corp.in)"));
}
