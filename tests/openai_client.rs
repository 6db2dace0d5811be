//! OpenAI client behaviour against a mock HTTP server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use contract_analyzer::assistant::{
    AnalysisService, AssistantError, FileHandle, MessageContent, OpenAiClient, Role, RunHandle,
    RunStatus, ThreadHandle,
};

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(format!("{}/", server.uri()), "sk-test", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_upload_sends_auth_and_beta_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-abc",
            "object": "file",
            "purpose": "assistants"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = client(&server)
        .upload_file("lease.pdf", b"%PDF-1.4".to_vec())
        .await
        .unwrap();
    assert_eq!(handle, FileHandle::new("file-abc"));
}

#[tokio::test]
async fn test_verify_file_access() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/file-ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "file-ok" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/file-gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "message": "No such File object: file-gone", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.verify_file_access(&FileHandle::new("file-ok")).await);
    assert!(!client.verify_file_access(&FileHandle::new("file-gone")).await);
}

#[tokio::test]
async fn test_delete_file() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/files/file-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-1", "object": "file", "deleted": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/files/file-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-2", "object": "file", "deleted": false
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    client.delete_file(&FileHandle::new("file-1")).await.unwrap();
    assert!(client.delete_file(&FileHandle::new("file-2")).await.is_err());
}

#[tokio::test]
async fn test_message_attaches_file_for_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/messages"))
        .and(body_partial_json(json!({
            "role": "user",
            "content": "Analyze it",
            "attachments": [{ "file_id": "file-1", "tools": [{ "type": "file_search" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = client(&server)
        .send_message(
            &ThreadHandle::new("thread_1"),
            "Analyze it",
            Some(&FileHandle::new("file-1")),
        )
        .await
        .unwrap();
    assert_eq!(handle.as_str(), "msg_1");
}

#[tokio::test]
async fn test_start_run_and_poll_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs"))
        .and(body_partial_json(json!({ "assistant_id": "asst_1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1", "status": "queued"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "expired",
            "last_error": null
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let thread = ThreadHandle::new("thread_1");
    let run = client.start_run(&thread, "asst_1").await.unwrap();
    assert_eq!(run, RunHandle::new("run_1"));
    assert_eq!(
        client.get_run_status(&thread, &run).await.unwrap(),
        RunStatus::Failed
    );
}

#[tokio::test]
async fn test_list_messages_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("after", "msg_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "msg_3", "role": "assistant", "content": "plain answer" }
            ],
            "has_more": false,
            "last_id": "msg_3"
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("order", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "msg_1", "role": "user", "content": [
                    { "type": "text", "text": { "value": "Analyze the PDF", "annotations": [] } }
                ]},
                { "id": "msg_2", "role": "assistant", "content": [
                    { "type": "text", "text": { "value": "Structured answer", "annotations": [] } },
                    { "type": "image_file", "image_file": { "file_id": "file-img" } }
                ]}
            ],
            "has_more": true,
            "last_id": "msg_2"
        })))
        .mount(&server)
        .await;

    let messages = client(&server)
        .list_messages(&ThreadHandle::new("thread_1"))
        .await
        .unwrap();

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(
        messages[1].content,
        vec![
            MessageContent::StructuredItem {
                text: "Structured answer".to_string()
            },
            MessageContent::Unrecognized,
        ]
    );
    assert_eq!(
        messages[2].content,
        vec![MessageContent::PlainText("plain answer".to_string())]
    );
}

#[tokio::test]
async fn test_list_messages_stops_when_cursor_repeats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "msg_1", "role": "assistant", "content": "Lease term is 36 months." }
            ],
            "has_more": true,
            "last_id": "msg_1"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let messages = tokio::time::timeout(
        Duration::from_secs(5),
        client(&server).list_messages(&ThreadHandle::new("thread_1")),
    )
    .await
    .expect("listing should not loop forever")
    .unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].content,
        vec![MessageContent::PlainText("Lease term is 36 months.".to_string())]
    );
}

#[tokio::test]
async fn test_api_error_uses_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let err = client(&server).create_thread().await.unwrap_err();
    match err {
        AssistantError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
