//! Integration tests for the chat relay endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use mockito::Matcher;
    use serde_json::{Value, json};
    use tower::util::ServiceExt;

    use crate::test_utils::{body_to_string, test_app, test_config};

    const UNREACHABLE: &str = "http://127.0.0.1:1";

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn transcript(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                // Oldest first, always ending with a user message
                let role = if (n - i) % 2 == 1 { "user" } else { "assistant" };
                json!({"role": role, "content": format!("message {}", i)})
            })
            .collect()
    }

    /// Tests the relay rejects bodies without a messages array
    #[tokio::test]
    async fn it_returns_400_for_missing_messages() {
        for body in [json!({}), json!({"messages": "hello"}), json!({"message": []})] {
            let app = test_app(test_config(UNREACHABLE, None));
            let response = app.oneshot(post("/api/chat", body)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_to_string(response.into_body()).await;
            assert!(body.contains("Missing messages array"));
        }
    }

    /// Tests a non-JSON body is a validation error, not a crash
    #[tokio::test]
    async fn it_returns_400_for_invalid_json() {
        let app = test_app(test_config(UNREACHABLE, None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/chat")
                    .method("POST")
                    .body(Body::from("definitely not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Tests the shared secret blocks requests before reaching upstream
    #[tokio::test]
    async fn it_returns_401_without_the_shared_secret() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let app = test_app(test_config(&server.url(), Some("hunter2")));

        let response = app
            .clone()
            .oneshot(post("/api/chat", json!({"messages": transcript(1)})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut wrong = post("/api/chat", json!({"messages": transcript(1)}));
        wrong
            .headers_mut()
            .insert("x-errorify-password", "hunter3".parse().unwrap());
        let response = app.oneshot(wrong).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        upstream.assert_async().await;
    }

    /// Tests the shared secret is accepted from the header or query
    #[tokio::test]
    async fn it_accepts_the_shared_secret() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .expect(2)
            .create_async()
            .await;

        let app = test_app(test_config(&server.url(), Some("hunter2")));

        let mut with_header = post("/api/chat", json!({"messages": transcript(1)}));
        with_header
            .headers_mut()
            .insert("x-errorify-password", "hunter2".parse().unwrap());
        let response = app.clone().oneshot(with_header).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let with_query = post("/api/chat?password=hunter2", json!({"messages": transcript(1)}));
        let response = app.oneshot(with_query).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        upstream.assert_async().await;
    }

    /// Tests only the newest twelve messages are forwarded, with the
    /// default model, token cap and credentials
    #[tokio::test]
    async fn it_forwards_the_last_twelve_messages() {
        let mut server = mockito::Server::new_async().await;
        let messages = transcript(15);
        let upstream_body = r#"{"id": "chatcmpl-1", "choices": [{"message": {"role": "assistant", "content": "Hi"}}]}"#;

        let upstream = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-api-key")
            .match_body(Matcher::Json(json!({
                "model": "gpt-4o",
                "messages": messages[3..].to_vec(),
                "max_tokens": 256,
            })))
            .with_status(200)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_body(upstream_body)
            .create_async()
            .await;

        let app = test_app(test_config(&server.url(), None));
        let response = app
            .oneshot(post("/api/chat", json!({"messages": messages})))
            .await
            .unwrap();

        upstream.assert_async().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json; charset=utf-8"
        );

        // Passed through byte for byte
        let body = body_to_string(response.into_body()).await;
        assert_eq!(body, upstream_body);
    }

    /// Tests the caller can pick the model
    #[tokio::test]
    async fn it_uses_the_requested_model() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4.1"})))
            .with_status(200)
            .with_body(r#"{"output":"ok"}"#)
            .create_async()
            .await;

        let app = test_app(test_config(&server.url(), None));
        let response = app
            .oneshot(post(
                "/api/chat",
                json!({"messages": transcript(2), "model": "gpt-4.1"}),
            ))
            .await
            .unwrap();

        upstream.assert_async().await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    /// Tests upstream JSON errors are relayed with their status
    #[tokio::test]
    async fn it_relays_upstream_json_errors() {
        let mut server = mockito::Server::new_async().await;
        let _upstream = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"boom"}"#)
            .create_async()
            .await;

        let app = test_app(test_config(&server.url(), None));
        let response = app
            .oneshot(post("/api/chat", json!({"messages": transcript(1)})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
        assert_eq!(body, json!({"error": "boom"}));
    }

    /// Tests upstream text errors are relayed with their status
    #[tokio::test]
    async fn it_relays_upstream_text_errors() {
        let mut server = mockito::Server::new_async().await;
        let _upstream = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let app = test_app(test_config(&server.url(), None));
        let response = app
            .oneshot(post("/api/chat", json!({"messages": transcript(1)})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_to_string(response.into_body()).await, "boom");
    }

    /// Tests a relay that can't reach upstream still answers
    #[tokio::test]
    async fn it_returns_500_when_upstream_is_unreachable() {
        let app = test_app(test_config(UNREACHABLE, None));
        let response = app
            .oneshot(post("/api/chat", json!({"messages": transcript(1)})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.starts_with("Something went wrong"));
    }

    /// Tests the mock endpoint echoes the last user message
    #[tokio::test]
    async fn it_replies_from_the_mock_endpoint() {
        let app = test_app(test_config(UNREACHABLE, None));
        let response = app
            .oneshot(post(
                "/api/chat-mock",
                json!({"messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
        assert_eq!(body["choices"][0]["message"]["content"], "Mock reply to: \"hi\"");
    }

    /// Tests the mock endpoint skips trailing assistant messages
    #[tokio::test]
    async fn it_mocks_the_latest_user_message() {
        let app = test_app(test_config(UNREACHABLE, None));
        let response = app
            .oneshot(post(
                "/api/chat-mock",
                json!({"messages": [
                    {"role": "user", "content": "first"},
                    {"role": "assistant", "content": "reply"},
                    {"role": "user", "content": "second"},
                    {"role": "assistant", "content": "another"}
                ]}),
            ))
            .await
            .unwrap();

        let body: Value = serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
        assert_eq!(body["choices"][0]["message"]["content"], "Mock reply to: \"second\"");
    }

    /// Tests the mock endpoint is protected like the relay
    #[tokio::test]
    async fn it_protects_the_mock_endpoint() {
        let app = test_app(test_config(UNREACHABLE, Some("hunter2")));
        let response = app
            .clone()
            .oneshot(post("/api/chat-mock", json!({"messages": transcript(1)})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(post("/api/chat-mock?password=hunter2", json!({"messages": []})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
        assert_eq!(body["choices"][0]["message"]["content"], "Mock reply to: \"\"");
    }
}
