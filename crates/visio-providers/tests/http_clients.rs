//! HTTP behaviour of the provider clients against a mock server

use serde_json::json;
use visio_protocol::{AiModel, ContextEntry, ModelConfig, ModelConfigPatch, Provider};
use visio_providers::{
    CompletionClient, OpenAICompatibleClient, ProviderConfig, ProviderError, RelayClient,
    VisionClient,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn params_for(model: AiModel) -> visio_protocol::ModelParameters {
    let mut config = ModelConfig::default();
    config.apply(ModelConfigPatch::model(model));
    config.parameters()
}

fn context() -> Vec<ContextEntry> {
    vec![
        ContextEntry::system("Previous conversation summary:\nTopics discussed: ownership"),
        ContextEntry::user("and borrowing?"),
    ]
}

#[tokio::test]
async fn openai_completion_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system"},
                {"role": "user", "content": "and borrowing?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Borrowing lends access."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 21, "completion_tokens": 5, "total_tokens": 26}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::openai("sk-test")
        .with_base_url(server.uri())
        .with_model("gpt-4o-mini");
    let client = OpenAICompatibleClient::new(config).unwrap();

    let completion = client
        .submit(&context(), &params_for(AiModel::NekoLabsGpt4o))
        .await
        .unwrap();
    assert_eq!(completion.content, "Borrowing lends access.");
    assert_eq!(completion.usage.prompt_tokens, 21);
    assert_eq!(completion.usage.completion_tokens, 5);
    assert_eq!(client.provider(), Provider::OpenAI);
}

#[tokio::test]
async fn openai_rate_limit_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let client =
        OpenAICompatibleClient::new(ProviderConfig::openai("k").with_base_url(server.uri()))
            .unwrap();
    let err = client
        .submit(&context(), &params_for(AiModel::NekoLabsGpt4o))
        .await
        .unwrap_err();

    assert_eq!(err.retry_after_ms(), Some(7_000));
}

#[tokio::test]
async fn openai_server_error_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": {"message": "upstream exploded"}})),
        )
        .mount(&server)
        .await;

    let client =
        OpenAICompatibleClient::new(ProviderConfig::openai("k").with_base_url(server.uri()))
            .unwrap();
    let err = client
        .submit(&context(), &params_for(AiModel::NekoLabsGpt4o))
        .await
        .unwrap_err();

    match err {
        ProviderError::InvalidResponse(msg) => assert!(msg.contains("upstream exploded")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn openai_vision_sends_image_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "what is this?"},
                    {"type": "image_url", "image_url": {"url": "https://img.test/cat.png"}}
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "A cat on a mat."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        OpenAICompatibleClient::new(ProviderConfig::openai("k").with_base_url(server.uri()))
            .unwrap();
    let description = client
        .analyze_image("https://img.test/cat.png", "what is this?", &[])
        .await
        .unwrap();
    assert_eq!(description.description, "A cat on a mat.");
}

#[tokio::test]
async fn nekolabs_relay_flattens_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/gpt/4o"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": "Borrowing lends access without ownership."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RelayClient::new(ProviderConfig::nekolabs().with_base_url(server.uri())).unwrap();
    let completion = client
        .submit(&context(), &params_for(AiModel::NekoLabsGpt4o))
        .await
        .unwrap();

    assert_eq!(completion.content, "Borrowing lends access without ownership.");
    assert!(completion.usage.prompt_tokens > 0);
    assert_eq!(completion.usage.completion_tokens, 11);

    let requests = server.received_requests().await.unwrap();
    let url = &requests[0].url;
    let text = url
        .query_pairs()
        .find(|(k, _)| k == "text")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert!(text.contains("Topics discussed: ownership"));
    assert!(text.contains("User: and borrowing?"));
}

#[tokio::test]
async fn resita_relay_sends_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/aicoding"))
        .and(query_param("apikey", "resita-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Hello from Resita"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        RelayClient::new(ProviderConfig::resita("resita-key").with_base_url(server.uri()))
            .unwrap();
    let completion = client
        .submit(&context(), &params_for(AiModel::ResitaClaude))
        .await
        .unwrap();
    assert_eq!(completion.content, "Hello from Resita");
}

#[tokio::test]
async fn relay_unsuccessful_envelope_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/aicoding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "invalid apikey"
        })))
        .mount(&server)
        .await;

    let client =
        RelayClient::new(ProviderConfig::resita("bad").with_base_url(server.uri())).unwrap();
    let err = client
        .submit(&context(), &params_for(AiModel::ResitaChatGpt))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(ref m) if m == "invalid apikey"));
}

#[tokio::test]
async fn relay_rejects_empty_last_entry() {
    let client = RelayClient::new(ProviderConfig::nekolabs()).unwrap();
    let err = client
        .submit(
            &[ContextEntry::user("   ")],
            &params_for(AiModel::NekoLabsGpt4o),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::EmptyRequest(_)));
}

#[tokio::test]
async fn nekolabs_vision_passes_image_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/gpt/5"))
        .and(query_param("imageUrl", "https://img.test/dog.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": "A golden retriever."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RelayClient::new(ProviderConfig::nekolabs().with_base_url(server.uri())).unwrap();
    let history = vec![ContextEntry::user("I got a dog")];
    let description = client
        .analyze_image("https://img.test/dog.jpg", "what breed?", &history)
        .await
        .unwrap();
    assert_eq!(description.description, "A golden retriever.");

    let requests = server.received_requests().await.unwrap();
    let text = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "text")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(
        text,
        "Previous conversation:\nUser: I got a dog\n\nCurrent question: what breed?"
    );
}

#[tokio::test]
async fn nekolabs_vision_rejects_inline_images() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = RelayClient::new(ProviderConfig::nekolabs().with_base_url(server.uri())).unwrap();
    let inline = format!("data:image/png;base64,{}", "iVBOR".repeat(200_000));
    let err = client
        .analyze_image(&inline, "what?", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidImage(_)));
}
