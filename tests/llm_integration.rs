//! Integration tests for the LLM client.
//!
//! These tests make real API calls to an OpenAI-compatible endpoint.
//! Run with: LLM_API_KEY=your_key cargo test --test llm_integration -- --ignored

use resume_forge::llm::{GenerationRequest, LlmClient, Message};

fn get_test_api_key() -> String {
    std::env::var("LLM_API_KEY").expect("LLM_API_KEY environment variable must be set for integration tests")
}

fn api_base() -> String {
    std::env::var("LLM_API_BASE").unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
}

fn create_test_client() -> LlmClient {
    LlmClient::new(
        api_base(),
        Some(get_test_api_key()),
        "gpt-4o-mini".to_string(),
        "text-embedding-3-small".to_string(),
    )
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_generation() {
    let client = create_test_client();

    let request = GenerationRequest::new(
        "",
        vec![
            Message::system("You are a helpful assistant. Reply concisely."),
            Message::user("What is 2 + 2? Reply with just the number."),
        ],
    )
    .with_max_tokens(10)
    .with_temperature(0.0);

    let response = client.chat(request).await;
    assert!(response.is_ok(), "Generation failed: {:?}", response.err());

    let content = response
        .expect("should have response")
        .first_content()
        .expect("should have content")
        .to_string();
    assert!(content.contains('4'), "response should contain '4', got: {content}");
}

#[tokio::test]
#[ignore]
async fn test_multi_turn_conversation() {
    let client = create_test_client();

    let request = GenerationRequest::new(
        "",
        vec![
            Message::system("You are a math tutor. Be concise."),
            Message::user("Remember the number 42."),
            Message::assistant("I'll remember 42."),
            Message::user("What number did I ask you to remember?"),
        ],
    )
    .with_max_tokens(20)
    .with_temperature(0.0);

    let response = client.chat(request).await.expect("generation should succeed");
    let content = response.first_content().expect("should have content");
    assert!(content.contains("42"), "response should mention 42, got: {content}");
}

#[tokio::test]
#[ignore]
async fn test_embeddings_are_nonempty_and_same_length() {
    let client = create_test_client();

    let vectors = client
        .embed(vec!["first résumé chunk".to_string(), "second résumé chunk".to_string()])
        .await
        .expect("embed request should succeed");

    assert_eq!(vectors.len(), 2);
    assert!(!vectors[0].is_empty());
    assert_eq!(vectors[0].len(), vectors[1].len());
}

#[tokio::test]
#[ignore]
async fn test_generation_with_high_temperature() {
    let client = create_test_client();

    let request = GenerationRequest::new("", vec![Message::user("Say hello in a creative way.")])
        .with_temperature(1.5)
        .with_max_tokens(50);

    let response = client.chat(request).await;
    assert!(response.is_ok(), "high temperature generation failed: {:?}", response.err());

    let content = response
        .expect("should have response")
        .first_content()
        .expect("should have content")
        .to_string();
    assert!(!content.is_empty(), "response should not be empty");
}

#[tokio::test]
async fn test_invalid_api_key() {
    let client = LlmClient::new(
        api_base(),
        Some("invalid-key".to_string()),
        "gpt-4o-mini".to_string(),
        "text-embedding-3-small".to_string(),
    );

    let request = GenerationRequest::new("", vec![Message::user("test")]).with_max_tokens(5);

    let response = client.chat(request).await;
    assert!(response.is_err(), "should fail with invalid API key");
}

#[tokio::test]
#[ignore]
async fn test_default_model_used() {
    let client = create_test_client();

    // empty model name should fall back to the client's configured chat model
    let request = GenerationRequest::new("", vec![Message::user("Say 'test' and nothing else.")])
        .with_max_tokens(10);

    let response = client.chat(request).await;
    assert!(response.is_ok(), "generation with default model failed: {:?}", response.err());
}
