/*!
 * Tests for model clients
 */

use booktrans::ProviderError;
use booktrans::providers::mock::MockModelClient;
use booktrans::providers::ollama::{Ollama, parse_generation_response};
use booktrans::providers::{GenerateRequest, ModelClient};

fn request(prompt: &str) -> GenerateRequest {
    GenerateRequest::new("test-model", prompt)
}

#[test]
fn test_generateRequest_builders_shouldOverrideSampling() {
    let request = request("p").temperature(0.7).top_p(0.5);
    assert_eq!(request.temperature, 0.7);
    assert_eq!(request.top_p, 0.5);
    assert_eq!(GenerateRequest::new("m", "p").temperature, 0.3);
}

#[tokio::test]
async fn test_mock_working_shouldReturnFixedReplyAndRecordPrompts() {
    let client = MockModelClient::working("Hola");

    let response = client.generate(&request("Hello")).await.unwrap();

    assert_eq!(response.text, "Hola");
    assert_eq!(client.request_count(), 1);
    assert_eq!(client.prompts(), vec!["Hello".to_string()]);
    assert!(client.is_healthy().await);
}

#[test]
fn test_mock_echo_shouldReturnPrompt() {
    let client = MockModelClient::echo();
    let response = tokio_test::block_on(client.generate(&request("Say this"))).unwrap();
    assert_eq!(response.text, "Say this");
}

#[tokio::test]
async fn test_mock_sequence_shouldPlayScriptThenFail() {
    let client = MockModelClient::sequence([
        Err(ProviderError::Timeout(5)),
        Ok("Bonjour".to_string()),
    ]);

    assert_eq!(client.generate(&request("a")).await, Err(ProviderError::Timeout(5)));
    assert_eq!(client.generate(&request("b")).await.unwrap().text, "Bonjour");
    assert!(matches!(
        client.generate(&request("c")).await,
        Err(ProviderError::ConnectionError(_))
    ));
    assert!(!client.is_healthy().await);
}

#[tokio::test]
async fn test_mock_intermittent_shouldFailEveryNthCall() {
    let client = MockModelClient::intermittent(3);
    let mut failures = 0;
    for i in 0..6 {
        if client.generate(&request(&i.to_string())).await.is_err() {
            failures += 1;
        }
    }
    assert_eq!(failures, 2);
}

#[tokio::test]
async fn test_mock_clone_shouldShareCounters() {
    let client = MockModelClient::working("x");
    let clone = client.clone();
    clone.generate(&request("a")).await.unwrap();
    assert_eq!(client.request_count(), 1);
}

#[test]
fn test_parseGenerationResponse_withJsonLines_shouldConcatenate() {
    let body = "{\"model\":\"m\",\"response\":\"Hola \",\"done\":false}\n{\"model\":\"m\",\"response\":\"mundo\",\"done\":true,\"eval_count\":2}\n";
    let parsed = parse_generation_response(body).unwrap();

    assert_eq!(parsed.response, "Hola mundo");
    assert_eq!(parsed.eval_count, Some(2));
}

#[test]
fn test_parseGenerationResponse_withGarbage_shouldFail() {
    assert!(matches!(
        parse_generation_response("<html>bad gateway</html>"),
        Err(ProviderError::ParseError(_))
    ));
}

#[test]
fn test_ollama_new_shouldTrimTrailingSlash() {
    let client = Ollama::from_url("http://localhost:11434/");
    assert_eq!(client.base_url(), "http://localhost:11434");
    assert_eq!(client.name(), "ollama");
}
