//! Tests for utero-llm: request types, Gemini response parsing, advice client

use std::sync::{Arc, Mutex};
use utero_core::{CyclePhase, Error, Mood};
use utero_llm::gemini::{extract_text, GenerateContentResponse};
use utero_llm::*;

// ===========================================================================
// Mock provider
// ===========================================================================

enum MockBehavior {
    Text(String),
    Error,
}

struct MockProvider {
    behavior: MockBehavior,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    fn text(s: &str) -> Arc<Self> {
        Arc::new(Self {
            behavior: MockBehavior::Text(s.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            behavior: MockBehavior::Error,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: LlmRequest) -> LlmResult<String> {
        self.requests.lock().unwrap().push(request);
        match &self.behavior {
            MockBehavior::Text(s) => Ok(s.clone()),
            MockBehavior::Error => Err(LlmError::RateLimited { retry_after_ms: 1000 }),
        }
    }
}

fn client(provider: &Arc<MockProvider>) -> AdviceClient {
    AdviceClient::new(provider.clone())
}

// ===========================================================================
// LlmRequest
// ===========================================================================

#[test]
fn llm_request_default() {
    let req = LlmRequest::default();
    assert_eq!(req.model, "gemini-2.5-flash");
    assert!(req.prompt.is_empty());
    assert!(req.response_schema.is_none());
    assert!(req.system.is_none());
}

#[test]
fn advice_types_use_camel_case() {
    let advice: NutritionAdvice =
        serde_json::from_str(r#"{"foodsToEat":["Spinach"],"foodsToAvoid":["Caffeine"]}"#).unwrap();
    assert_eq!(advice.foods_to_eat, vec!["Spinach"]);
    let rec = ProductRecommendation {
        product_name: "Cup".into(),
        product_type: "Menstrual Cup".into(),
        recommendation: "Reusable".into(),
    };
    let json = serde_json::to_value(&rec).unwrap();
    assert_eq!(json["productName"], "Cup");
    assert_eq!(json["productType"], "Menstrual Cup");
}

// ===========================================================================
// Gemini response parsing
// ===========================================================================

#[test]
fn extract_text_joins_parts() {
    let resp: GenerateContentResponse = serde_json::from_str(
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"there"}]},"finishReason":"STOP"}]}"#,
    )
    .unwrap();
    assert_eq!(extract_text(&resp).unwrap(), "Hello there");
}

#[test]
fn extract_text_no_candidates_is_invalid() {
    let resp: GenerateContentResponse =
        serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
    let err = extract_text(&resp).unwrap_err();
    assert!(matches!(err, LlmError::InvalidResponse(ref m) if m.contains("SAFETY")));
}

#[test]
fn extract_text_empty_candidate_is_invalid() {
    let resp: GenerateContentResponse =
        serde_json::from_str(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#).unwrap();
    assert!(matches!(extract_text(&resp), Err(LlmError::InvalidResponse(_))));
}

#[test]
fn gemini_provider_name() {
    let p = GeminiProvider::new("key");
    assert_eq!(p.name(), "gemini");
}

#[tokio::test]
async fn gemini_provider_without_key_fails_fast() {
    let p = GeminiProvider::new("");
    let err = p.generate(LlmRequest::new("gemini-2.5-flash", "hi")).await.unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey));
}

// ===========================================================================
// AdviceClient
// ===========================================================================

#[tokio::test]
async fn symptom_advice_empty_input_skips_model() {
    let mock = MockProvider::text("unused");
    let text = client(&mock).symptom_advice(&[], None).await.unwrap();
    assert_eq!(text, "No symptoms or mood selected.");
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn symptom_advice_trims_and_prompts() {
    let mock = MockProvider::text("  Drink water.\n");
    let text = client(&mock)
        .symptom_advice(&["Cramps".into()], Some(Mood::Sad))
        .await
        .unwrap();
    assert_eq!(text, "Drink water.");
    let reqs = mock.requests();
    assert_eq!(reqs.len(), 1);
    assert!(reqs[0].prompt.contains("Cramps"));
    assert!(reqs[0].prompt.contains("My current mood is: Sad."));
    assert!(reqs[0].response_schema.is_none());
}

#[tokio::test]
async fn mood_quote_uses_mood_name() {
    let mock = MockProvider::text("Keep going.");
    let quote = client(&mock).mood_quote(Mood::VerySad).await.unwrap();
    assert_eq!(quote, "Keep going.");
    assert!(mock.requests()[0].prompt.contains("'Very Sad'"));
}

#[tokio::test]
async fn nutrition_advice_parses_json_with_schema() {
    let mock = MockProvider::text(r#"{"foodsToEat":["Lentils","Salmon"],"foodsToAvoid":["Alcohol"]}"#);
    let advice = client(&mock).nutrition_advice(CyclePhase::Luteal).await.unwrap();
    assert_eq!(advice.foods_to_eat, vec!["Lentils", "Salmon"]);
    assert_eq!(advice.foods_to_avoid, vec!["Alcohol"]);
    let req = &mock.requests()[0];
    assert!(req.prompt.contains("Luteal phase"));
    let schema = req.response_schema.as_ref().unwrap();
    assert_eq!(schema["required"][0], "foodsToEat");
}

#[tokio::test]
async fn nutrition_advice_bad_json_is_upstream_error() {
    let mock = MockProvider::text("not json at all");
    let err = client(&mock).nutrition_advice(CyclePhase::Follicular).await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to get nutrition advice from AI.");
}

#[tokio::test]
async fn craving_advice_blank_input() {
    let mock = MockProvider::text("unused");
    let text = client(&mock).craving_advice("   ").await.unwrap();
    assert_eq!(text, "Please tell me what you're craving.");
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn product_recommendations_parse_list() {
    let mock = MockProvider::text(
        r#"[{"productName":"Organic Pads","productType":"Pad","recommendation":"Gentle"}]"#,
    );
    let prefs = ProductPreferences {
        flow: "Heavy".into(),
        activity: "High".into(),
        preferences: vec!["Pads".into(), "Cups".into()],
    };
    let recs = client(&mock).product_recommendations(&prefs).await.unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].product_type, "Pad");
    assert!(mock.requests()[0].prompt.contains("Product Types of Interest: Pads, Cups"));
}

#[tokio::test]
async fn provider_failure_maps_to_friendly_message() {
    let mock = MockProvider::failing();
    let err = client(&mock).craving_advice("chocolate").await.unwrap_err();
    assert!(matches!(err, Error::Upstream { ref service, .. } if service == "advice"));
    assert_eq!(err.user_message(), "Failed to get craving advice from AI.");
}

#[tokio::test]
async fn custom_model_is_forwarded() {
    let mock = MockProvider::text("ok");
    let c = client(&mock).with_model("gemini-2.5-pro");
    c.mood_quote(Mood::Happy).await.unwrap();
    assert_eq!(mock.requests()[0].model, "gemini-2.5-pro");
}
