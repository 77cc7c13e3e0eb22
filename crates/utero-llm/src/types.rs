//! LLM request and advice types

use serde::{Deserialize, Serialize};

pub const DEFAULT_ADVICE_MODEL: &str = "gemini-2.5-flash";

/// Single-turn generation request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// When set, the response is constrained to JSON matching this schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for LlmRequest {
    fn default() -> Self {
        Self {
            model: DEFAULT_ADVICE_MODEL.to_string(),
            prompt: String::new(),
            system: None,
            response_schema: None,
            temperature: None,
        }
    }
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionAdvice {
    pub foods_to_eat: Vec<String>,
    pub foods_to_avoid: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecommendation {
    pub product_name: String,
    pub product_type: String,
    pub recommendation: String,
}

/// Inputs to the product advisor
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProductPreferences {
    pub flow: String,
    pub activity: String,
    pub preferences: Vec<String>,
}
