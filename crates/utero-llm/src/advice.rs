//! Advice client: symptom remedies, mood quotes, nutrition, cravings, products
//!
//! Every failure is logged with its cause and surfaced as an
//! `Error::Upstream` carrying a short user-facing message.

use crate::provider::{LlmError, LlmProvider};
use crate::types::{LlmRequest, NutritionAdvice, ProductPreferences, ProductRecommendation, DEFAULT_ADVICE_MODEL};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};
use utero_core::{CyclePhase, Error, Mood, Result};

const SERVICE: &str = "advice";

pub struct AdviceClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl AdviceClient {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: DEFAULT_ADVICE_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn text(&self, prompt: String, what: &str, failure: &str) -> Result<String> {
        debug!(provider = self.provider.name(), model = %self.model, "requesting {}", what);
        match self.provider.generate(LlmRequest::new(&self.model, prompt)).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => Err(upstream(what, failure, e)),
        }
    }

    async fn structured<T: DeserializeOwned>(
        &self,
        prompt: String,
        schema: serde_json::Value,
        what: &str,
        failure: &str,
    ) -> Result<T> {
        debug!(provider = self.provider.name(), model = %self.model, "requesting {}", what);
        let request = LlmRequest::new(&self.model, prompt).with_schema(schema);
        let text = self
            .provider
            .generate(request)
            .await
            .map_err(|e| upstream(what, failure, e))?;
        serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            upstream(what, failure, LlmError::InvalidResponse(e.to_string()))
        })
    }

    pub async fn symptom_advice(&self, symptoms: &[String], mood: Option<Mood>) -> Result<String> {
        if symptoms.is_empty() && mood.is_none() {
            return Ok("No symptoms or mood selected.".to_string());
        }
        self.text(
            symptom_prompt(symptoms, mood),
            "symptom advice",
            "Failed to get symptom advice from AI.",
        )
        .await
    }

    pub async fn mood_quote(&self, mood: Mood) -> Result<String> {
        let prompt = format!(
            "Generate a short, single-sentence motivational quote for someone feeling '{}'. \
             The quote should be uplifting and encouraging. Do not include quotation marks or any introductory text.",
            mood
        );
        self.text(prompt, "mood quote", "Failed to get mood quote from AI.")
            .await
    }

    pub async fn nutrition_advice(&self, phase: CyclePhase) -> Result<NutritionAdvice> {
        let prompt = format!(
            "I am in the {} phase of my menstrual cycle. Provide nutrition advice.",
            phase
        );
        self.structured(
            prompt,
            nutrition_schema(),
            "nutrition advice",
            "Failed to get nutrition advice from AI.",
        )
        .await
    }

    pub async fn craving_advice(&self, craving: &str) -> Result<String> {
        let craving = craving.trim();
        if craving.is_empty() {
            return Ok("Please tell me what you're craving.".to_string());
        }
        let prompt = format!(
            "I'm having a food craving for \"{}\". Please suggest 2-3 healthier alternatives that could satisfy this craving. \
             For each suggestion, provide a brief (1-2 sentence) explanation of why it's a good alternative. \
             Format the response with bullet points for readability. \
             Frame it as helpful advice, but do not add a greeting or sign-off.",
            craving
        );
        self.text(prompt, "craving advice", "Failed to get craving advice from AI.")
            .await
    }

    pub async fn product_recommendations(
        &self,
        prefs: &ProductPreferences,
    ) -> Result<Vec<ProductRecommendation>> {
        let prompt = format!(
            "Recommend menstrual products based on these preferences: Flow: {}, Activity Level: {}, \
             Product Types of Interest: {}. Provide 3 recommendations.",
            prefs.flow,
            prefs.activity,
            prefs.preferences.join(", ")
        );
        self.structured(
            prompt,
            product_schema(),
            "product recommendations",
            "Failed to get product recommendations from AI.",
        )
        .await
    }
}

fn upstream(what: &str, failure: &str, cause: LlmError) -> Error {
    error!("Error fetching {}: {}", what, cause);
    Error::upstream(SERVICE, failure)
}

fn symptom_prompt(symptoms: &[String], mood: Option<Mood>) -> String {
    let mut descriptions = Vec::new();
    if !symptoms.is_empty() {
        descriptions.push(format!(
            "I am experiencing the following menstrual cycle symptoms: {}.",
            symptoms.join(", ")
        ));
    }
    if let Some(mood) = mood {
        descriptions.push(format!("My current mood is: {}.", mood));
    }
    format!(
        "{} Provide 2-3 concise, actionable remedies or suggestions to help alleviate these. \
         Frame the response as helpful advice, but do not add a greeting or sign-off.",
        descriptions.join(" ")
    )
}

/// Models sometimes wrap JSON in a markdown fence despite the mime type.
fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let Some(inner) = t.strip_prefix("```") else {
        return t;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn nutrition_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "foodsToEat": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of foods that are beneficial during this phase."
            },
            "foodsToAvoid": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of foods to limit or avoid during this phase."
            }
        },
        "required": ["foodsToEat", "foodsToAvoid"]
    })
}

fn product_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "productName": {
                    "type": "STRING",
                    "description": "A generic but descriptive name for the product (e.g., \"High-Absorbency Organic Cotton Tampons\")."
                },
                "productType": {
                    "type": "STRING",
                    "description": "The type of product (e.g., Tampon, Pad, Menstrual Cup)."
                },
                "recommendation": {
                    "type": "STRING",
                    "description": "A brief explanation of why this product is a good fit for the user."
                }
            },
            "required": ["productName", "productType", "recommendation"]
        }
    })
}
