//! Utero LLM - Generative-language provider adapters and the advice client

pub mod advice;
pub mod gemini;
pub mod provider;
pub mod types;

pub use advice::AdviceClient;
pub use gemini::GeminiProvider;
pub use provider::{LlmError, LlmProvider, LlmResult};
pub use types::*;
