/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for various LLM providers:
 * - Anthropic: Anthropic messages API integration
 * - OpenAI: OpenAI chat-completions API integration
 * - Mock: scripted provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// A completion request at the orchestration boundary.
///
/// Provider-specific request builders translate this into their own wire
/// format; the orchestrator never sees provider wire types.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Model identifier
    pub model: String,

    /// System prompt guiding the model
    pub system_prompt: String,

    /// Marker-delimited sub-batch payload
    pub payload: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

/// A completion response at the orchestration boundary.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// The generated text
    pub text: String,

    /// Prompt tokens consumed, when the provider reports usage
    pub prompt_tokens: Option<u64>,

    /// Completion tokens generated, when the provider reports usage
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers.
///
/// The trait is object-safe so the orchestrator can hold any provider (or a
/// test mock) behind `Arc<dyn Provider>` and be unit-tested without a
/// network present.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

pub mod anthropic;
pub mod mock;
pub mod openai;
