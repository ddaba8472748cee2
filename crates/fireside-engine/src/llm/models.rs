use serde::Deserialize;

/// Default model used for both sufficiency judging and report writing.
/// Overridable via the `model` config field.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// API usage information from the LLM provider.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
