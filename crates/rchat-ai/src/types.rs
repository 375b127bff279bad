//! Gateway configuration and reply metadata

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default Generative Language API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Format the service is asked to answer in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Plain text (markdown is still allowed inside the text)
    #[default]
    PlainText,
}

impl ResponseFormat {
    /// MIME type sent to the service
    pub fn mime_type(&self) -> &'static str {
        match self {
            ResponseFormat::PlainText => "text/plain",
        }
    }
}

/// Sampling parameters for a generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Randomness of output (0.0 - 2.0)
    pub temperature: f32,
    /// Nucleus-sampling cutoff (0.0 - 1.0)
    pub top_p: f32,
    /// Candidate-pool size
    pub top_k: u32,
    /// Hard length cap on the reply
    pub max_output_tokens: u32,
    /// Reply format
    pub response_format: ResponseFormat,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_format: ResponseFormat::PlainText,
        }
    }
}

impl GenerationConfig {
    /// Reject parameter values the service would refuse
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::InvalidConfig(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(Error::InvalidConfig(format!(
                "top_p must be within 0.0..=1.0, got {}",
                self.top_p
            )));
        }
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".into()));
        }
        if self.max_output_tokens == 0 {
            return Err(Error::InvalidConfig(
                "max_output_tokens must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Everything a gateway needs besides credentials
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Model identifier (e.g., "gemini-2.0-flash")
    pub model: String,
    /// Base URL for API calls
    pub base_url: String,
    /// Sampling parameters
    pub generation: GenerationConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            generation: GenerationConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Config for a specific model with default parameters
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of response
    Stop,
    /// Output token cap reached
    MaxTokens,
    /// Blocked by safety filters
    Safety,
    /// Blocked for recitation
    Recitation,
    /// Anything else the service reports
    Other,
}

impl FinishReason {
    /// Map a Gemini `finishReason` value
    pub fn from_gemini(reason: &str) -> Self {
        match reason {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            _ => FinishReason::Other,
        }
    }
}

/// Token usage reported for one reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt: u32,
    pub reply: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_generation_config() {
        let config = GenerationConfig::default();
        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.top_p, 0.95);
        assert_eq!(config.top_k, 40);
        assert_eq!(config.max_output_tokens, 8192);
        assert_eq!(config.response_format.mime_type(), "text/plain");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = GenerationConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = GenerationConfig {
            top_p: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GenerationConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_gemini("STOP"), FinishReason::Stop);
        assert_eq!(FinishReason::from_gemini("MAX_TOKENS"), FinishReason::MaxTokens);
        assert_eq!(FinishReason::from_gemini("BLOCKLIST"), FinishReason::Other);
    }
}
