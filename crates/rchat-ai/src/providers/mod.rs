//! Response gateway contract and implementations

pub mod google;

use crate::{Error, GatewayError, Result};
use async_trait::async_trait;

/// Sends a single prompt to a text-generation service and returns its reply.
///
/// Implementations are stateless with respect to the conversation: each call
/// carries exactly one prompt and no prior turns.
#[async_trait]
pub trait ResponseGateway: Send + Sync {
    /// Produce the reply text for `prompt`
    async fn send(&self, prompt: &str) -> std::result::Result<String, GatewayError>;
}

/// Get an API key from the provided value or the first set environment variable
pub fn get_api_key(provided: Option<&str>, env_vars: &[&str]) -> Result<String> {
    if let Some(key) = provided.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    env_vars
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .ok_or(Error::InvalidApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provided_key_wins() {
        let key = get_api_key(Some("abc"), &["RCHAT_TEST_UNSET_KEY_VAR"]).unwrap();
        assert_eq!(key, "abc");
    }

    #[test]
    fn test_blank_key_falls_through_to_missing() {
        let result = get_api_key(Some("  "), &["RCHAT_TEST_UNSET_KEY_VAR"]);
        assert!(matches!(result, Err(Error::InvalidApiKey)));
    }
}
