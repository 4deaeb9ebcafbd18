//! Semantic verification: let an LLM decide which items are prescribed.
//!
//! Substring matching fails on OCR misreads and brand/generic synonyms. This
//! strategy sends the extracted text and requested names to a provider and
//! asks for the subset it considers prescribed. The answer is mapped back
//! onto the requested items and fed through the same composer as the
//! substring matcher, so both strategies yield identically shaped verdicts.
//!
//! ## Retry Strategy
//!
//! Provider errors are retried with exponential backoff
//! (`retry_backoff_ms * 2^attempt`). An answer that does not parse is
//! returned as an error straight away.

use crate::config::VerifierConfig;
use crate::error::VerifyError;
use crate::model::{normalize_name, DesiredItem, ExtractedText};
use crate::output::VerificationVerdict;
use crate::pipeline::compose::compose;
use crate::pipeline::matcher::MatchResult;
use crate::pipeline::policy::PolicyOutcome;
use crate::prompts::{semantic_user_message, SEMANTIC_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// The model's structured answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SemanticJudgement {
    #[serde(default)]
    pub matched_items: Vec<String>,
}

/// LLM-backed alternative to the substring matcher.
#[derive(Clone)]
pub struct SemanticVerifier {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl SemanticVerifier {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &VerifierConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Produce a full verdict for the extracted text.
    pub async fn verify(
        &self,
        text: &ExtractedText,
        desired: &[DesiredItem],
        policy: &PolicyOutcome,
    ) -> Result<VerificationVerdict, VerifyError> {
        let matches = self.judge(text, desired).await?;
        Ok(compose(text, desired, &matches, policy))
    }

    /// Ask the provider which desired items the text prescribes.
    pub async fn judge(
        &self,
        text: &ExtractedText,
        desired: &[DesiredItem],
    ) -> Result<MatchResult, VerifyError> {
        if desired.is_empty() || text.is_empty() {
            debug!("Nothing to judge; skipping provider call");
            return Ok(MatchResult::partition(desired, |_| false));
        }

        let messages = vec![
            ChatMessage::system(SEMANTIC_SYSTEM_PROMPT),
            ChatMessage::user(&semantic_user_message(text.as_str(), desired)),
        ];
        let options = self.build_options();
        let start = Instant::now();
        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Semantic verification: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    info!(
                        "Semantic verification: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    let judgement = parse_judgement(&response.content)?;
                    return Ok(apply_judgement(desired, &judgement));
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    warn!("Semantic verification: attempt {} failed: {}", attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(VerifyError::SemanticVerifier {
            message: format!(
                "provider failed after {} retries: {}",
                self.max_retries,
                last_err.unwrap_or_else(|| "Unknown error".to_string())
            ),
        })
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n```\s*$").unwrap());

/// Parse the model's answer, tolerating code fences and surrounding prose.
pub fn parse_judgement(raw: &str) -> Result<SemanticJudgement, VerifyError> {
    let trimmed = raw.trim();
    let body = match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str()),
        None => trimmed,
    };
    let object = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    };
    serde_json::from_str(object).map_err(|e| VerifyError::SemanticVerifier {
        message: format!("unparseable model answer ({e}): {}", truncate(raw, 120)),
    })
}

/// Map a judgement back onto the requested items by normalised name.
///
/// Names the model invents are ignored; every requested item lands in
/// exactly one partition.
pub fn apply_judgement(desired: &[DesiredItem], judgement: &SemanticJudgement) -> MatchResult {
    let found: HashSet<String> = judgement
        .matched_items
        .iter()
        .map(|n| normalize_name(n))
        .collect();
    MatchResult::partition(desired, |item| found.contains(&item.normalized_name()))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\u{2026}", &s[..idx]),
        None => s.to_string(),
    }
}
