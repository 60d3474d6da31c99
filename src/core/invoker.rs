//! Single model invocation with retry, backoff and content-policy fallback
//!
//! `translate_one` never fails: whatever goes wrong, the caller gets either a
//! cleaned completion or its own input back.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::codec::{markers, sanitizer};
use crate::core::client::ChatModel;
use crate::core::config::TranslatorConfig;
use crate::core::errors::TranslationError;
use crate::core::models::ChatRequest;
use crate::core::usage::UsageTracker;

/// Builds the standard and the simplified prompt for a text
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    source_languages: String,
    target_language: String,
}

impl PromptBuilder {
    /// Prompts for the given language pair
    pub fn new(source_languages: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_languages: source_languages.into(),
            target_language: target_language.into(),
        }
    }

    /// Full prompt used for every first attempt
    pub fn standard(&self, text: &str) -> ChatRequest {
        let target = &self.target_language;
        let system = format!(
            "You are a professional translator. Translate {} into {}. \
             Keep English text unchanged. Never modify placeholders or special markers. \
             Return ONLY the translated text without explanations, notes or comments.",
            self.source_languages, target
        );
        let user = format!(
            "{}\n\nTranslate the content above into {}. Leave English text as it is. \
             Do NOT alter tokens shaped like __PH_<number>__ or #BATCH_SPLIT_<number>#, \
             nor markers such as #n, #!ALB(...) and <color=...>. \
             Keep punctuation and brackets exactly as given. \
             Output only the translation, with no explanations or notes.",
            text, target
        );
        ChatRequest::new(system, user)
    }

    /// Pared-down prompt for retrying after a content-filter rejection
    pub fn fallback(&self, text: &str) -> ChatRequest {
        let target = &self.target_language;
        ChatRequest::new(
            format!("Translate text into {}. Keep placeholders unchanged.", target),
            format!(
                "{}\n\nTranslate into {}. Keep English unchanged. \
                 Do not change placeholders or markers. Output only the translated text.",
                text, target
            ),
        )
    }
}

/// Backoff settings for rate-limited requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound of the random delay added to each wait
    pub max_jitter: Duration,
    /// Cap on the doubled delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy from the `retry_*` settings
    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.retry_delay_ms),
            max_jitter: Duration::from_millis(config.retry_jitter_ms),
            max_delay: Duration::from_millis(config.max_retry_delay_ms),
        }
    }

    /// Delay to use after `current`
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let max = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(0..=max))
    }
}

/// Sends texts to the model and cleans what comes back
pub struct Translator<M> {
    model: M,
    prompts: PromptBuilder,
    retry: RetryPolicy,
    usage: UsageTracker,
}

impl<M: ChatModel> Translator<M> {
    /// Translator with prompts and retry policy taken from `config`
    pub fn new(model: M, config: &TranslatorConfig) -> Self {
        Self {
            model,
            prompts: PromptBuilder::new(&config.source_languages, &config.target_language),
            retry: RetryPolicy::from_config(config),
            usage: UsageTracker::new(),
        }
    }

    /// Override the backoff settings
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Underlying model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Counters for every request made so far
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Translate `text`, or return it unchanged if no translation can be had
    pub async fn translate_one(&self, text: &str) -> String {
        let request = self.prompts.standard(text);
        let mut delay = self.retry.base_delay;

        for attempt in 1..=self.retry.max_attempts {
            let err = match self.model.complete(&request).await {
                Ok(response) => {
                    self.usage.record_success(response.total_tokens).await;
                    if attempt > 1 {
                        info!("Translated after {} attempts", attempt);
                    }
                    return clean(&response.content);
                }
                Err(e) => e,
            };
            self.usage.record_failure().await;

            match err {
                TranslationError::RateLimitError { .. } if attempt == self.retry.max_attempts => {
                    break;
                }
                TranslationError::RateLimitError { retry_after } => {
                    let mut wait = delay + self.retry.jitter();
                    if let Some(secs) = retry_after {
                        wait = wait.max(Duration::from_secs(secs));
                    }
                    warn!(
                        "Rate limited; retrying in {:.1}s (attempt {}/{})",
                        wait.as_secs_f32(),
                        attempt,
                        self.retry.max_attempts
                    );
                    self.usage.record_rate_limit_retry().await;
                    sleep(wait).await;
                    delay = self.retry.next_delay(delay);
                }
                TranslationError::ContentPolicyError { message } => {
                    warn!("Content filter triggered ({}); retrying with simplified prompt", message);
                    return self.translate_simplified(text).await;
                }
                other => {
                    warn!("Translation request failed: {}; keeping source text", other);
                    self.usage.record_degraded().await;
                    return text.to_string();
                }
            }
        }

        warn!(
            "Still rate limited after {} attempts; keeping source text",
            self.retry.max_attempts
        );
        self.usage.record_degraded().await;
        text.to_string()
    }

    async fn translate_simplified(&self, text: &str) -> String {
        self.usage.record_content_policy_fallback().await;

        match self.model.complete(&self.prompts.fallback(text)).await {
            Ok(response) => {
                self.usage.record_success(response.total_tokens).await;
                debug!("Simplified prompt succeeded");
                clean(&response.content)
            }
            Err(e) => {
                warn!("Simplified prompt failed: {}; keeping source text", e);
                self.usage.record_failure().await;
                self.usage.record_degraded().await;
                text.to_string()
            }
        }
    }
}

/// Sanitize, then repair markers
fn clean(content: &str) -> String {
    markers::repair(&sanitizer::sanitize(content))
}
