use super::models::{Usage, DEFAULT_MODEL};
use fireside_adapters::config::Config;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// OpenRouter chat completions endpoint.
pub(crate) const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Retry configuration
pub(crate) const MAX_RETRIES: u32 = 3;
pub(crate) const BACKOFF_BASE_SECS: u64 = 2;
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Minimum spacing between outbound completion requests, shared by every
/// caller in the process (judging and report writing alike).
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum length for error content in error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Sanitize API response content for error messages to prevent credential leakage.
fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "secret",
        "password",
        "credential",
        "bearer",
        "sk-", // OpenAI/OpenRouter key prefix
    ];

    let truncated = truncate_str(content, MAX_ERROR_CONTENT_LEN);

    let lower = truncated.to_lowercase();
    for pattern in SECRET_PATTERNS {
        if lower.contains(pattern) {
            return "(response details redacted - may contain sensitive data)".to_string();
        }
    }

    truncated.to_string()
}

/// Truncate a string for display (Unicode-safe)
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> &str {
    if s.chars().count() <= max_chars {
        s
    } else {
        let byte_idx = s
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..byte_idx]
    }
}

/// Chat message in provider wire format.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    /// Content can be null in some API responses (e.g., when refusal or error occurs)
    #[serde(default)]
    content: Option<String>,
    /// Refusal reason - set when content is blocked by content moderation
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenRouter error response (can come with 200 status for upstream errors)
#[derive(Deserialize)]
pub(crate) struct OpenRouterError {
    pub error: OpenRouterApiError,
}

#[derive(Deserialize)]
pub(crate) struct OpenRouterApiError {
    pub message: String,
    #[serde(default)]
    pub code: Option<i32>,
}

static PACING_GATE: OnceLock<Mutex<Option<Instant>>> = OnceLock::new();

fn pacing_gate() -> &'static Mutex<Option<Instant>> {
    PACING_GATE.get_or_init(|| Mutex::new(None))
}

/// Wait until the shared minimum inter-request interval has elapsed.
///
/// The gate is one process-wide lock: concurrent turns from different users
/// queue here, so outbound model calls serialize instead of bursting.
async fn pace() {
    let mut last = pacing_gate().lock().await;
    if let Some(prev) = *last {
        let since = prev.elapsed();
        if since < MIN_REQUEST_INTERVAL {
            tokio::time::sleep(MIN_REQUEST_INTERVAL - since).await;
        }
    }
    *last = Some(Instant::now());
}

/// Linear backoff for rate limits: base times the attempt number.
pub(crate) fn backoff_secs(attempt: u32) -> u64 {
    BACKOFF_BASE_SECS.saturating_mul(attempt.max(1) as u64)
}

/// Extract a retry-after hint from a response body (if present)
fn parse_retry_after_body(text: &str) -> Option<u64> {
    // Look for patterns like "retry after X seconds" or "wait X seconds"
    let text_lower = text.to_lowercase();
    if let Some(pos) = text_lower.find("retry") {
        let after_retry = &text_lower[pos..];
        for word in after_retry.split_whitespace().skip(1).take(5) {
            if let Ok(secs) = word.trim_matches(|c: char| !c.is_numeric()).parse::<u64>() {
                if secs > 0 && secs < 300 {
                    return Some(secs);
                }
            }
        }
    }
    None
}

pub(crate) fn is_retryable_network_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn map_transport_error(err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        anyhow::anyhow!("⏱️ The request took too long. Please try again in a moment.")
    } else if err.is_connect() {
        anyhow::anyhow!("🔌 Could not reach the model service. Check the network and try again.")
    } else {
        anyhow::anyhow!("🔌 Connection trouble while talking to the model service: {}", err)
    }
}

/// Create a configured HTTP client for OpenRouter requests
pub(crate) fn create_http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))
}

/// Send a request to OpenRouter with automatic retry on transient failures.
///
/// Handles:
/// - Network errors (timeout, connection failures) with a fixed retry delay
/// - Rate limits (429), honoring a Retry-After hint when the server sends one
/// - Server errors (5xx)
/// - OpenRouter's 200-with-error responses
///
/// Error values carry human-readable messages; callers surface them as the
/// visible reply for the turn.
pub(crate) async fn send_with_retry<T: Serialize>(
    client: &reqwest::Client,
    api_key: &str,
    request_body: &T,
) -> anyhow::Result<String> {
    let mut last_error = String::new();
    let mut retry_count = 0;

    while retry_count <= MAX_RETRIES {
        let response = match client
            .post(OPENROUTER_URL)
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/fireside-bot/fireside")
            .header("X-Title", "Fireside")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(request_body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                last_error = err.to_string();
                if is_retryable_network_error(&err) && retry_count < MAX_RETRIES {
                    retry_count += 1;
                    tokio::time::sleep(Duration::from_secs(BACKOFF_BASE_SECS)).await;
                    continue;
                }
                return Err(map_transport_error(err));
            }
        };

        let status = response.status();
        let retry_after_header = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                last_error = err.to_string();
                if is_retryable_network_error(&err) && retry_count < MAX_RETRIES {
                    retry_count += 1;
                    tokio::time::sleep(Duration::from_secs(BACKOFF_BASE_SECS)).await;
                    continue;
                }
                return Err(map_transport_error(err));
            }
        };

        if status.is_success() {
            // OpenRouter sometimes returns errors with 200 status (upstream provider issues)
            if let Ok(err_resp) = serde_json::from_str::<OpenRouterError>(&text) {
                let is_retryable = err_resp
                    .error
                    .code
                    .map(|c| c >= 500 || c == 429)
                    .unwrap_or(true);

                if is_retryable && retry_count < MAX_RETRIES {
                    retry_count += 1;
                    tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
                    continue;
                }

                return Err(anyhow::anyhow!(
                    "⚠️ The model service reported a problem: {}",
                    truncate_str(&err_resp.error.message, 200)
                ));
            }

            return Ok(text);
        }

        last_error = text.clone();

        // Rate limit - retry with the server hint or linear backoff
        if status.as_u16() == 429 && retry_count < MAX_RETRIES {
            retry_count += 1;
            let wait = retry_after_header
                .or_else(|| parse_retry_after_body(&text))
                .unwrap_or_else(|| backoff_secs(retry_count));
            tokio::time::sleep(Duration::from_secs(wait)).await;
            continue;
        }

        // Server errors - retry with backoff
        if status.is_server_error() && retry_count < MAX_RETRIES {
            retry_count += 1;
            tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
            continue;
        }

        // Non-retryable error or max retries exceeded
        let error_msg = match status.as_u16() {
            401 => "❌ Authentication with the model service failed. Please check the API key."
                .to_string(),
            402 => "💰 The model service account is out of credits. Please top it up and try again."
                .to_string(),
            429 => format!(
                "⏳ Too many requests right now (gave up after {} retries). Please wait a few minutes and try again.",
                retry_count
            ),
            500..=599 => format!(
                "⚠️ The model service had a server error ({}). It may be temporarily unavailable.",
                status
            ),
            _ => format!("⚠️ HTTP error {}: {}", status, sanitize_api_response(&text)),
        };
        return Err(anyhow::anyhow!("{}", error_msg));
    }

    // Should not reach here, but handle gracefully
    Err(anyhow::anyhow!("{}", last_error))
}

/// Client for the external text-completion capability.
///
/// Cheap to clone; the pacing gate is process-wide, so any number of clones
/// still share one request budget.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    api_key: Option<String>,
    model: String,
    routing_user: Option<String>,
    timeout_secs: u64,
}

impl CompletionClient {
    /// Build a client from the on-disk config and environment.
    pub fn from_config() -> Self {
        let mut config = Config::load();
        let api_key = config.get_api_key();
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let routing_user = config.routing_user();
        Self {
            api_key,
            model,
            routing_user,
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }

    /// A client with no credentials. Every call fails fast with the no-key
    /// message, so callers exercise their local fallbacks; used for offline
    /// operation and deterministic tests.
    pub fn disabled() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            routing_user: None,
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Get a text completion for `user_message`.
    ///
    /// Error values are human-readable and safe to show as the turn reply.
    pub async fn complete(
        &self,
        user_message: &str,
        history: Option<&[Message]>,
        system_prompt: Option<&str>,
    ) -> anyhow::Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "❌ No API key is configured. Set OPENROUTER_API_KEY and restart."
            )
        })?;

        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(Message::system(system));
        }
        if let Some(history) = history {
            messages.extend_from_slice(history);
        }
        messages.push(Message::user(user_message));

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            user: self.routing_user.clone(),
        };

        pace().await;

        let client = create_http_client(self.timeout_secs)?;
        let text = send_with_retry(&client, api_key, &request).await?;

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            anyhow::anyhow!(
                "⚠️ Could not read the model response: {}\n{}",
                e,
                sanitize_api_response(&text)
            )
        })?;

        let choice = parsed.choices.first();

        if let Some(c) = choice {
            if let Some(refusal) = &c.message.refusal {
                return Err(anyhow::anyhow!(
                    "⚠️ The model declined this request: {}",
                    truncate_str(refusal, 200)
                ));
            }
        }

        let content = choice
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(anyhow::anyhow!(
                "⚠️ The model returned an empty reply. Please try again."
            ));
        }

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                model = %self.model,
                "completion ok"
            );
        }

        Ok(content)
    }
}
