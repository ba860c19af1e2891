//! Turns a free-text progress update into candidate task titles.
//!
//! A configured Anthropic key routes the text through the messages API; any
//! failure along that path (missing key, transport error, non-2xx status,
//! output without a JSON array) drops to the local pattern extractor. No
//! retries, no caching.

use std::env;
use std::time::{Duration as StdDuration, Instant};

use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AiErrorCode, AppError, AppResult};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(30);

const ENV_API_KEY: &str = "LIFETRACK_ANTHROPIC_API_KEY";
const ENV_FALLBACK_API_KEY: &str = "ANTHROPIC_API_KEY";
const ENV_BASE_URL: &str = "LIFETRACK_ANTHROPIC_BASE_URL";
const ENV_MODEL: &str = "LIFETRACK_ANTHROPIC_MODEL";

const LEAD_IN_PATTERN: &str = r"(?i)(?:need to|have to|should|must|todo:|to-do:|action:)\s*([^.!?\n]+)";
const BULLET_PATTERN: &str = r"(?:^|\n)\s*[-*•]\s*([^.!?\n]+)";
const NUMBERED_PATTERN: &str = r"(?:^|\n)\s*\d+[.)]\s*([^.!?\n]+)";
const JSON_ARRAY_PATTERN: &str = r"\[[\s\S]*\]";

/// Exclusive length bounds, in characters.
const MIN_TASK_CHARS: usize = 3;
const MAX_TASK_CHARS: usize = 150;
const MAX_CLAUSE_CHARS: usize = 100;
const MIN_CLAUSES: usize = 2;

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub http_timeout: StdDuration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http_timeout: HTTP_TIMEOUT,
        }
    }
}

impl ExtractionConfig {
    pub fn from_env() -> Self {
        let api_key = read_env(ENV_API_KEY).or_else(|| read_env(ENV_FALLBACK_API_KEY));
        Self {
            api_key,
            base_url: read_env(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: read_env(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            http_timeout: HTTP_TIMEOUT,
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Ai,
    Pattern,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTasks {
    pub tasks: Vec<String>,
    pub source: ExtractionSource,
}

#[async_trait::async_trait]
pub trait TaskExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> AppResult<Vec<String>>;
}

/// Local extractor: action lead-ins, bullets and numbered items, then comma
/// separated clauses when none of those match.
pub struct PatternExtractor {
    patterns: Vec<Regex>,
}

impl PatternExtractor {
    pub fn new() -> AppResult<Self> {
        let patterns = [LEAD_IN_PATTERN, BULLET_PATTERN, NUMBERED_PATTERN]
            .iter()
            .map(|pattern| compile(pattern))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn extract_titles(&self, text: &str) -> Vec<String> {
        let mut tasks: Vec<String> = Vec::new();
        for pattern in &self.patterns {
            for captures in pattern.captures_iter(text) {
                let Some(found) = captures.get(1) else {
                    continue;
                };
                let task = found.as_str().trim();
                if within(task, MIN_TASK_CHARS, MAX_TASK_CHARS)
                    && !tasks.iter().any(|existing| existing == task)
                {
                    tasks.push(task.to_string());
                }
            }
        }

        if tasks.is_empty() && text.contains(',') {
            let clauses: Vec<String> = text
                .split(',')
                .map(str::trim)
                .filter(|part| within(part, MIN_TASK_CHARS, MAX_CLAUSE_CHARS))
                .map(String::from)
                .collect();
            if clauses.len() >= MIN_CLAUSES {
                return clauses;
            }
        }

        tasks
    }
}

#[async_trait::async_trait]
impl TaskExtractor for PatternExtractor {
    async fn extract(&self, text: &str) -> AppResult<Vec<String>> {
        Ok(self.extract_titles(text))
    }
}

fn within(value: &str, min_exclusive: usize, max_exclusive: usize) -> bool {
    let len = value.chars().count();
    len > min_exclusive && len < max_exclusive
}

fn compile(pattern: &str) -> AppResult<Regex> {
    Regex::new(pattern).map_err(|err| AppError::other(format!("invalid extraction pattern: {err}")))
}

pub struct AnthropicExtractor {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    json_array: Regex,
}

impl AnthropicExtractor {
    pub fn try_new(config: &ExtractionConfig, api_key: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|err| AppError::other(format!("failed to build HTTP client: {err}")))?;

        let endpoint = format!("{}/v1/messages", config.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            api_key,
            endpoint,
            model: config.model.clone(),
            json_array: compile(JSON_ARRAY_PATTERN)?,
        })
    }

    fn build_request_body(&self, text: &str) -> JsonValue {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                { "role": "user", "content": extraction_prompt(text) }
            ]
        })
    }

    fn parse_titles(&self, content: &str, correlation_id: &str) -> AppResult<Vec<String>> {
        let invalid = |reason: &str| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                "model output did not contain a task list",
                Some(correlation_id),
                Some(json!({ "reason": reason })),
            )
        };

        let array = self
            .json_array
            .find(content)
            .ok_or_else(|| invalid("missing_json_array"))?;
        let values: Vec<JsonValue> =
            serde_json::from_str(array.as_str()).map_err(|_| invalid("invalid_json"))?;

        Ok(values
            .iter()
            .filter_map(JsonValue::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(String::from)
            .collect())
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> AppError {
        let (code, message) = match status {
            StatusCode::UNAUTHORIZED => (AiErrorCode::MissingApiKey, "API key was rejected".to_string()),
            StatusCode::FORBIDDEN => (AiErrorCode::Forbidden, "API key lacks permission".to_string()),
            StatusCode::TOO_MANY_REQUESTS => (AiErrorCode::RateLimited, "rate limited by provider".to_string()),
            StatusCode::BAD_REQUEST => (AiErrorCode::InvalidRequest, "provider rejected the request".to_string()),
            status if status.is_server_error() => (
                AiErrorCode::ProviderUnavailable,
                format!("provider unavailable (status {})", status.as_u16()),
            ),
            status => (
                AiErrorCode::Unknown,
                format!("unexpected provider status {}", status.as_u16()),
            ),
        };
        AppError::ai_with_details(
            code,
            message,
            Some(correlation_id),
            Some(json!({ "status": status.as_u16() })),
        )
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> AppError {
        let code = if err.is_timeout() {
            AiErrorCode::HttpTimeout
        } else {
            AiErrorCode::ProviderUnavailable
        };
        AppError::ai_with_details(
            code,
            format!("request to provider failed: {err}"),
            Some(correlation_id),
            None,
        )
    }
}

#[async_trait::async_trait]
impl TaskExtractor for AnthropicExtractor {
    async fn extract(&self, text: &str) -> AppResult<Vec<String>> {
        let correlation_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        debug!(
            target: "app::extract",
            correlation_id = %correlation_id,
            model = %self.model,
            chars = text.chars().count(),
            "requesting task extraction"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request_body(text))
            .send()
            .await
            .map_err(|err| Self::error_from_reqwest(err, &correlation_id))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::map_http_error(status, &correlation_id));
        }

        let body: JsonValue = response.json().await.map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                "provider response was not JSON",
                Some(correlation_id.as_str()),
                Some(json!({ "reason": err.to_string() })),
            )
        })?;
        let content = body
            .pointer("/content/0/text")
            .and_then(JsonValue::as_str)
            .unwrap_or("[]");

        let titles = self.parse_titles(content, &correlation_id)?;
        debug!(
            target: "app::extract",
            correlation_id = %correlation_id,
            latency_ms = start.elapsed().as_millis() as u64,
            tasks = titles.len(),
            "provider responded"
        );
        Ok(titles)
    }
}

fn extraction_prompt(text: &str) -> String {
    format!(
        "Extract actionable tasks from the following progress update. Return ONLY a JSON array \
of task titles (strings). If there are no clear actionable tasks, return an empty array [].

Progress update: \"{text}\"

Rules:
- Each task should be a clear, actionable item
- Keep task titles concise (under 100 characters)
- Focus on TODO items, action items, or things that need to be done
- Don't include tasks that are already completed
- Return valid JSON array only, no other text

JSON array:"
    )
}

pub struct TaskExtractionService {
    remote: Option<Box<dyn TaskExtractor>>,
    fallback: PatternExtractor,
}

impl TaskExtractionService {
    pub fn new(config: ExtractionConfig) -> AppResult<Self> {
        let remote: Option<Box<dyn TaskExtractor>> = match config.api_key.clone() {
            Some(key) => Some(Box::new(AnthropicExtractor::try_new(&config, key)?)),
            None => {
                info!(target: "app::extract", "no API key configured, using pattern extraction only");
                None
            }
        };
        Ok(Self {
            remote,
            fallback: PatternExtractor::new()?,
        })
    }

    pub fn from_env() -> AppResult<Self> {
        Self::new(ExtractionConfig::from_env())
    }

    pub fn with_remote(remote: Box<dyn TaskExtractor>) -> AppResult<Self> {
        Ok(Self {
            remote: Some(remote),
            fallback: PatternExtractor::new()?,
        })
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub async fn extract(&self, text: &str) -> AppResult<ExtractedTasks> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::validation("text is required"));
        }

        if let Some(remote) = &self.remote {
            match remote.extract(text).await {
                Ok(tasks) => {
                    info!(target: "app::extract", tasks = tasks.len(), "tasks extracted by model");
                    return Ok(ExtractedTasks {
                        tasks,
                        source: ExtractionSource::Ai,
                    });
                }
                Err(err) => {
                    warn!(
                        target: "app::extract",
                        error = %err,
                        "model extraction failed, falling back to patterns"
                    );
                }
            }
        }

        let tasks = self.fallback.extract_titles(text);
        info!(target: "app::extract", tasks = tasks.len(), "tasks extracted by patterns");
        Ok(ExtractedTasks {
            tasks,
            source: ExtractionSource::Pattern,
        })
    }
}
