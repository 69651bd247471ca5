//! CSAcademy evaluation-job listing.
//!
//! The listing is a JSON endpoint paginated by end timestamp: a request with
//! `endTime=T` returns the newest jobs submitted at or before `T`.

use super::{FetcherSettings, PageFetcher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use judge_types::{FetchError, Submission};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct JobsResponse {
    state: JobsState,
}

#[derive(Debug, Default, Deserialize)]
struct JobsState {
    #[serde(default)]
    evaljob: Vec<EvalJob>,
    #[serde(default)]
    publicuser: Vec<PublicUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvalJob {
    id: i64,
    user_id: i64,
    time_submitted: f64,
    #[serde(default)]
    source_text: String,
    #[serde(default, rename = "compileOK")]
    compile_ok: bool,
    #[serde(default)]
    is_done: bool,
    #[serde(default)]
    score: Option<f64>,
    eval_task_id: i64,
}

#[derive(Debug, Deserialize)]
struct PublicUser {
    id: i64,
    #[serde(default)]
    name: String,
}

/// Fetcher for `csacademy.com`, paged by [`TimeCursor`](judge_core::TimeCursor).
#[derive(Debug, Clone)]
pub struct CsAcademyFetcher {
    client: reqwest::Client,
    settings: FetcherSettings,
}

impl CsAcademyFetcher {
    /// Build a fetcher with its own HTTP client.
    pub fn new(settings: FetcherSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Fatal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// URL of the page ending at `offset`.
    pub fn page_url(&self, offset: &Option<DateTime<Utc>>) -> String {
        let mut url = format!(
            "{}/eval/get_eval_jobs/?numJobs={}",
            self.settings.base_url, self.settings.page_size
        );
        if let Some(end) = offset {
            url.push_str(&format!("&endTime={}", end.timestamp()));
        }
        url
    }
}

#[async_trait]
impl PageFetcher for CsAcademyFetcher {
    type Offset = Option<DateTime<Utc>>;

    async fn fetch(&self, offset: &Option<DateTime<Utc>>) -> Result<Vec<Submission>, FetchError> {
        let url = self.page_url(offset);
        tracing::debug!(%url, "Fetching CSAcademy page");

        let response = self
            .client
            .get(&url)
            .header("x-requested-with", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Fatal(format!("HTTP {status} from {url}")));
        }
        if !status.is_success() {
            return Err(FetchError::Transport(format!("HTTP {status} from {url}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        parse_page(&body)
    }
}

/// Decode and normalize one response body.
fn parse_page(body: &[u8]) -> Result<Vec<Submission>, FetchError> {
    let response: JobsResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Shape(e.to_string()))?;

    let names: HashMap<i64, String> = response
        .state
        .publicuser
        .into_iter()
        .map(|user| (user.id, user.name))
        .collect();

    response
        .state
        .evaljob
        .into_iter()
        .map(|job| normalize(job, &names))
        .collect()
}

fn normalize(job: EvalJob, names: &HashMap<i64, String>) -> Result<Submission, FetchError> {
    let display_name = match names.get(&job.user_id) {
        Some(name) => name.clone(),
        None => {
            tracing::warn!(user_id = job.user_id, job = job.id, "User missing from page");
            String::new()
        }
    };

    let date = unix_date(job.time_submitted).ok_or_else(|| {
        FetchError::Shape(format!(
            "job {} has invalid timeSubmitted {}",
            job.id, job.time_submitted
        ))
    })?;

    let size_kb = match job.source_text.len() {
        0 => None,
        len => Some(len as f64 / 1024.0),
    };

    let score = job
        .score
        .filter(|s| !s.is_nan() && *s >= 0.0)
        .map(|s| (s * 100.0).round() as i64);

    Ok(Submission {
        id: job.id.into(),
        username: job.user_id.to_string(),
        display_name,
        problem_id: Some(job.eval_task_id.to_string()),
        problem_name: None,
        size_kb,
        date,
        ignored: false,
        compile_error: !job.compile_ok,
        internal_error: false,
        score,
        finalized: job.is_done,
    })
}

fn unix_date(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}
