#[cfg(test)]
#[path = "ollama_test.rs"]
mod tests;

use crate::backend::{Backend, FragmentStream};
use crate::config::{BackendConfig, user_agent};
use crate::models::{BackendError, GenerateRequest, GenerateResponse, Model};
use async_trait::async_trait;
use eyre::{Context, Result};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use std::time;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;

/// Client for an Ollama-compatible completion API.
pub struct Ollama {
    alias: String,
    endpoint: String,
    timeout: Option<time::Duration>,
    client: reqwest::Client,
}

#[async_trait]
impl Backend for Ollama {
    fn name(&self) -> &str {
        &self.alias
    }

    async fn list_models(&self) -> Result<Vec<Model>> {
        let mut req = self
            .client
            .get(format!("{}/api/tags", self.endpoint))
            .header("User-Agent", user_agent());

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let res = req.send().await.wrap_err("listing models")?;
        let res = check_status(res).await?;

        let res = res
            .json::<TagListResponse>()
            .await
            .wrap_err("parsing model list response")?;

        let mut models = res
            .models
            .into_iter()
            .map(|m| Model::new(m.name).with_provider(&self.alias))
            .collect::<Vec<_>>();

        models.sort_by(|a, b| a.id().cmp(b.id()));

        Ok(models)
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let request = request.with_stream(false);
        let res = self.send_generate(&request).await?;
        let res = res
            .json::<GenerateResponse>()
            .await
            .wrap_err("parsing generate response")?;
        Ok(res)
    }

    async fn generate_stream(&self, request: GenerateRequest) -> Result<FragmentStream> {
        let request = request.with_stream(true);
        let res = self.send_generate(&request).await?;

        let stream = res.bytes_stream().map_err(|e| {
            let err_msg = e.to_string();
            std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg)
        });

        Ok(fragments(StreamReader::new(stream).lines()).boxed())
    }
}

impl From<&BackendConfig> for Ollama {
    fn from(value: &BackendConfig) -> Self {
        let mut ollama = Ollama::default().with_endpoint(&value.endpoint);
        if let Some(timeout) = value.timeout_secs {
            ollama = ollama.with_timeout(time::Duration::from_secs(timeout as u64));
        }
        ollama
    }
}

impl Ollama {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Option<time::Duration> {
        self.timeout
    }

    async fn send_generate(&self, request: &GenerateRequest) -> Result<reqwest::Response> {
        let mut req = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .header("Content-Type", "application/json")
            .header("User-Agent", user_agent());

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        log::trace!("Sending generate request: {:?}", request);

        let res = req
            .json(request)
            .send()
            .await
            .wrap_err("sending generate request")?;
        check_status(res).await
    }
}

impl Default for Ollama {
    fn default() -> Self {
        Self {
            alias: "Ollama".to_string(),
            endpoint: crate::config::constants::DEFAULT_ENDPOINT.to_string(),
            timeout: None,
            client: reqwest::Client::new(),
        }
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response> {
    if res.status().is_success() {
        return Ok(res);
    }

    let http_code = res.status().as_u16();
    let body = res.text().await.wrap_err("reading error response")?;
    log::error!("Error response: {}", body);
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    Err(BackendError::Api { http_code, message }.into())
}

/// Turn newline-delimited JSON into fragments. Blank lines are skipped, a line
/// that is not a fragment yields `MalformedChunk` and reading goes on, while
/// an error line or an I/O failure yields `Transport` and ends the stream.
pub(crate) fn fragments<R>(
    lines: Lines<R>,
) -> impl Stream<Item = Result<GenerateResponse, BackendError>> + Send + 'static
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    stream::unfold(Some(lines), |state| async move {
        let mut lines = state?;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(err) => return Some((Err(BackendError::Transport(err.to_string())), None)),
            };

            let line = line.trim();
            log::trace!("streaming response: {}", line);
            if line.is_empty() {
                continue;
            }

            return match parse_fragment(line) {
                Ok(fragment) => {
                    let next = if fragment.done { None } else { Some(lines) };
                    Some((Ok(fragment), next))
                }
                Err(err @ BackendError::MalformedChunk(_)) => Some((Err(err), Some(lines))),
                Err(err) => Some((Err(err), None)),
            };
        }
    })
}

fn parse_fragment(line: &str) -> Result<GenerateResponse, BackendError> {
    let data = serde_json::from_str::<StreamLine>(line)
        .map_err(|e| BackendError::MalformedChunk(format!("{e}: {line}")))?;

    if let Some(error) = data.error {
        return Err(BackendError::Transport(error));
    }

    match data.response {
        Some(response) => Ok(GenerateResponse {
            model: data.model,
            response,
            done: data.done,
        }),
        None if data.done => Ok(GenerateResponse {
            model: data.model,
            response: String::new(),
            done: true,
        }),
        None => Err(BackendError::MalformedChunk(line.to_string())),
    }
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct StreamLine {
    #[serde(default)]
    model: String,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct TagResponse {
    name: String,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct TagListResponse {
    models: Vec<TagResponse>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}
