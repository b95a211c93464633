//! Completion endpoint: request/response payload shapes, the unary
//! `create_completion` call and the streaming variant.

use std::collections::HashMap;

use futures::TryStreamExt;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::{Error, StreamError};
use crate::stream::decode_completion_stream;

/// Request body for `POST /completions`. Unset optional fields are
/// omitted from the wire.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,
    pub echo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_of: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// One generated completion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub index: u32,
    pub finish_reason: Option<String>,
    pub logprobs: Option<LogprobResult>,
}

/// Per-token log probabilities, present when `logprobs` was requested.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LogprobResult {
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub token_logprobs: Vec<f32>,
    #[serde(default)]
    pub top_logprobs: Vec<HashMap<String, f32>>,
    #[serde(default)]
    pub text_offset: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Response body of the completion endpoint.
///
/// During streaming the first choice's `text` is the concatenation of
/// every fragment seen so far; all other fields reflect only the most
/// recently decoded frame.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Usage,
}

impl Client {
    /// Request a completion and decode the full response body.
    pub async fn create_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, Error> {
        let req = self
            .request(Method::POST, "/completions")
            .json(request)
            .build()?;
        self.send_request(req).await
    }

    /// Request a streamed completion, invoking `on_data` with the
    /// accumulated response after every decoded frame.
    ///
    /// `request.stream` must be `true`, otherwise the service answers
    /// with a single JSON document instead of an event stream.
    ///
    /// Runs until the `[DONE]` sentinel (the only success exit), a read
    /// failure, or a frame that fails to decode. On failure the returned
    /// [`StreamError`] carries whatever was accumulated before the error.
    pub async fn create_completion_stream<F>(
        &self,
        request: &CompletionRequest,
        on_data: F,
    ) -> Result<CompletionResponse, StreamError>
    where
        F: FnMut(&CompletionResponse),
    {
        let mut output = CompletionResponse::default();
        match self.run_completion_stream(request, &mut output, on_data).await {
            Ok(()) => Ok(output),
            Err(source) => Err(StreamError {
                partial: output,
                source,
            }),
        }
    }

    async fn run_completion_stream<F>(
        &self,
        request: &CompletionRequest,
        output: &mut CompletionResponse,
        mut on_data: F,
    ) -> Result<(), Error>
    where
        F: FnMut(&CompletionResponse),
    {
        let req = self
            .request(Method::POST, "/completions")
            .json(request)
            .build()?;
        let response = self.dispatch(req).await?;

        let body = response.bytes_stream().map_err(Error::from);
        decode_completion_stream(body, output, &mut on_data).await
    }
}
