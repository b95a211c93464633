//! Client configuration and the request dispatch path shared by every
//! endpoint: header injection, status classification, error decoding and
//! unary response decoding.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ApiError, Error};

const API_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const ORGANIZATION_HEADER: &str = "OpenAI-Organization";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// OpenAI API client.
///
/// Immutable once constructed and safe to share across concurrent calls;
/// the underlying `reqwest::Client` multiplexes connections internally.
/// The bearer header is marked sensitive, so `Debug` output redacts it.
#[derive(Debug)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
    auth: HeaderValue,
    organization: Option<HeaderValue>,
}

impl Client {
    /// Create a client for the given API key, with the default base URL
    /// and a transport enforcing a 60-second overall request timeout.
    ///
    /// The timeout bounds whole calls including the live streaming phase,
    /// so a custom transport via [`Client::with_http_client`] is advised
    /// for streams expected to run longer.
    pub fn new(api_key: &str) -> Result<Self, Error> {
        let auth = bearer_header(api_key)?;

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("rsgpt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build reqwest client: {e}")))?;

        Ok(Self {
            base_url: API_BASE_URL.to_string(),
            http,
            auth,
            organization: None,
        })
    }

    /// Attach an organization id, sent as the `OpenAI-Organization`
    /// header on every request.
    pub fn with_organization(mut self, organization: &str) -> Result<Self, Error> {
        let value = HeaderValue::from_str(organization).map_err(|_| {
            Error::Configuration("organization id is not a valid header value".to_string())
        })?;
        self.organization = Some(value);
        Ok(self)
    }

    /// Override the base endpoint URL (e.g. for a proxy or a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the transport with a caller-supplied `reqwest::Client`,
    /// keeping whatever timeout and pool settings it was built with.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Execute exactly one round trip: inject headers, run the request,
    /// and classify the response. Statuses in `[200, 400)` pass through;
    /// everything else is decoded into an [`ApiError`]. No retries.
    #[tracing::instrument(name = "dispatch", skip(self, request), fields(url = %request.url()), err)]
    pub(crate) async fn dispatch(
        &self,
        mut request: reqwest::Request,
    ) -> Result<reqwest::Response, Error> {
        self.apply_headers(&mut request);

        let response = self.http.execute(request).await?;
        let status = response.status().as_u16();

        if !(200..400).contains(&status) {
            warn!(status, "service returned error status");
            return Err(decode_error_response(response).await);
        }

        debug!(status, "request succeeded");
        Ok(response)
    }

    /// Dispatch and decode the full success body into `T`.
    pub(crate) async fn send_request<T>(&self, request: reqwest::Request) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let response = self.dispatch(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(Error::Decode)
    }

    /// Dispatch without decoding; dropping the response releases the body.
    pub(crate) async fn send_request_discard(
        &self,
        request: reqwest::Request,
    ) -> Result<(), Error> {
        self.dispatch(request).await.map(drop)
    }

    fn apply_headers(&self, request: &mut reqwest::Request) {
        let headers = request.headers_mut();

        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(AUTHORIZATION, self.auth.clone());

        // reqwest's `json()` pre-sets a bare `application/json`; upgrade it
        // to the charset-bearing form the service expects. Any other
        // caller-chosen type (multipart boundaries) must stay untouched.
        let json_body = headers
            .get(CONTENT_TYPE)
            .is_none_or(|value| value.as_bytes() == b"application/json");
        if json_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        if let Some(organization) = &self.organization {
            headers.insert(ORGANIZATION_HEADER, organization.clone());
        }
    }
}

fn bearer_header(api_key: &str) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| Error::Configuration("API key is not a valid header value".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Wire shape of the service's error body. The nested object may be
/// absent or malformed, in which case only the status code is reported.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    param: Option<String>,
    code: Option<String>,
}

/// Decode a failing response into an [`Error::Api`]. Always consumes the
/// body; always produces an error.
async fn decode_error_response(response: reqwest::Response) -> Error {
    let status_code = response.status().as_u16();

    let payload = match response.bytes().await {
        Ok(body) => serde_json::from_slice::<ErrorResponse>(&body)
            .ok()
            .and_then(|envelope| envelope.error),
        Err(_) => None,
    };

    let mut api = ApiError {
        status_code,
        ..ApiError::default()
    };
    if let Some(payload) = payload {
        api.message = Some(payload.message);
        api.error_type = payload.error_type;
        api.param = payload.param;
        api.code = payload.code;
    }

    Error::Api(api)
}
