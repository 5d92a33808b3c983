//! Authenticated HTTP wrapper for the remote service

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::ApiConfig;
use crate::{Error, Result};

/// HTTP client that attaches the bearer credential to every request
///
/// Cheap to clone; clones share one connection pool and cancellation token.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    cancel: CancellationToken,
}

impl HttpClient {
    /// Create a client from API settings
    ///
    /// # Errors
    ///
    /// Returns error if the credential or beta header is not a valid header
    /// value, or the underlying client cannot be built
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
            .map_err(|_| Error::Config("API key contains invalid characters".to_string()))?;
        auth.set_sensitive(true);

        let beta = HeaderValue::from_str(&config.beta)
            .map_err(|_| Error::Config(format!("invalid OpenAI-Beta value: {:?}", config.beta)))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(HeaderName::from_static("openai-beta"), beta);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cancel: CancellationToken::new(),
        })
    }

    /// Abandon in-flight requests with `Cancelled` once `cancel` fires
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Base URL requests are resolved against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body
    ///
    /// # Errors
    ///
    /// Returns `RemoteRequest` on non-200, `MalformedResponse` if the body
    /// does not match `T`, or `Http` on transport failure
    pub async fn get_json<T>(&self, path: &str, context: &'static str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let (status, body) = self.send(self.request(Method::GET, path)).await?;
        decode_json(status, &body, context)
    }

    /// POST a JSON body to `path` and decode the JSON response
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_json`]
    pub async fn post_json<T, B>(&self, path: &str, body: &B, context: &'static str) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (status, bytes) = self.send(self.request(Method::POST, path).json(body)).await?;
        decode_json(status, &bytes, context)
    }

    /// POST an empty JSON object to `path` and decode the JSON response
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_json`]
    pub async fn post_empty<T>(&self, path: &str, context: &'static str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.post_json(path, &serde_json::json!({}), context).await
    }

    /// POST a JSON body to `path` and return the raw response bytes
    ///
    /// # Errors
    ///
    /// Returns `RemoteRequest` on non-200 or `Http` on transport failure
    pub async fn post_bytes<B>(&self, path: &str, body: &B) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let (status, bytes) = self.send(self.request(Method::POST, path).json(body)).await?;
        check_status(status, &bytes)?;
        Ok(bytes)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.client.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<(u16, Vec<u8>)> {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let url = response.url().path().to_string();
            let body = response.bytes().await?;
            Ok::<_, Error>((status, url, body))
        };

        let (status, url, body) = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Error::Cancelled),
            result = exchange => result?,
        };

        tracing::debug!(path = %url, status, bytes = body.len(), "remote response");

        Ok((status, body.to_vec()))
    }
}

/// Fail with `RemoteRequest` unless `status` is 200
///
/// # Errors
///
/// Returns `RemoteRequest` carrying the body text for any other status
pub fn check_status(status: u16, body: &[u8]) -> Result<()> {
    if status == 200 {
        return Ok(());
    }

    Err(Error::RemoteRequest {
        status,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

/// Check `status` and decode a JSON body into `T`
///
/// # Errors
///
/// Returns `RemoteRequest` for non-200 statuses and `MalformedResponse`
/// when a 200 body does not match `T`
pub fn decode_json<T>(status: u16, body: &[u8], context: &'static str) -> Result<T>
where
    T: DeserializeOwned,
{
    check_status(status, body)?;

    serde_json::from_slice(body).map_err(|e| Error::MalformedResponse {
        context,
        message: e.to_string(),
    })
}
