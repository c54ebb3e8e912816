//! Shared HTTP client for the external distance and model services

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("Unexpected status: {status}")]
    Status { status: u16 },
    #[error("Timeout")]
    Timeout,
    #[error("Rate limited")]
    RateLimited,
    #[error("Parse error: {message}")]
    ParseError { message: String },
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout
        } else {
            HttpError::RequestFailed {
                message: err.to_string(),
            }
        }
    }
}

/// Build a URL from a base and query parameters
pub fn url_with_params(url: &str, params: &[(&str, &str)]) -> Result<Url, HttpError> {
    Url::parse_with_params(url, params).map_err(|_| HttpError::InvalidUrl {
        url: url.to_string(),
    })
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET `url` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, HttpError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        decode(response).await
    }

    /// GET `url` and decode the JSON body, including 4xx replies whose body
    /// is the same document (OSRM reports `NoRoute` and friends with a 400)
    pub async fn get_json_or_client_error<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, HttpError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() && status.as_u16() != 429 {
            let body = response.text().await?;
            return serde_json::from_str(&body).map_err(|_| HttpError::Status {
                status: status.as_u16(),
            });
        }

        decode(response).await
    }

    /// POST `body` as JSON to `url` and decode the JSON reply
    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .json(body)
            .send()
            .await?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, HttpError> {
    let status = response.status();

    if status.as_u16() == 429 {
        return Err(HttpError::RateLimited);
    }
    if !status.is_success() {
        return Err(HttpError::Status {
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| HttpError::ParseError {
        message: e.to_string(),
    })
}
