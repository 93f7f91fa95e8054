//! REST transport for the posts API.

use async_trait::async_trait;
use fresca_api_types::PostPayload;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::application::posts::PostsApi;
use crate::cache::QueryError;
use crate::config::ApiSettings;
use crate::domain::entities::PostId;

const USER_AGENT: &str = concat!("fresca/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    #[error("request to {url} failed: {source}")]
    Network {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status { status: StatusCode, url: Url },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
}

impl From<ApiError> for QueryError {
    fn from(err: ApiError) -> Self {
        match &err {
            ApiError::Status { status, .. } => QueryError::Status {
                status: status.as_u16(),
            },
            ApiError::Decode { .. } => QueryError::transform(err.to_string()),
            _ => QueryError::Network(err.to_string()),
        }
    }
}

/// Thin JSON client bound to one base url.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
}

impl RestClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut base = settings.base_url.clone();
        // Url::join treats a base without a trailing slash as a file and
        // would replace its last path segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(ApiError::Build)?;
        Ok(Self { http, base })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(path)?;
        let response = self
            .dispatch(self.http.get(url.clone()), &url)
            .await?;
        decode(response).await
    }

    pub async fn send_json<B>(&self, method: Method, path: &str, body: &B) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let response = self
            .dispatch(self.http.request(method, url.clone()).json(body), &url)
            .await?;
        decode(response).await
    }

    pub async fn send_unit(&self, method: Method, path: &str) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        self.dispatch(self.http.request(method, url.clone()), &url)
            .await?;
        Ok(())
    }

    async fn dispatch(&self, request: RequestBuilder, url: &Url) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|source| ApiError::Network {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "request was refused");
            return Err(ApiError::Status {
                status,
                url: url.clone(),
            });
        }
        debug!(%url, status = status.as_u16(), "request succeeded");
        Ok(response)
    }
}

async fn decode(response: Response) -> Result<Value, ApiError> {
    let url = response.url().clone();
    response
        .json()
        .await
        .map_err(|source| ApiError::Decode { url, source })
}

/// [`PostsApi`] over the json-server style `/posts` resource.
pub struct HttpPostsApi {
    client: RestClient,
}

impl HttpPostsApi {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PostsApi for HttpPostsApi {
    async fn list(&self) -> Result<Value, ApiError> {
        self.client.get_json("posts").await
    }

    async fn create(&self, payload: &PostPayload) -> Result<Value, ApiError> {
        self.client.send_json(Method::POST, "posts", payload).await
    }

    async fn update(&self, id: PostId, payload: &PostPayload) -> Result<Value, ApiError> {
        self.client
            .send_json(Method::PUT, &format!("posts/{id}"), payload)
            .await
    }

    async fn remove(&self, id: PostId) -> Result<(), ApiError> {
        self.client
            .send_unit(Method::DELETE, &format!("posts/{id}"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn settings(base: &str) -> ApiSettings {
        ApiSettings {
            base_url: Url::parse(base).expect("test url"),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn endpoint_joins_are_anchored_to_the_base_path() {
        let client = RestClient::new(&settings("http://localhost:3500")).expect("client");
        assert_eq!(
            client.endpoint("posts").expect("join").as_str(),
            "http://localhost:3500/posts"
        );
        assert_eq!(
            client.endpoint("posts/7").expect("join").as_str(),
            "http://localhost:3500/posts/7"
        );

        let nested = RestClient::new(&settings("http://example.com/api")).expect("client");
        assert_eq!(
            nested.endpoint("posts").expect("join").as_str(),
            "http://example.com/api/posts",
            "a base path without a trailing slash keeps its last segment"
        );
    }

    #[test]
    fn status_errors_map_to_query_status_errors() {
        let url = Url::parse("http://localhost:3500/posts").expect("test url");
        let err = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            url,
        };
        assert_eq!(QueryError::from(err), QueryError::Status { status: 404 });
    }

    #[test]
    fn url_errors_map_to_network_errors() {
        let err = ApiError::from(url::ParseError::EmptyHost);
        assert!(matches!(QueryError::from(err), QueryError::Network(_)));
    }
}
