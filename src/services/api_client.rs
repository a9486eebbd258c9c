use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, StatusCode, header::CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::ClientConfig,
    error::{ApiError, ApiResult},
    routes::Navigator,
    session::SessionContext,
};

/// REST client bound to `{api_base_url}/api`.
///
/// Attaches the session's bearer token to every request. A 401 on any call
/// clears the session and sends the navigator to the login screen.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    session: SessionContext,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Client rooted at `{api_base_url}/api` with the configured timeout.
    pub fn new(
        config: &ClientConfig,
        session: SessionContext,
        navigator: Arc<dyn Navigator>,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ApiError::ClientBuilder { source })?;
        let base_url = Arc::<str>::from(format!(
            "{}/api",
            config.api_base_url.trim_end_matches('/')
        ));

        Ok(Self {
            client,
            base_url,
            session,
            navigator,
        })
    }

    /// Session whose token is attached to requests.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Base URL every path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `GET path`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.execute(path, self.request(Method::GET, path)).await
    }

    /// `GET path` with `query` encoded into the URL.
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(path, self.request(Method::GET, path).query(query))
            .await
    }

    /// `POST path` with a JSON body.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(path, self.request(Method::POST, path).json(body))
            .await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.execute(path, self.request(Method::POST, path)).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(path, self.request(Method::PUT, path).json(body))
            .await
    }

    /// `DELETE path`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.execute(path, self.request(Method::DELETE, path)).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        builder: RequestBuilder,
    ) -> ApiResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|source| ApiError::RequestSend {
                path: path.to_string(),
                source,
            })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::ReadBody {
                path: path.to_string(),
                source,
            })?;
        debug!(path, status = status.as_u16(), bytes = body.len(), "response received");

        match status {
            StatusCode::UNAUTHORIZED => {
                warn!(path, "backend rejected the session; signing out");
                self.session.clear();
                self.navigator.redirect_to_login();
                Err(ApiError::Unauthorized {
                    path: path.to_string(),
                    message: error_message(&body),
                })
            }
            status if status.is_success() => decode_body(path, &body),
            other => Err(ApiError::RequestStatus {
                path: path.to_string(),
                status: other,
                message: error_message(&body),
            }),
        }
    }
}

/// `message` field of a JSON error body.
fn error_message(body: &[u8]) -> Option<String> {
    let value = serde_json::from_slice::<Value>(body).ok()?;
    value.get("message")?.as_str().map(str::to_owned)
}

fn decode_body<T: DeserializeOwned>(path: &str, body: &[u8]) -> ApiResult<T> {
    let decoded = if body.iter().all(u8::is_ascii_whitespace) {
        T::deserialize(Value::Null)
    } else {
        serde_json::from_slice(body)
    };
    decoded.map_err(|source| ApiError::DecodeBody {
        path: path.to_string(),
        source,
    })
}
