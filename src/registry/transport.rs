//! HTTP seam between the registry client and the network
//!
//! Session and scraper logic only see [`HttpTransport`]; production uses
//! [`ReqwestTransport`], tests script responses.

use std::sync::Arc;

use async_trait::async_trait;

use super::config::RegistryConfig;
use super::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRequest {
    pub method: HttpMethod,
    pub url: String,
    pub form: Vec<(String, String)>,
    pub cookie_header: Option<String>,
    /// Follow redirects to the final page instead of returning the 3xx
    pub follow_redirects: bool,
}

impl RegistryRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            form: Vec::new(),
            cookie_header: None,
            follow_redirects: false,
        }
    }

    pub fn post_form(url: impl Into<String>, form: &[(&str, &str)]) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            cookie_header: None,
            follow_redirects: false,
        }
    }

    pub fn with_cookies(mut self, cookie_header: String) -> Self {
        if !cookie_header.is_empty() {
            self.cookie_header = Some(cookie_header);
        }
        self
    }

    pub fn following_redirects(mut self) -> Self {
        self.follow_redirects = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryResponse {
    pub status: u16,
    /// Final URL of the response
    pub url: String,
    pub location: Option<String>,
    pub content_type: Option<String>,
    /// Raw `Set-Cookie` header values
    pub set_cookies: Vec<String>,
    /// Empty for binary media responses
    pub body: String,
}

impl RegistryResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// True for responses that carry a media file rather than a page
    pub fn is_binary_media(&self) -> bool {
        is_binary_content_type(self.content_type.as_deref())
    }
}

fn is_binary_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        Some(value) => {
            let lower = value.to_ascii_lowercase();
            lower.contains("image/") || lower.starts_with("application/octet-stream")
        }
        None => false,
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: RegistryRequest) -> Result<RegistryResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn send(&self, request: RegistryRequest) -> Result<RegistryResponse, TransportError> {
        (**self).send(request).await
    }
}

/// reqwest-backed transport
///
/// Holds two clients because reqwest fixes the redirect policy per client.
pub struct ReqwestTransport {
    direct: reqwest::Client,
    following: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &RegistryConfig) -> Result<Self, TransportError> {
        let headers = default_headers(config)?;
        let build = |policy: reqwest::redirect::Policy| {
            reqwest::Client::builder()
                .redirect(policy)
                .connect_timeout(config.connect_timeout)
                .timeout(config.request_timeout)
                .user_agent(config.user_agent.clone())
                .default_headers(headers.clone())
                .build()
                .map_err(|e| TransportError::Protocol(format!("cannot build HTTP client: {}", e)))
        };

        Ok(Self {
            direct: build(reqwest::redirect::Policy::none())?,
            following: build(reqwest::redirect::Policy::limited(5))?,
        })
    }
}

fn default_headers(config: &RegistryConfig) -> Result<reqwest::header::HeaderMap, TransportError> {
    use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};

    let to_value = |value: String| {
        HeaderValue::from_str(&value)
            .map_err(|e| TransportError::Protocol(format!("invalid header value '{}': {}", value, e)))
    };

    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, to_value(config.base_url.trim_end_matches('/').to_string())?);
    headers.insert(REFERER, to_value(config.search_url())?);
    Ok(headers)
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() || error.is_request() {
        TransportError::Connection {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::Protocol(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: RegistryRequest) -> Result<RegistryResponse, TransportError> {
        let client = if request.follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        let mut builder = match request.method {
            HttpMethod::Get => client.get(&request.url),
            HttpMethod::Post => client.post(&request.url).form(&request.form),
        };
        if let Some(cookies) = &request.cookie_header {
            builder = builder.header(reqwest::header::COOKIE, cookies.as_str());
        }

        log::debug!("{:?} {}", request.method, request.url);
        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(&request.url, e))?;

        let headers = response.headers();
        let header_text = |name: reqwest::header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        let location = header_text(reqwest::header::LOCATION);
        let content_type = header_text(reqwest::header::CONTENT_TYPE);
        let set_cookies = headers
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .collect();
        let status = response.status().as_u16();
        let url = response.url().to_string();

        let body = if is_binary_content_type(content_type.as_deref()) {
            String::new()
        } else {
            response
                .text()
                .await
                .map_err(|e| map_reqwest_error(&request.url, e))?
        };

        log::debug!("{} -> {} ({} bytes)", url, status, body.len());
        Ok(RegistryResponse {
            status,
            url,
            location,
            content_type,
            set_cookies,
            body,
        })
    }
}
