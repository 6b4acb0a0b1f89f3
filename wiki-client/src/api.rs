//! REST client for the wiki page API

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;
use wiki_core::{ClientId, Page, PageId, PageSummary, Result, ServerConfig, WikiError};

/// Page CRUD operations offered by the wiki server
#[async_trait]
pub trait WikiApi: Send + Sync {
    /// Fetch the page collection
    async fn list_pages(&self) -> Result<Vec<PageSummary>>;

    /// Fetch one page with its server-rendered HTML
    async fn fetch_page(&self, id: PageId) -> Result<Page>;

    /// Create a page; the server assigns the identifier
    async fn create_page(&self, name: &str, markdown: &str) -> Result<()>;

    /// Replace a page's markdown on behalf of an editing session
    async fn update_page(&self, id: PageId, markdown: &str, client: ClientId) -> Result<()>;

    /// Delete a page
    async fn delete_page(&self, id: PageId) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct CreatePageRequest<'a> {
    name: &'a str,
    markdown: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdatePageRequest<'a> {
    markdown: &'a str,
    client: ClientId,
}

#[derive(Debug, Deserialize)]
struct PageListResponse {
    #[serde(default)]
    pages: Vec<PageSummary>,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    page: Page,
}

/// reqwest-backed implementation of [`WikiApi`]
#[derive(Clone)]
pub struct HttpWikiApi {
    http: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

pub(crate) fn transport_error(err: reqwest::Error) -> WikiError {
    WikiError::http(err.to_string())
}

impl HttpWikiApi {
    /// Create a client for the configured server
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            http,
            base_url: config.base_url()?,
            api_token: config.api_token.clone(),
        })
    }

    /// Base address of the wiki server
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and unwrap the server's `{success, error}` envelope
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        let value: serde_json::Value = if body.is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            match serde_json::from_slice(&body) {
                Ok(value) => value,
                Err(e) if status.is_success() => return Err(e.into()),
                Err(_) => {
                    return Err(WikiError::api(
                        status.as_u16(),
                        fallback_message(status, &String::from_utf8_lossy(&body)),
                    ))
                }
            }
        };

        let declared_failure = value.get("success").and_then(|v| v.as_bool()) == Some(false);
        if !status.is_success() || declared_failure {
            let message = value
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| fallback_message(status, ""));
            return Err(WikiError::api(status.as_u16(), message));
        }

        Ok(serde_json::from_value(value)?)
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[async_trait]
impl WikiApi for HttpWikiApi {
    async fn list_pages(&self) -> Result<Vec<PageSummary>> {
        let url = self.endpoint("/api/pages")?;
        let response: PageListResponse = self.send_json(self.request(Method::GET, url)).await?;
        tracing::debug!("Fetched {} pages", response.pages.len());
        Ok(response.pages)
    }

    async fn fetch_page(&self, id: PageId) -> Result<Page> {
        let url = self.endpoint(&format!("/api/pages/{}", id))?;
        let response: PageResponse = self.send_json(self.request(Method::GET, url)).await?;
        Ok(response.page)
    }

    async fn create_page(&self, name: &str, markdown: &str) -> Result<()> {
        let url = self.endpoint("/api/pages")?;
        let request = self
            .request(Method::POST, url)
            .json(&CreatePageRequest { name, markdown });
        let _: serde_json::Value = self.send_json(request).await?;
        tracing::info!("Created page '{}'", name);
        Ok(())
    }

    async fn update_page(&self, id: PageId, markdown: &str, client: ClientId) -> Result<()> {
        let url = self.endpoint(&format!("/api/pages/{}", id))?;
        let request = self
            .request(Method::PUT, url)
            .json(&UpdatePageRequest { markdown, client });
        let _: serde_json::Value = self.send_json(request).await?;
        tracing::info!("Updated page {}", id);
        Ok(())
    }

    async fn delete_page(&self, id: PageId) -> Result<()> {
        let url = self.endpoint(&format!("/api/pages/{}", id))?;
        let _: serde_json::Value = self.send_json(self.request(Method::DELETE, url)).await?;
        tracing::info!("Deleted page {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_payload_shape() {
        let client = ClientId::new();
        let body = serde_json::to_value(UpdatePageRequest {
            markdown: "# Hi",
            client,
        })
        .unwrap();
        assert_eq!(body["markdown"], "# Hi");
        assert_eq!(body["client"], client.to_string());
    }

    #[test]
    fn test_endpoint_is_host_absolute() {
        let config = ServerConfig {
            base_url: "http://localhost:8080/app/".to_string(),
            ..Default::default()
        };
        let api = HttpWikiApi::new(&config).unwrap();
        assert_eq!(
            api.endpoint("/api/pages/4").unwrap().as_str(),
            "http://localhost:8080/api/pages/4"
        );
    }

    #[test]
    fn test_fallback_message() {
        assert_eq!(fallback_message(StatusCode::NOT_FOUND, ""), "Not Found");
        assert_eq!(fallback_message(StatusCode::BAD_GATEWAY, " upstream down "), "upstream down");
    }
}
