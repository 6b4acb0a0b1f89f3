//! Markdown preview renderers

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use std::sync::Arc;
use wiki_core::{RendererKind, Result, WikiError};

use crate::api::{transport_error, HttpWikiApi};

/// Turns markdown source into preview HTML
#[async_trait]
pub trait MarkdownRenderer: Send + Sync {
    async fn render(&self, markdown: &str) -> Result<String>;

    /// Get renderer name for debugging
    fn renderer_name(&self) -> &str {
        "UnnamedRenderer"
    }
}

/// Renders through the server's `POST /app/markdown` endpoint
pub struct RemoteRenderer {
    api: HttpWikiApi,
}

impl RemoteRenderer {
    pub fn new(api: HttpWikiApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MarkdownRenderer for RemoteRenderer {
    async fn render(&self, markdown: &str) -> Result<String> {
        let url = self.api.endpoint("/app/markdown")?;
        let response = self
            .api
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(markdown.to_string())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let html = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(WikiError::rendering(format!(
                "render endpoint returned {}",
                status
            )));
        }
        Ok(html)
    }

    fn renderer_name(&self) -> &str {
        "RemoteRenderer"
    }
}

/// Renders in-process, for previews without a round trip
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRenderer;

#[async_trait]
impl MarkdownRenderer for LocalRenderer {
    async fn render(&self, markdown: &str) -> Result<String> {
        Ok(markdown::to_html(markdown))
    }

    fn renderer_name(&self) -> &str {
        "LocalRenderer"
    }
}

/// Pick the renderer selected in the editor configuration
pub fn renderer_for(kind: RendererKind, api: &HttpWikiApi) -> Arc<dyn MarkdownRenderer> {
    match kind {
        RendererKind::Remote => Arc::new(RemoteRenderer::new(api.clone())),
        RendererKind::Local => Arc::new(LocalRenderer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_renderer() {
        let html = LocalRenderer
            .render("# Example page\n\nSome text _here_.\n")
            .await
            .unwrap();
        assert!(html.contains("<h1>Example page</h1>"));
        assert!(html.contains("<em>here</em>"));
    }

    #[test]
    fn test_renderer_selection() {
        let api = HttpWikiApi::new(&Default::default()).unwrap();
        assert_eq!(renderer_for(RendererKind::Local, &api).renderer_name(), "LocalRenderer");
        assert_eq!(renderer_for(RendererKind::Remote, &api).renderer_name(), "RemoteRenderer");
    }
}
