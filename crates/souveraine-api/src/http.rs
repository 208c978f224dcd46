//! reqwest implementation of the backend gateway

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use crate::{
    ChatReply, DocumentUpload, IntelligentChatRequest, UploadReply, VoiceReply, VoiceUpload,
    error::{Error, Result},
    gateway::Backend,
};

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Paths of the backend endpoints, relative to the base URL
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub health: String,
    pub chat: String,
    pub voice: String,
    pub upload: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            health: "/api/health".to_string(),
            chat: "/ai/chat/intelligent".to_string(),
            voice: "/ai/chat/voice".to_string(),
            upload: "/api/upload".to_string(),
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Backend base URL, without trailing slash
    pub base_url: String,
    pub endpoints: Endpoints,
    /// Budget for the liveness probe
    pub status_timeout: Duration,
    /// Budget for text and voice exchanges (generation is slow)
    pub chat_timeout: Duration,
    /// Budget for document uploads
    pub upload_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoints: Endpoints::default(),
            status_timeout: Duration::from_secs(5),
            chat_timeout: Duration::from_secs(60),
            upload_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the backend
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Create a gateway with default timeouts
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(GatewayConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    /// Create a gateway from a full configuration
    pub fn with_config(mut config: GatewayConfig) -> Result<Self> {
        let trimmed = config.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                config.base_url
            )));
        }
        config.base_url = trimmed;

        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Resolve a backend-relative path (e.g. an `audio_url`) to an absolute URL
    pub fn resolve_url(&self, path: &str) -> String {
        resolve_url(&self.config.base_url, path)
    }

    fn url(&self, path: &str) -> String {
        resolve_url(&self.config.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        budget: Duration,
    ) -> Result<T> {
        let response = request
            .timeout(budget)
            .send()
            .await
            .map_err(|e| map_transport_error(e, budget))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = extract_detail(&body);
            tracing::debug!(status = status.as_u16(), %detail, "backend rejected request");
            return Err(Error::status(status.as_u16(), detail));
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, budget))?;
        serde_json::from_str(&body).map_err(|e| {
            Error::UnexpectedResponse(format!("{} (body: {})", e, preview(&body, 200)))
        })
    }
}

#[async_trait]
impl Backend for HttpGateway {
    async fn check_status(&self) -> bool {
        let url = self.url(&self.config.endpoints.health);
        match self
            .client
            .get(&url)
            .timeout(self.config.status_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "backend health check failed");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "backend offline");
                false
            }
        }
    }

    async fn send_intelligent_message(&self, request: IntelligentChatRequest) -> Result<ChatReply> {
        let url = self.url(&self.config.endpoints.chat);
        tracing::debug!(
            %url,
            category = request.category.id(),
            language = request.language.code(),
            has_session = request.session_id.is_some(),
            "sending intelligent message"
        );
        let builder = self.client.post(&url).json(&request);
        self.send_json(builder, self.config.chat_timeout).await
    }

    async fn send_voice_message(&self, upload: VoiceUpload) -> Result<VoiceReply> {
        let url = self.url(&self.config.endpoints.voice);
        tracing::debug!(%url, bytes = upload.audio.len(), "sending voice message");

        let audio = Part::bytes(upload.audio)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let form = Form::new()
            .part("audio", audio)
            .text("session_id", upload.session_id.unwrap_or_default())
            .text("category", upload.category.id())
            .text("language", upload.language.code());

        let builder = self.client.post(&url).multipart(form);
        self.send_json(builder, self.config.chat_timeout).await
    }

    async fn upload_document(&self, upload: DocumentUpload) -> Result<UploadReply> {
        let url = self.url(&self.config.endpoints.upload);
        tracing::debug!(%url, file = %upload.file_name, bytes = upload.bytes.len(), "uploading document");

        let file = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let mut form = Form::new()
            .part("file", file)
            .text("category", upload.category.id());
        if let Some(description) = upload.description.filter(|d| !d.is_empty()) {
            form = form.text("description", description);
        }

        let builder = self.client.post(&url).multipart(form);
        self.send_json(builder, self.config.upload_timeout).await
    }
}

/// Join a backend-relative path onto `base`; absolute URLs pass through
pub fn resolve_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

fn map_transport_error(e: reqwest::Error, budget: Duration) -> Error {
    if e.is_timeout() {
        Error::Timeout(budget)
    } else {
        Error::Http(e)
    }
}

/// Pull FastAPI-style `detail` out of an error body, else the raw text
fn extract_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail") {
            return match detail {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }
    }
    preview(body.trim(), 200)
}

fn preview(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
