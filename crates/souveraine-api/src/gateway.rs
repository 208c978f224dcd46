//! The backend seam the session layer depends on

use async_trait::async_trait;

use crate::{
    ChatReply, DocumentUpload, IntelligentChatRequest, Result, UploadReply, VoiceReply,
    VoiceUpload,
};

/// Request/response operations exposed by the AI backend.
///
/// Only `check_status` is safe to repeat; the other calls are issued once
/// per user action.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Liveness probe. Any failure maps to `false`.
    async fn check_status(&self) -> bool;

    /// Primary text exchange (RAG + generation)
    async fn send_intelligent_message(&self, request: IntelligentChatRequest) -> Result<ChatReply>;

    /// Speech-to-text followed by the same exchange
    async fn send_voice_message(&self, upload: VoiceUpload) -> Result<VoiceReply>;

    /// Store a document on the backend
    async fn upload_document(&self, upload: DocumentUpload) -> Result<UploadReply>;
}
