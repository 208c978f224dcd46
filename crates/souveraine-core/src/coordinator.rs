//! Session coordinator: active conversation, guest session and the send lifecycle

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use souveraine_api::{
    Backend, Category, ChatReply, DocumentUpload, IntelligentChatRequest, Language, VoiceUpload,
};
use tokio::sync::broadcast;

use crate::{
    audio::{AudioCapture, AudioPayload},
    content,
    error::{Error, Result, ValidationError},
    events::{Notice, SessionEvent},
    model::{Conversation, Message, PLACEHOLDER_TITLE, ThemePreference},
    repository::{ConversationRepository, ConversationUpdate, NewConversation},
    store::PersistedStore,
};

/// Largest file accepted for upload (10 MiB)
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Appended to the conversation when a text exchange fails
pub const SEND_ERROR_TEXT: &str = "⚠️ Erreur de connexion avec le serveur. Veuillez réessayer.";

/// Content of the optimistic user message for a voice send
pub const VOICE_MESSAGE_TEXT: &str = "🎤 Message vocal";

/// Where the coordinator is in the send lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    /// Nothing pending
    Idle,
    /// An attachment is staged and waiting for submit
    Drafting,
    /// A request is in flight; further submits are ignored
    Sending,
}

/// How a submit settled
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The backend answered; `message` is the last message appended
    Reconciled {
        conversation_id: String,
        message: Message,
    },
    /// The backend call failed; an error message was appended
    Failed {
        conversation_id: String,
        error: String,
    },
    /// Another send was in flight; nothing happened
    Ignored,
}

impl SendOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, SendOutcome::Ignored)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            SendOutcome::Reconciled {
                conversation_id, ..
            }
            | SendOutcome::Failed {
                conversation_id, ..
            } => Some(conversation_id),
            SendOutcome::Ignored => None,
        }
    }
}

/// A file staged for upload with the next send
#[derive(Debug, Clone)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl Attachment {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

struct SessionState {
    active: Option<String>,
    session_id: Option<String>,
    category: Category,
    language: Language,
    theme: ThemePreference,
    attachment: Option<Attachment>,
}

/// Clears the in-flight flag on every exit path
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Owns the active conversation pointer, the guest session id and the
/// message-send lifecycle.
///
/// All methods take `&self`; wrap in an `Arc` to share with background
/// tasks. Locks are never held across a backend call.
pub struct SessionCoordinator {
    repository: Mutex<ConversationRepository>,
    store: PersistedStore,
    backend: Arc<dyn Backend>,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionCoordinator {
    /// Restore persisted state and attach to `backend`
    pub fn new(store: PersistedStore, backend: Arc<dyn Backend>) -> Self {
        let repository = ConversationRepository::load(store.clone());

        let stored = store.active_conversation();
        let active = stored
            .clone()
            .filter(|id| repository.contains(id))
            .or_else(|| repository.list().first().map(|c| c.id.clone()));
        if active != stored {
            if let Err(e) = store.set_active_conversation(active.as_deref()) {
                tracing::error!(error = %e, "failed to persist active conversation");
            }
        }

        let state = SessionState {
            active,
            session_id: store.guest_session(),
            category: Category::default(),
            language: Language::default(),
            theme: store.theme(),
            attachment: None,
        };
        let (event_tx, _) = broadcast::channel(256);

        Self {
            repository: Mutex::new(repository),
            store,
            backend,
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
            event_tx,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn phase(&self) -> SendPhase {
        if self.in_flight.load(Ordering::Acquire) {
            SendPhase::Sending
        } else if self.state.lock().attachment.is_some() {
            SendPhase::Drafting
        } else {
            SendPhase::Idle
        }
    }

    /// Snapshot of all conversations in insertion order
    pub fn conversations(&self) -> Vec<Conversation> {
        self.repository.lock().list().to_vec()
    }

    pub fn search(&self, term: &str) -> Vec<Conversation> {
        self.repository
            .lock()
            .search(term)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn active_id(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        let id = self.active_id()?;
        self.repository.lock().get(&id).ok().cloned()
    }

    pub fn select_conversation(&self, id: &str) -> Result<()> {
        if !self.repository.lock().contains(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        self.set_active(Some(id.to_string()));
        Ok(())
    }

    /// Start an empty conversation and make it active
    pub fn new_conversation(&self) -> Conversation {
        let conversation = self.repository.lock().create(NewConversation {
            title: PLACEHOLDER_TITLE.to_string(),
            category: Category::General,
            messages: Vec::new(),
        });
        self.emit(SessionEvent::ConversationCreated {
            conversation: conversation.clone(),
        });
        self.set_active(Some(conversation.id.clone()));
        self.notice(Notice::success("Nouvelle conversation démarrée"));
        conversation
    }

    /// Delete a conversation; if it was active, the first remaining one
    /// (or none) becomes active
    pub fn delete_conversation(&self, id: &str) -> Result<()> {
        let next = {
            let mut repo = self.repository.lock();
            repo.delete(id)?;
            repo.list().first().map(|c| c.id.clone())
        };
        self.emit(SessionEvent::ConversationDeleted {
            conversation_id: id.to_string(),
        });

        let was_active = self.state.lock().active.as_deref() == Some(id);
        if was_active {
            self.set_active(next);
        }
        self.notice(Notice::success("Conversation supprimée"));
        Ok(())
    }

    pub fn category(&self) -> Category {
        self.state.lock().category
    }

    pub fn set_category(&self, category: Category) {
        self.state.lock().category = category;
    }

    pub fn language(&self) -> Language {
        self.state.lock().language
    }

    pub fn set_language(&self, language: Language) {
        self.state.lock().language = language;
    }

    pub fn theme(&self) -> ThemePreference {
        self.state.lock().theme
    }

    pub fn set_theme(&self, theme: ThemePreference) {
        self.state.lock().theme = theme;
        if let Err(e) = self.store.set_theme(theme) {
            tracing::error!(error = %e, "failed to persist theme");
        }
    }

    pub fn toggle_theme(&self) -> ThemePreference {
        let theme = self.theme().toggled();
        self.set_theme(theme);
        theme
    }

    /// Guest session id of record, if the backend issued one
    pub fn session_id(&self) -> Option<String> {
        self.state.lock().session_id.clone()
    }

    /// Stage a file to upload with the next send
    pub fn stage_attachment(&self, attachment: Attachment) -> Result<()> {
        if attachment.size() > MAX_ATTACHMENT_BYTES {
            let err = ValidationError::AttachmentTooLarge {
                size: attachment.size(),
                max: MAX_ATTACHMENT_BYTES,
            };
            self.notice(Notice::error("Fichier trop volumineux (max 10MB)"));
            return Err(err.into());
        }
        self.notice(Notice::success(format!(
            "Fichier sélectionné: {}",
            attachment.file_name
        )));
        self.state.lock().attachment = Some(attachment);
        Ok(())
    }

    pub fn clear_attachment(&self) {
        self.state.lock().attachment = None;
    }

    /// Name of the staged file, if any
    pub fn staged_attachment(&self) -> Option<String> {
        self.state
            .lock()
            .attachment
            .as_ref()
            .map(|a| a.file_name.clone())
    }

    /// Submit typed text (and the staged attachment, if any)
    pub async fn send_text(&self, text: &str) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() && self.state.lock().attachment.is_none() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("send already in flight, ignoring submit");
            return Ok(SendOutcome::Ignored);
        };

        let (category, language, attachment) = {
            let mut state = self.state.lock();
            // Cleared since the check above
            if text.is_empty() && state.attachment.is_none() {
                return Err(ValidationError::EmptyMessage.into());
            }
            (state.category, state.language, state.attachment.take())
        };

        let seed = match &attachment {
            Some(a) if text.is_empty() => a.file_name.as_str(),
            _ => text,
        };
        let conversation_id = self.ensure_conversation(content::title_from(seed), category);
        self.emit(SessionEvent::SendStarted {
            conversation_id: conversation_id.clone(),
        });

        let mut last = None;
        if let Some(attachment) = attachment {
            let names_title = text.is_empty();
            last = Some(
                self.upload(&conversation_id, attachment, category, names_title)
                    .await,
            );
            if text.is_empty() {
                return Ok(self.finish(&conversation_id, last));
            }
        }

        self.append_user(&conversation_id, Message::user(text, category), Some(text), category);

        let request = IntelligentChatRequest {
            message: text.to_string(),
            category,
            language,
            session_id: self.session_id(),
        };
        tracing::debug!(%conversation_id, category = category.id(), "sending message");

        let outcome = match self.backend.send_intelligent_message(request).await {
            Ok(reply) => {
                self.adopt_session_id(reply.session_id.as_deref());
                let message = Message::assistant(&reply);
                self.append(&conversation_id, ConversationUpdate::append(message.clone()));
                if let Some(notice) = mode_notice(&reply) {
                    self.notice(notice);
                }
                Ok(message)
            }
            Err(e) => {
                tracing::warn!(error = %e, "message send failed");
                self.append(
                    &conversation_id,
                    ConversationUpdate::append(Message::error(SEND_ERROR_TEXT)),
                );
                self.notice(Notice::error(e.user_message()));
                Err(e.user_message())
            }
        };
        Ok(self.finish(&conversation_id, Some(outcome)))
    }

    /// Submit a recorded voice message
    pub async fn send_voice(&self, payload: AudioPayload) -> Result<SendOutcome> {
        if let Err(e) = payload.validate() {
            self.notice(Notice::error(format!("⚠️ {}", e)));
            return Err(e.into());
        }
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("send already in flight, ignoring voice submit");
            return Ok(SendOutcome::Ignored);
        };

        let (category, language) = {
            let state = self.state.lock();
            (state.category, state.language)
        };
        let conversation_id = self.ensure_conversation(PLACEHOLDER_TITLE.to_string(), category);
        self.emit(SessionEvent::SendStarted {
            conversation_id: conversation_id.clone(),
        });
        self.append_user(
            &conversation_id,
            Message::voice(VOICE_MESSAGE_TEXT, category),
            None,
            category,
        );
        self.notice(Notice::info("🎤 Transcription en cours..."));

        let upload = VoiceUpload {
            audio: payload.bytes,
            file_name: payload.file_name,
            mime_type: payload.mime_type,
            session_id: self.session_id(),
            category,
            language,
        };
        tracing::debug!(%conversation_id, bytes = upload.audio.len(), "sending voice message");

        let outcome = match self.backend.send_voice_message(upload).await {
            Ok(voice) => {
                self.adopt_session_id(voice.reply.session_id.as_deref());
                let message = Message::assistant(&voice.reply)
                    .with_transcription(&voice.transcription, voice.transcription_confidence);
                let title = self
                    .has_placeholder_title(&conversation_id)
                    .then(|| content::title_from(&voice.transcription))
                    .filter(|t| !t.is_empty());
                self.append(
                    &conversation_id,
                    ConversationUpdate {
                        title,
                        category: Some(category),
                        append: vec![message.clone()],
                    },
                );
                let confidence = voice.transcription_confidence.unwrap_or(0.9);
                self.notice(Notice::success(format!(
                    "✅ Voix → Texte → IA ({:.0}% confiance)",
                    confidence * 100.0
                )));
                Ok(message)
            }
            Err(e) => {
                tracing::warn!(error = %e, "voice send failed");
                self.append(
                    &conversation_id,
                    ConversationUpdate::append(Message::error(format!(
                        "⚠️ Erreur lors du traitement vocal: {}",
                        e.user_message()
                    ))),
                );
                self.notice(Notice::error(format!("❌ {}", e.user_message())));
                Err(e.user_message())
            }
        };
        Ok(self.finish(&conversation_id, Some(outcome)))
    }

    /// Record with `capture`, then submit the result as a voice message
    pub async fn capture_and_send_voice(&self, capture: &dyn AudioCapture) -> Result<SendOutcome> {
        if self.in_flight.load(Ordering::Acquire) {
            return Ok(SendOutcome::Ignored);
        }
        let payload = match capture.capture().await {
            Ok(payload) => payload,
            Err(e) => {
                self.notice(Notice::error(e.to_string()));
                return Err(e);
            }
        };
        self.send_voice(payload).await
    }

    /// Content of a prior user message of the active conversation, as a
    /// new draft. History is left untouched.
    pub fn reuse_message(&self, message_id: &str) -> Result<String> {
        let message = self.find_active_message(message_id)?;
        if !message.is_user() {
            return Err(Error::NotFound(message_id.to_string()));
        }
        Ok(message.content)
    }

    /// Thumbs up/down on an assistant message
    pub fn record_feedback(&self, message_id: &str, positive: bool) -> Result<()> {
        self.find_active_message(message_id)?;
        tracing::info!(%message_id, positive, "message feedback");
        self.notice(Notice::success(if positive {
            "Merci pour votre retour positif !"
        } else {
            "Merci, nous prenons en compte votre retour."
        }));
        Ok(())
    }

    /// Probe the backend once and publish the result
    pub async fn check_status(&self) -> bool {
        let online = self.backend.check_status().await;
        self.emit(SessionEvent::BackendStatus { online });
        if !online {
            self.notice(Notice::error("Le backend est hors ligne ⚠️"));
        }
        online
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                flag: &self.in_flight,
            })
    }

    /// Active conversation id, creating one titled `title` if none is active
    fn ensure_conversation(&self, title: String, category: Category) -> String {
        if let Some(id) = self.active_id() {
            if self.repository.lock().contains(&id) {
                return id;
            }
        }
        let conversation = self.repository.lock().create(NewConversation {
            title,
            category,
            messages: Vec::new(),
        });
        let id = conversation.id.clone();
        self.emit(SessionEvent::ConversationCreated { conversation });
        self.set_active(Some(id.clone()));
        id
    }

    fn has_placeholder_title(&self, id: &str) -> bool {
        self.repository
            .lock()
            .get(id)
            .map(|c| c.has_placeholder_title())
            .unwrap_or(false)
    }

    /// Optimistic append of the outgoing message
    fn append_user(&self, id: &str, message: Message, title_seed: Option<&str>, category: Category) {
        let title = title_seed
            .filter(|_| self.has_placeholder_title(id))
            .map(content::title_from);
        self.append(
            id,
            ConversationUpdate {
                title,
                category: Some(category),
                append: vec![message],
            },
        );
    }

    fn append(&self, id: &str, update: ConversationUpdate) {
        let appended = update.append.clone();
        let result = self.repository.lock().update(id, update);
        match result {
            Ok(_) => {
                for message in appended {
                    self.emit(SessionEvent::MessageAppended {
                        conversation_id: id.to_string(),
                        message,
                    });
                }
            }
            // Deleted while the request was in flight
            Err(e) => tracing::warn!(conversation_id = %id, error = %e, "dropping update"),
        }
    }

    async fn upload(
        &self,
        conversation_id: &str,
        attachment: Attachment,
        category: Category,
        names_title: bool,
    ) -> std::result::Result<Message, String> {
        let display_name = attachment.file_name.clone();
        let upload = DocumentUpload {
            bytes: attachment.bytes,
            file_name: attachment.file_name,
            mime_type: attachment.mime_type,
            category,
            description: None,
        };
        match self.backend.upload_document(upload).await {
            Ok(reply) => {
                let message =
                    Message::attachment(&display_name, reply.file_url, reply.filename, category);
                // Typed text, when present, names a placeholder conversation
                let seed = names_title.then_some(display_name.as_str());
                self.append_user(conversation_id, message.clone(), seed, category);
                self.notice(Notice::success("✅ Fichier uploadé avec succès"));
                Ok(message)
            }
            Err(e) => {
                tracing::warn!(error = %e, file = %display_name, "upload failed");
                self.append(
                    conversation_id,
                    ConversationUpdate::append(Message::error(format!(
                        "⚠️ Échec de l'envoi de {}: {}",
                        display_name,
                        e.user_message()
                    ))),
                );
                self.notice(Notice::error("❌ Erreur lors de l'upload"));
                Err(e.user_message())
            }
        }
    }

    fn finish(
        &self,
        conversation_id: &str,
        result: Option<std::result::Result<Message, String>>,
    ) -> SendOutcome {
        let outcome = match result {
            Some(Ok(message)) => SendOutcome::Reconciled {
                conversation_id: conversation_id.to_string(),
                message,
            },
            Some(Err(error)) => SendOutcome::Failed {
                conversation_id: conversation_id.to_string(),
                error,
            },
            None => SendOutcome::Ignored,
        };
        self.emit(SessionEvent::SendFinished {
            conversation_id: conversation_id.to_string(),
            ok: matches!(outcome, SendOutcome::Reconciled { .. }),
        });
        outcome
    }

    /// Keep the first session id the backend issues; never overwrite it
    fn adopt_session_id(&self, candidate: Option<&str>) {
        let Some(candidate) = candidate.map(str::trim).filter(|s| !s.is_empty()) else {
            return;
        };
        {
            let mut state = self.state.lock();
            if let Some(current) = &state.session_id {
                if current != candidate {
                    tracing::debug!(%current, %candidate, "ignoring differing session id");
                }
                return;
            }
            state.session_id = Some(candidate.to_string());
        }
        tracing::info!(session_id = %candidate, "adopted guest session");
        if let Err(e) = self.store.set_guest_session(candidate) {
            tracing::error!(error = %e, "failed to persist guest session");
        }
        self.emit(SessionEvent::SessionIdAssigned {
            session_id: candidate.to_string(),
        });
    }

    fn set_active(&self, id: Option<String>) {
        self.state.lock().active = id.clone();
        if let Err(e) = self.store.set_active_conversation(id.as_deref()) {
            tracing::error!(error = %e, "failed to persist active conversation");
        }
        self.emit(SessionEvent::ActiveChanged {
            conversation_id: id,
        });
    }

    fn find_active_message(&self, message_id: &str) -> Result<Message> {
        let conversation = self
            .active_conversation()
            .ok_or_else(|| Error::NotFound(message_id.to_string()))?;
        conversation
            .messages
            .into_iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| Error::NotFound(message_id.to_string()))
    }

    fn notice(&self, notice: Notice) {
        self.emit(SessionEvent::Notice(notice));
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Notice text for the backend's answer mode
fn mode_notice(reply: &ChatReply) -> Option<Notice> {
    match reply.mode.as_deref() {
        Some("intelligent") => {
            let audio = if reply.audio_url.as_deref().is_some_and(|u| !u.is_empty()) {
                " 🔊"
            } else {
                ""
            };
            Some(Notice::success(format!(
                "🧠 Réponse intelligente ({} sources){}",
                reply.source_count(),
                audio
            )))
        }
        Some("greeting") => Some(Notice::success("👋 Bienvenue ! IA locale du Burkina Faso")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoticeLevel;
    use crate::model::Role;
    use async_trait::async_trait;
    use souveraine_api::{UploadReply, VoiceReply};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MockBackend {
        chat_replies: Mutex<VecDeque<souveraine_api::Result<ChatReply>>>,
        voice_replies: Mutex<VecDeque<souveraine_api::Result<VoiceReply>>>,
        upload_fails: AtomicBool,
        requests: Mutex<Vec<IntelligentChatRequest>>,
        chat_calls: AtomicUsize,
        voice_calls: AtomicUsize,
        upload_calls: AtomicUsize,
        online: AtomicBool,
        /// When set, chat calls signal `entered` and wait on `gate`
        gated: AtomicBool,
        entered: Notify,
        gate: Notify,
    }

    impl MockBackend {
        fn replying(replies: Vec<souveraine_api::Result<ChatReply>>) -> Arc<Self> {
            let mock = Self::default();
            *mock.chat_replies.lock() = replies.into();
            Arc::new(mock)
        }
    }

    #[async_trait]
    impl Backend for MockBackend {
        async fn check_status(&self) -> bool {
            self.online.load(Ordering::SeqCst)
        }

        async fn send_intelligent_message(
            &self,
            request: IntelligentChatRequest,
        ) -> souveraine_api::Result<ChatReply> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(request);
            if self.gated.load(Ordering::SeqCst) {
                self.entered.notify_one();
                self.gate.notified().await;
            }
            let next = self.chat_replies.lock().pop_front();
            next.unwrap_or_else(|| Ok(reply("D'accord.")))
        }

        async fn send_voice_message(
            &self,
            _upload: VoiceUpload,
        ) -> souveraine_api::Result<VoiceReply> {
            self.voice_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.voice_replies.lock().pop_front();
            next.unwrap_or_else(|| Ok(VoiceReply::default()))
        }

        async fn upload_document(
            &self,
            upload: DocumentUpload,
        ) -> souveraine_api::Result<UploadReply> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            if self.upload_fails.load(Ordering::SeqCst) {
                return Err(souveraine_api::Error::status(413, "trop gros"));
            }
            Ok(UploadReply {
                file_url: format!("/uploads/{}", upload.file_name),
                filename: format!("stored_{}", upload.file_name),
                message: None,
            })
        }
    }

    fn reply(text: &str) -> ChatReply {
        ChatReply {
            response: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn coordinator(mock: &Arc<MockBackend>) -> (SessionCoordinator, PersistedStore) {
        let store = PersistedStore::in_memory();
        (SessionCoordinator::new(store.clone(), mock.clone()), store)
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn notices(events: &[SessionEvent]) -> Vec<Notice> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    fn voice_payload(bytes: usize, duration_ms: u64) -> AudioPayload {
        AudioPayload::new(vec![0; bytes], "audio/wav")
            .with_duration(Duration::from_millis(duration_ms))
    }

    #[tokio::test]
    async fn test_first_message_creates_conversation() {
        let mock = MockBackend::replying(vec![Ok(ChatReply {
            response: Some("Le mil, le sorgho et le maïs.".into()),
            mode: Some("intelligent".into()),
            sources: vec!["atlas_agricole.pdf".into()],
            session_id: Some("guest_42".into()),
            ..Default::default()
        })]);
        let (coord, store) = coordinator(&mock);
        coord.set_category(Category::Agriculture);
        let mut rx = coord.subscribe();

        let outcome = coord.send_text("Quelles cultures au Burkina?").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Reconciled { .. }));

        let conversations = coord.conversations();
        assert_eq!(conversations.len(), 1);
        let conv = &conversations[0];
        assert_eq!(conv.title, "Quelles cultures au Burkina?");
        assert_eq!(conv.category, Category::Agriculture);
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].role, Role::User);
        assert_eq!(conv.messages[1].role, Role::Assistant);
        assert_eq!(conv.messages[1].content, "Le mil, le sorgho et le maïs.");
        assert_eq!(conv.messages[1].sources, vec!["atlas_agricole.pdf".to_string()]);

        assert_eq!(coord.active_id().as_deref(), Some(conv.id.as_str()));
        assert_eq!(store.active_conversation().as_deref(), Some(conv.id.as_str()));
        assert_eq!(store.load_conversations(), conversations);
        assert_eq!(coord.session_id().as_deref(), Some("guest_42"));
        assert_eq!(store.guest_session().as_deref(), Some("guest_42"));

        let request = &mock.requests.lock()[0];
        assert_eq!(request.category, Category::Agriculture);
        assert_eq!(request.language, Language::Fr);
        assert_eq!(request.session_id, None);

        let events = drain(&mut rx);
        assert!(matches!(events[0], SessionEvent::ConversationCreated { .. }));
        assert!(
            notices(&events)
                .iter()
                .any(|n| n.text.starts_with("🧠 Réponse intelligente (1 sources)"))
        );
        assert_eq!(coord.phase(), SendPhase::Idle);
    }

    #[tokio::test]
    async fn test_long_first_message_title_is_truncated() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        coord
            .send_text("Comment préparer le beurre de karité à la maison ?")
            .await
            .unwrap();
        assert_eq!(coord.conversations()[0].title, "Comment préparer le beurre de ...");
    }

    #[tokio::test]
    async fn test_backend_error_keeps_user_message() {
        let mock = MockBackend::replying(vec![Err(souveraine_api::Error::status(500, "boom"))]);
        let (coord, store) = coordinator(&mock);
        let mut rx = coord.subscribe();

        let outcome = coord.send_text("Bonjour").await.unwrap();
        match outcome {
            SendOutcome::Failed { error, .. } => assert_eq!(error, "Erreur serveur interne"),
            other => panic!("expected failure, got {:?}", other),
        }

        let conv = coord.active_conversation().unwrap();
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].content, "Bonjour");
        assert_eq!(conv.messages[1].role, Role::System);
        assert!(conv.messages[1].is_error);
        assert_eq!(conv.message_count, 2);
        assert_eq!(store.load_conversations()[0].messages.len(), 2);
        assert_eq!(coord.phase(), SendPhase::Idle);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::SendFinished { ok: false, .. })));
        assert!(notices(&events).iter().any(|n| n.level == NoticeLevel::Error));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_effects() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        let err = coord.send_text("   ").await.unwrap_err();
        assert!(err.is_validation());
        assert!(coord.conversations().is_empty());
        assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_voice_capture_is_rejected() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        let mut rx = coord.subscribe();

        let err = coord.send_voice(voice_payload(8000, 500)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::AudioTooShort)
        ));
        assert_eq!(mock.voice_calls.load(Ordering::SeqCst), 0);
        assert!(coord.conversations().is_empty());

        let events = drain(&mut rx);
        let notices = notices(&events);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_tiny_voice_payload_is_rejected() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        let payload = AudioPayload::new(vec![0; 200], "audio/webm");
        assert!(coord.send_voice(payload).await.unwrap_err().is_validation());
        assert_eq!(mock.voice_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_voice_send_uses_transcription_for_title() {
        let mock = MockBackend::replying(vec![]);
        mock.voice_replies.lock().push_back(Ok(VoiceReply {
            transcription: "Quel temps fera-t-il à Bobo-Dioulasso demain ?".into(),
            transcription_confidence: Some(0.87),
            reply: ChatReply {
                response: Some("Il fera chaud.".into()),
                session_id: Some("guest_voice".into()),
                ..Default::default()
            },
        }));
        let (coord, _) = coordinator(&mock);

        let outcome = coord.send_voice(voice_payload(16_000, 3000)).await.unwrap();
        assert!(matches!(outcome, SendOutcome::Reconciled { .. }));

        let conv = coord.active_conversation().unwrap();
        assert_eq!(conv.title, "Quel temps fera-t-il à Bobo-Di...");
        assert_eq!(conv.messages.len(), 2);
        assert!(conv.messages[0].is_voice);
        assert_eq!(conv.messages[0].content, VOICE_MESSAGE_TEXT);
        assert_eq!(
            conv.messages[1].transcription.as_deref(),
            Some("Quel temps fera-t-il à Bobo-Dioulasso demain ?")
        );
        assert_eq!(conv.messages[1].confidence, Some(0.87));
        assert_eq!(coord.session_id().as_deref(), Some("guest_voice"));
    }

    #[tokio::test]
    async fn test_voice_failure_keeps_voice_message() {
        let mock = MockBackend::replying(vec![]);
        mock.voice_replies
            .lock()
            .push_back(Err(souveraine_api::Error::status(422, "Audio illisible")));
        let (coord, _) = coordinator(&mock);

        let outcome = coord.send_voice(voice_payload(16_000, 3000)).await.unwrap();
        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        let conv = coord.active_conversation().unwrap();
        assert_eq!(conv.messages.len(), 2);
        assert!(conv.messages[0].is_voice);
        assert!(conv.messages[1].is_error);
        assert!(conv.messages[1].content.contains("Audio illisible"));
        assert_eq!(conv.title, PLACEHOLDER_TITLE);
    }

    #[tokio::test]
    async fn test_session_id_is_adopted_once() {
        let mock = MockBackend::replying(vec![
            Ok(ChatReply {
                session_id: Some("guest_1".into()),
                ..reply("a")
            }),
            Ok(ChatReply {
                session_id: Some("guest_2".into()),
                ..reply("b")
            }),
        ]);
        let (coord, store) = coordinator(&mock);
        let mut rx = coord.subscribe();

        coord.send_text("un").await.unwrap();
        coord.send_text("deux").await.unwrap();

        assert_eq!(coord.session_id().as_deref(), Some("guest_1"));
        assert_eq!(store.guest_session().as_deref(), Some("guest_1"));
        let requests = mock.requests.lock();
        assert_eq!(requests[0].session_id, None);
        assert_eq!(requests[1].session_id.as_deref(), Some("guest_1"));

        let assigned = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::SessionIdAssigned { .. }))
            .count();
        assert_eq!(assigned, 1);
    }

    #[tokio::test]
    async fn test_stored_session_id_is_reused() {
        let mock = MockBackend::replying(vec![Ok(ChatReply {
            session_id: Some("guest_new".into()),
            ..reply("a")
        })]);
        let store = PersistedStore::in_memory();
        store.set_guest_session("guest_old").unwrap();
        let coord = SessionCoordinator::new(store.clone(), mock.clone());

        coord.send_text("bonjour").await.unwrap();
        assert_eq!(mock.requests.lock()[0].session_id.as_deref(), Some("guest_old"));
        assert_eq!(store.guest_session().as_deref(), Some("guest_old"));
    }

    #[tokio::test]
    async fn test_second_send_while_in_flight_is_ignored() {
        let mock = MockBackend::replying(vec![]);
        mock.gated.store(true, Ordering::SeqCst);
        let store = PersistedStore::in_memory();
        let coord = Arc::new(SessionCoordinator::new(store, mock.clone()));

        let first = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.send_text("première").await })
        };
        mock.entered.notified().await;
        assert_eq!(coord.phase(), SendPhase::Sending);

        let second = coord.send_text("seconde").await.unwrap();
        assert!(second.is_ignored());
        assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 1);
        assert_eq!(coord.active_conversation().unwrap().messages.len(), 1);

        mock.gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SendOutcome::Reconciled { .. }));

        let conv = coord.active_conversation().unwrap();
        let contents: Vec<_> = conv.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["première", "D'accord."]);
        assert_eq!(coord.phase(), SendPhase::Idle);
    }

    #[tokio::test]
    async fn test_conversation_deleted_during_send() {
        let mock = MockBackend::replying(vec![]);
        mock.gated.store(true, Ordering::SeqCst);
        let coord = Arc::new(SessionCoordinator::new(PersistedStore::in_memory(), mock.clone()));

        let send = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.send_text("bonjour").await })
        };
        mock.entered.notified().await;
        let id = coord.active_id().unwrap();
        coord.delete_conversation(&id).unwrap();
        mock.gate.notify_one();

        assert!(send.await.unwrap().is_ok());
        assert!(coord.conversations().is_empty());
        assert_eq!(coord.active_id(), None);
    }

    #[tokio::test]
    async fn test_restore_active_pointer() {
        let store = PersistedStore::in_memory();
        let mock = MockBackend::replying(vec![]);
        let (first, second) = {
            let coord = SessionCoordinator::new(store.clone(), mock.clone());
            let a = coord.new_conversation();
            let b = coord.new_conversation();
            (a.id, b.id)
        };

        let coord = SessionCoordinator::new(store.clone(), mock.clone());
        assert_eq!(coord.active_id().as_deref(), Some(second.as_str()));

        store.set_active_conversation(Some("conv_gone")).unwrap();
        let coord = SessionCoordinator::new(store.clone(), mock.clone());
        assert_eq!(coord.active_id().as_deref(), Some(first.as_str()));
        assert_eq!(store.active_conversation().as_deref(), Some(first.as_str()));

        let coord = SessionCoordinator::new(PersistedStore::in_memory(), mock);
        assert_eq!(coord.active_id(), None);
        assert!(coord.active_conversation().is_none());
    }

    #[tokio::test]
    async fn test_placeholder_title_replaced_once() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        let conv = coord.new_conversation();
        assert_eq!(conv.title, PLACEHOLDER_TITLE);
        assert_eq!(conv.message_count, 0);

        coord.send_text("Le prix du coton").await.unwrap();
        coord.send_text("Et celui du sésame ?").await.unwrap();

        let conv = coord.active_conversation().unwrap();
        assert_eq!(conv.title, "Le prix du coton");
        assert_eq!(conv.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_category_follows_selector() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        coord.send_text("premier").await.unwrap();
        coord.set_category(Category::Health);
        coord.set_language(Language::Moore);
        coord.send_text("second").await.unwrap();

        assert_eq!(coord.active_conversation().unwrap().category, Category::Health);
        assert_eq!(mock.requests.lock()[1].language, Language::Moore);
    }

    #[tokio::test]
    async fn test_delete_active_selects_first_remaining() {
        let mock = MockBackend::replying(vec![]);
        let (coord, store) = coordinator(&mock);
        let a = coord.new_conversation();
        let b = coord.new_conversation();
        let c = coord.new_conversation();
        assert_eq!(coord.active_id(), Some(c.id.clone()));

        coord.delete_conversation(&c.id).unwrap();
        assert_eq!(coord.active_id(), Some(a.id.clone()));

        coord.select_conversation(&b.id).unwrap();
        coord.delete_conversation(&a.id).unwrap();
        assert_eq!(coord.active_id(), Some(b.id.clone()));

        coord.delete_conversation(&b.id).unwrap();
        assert_eq!(coord.active_id(), None);
        assert_eq!(store.active_conversation(), None);
        assert!(coord.delete_conversation(&b.id).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_select_unknown_conversation() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        assert!(coord.select_conversation("conv_x").unwrap_err().is_not_found());
        assert_eq!(coord.active_id(), None);
    }

    #[tokio::test]
    async fn test_attachment_uploaded_before_text() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        coord
            .stage_attachment(Attachment::new(b"%PDF-1.4".to_vec(), "guide.pdf", "application/pdf"))
            .unwrap();
        assert_eq!(coord.phase(), SendPhase::Drafting);
        assert_eq!(coord.staged_attachment().as_deref(), Some("guide.pdf"));

        coord.send_text("Résume ce guide").await.unwrap();

        let conv = coord.active_conversation().unwrap();
        let contents: Vec<_> = conv.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["📎 guide.pdf", "Résume ce guide", "D'accord."]);
        assert_eq!(conv.messages[0].file_url.as_deref(), Some("/uploads/guide.pdf"));
        assert_eq!(conv.messages[0].file_name.as_deref(), Some("stored_guide.pdf"));
        assert_eq!(coord.staged_attachment(), None);
        assert_eq!(coord.phase(), SendPhase::Idle);
    }

    #[tokio::test]
    async fn test_text_names_placeholder_conversation_over_attachment() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        coord.new_conversation();
        coord
            .stage_attachment(Attachment::new(b"%PDF-1.4".to_vec(), "guide.pdf", "application/pdf"))
            .unwrap();

        coord.send_text("Résume ce guide").await.unwrap();

        let conv = coord.active_conversation().unwrap();
        assert_eq!(conv.title, "Résume ce guide");
        assert_eq!(conv.messages.len(), 3);
    }

    #[tokio::test]
    async fn test_attachment_only_names_placeholder_conversation() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        coord.new_conversation();
        coord
            .stage_attachment(Attachment::new(vec![1, 2, 3], "notes.txt", "text/plain"))
            .unwrap();

        coord.send_text("").await.unwrap();
        assert_eq!(coord.active_conversation().unwrap().title, "notes.txt");
    }

    #[tokio::test]
    async fn test_attachment_cleared_before_empty_send() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        coord
            .stage_attachment(Attachment::new(vec![1, 2, 3], "notes.txt", "text/plain"))
            .unwrap();
        coord.clear_attachment();

        let err = coord.send_text("").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyMessage)));
        assert!(coord.conversations().is_empty());
        assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 0);
        assert_eq!(mock.upload_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_attachment_only_send() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        coord
            .stage_attachment(Attachment::new(vec![1, 2, 3], "notes.txt", "text/plain"))
            .unwrap();

        let outcome = coord.send_text("").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Reconciled { .. }));
        assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 0);
        let conv = coord.active_conversation().unwrap();
        assert_eq!(conv.title, "notes.txt");
        assert_eq!(conv.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_text_send() {
        let mock = MockBackend::replying(vec![]);
        mock.upload_fails.store(true, Ordering::SeqCst);
        let (coord, _) = coordinator(&mock);
        coord
            .stage_attachment(Attachment::new(vec![0; 10], "scan.png", "image/png"))
            .unwrap();

        coord.send_text("Voici le scan").await.unwrap();

        let conv = coord.active_conversation().unwrap();
        assert_eq!(conv.messages.len(), 3);
        assert!(conv.messages[0].is_error);
        assert_eq!(conv.messages[1].content, "Voici le scan");
        assert!(conv.messages[2].is_assistant());
        assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_attachment_rejected() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        let big = Attachment::new(vec![0; (MAX_ATTACHMENT_BYTES + 1) as usize], "big.pdf", "application/pdf");
        let err = coord.stage_attachment(big).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::AttachmentTooLarge { .. })
        ));
        assert_eq!(coord.staged_attachment(), None);
        assert_eq!(mock.upload_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reuse_message_returns_draft() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        coord.send_text("Combien coûte le fonio ?").await.unwrap();
        let conv = coord.active_conversation().unwrap();

        let draft = coord.reuse_message(&conv.messages[0].id).unwrap();
        assert_eq!(draft, "Combien coûte le fonio ?");
        assert!(coord.reuse_message(&conv.messages[1].id).unwrap_err().is_not_found());
        assert_eq!(coord.active_conversation().unwrap(), conv);
    }

    #[tokio::test]
    async fn test_feedback_is_acknowledged() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        coord.send_text("Merci").await.unwrap();
        let answer = coord.active_conversation().unwrap().messages[1].id.clone();
        let mut rx = coord.subscribe();

        coord.record_feedback(&answer, true).unwrap();
        let notices = notices(&drain(&mut rx));
        assert_eq!(notices[0].text, "Merci pour votre retour positif !");
        assert!(coord.record_feedback("msg_x", false).is_err());
    }

    #[tokio::test]
    async fn test_theme_toggle_is_persisted() {
        let mock = MockBackend::replying(vec![]);
        let (coord, store) = coordinator(&mock);
        assert_eq!(coord.theme(), ThemePreference::Dark);
        assert_eq!(coord.toggle_theme(), ThemePreference::Light);
        assert_eq!(store.theme(), ThemePreference::Light);
    }

    #[tokio::test]
    async fn test_check_status_publishes() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);
        let mut rx = coord.subscribe();

        assert!(!coord.check_status().await);
        mock.online.store(true, Ordering::SeqCst);
        assert!(coord.check_status().await);

        let statuses: Vec<bool> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::BackendStatus { online } => Some(online),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![false, true]);
    }

    struct FixedCapture(AudioPayload);

    #[async_trait]
    impl AudioCapture for FixedCapture {
        async fn capture(&self) -> Result<AudioPayload> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_capture_and_send_voice() {
        let mock = MockBackend::replying(vec![]);
        let (coord, _) = coordinator(&mock);

        let short = FixedCapture(voice_payload(4000, 800));
        assert!(coord.capture_and_send_voice(&short).await.is_err());
        assert_eq!(mock.voice_calls.load(Ordering::SeqCst), 0);

        let ok = FixedCapture(voice_payload(40_000, 4000));
        coord.capture_and_send_voice(&ok).await.unwrap();
        assert_eq!(mock.voice_calls.load(Ordering::SeqCst), 1);
    }
}
