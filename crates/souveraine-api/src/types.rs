//! Wire types for the backend contract

use serde::{Deserialize, Deserializer, Serialize};

/// Knowledge domain a question is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    #[serde(rename = "general")]
    General,
    #[serde(rename = "agriculture")]
    Agriculture,
    #[serde(rename = "sante", alias = "health")]
    Health,
    #[serde(rename = "education")]
    Education,
    #[serde(rename = "culture")]
    Culture,
    #[serde(rename = "technologie", alias = "technology")]
    Technology,
    #[serde(rename = "economie", alias = "economy")]
    Economy,
    #[serde(rename = "droit", alias = "law")]
    Law,
}

impl Category {
    /// All categories in selector order
    pub const ALL: [Category; 8] = [
        Category::General,
        Category::Agriculture,
        Category::Health,
        Category::Education,
        Category::Culture,
        Category::Technology,
        Category::Economy,
        Category::Law,
    ];

    /// Identifier sent to the backend
    pub fn id(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Agriculture => "agriculture",
            Category::Health => "sante",
            Category::Education => "education",
            Category::Culture => "culture",
            Category::Technology => "technologie",
            Category::Economy => "economie",
            Category::Law => "droit",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Category::General => "Général",
            Category::Agriculture => "Agriculture",
            Category::Health => "Santé",
            Category::Education => "Éducation",
            Category::Culture => "Culture",
            Category::Technology => "Technologie",
            Category::Economy => "Économie",
            Category::Law => "Droit",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::General => "🌐",
            Category::Agriculture => "🌾",
            Category::Health => "🏥",
            Category::Education => "🎓",
            Category::Culture => "🎭",
            Category::Technology => "💻",
            Category::Economy => "💰",
            Category::Law => "⚖️",
        }
    }

    /// Parse from a backend id, an English name or a label prefix
    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let english = |c: &Category| format!("{:?}", c).to_lowercase();
        Self::ALL
            .iter()
            .find(|c| c.id() == needle || english(c) == needle)
            .or_else(|| {
                Self::ALL
                    .iter()
                    .find(|c| c.label().to_lowercase().starts_with(&needle))
            })
            .copied()
    }

    /// Next category in selector order, wrapping around
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Language of the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    #[default]
    Fr,
    Moore,
    Dioula,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Fr, Language::Moore, Language::Dioula];

    /// Code sent to the backend
    pub fn code(&self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::Moore => "mo",
            Language::Dioula => "di",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::Fr => "Français",
            Language::Moore => "Mooré",
            Language::Dioula => "Dioula",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fr" | "francais" | "français" | "french" => Some(Language::Fr),
            "mo" | "moore" | "mooré" => Some(Language::Moore),
            "di" | "dioula" | "dyula" => Some(Language::Dioula),
            _ => None,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Language::Fr => Language::Moore,
            Language::Moore => Language::Dioula,
            Language::Dioula => Language::Fr,
        }
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        Language::parse(&s).unwrap_or_default()
    }
}

impl From<Language> for String {
    fn from(l: Language) -> Self {
        l.code().to_string()
    }
}

/// How the audio attached to an answer was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AudioMode {
    /// Recorded by a native speaker
    PreRecorded,
    /// Text-to-speech output
    Synthesized,
    #[default]
    Unavailable,
}

impl AudioMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioMode::PreRecorded => "pre_recorded",
            AudioMode::Synthesized => "tts_generated",
            AudioMode::Unavailable => "not_available",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AudioMode::PreRecorded => "Audio natif",
            AudioMode::Synthesized => "Audio généré",
            AudioMode::Unavailable => "Texte uniquement",
        }
    }
}

impl From<String> for AudioMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pre_recorded" => AudioMode::PreRecorded,
            "tts_generated" | "synthesized" => AudioMode::Synthesized,
            _ => AudioMode::Unavailable,
        }
    }
}

impl From<AudioMode> for String {
    fn from(m: AudioMode) -> Self {
        m.as_str().to_string()
    }
}

/// Body of `POST /ai/chat/intelligent`
#[derive(Debug, Clone, Serialize)]
pub struct IntelligentChatRequest {
    pub message: String,
    pub category: Category,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Answer to a text or voice exchange.
///
/// The backend has populated different text fields over time
/// (`response`, `reponse`, `answer`) and may attach retrieved `context`
/// snippets. Resolution of the text to show lives with the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub reponse: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub context: Vec<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
    #[serde(default)]
    pub sources_count: Option<u32>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub audio_mode: AudioMode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: Language,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: Vec<String>,
}

impl ChatReply {
    /// Generated text, trying `response`, then `reponse`, then `answer`
    pub fn text(&self) -> &str {
        [&self.response, &self.reponse, &self.answer]
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .find(|s| !s.trim().is_empty())
            .unwrap_or("")
    }

    /// Number of sources, preferring the explicit count
    pub fn source_count(&self) -> u32 {
        self.sources_count.unwrap_or(self.sources.len() as u32)
    }
}

/// Answer to `POST /ai/chat/voice`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceReply {
    #[serde(default)]
    pub transcription: String,
    #[serde(default)]
    pub transcription_confidence: Option<f32>,
    #[serde(flatten)]
    pub reply: ChatReply,
}

/// Recorded audio sent to the voice endpoint
#[derive(Debug, Clone)]
pub struct VoiceUpload {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub session_id: Option<String>,
    pub category: Category,
    pub language: Language,
}

/// Document sent to the upload endpoint
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub category: Category,
    pub description: Option<String>,
}

/// Answer to `POST /api/upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReply {
    pub file_url: String,
    pub filename: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Accepts `null`, a single string, or a list of strings
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
