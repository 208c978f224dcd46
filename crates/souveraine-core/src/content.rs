//! Message text resolution and display formatting

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::{Message, Role};

/// Maximum characters of a derived conversation title
pub const TITLE_MAX_CHARS: usize = 30;
/// Maximum characters of a conversation list preview
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Conversation title derived from the first outgoing text
pub fn title_from(text: &str) -> String {
    truncate_chars(text.trim(), TITLE_MAX_CHARS)
}

/// Conversation list preview of a message body
pub fn preview(text: &str) -> String {
    truncate_chars(text, PREVIEW_MAX_CHARS)
}

/// Text to display for a message.
///
/// Precedence for assistant messages: first non-empty `context` snippet,
/// then the generated text (which was itself resolved from
/// `response` → `reponse` → `answer` when the reply arrived), then
/// `content`. Other roles always show `content`.
pub fn resolve_display_text(message: &Message) -> &str {
    if message.role == Role::Assistant {
        if let Some(snippet) = message.context.iter().find(|c| !c.trim().is_empty()) {
            return snippet;
        }
    }
    &message.content
}

/// Kind of a formatted display line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Plain,
    /// `- item`
    Bullet,
    /// `3) item`, carrying the number
    Numbered(String),
}

/// Run of text within a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub bold: bool,
}

/// One display line of a formatted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLine {
    pub kind: LineKind,
    pub spans: Vec<TextSpan>,
}

impl FormattedLine {
    /// Concatenated text without styling
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-•]\s+(.+)$").expect("valid bullet regex"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\)\s+(.+)$").expect("valid numbered regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));

/// Split message text into display lines with list and emphasis markup
pub fn format_content(text: &str) -> Vec<FormattedLine> {
    text.lines()
        .map(|line| {
            if let Some(caps) = NUMBERED.captures(line) {
                FormattedLine {
                    kind: LineKind::Numbered(caps[1].to_string()),
                    spans: split_bold(&caps[2]),
                }
            } else if let Some(caps) = BULLET.captures(line) {
                FormattedLine {
                    kind: LineKind::Bullet,
                    spans: split_bold(&caps[1]),
                }
            } else {
                FormattedLine {
                    kind: LineKind::Plain,
                    spans: split_bold(line),
                }
            }
        })
        .collect()
}

fn split_bold(text: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in BOLD.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            spans.push(TextSpan {
                text: text[last..whole.start()].to_string(),
                bold: false,
            });
        }
        spans.push(TextSpan {
            text: caps[1].to_string(),
            bold: true,
        });
        last = whole.end();
    }
    if last < text.len() || spans.is_empty() {
        spans.push(TextSpan {
            text: text[last..].to_string(),
            bold: false,
        });
    }
    spans
}

/// French relative date for the conversation list
pub fn relative_date(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(then);
    let mins = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if mins < 1 {
        "À l'instant".to_string()
    } else if mins < 60 {
        format!("Il y a {} min", mins)
    } else if hours < 24 {
        format!("Il y a {} h", hours)
    } else if days == 1 {
        "Hier".to_string()
    } else if days < 7 {
        format!("Il y a {} jours", days)
    } else {
        format!("{} {}", then.format("%-d"), month_abbrev(then))
    }
}

fn month_abbrev(date: DateTime<Utc>) -> &'static str {
    use chrono::Datelike;
    const MONTHS: [&str; 12] = [
        "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.",
        "nov.", "déc.",
    ];
    MONTHS[date.month0() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use souveraine_api::{Category, ChatReply};

    #[test]
    fn test_truncate_chars_unicode() {
        assert_eq!(truncate_chars("Ouagadougou", 20), "Ouagadougou");
        assert_eq!(truncate_chars("éééé", 2), "éé...");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_title_from_short_text_is_verbatim() {
        assert_eq!(
            title_from("Quelles cultures au Burkina?"),
            "Quelles cultures au Burkina?"
        );
    }

    #[test]
    fn test_title_from_long_text_is_truncated() {
        let title = title_from("Comment préparer le beurre de karité à la maison ?");
        assert_eq!(title, "Comment préparer le beurre de ...");
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
    }

    fn assistant_with(content: &str, context: &[&str]) -> Message {
        let reply = ChatReply {
            response: Some(content.to_string()),
            context: context.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        Message::assistant(&reply)
    }

    #[test]
    fn test_context_takes_display_priority() {
        let msg = assistant_with("réponse générée", &["", "  ", "extrait du guide"]);
        assert_eq!(resolve_display_text(&msg), "extrait du guide");
    }

    #[test]
    fn test_content_when_context_empty() {
        let msg = assistant_with("réponse générée", &["", " "]);
        assert_eq!(resolve_display_text(&msg), "réponse générée");
    }

    #[test]
    fn test_user_message_ignores_context() {
        let mut msg = Message::user("ma question", Category::General);
        msg.context = vec!["ne pas afficher".into()];
        assert_eq!(resolve_display_text(&msg), "ma question");
    }

    #[test]
    fn test_format_bullets_and_numbers() {
        let lines = format_content("Cultures:\n- mil\n- sorgho\n1) semer\n2) récolter");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].kind, LineKind::Plain);
        assert_eq!(lines[1].kind, LineKind::Bullet);
        assert_eq!(lines[1].plain_text(), "mil");
        assert_eq!(lines[3].kind, LineKind::Numbered("1".into()));
        assert_eq!(lines[4].plain_text(), "récolter");
    }

    #[test]
    fn test_format_bold_spans() {
        let lines = format_content("Le **mil** et le **sorgho** dominent");
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 5);
        assert_eq!(spans[1], TextSpan { text: "mil".into(), bold: true });
        assert_eq!(spans[4], TextSpan { text: " dominent".into(), bold: false });
    }

    #[test]
    fn test_format_empty_line_kept() {
        let lines = format_content("a\n\nb");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].plain_text(), "");
    }

    #[test]
    fn test_relative_date() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        assert_eq!(relative_date(now, now), "À l'instant");
        assert_eq!(relative_date(now - Duration::minutes(5), now), "Il y a 5 min");
        assert_eq!(relative_date(now - Duration::hours(3), now), "Il y a 3 h");
        assert_eq!(relative_date(now - Duration::hours(30), now), "Hier");
        assert_eq!(relative_date(now - Duration::days(4), now), "Il y a 4 jours");
        assert_eq!(relative_date(now - Duration::days(10), now), "10 mars");
    }
}
