//! Message list widget for displaying a conversation

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use souveraine_api::{AudioMode, Language, resolve_url};
use souveraine_core::{
    Message, Role,
    content::{LineKind, format_content},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Widget for displaying the messages of one conversation.
///
/// Lines are wrapped here rather than by the paragraph so that
/// [`content_height`] and rendering always agree.
pub struct MessageList<'a> {
    messages: &'a [Message],
    theme: &'a Theme,
    scroll: usize,
    base_url: Option<&'a str>,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [Message], theme: &'a Theme) -> Self {
        Self {
            messages,
            theme,
            scroll: 0,
            base_url: None,
        }
    }

    /// Set scroll offset (in lines)
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Base URL used to resolve relative audio links
    pub fn base_url(mut self, base_url: &'a str) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let width = area.width as usize;
        let lines: Vec<Line> = self
            .messages
            .iter()
            .enumerate()
            .flat_map(|(i, msg)| render_message(msg, i + 1, self.theme, width, self.base_url))
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();
        Paragraph::new(lines).render(area, buf);
    }
}

/// Total rendered height of `messages` at `width`
pub fn content_height(messages: &[Message], width: usize, base_url: Option<&str>) -> usize {
    let theme = Theme::dark();
    messages
        .iter()
        .enumerate()
        .map(|(i, msg)| render_message(msg, i + 1, &theme, width, base_url).len())
        .sum()
}

/// Lines for one message: header, body, metadata, blank separator.
/// `number` is the 1-based position shown in the header.
pub fn render_message(
    msg: &Message,
    number: usize,
    theme: &Theme,
    width: usize,
    base_url: Option<&str>,
) -> Vec<Line<'static>> {
    let mut lines = vec![header(msg, number, theme)];

    match msg.role {
        Role::Assistant => {
            for line in format_content(msg.display_text()) {
                let prefix = match &line.kind {
                    LineKind::Plain => Span::raw("  "),
                    LineKind::Bullet => Span::styled("  • ", theme.accent_style()),
                    LineKind::Numbered(n) => Span::styled(format!("  {}. ", n), theme.accent_style()),
                };
                let body = theme.base_style();
                let spans: Vec<(String, Style)> = line
                    .spans
                    .iter()
                    .map(|s| {
                        let style = if s.bold {
                            body.add_modifier(Modifier::BOLD)
                        } else {
                            body
                        };
                        (s.text.clone(), style)
                    })
                    .collect();
                lines.extend(wrap_spans(prefix, &spans, width));
            }
            lines.extend(metadata(msg, theme, width, base_url));
        }
        Role::User | Role::System => {
            let style = if msg.is_error {
                theme.error_style()
            } else {
                theme.base_style()
            };
            for line in msg.content.lines() {
                lines.extend(wrap_spans(Span::raw("  "), &[(line.to_string(), style)], width));
            }
            if let Some(url) = &msg.file_url {
                let url = resolve(base_url, url);
                lines.extend(wrap_spans(
                    Span::raw("  "),
                    &[(format!("↳ {}", url), theme.dim_style())],
                    width,
                ));
            }
        }
    }

    lines.push(Line::from(""));
    lines
}

fn header(msg: &Message, number: usize, theme: &Theme) -> Line<'static> {
    let (label, style) = match msg.role {
        Role::User if msg.is_voice => ("▶ Vous 🎤", theme.user_style()),
        Role::User => ("▶ Vous", theme.user_style()),
        Role::Assistant => ("◀ IA Souveraine", theme.assistant_style()),
        Role::System if msg.is_error => ("⚠ Erreur", theme.error_style()),
        Role::System => ("● Système", theme.dim_style()),
    };
    let mut spans = vec![
        Span::styled(format!("#{} ", number), theme.dim_style()),
        Span::styled(label, style),
        Span::styled(
            format!(" · {}", msg.timestamp.with_timezone(&chrono::Local).format("%H:%M")),
            theme.dim_style(),
        ),
    ];
    if let Some(category) = msg.category.filter(|_| msg.is_user()) {
        spans.push(Span::styled(
            format!(" {} {}", category.icon(), category.label()),
            theme.dim_style(),
        ));
    }
    Line::from(spans)
}

fn metadata(msg: &Message, theme: &Theme, width: usize, base_url: Option<&str>) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    let mut push = |text: String, style: Style| {
        out.extend(wrap_spans(Span::raw("  "), &[(text, style)], width));
    };

    if let Some(t) = &msg.transcription {
        push(format!("🎤 « {} »", t), theme.dim_style());
    }
    if !msg.sources.is_empty() {
        let count = msg.sources_count.unwrap_or(msg.sources.len() as u32);
        push(
            format!("📚 {} source(s): {}", count, msg.sources.join(", ")),
            theme.dim_style(),
        );
    }
    if let Some(url) = &msg.audio_url {
        let mode = msg.audio_mode.unwrap_or(AudioMode::Synthesized);
        push(
            format!("🔊 {}: {}", mode.label(), resolve(base_url, url)),
            theme.badge_style(),
        );
    }
    let mut badges = Vec::new();
    if let Some(language) = msg.language.filter(|l| *l != Language::Fr) {
        badges.push(format!("[{}]", language.label()));
    }
    if let Some(confidence) = msg.confidence {
        badges.push(format!("Confiance {:.0}%", confidence * 100.0));
    }
    if !badges.is_empty() {
        push(badges.join(" "), theme.badge_style());
    }
    for suggestion in &msg.suggestions {
        push(format!("💡 {}", suggestion), theme.warning_style());
    }
    out
}

fn resolve(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) => resolve_url(base, url),
        None => url.to_string(),
    }
}

/// Word-wrap styled runs to `width` columns.
///
/// The first line starts with `prefix`; continuation lines are indented
/// by its width. Words longer than a line are split.
pub fn wrap_spans(prefix: Span<'static>, spans: &[(String, Style)], width: usize) -> Vec<Line<'static>> {
    let indent = prefix.content.width();
    let width = width.max(indent + 1);

    let mut lines = Vec::new();
    let mut current = vec![prefix];
    let mut used = indent;

    for (text, style) in spans {
        for word in text.split_inclusive(' ') {
            let word_width = word.trim_end().width();
            if used > indent && used + word_width > width {
                lines.push(Line::from(std::mem::take(&mut current)));
                current.push(Span::raw(" ".repeat(indent)));
                used = indent;
            }

            let mut run = String::new();
            for c in word.chars() {
                if used == indent && c == ' ' {
                    continue;
                }
                let cw = c.width().unwrap_or(0);
                if used + cw > width {
                    current.push(Span::styled(std::mem::take(&mut run), *style));
                    lines.push(Line::from(std::mem::take(&mut current)));
                    current.push(Span::raw(" ".repeat(indent)));
                    used = indent;
                    if c == ' ' {
                        continue;
                    }
                }
                run.push(c);
                used += cw;
            }
            if !run.is_empty() {
                current.push(Span::styled(run, *style));
            }
        }
    }
    lines.push(Line::from(current));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use souveraine_api::{Category, ChatReply};

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_spans_breaks_on_words() {
        let lines = wrap_spans(
            Span::raw("  "),
            &[("Le mil et le sorgho".into(), Style::default())],
            10,
        );
        let texts: Vec<_> = lines.iter().map(text_of).collect();
        assert_eq!(texts, vec!["  Le mil ", "  et le ", "  sorgho"]);
    }

    #[test]
    fn test_wrap_spans_splits_long_words() {
        let lines = wrap_spans(Span::raw(""), &[("abcdefghij".into(), Style::default())], 4);
        let texts: Vec<_> = lines.iter().map(text_of).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_keeps_bold_style() {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let lines = wrap_spans(
            Span::raw("  • "),
            &[("le ".into(), Style::default()), ("karité".into(), bold)],
            40,
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans.last().map(|s| s.style), Some(bold));
    }

    #[test]
    fn test_assistant_rendering_includes_metadata() {
        let reply = ChatReply {
            response: Some("Cultures:\n- **mil**\n1) semer".into()),
            sources: vec!["atlas.pdf".into()],
            audio_url: Some("/audio/r.mp3".into()),
            audio_mode: AudioMode::PreRecorded,
            language: Language::Moore,
            suggestions: vec!["Et le maïs ?".into()],
            ..Default::default()
        };
        let msg = Message::assistant(&reply);
        let lines = render_message(&msg, 2, &Theme::dark(), 80, Some("http://localhost:8000"));
        let texts: Vec<_> = lines.iter().map(text_of).collect();

        assert!(texts[0].starts_with("#2 ◀ IA Souveraine"));
        assert_eq!(texts[2], "  • mil");
        assert_eq!(texts[3], "  1. semer");
        assert!(texts.iter().any(|t| t.contains("📚 1 source(s): atlas.pdf")));
        assert!(
            texts
                .iter()
                .any(|t| t.contains("Audio natif: http://localhost:8000/audio/r.mp3"))
        );
        assert!(texts.iter().any(|t| t.contains("[Mooré]")));
        assert!(texts.iter().any(|t| t.contains("💡 Et le maïs ?")));
        assert_eq!(texts.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_height_matches_render() {
        let messages = vec![
            Message::user("Quelles cultures au Burkina Faso pendant la saison sèche ?", Category::Agriculture),
            Message::error("⚠️ Erreur de connexion avec le serveur. Veuillez réessayer."),
        ];
        let theme = Theme::dark();
        let rendered: usize = messages
            .iter()
            .enumerate()
            .map(|(i, m)| render_message(m, i + 1, &theme, 24, None).len())
            .sum();
        assert_eq!(content_height(&messages, 24, None), rendered);
        assert!(rendered > 6);
    }
}
