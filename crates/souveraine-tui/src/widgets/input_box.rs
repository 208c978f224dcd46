//! Single-line message input

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Editable text line. The cursor is a char index, never a byte offset.
#[derive(Debug, Default)]
pub struct InputBox {
    content: String,
    cursor: usize,
    /// Display columns hidden on the left
    scroll: usize,
    placeholder: String,
    focused: bool,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replace the content and move the cursor to the end
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.cursor = self.char_count();
        self.scroll = 0;
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Return the content and clear the box
    pub fn take(&mut self) -> String {
        let content = std::mem::take(&mut self.content);
        self.clear();
        content
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn cursor_column(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Remove the chars in `[from, to)`
    fn remove_range(&mut self, from: usize, to: usize) {
        let (start, end) = (self.byte_at(from), self.byte_at(to));
        self.content.drain(start..end);
    }

    /// Apply an editing action. Returns whether it was consumed.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        let len = self.char_count();
        let handled = match action {
            Action::Char(c) => {
                self.insert(*c);
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.remove_range(self.cursor - 1, self.cursor);
                self.cursor -= 1;
                true
            }
            Action::Delete if self.cursor < len => {
                self.remove_range(self.cursor, self.cursor + 1);
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < len => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = len;
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                let chars: Vec<char> = self.content.chars().collect();
                let mut start = self.cursor;
                while start > 0 && chars[start - 1] == ' ' {
                    start -= 1;
                }
                while start > 0 && chars[start - 1] != ' ' {
                    start -= 1;
                }
                self.remove_range(start, self.cursor);
                self.cursor = start;
                true
            }
            Action::Paste(text) => {
                // Single line: line breaks become one space
                for c in text.chars() {
                    if c == '\n' || c == '\r' {
                        if self.cursor > 0 && !self.content.ends_with(' ') {
                            self.insert(' ');
                        }
                    } else {
                        self.insert(c);
                    }
                }
                true
            }
            _ => false,
        };
        if handled {
            self.update_scroll(width as usize);
        }
        handled
    }

    fn update_scroll(&mut self, width: usize) {
        let visible = width.saturating_sub(4);
        let column = self.cursor_column();
        if column < self.scroll {
            self.scroll = column;
        } else if visible > 0 && column >= self.scroll + visible {
            self.scroll = column + 1 - visible;
        }
    }

    /// Visible slice of the content given the scroll offset
    fn visible_text(&self, width: usize) -> String {
        let mut column = 0;
        let mut out = String::new();
        let mut used = 0;
        for c in self.content.chars() {
            let w = c.width().unwrap_or(0);
            if column < self.scroll {
                column += w;
                continue;
            }
            if used + w > width {
                break;
            }
            out.push(c);
            used += w;
        }
        out
    }

    /// Render inside a bordered block titled `title`
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme, title: Line<'_>) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(if self.focused {
                theme.accent_style()
            } else {
                theme.border_style()
            });
        let inner = block.inner(area);
        block.render(area, buf);

        let (text, style) = if self.content.is_empty() {
            (self.placeholder.clone(), theme.dim_style())
        } else {
            (self.visible_text(inner.width as usize), theme.base_style())
        };
        Paragraph::new(text).style(style).render(inner, buf);

        if self.focused && inner.width > 0 {
            let x = self.cursor_column().saturating_sub(self.scroll);
            if x < inner.width as usize {
                if let Some(cell) = buf.cell_mut((inner.x + x as u16, inner.y)) {
                    cell.set_style(Style::default().bg(theme.accent));
                }
            }
        }
    }
}
