//! Conversation list with search

use crate::theme::Theme;
use chrono::{DateTime, Utc};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, HighlightSpacing, List, ListItem, ListState, StatefulWidget, Widget},
};
use souveraine_core::{Conversation, content::relative_date};

/// Selection and search state, kept across frames
#[derive(Debug, Default, Clone)]
pub struct SidebarState {
    selected: usize,
    filter: String,
    searching: bool,
}

impl SidebarState {
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Search term currently applied
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn start_search(&mut self) {
        self.searching = true;
    }

    /// Leave search mode, keeping the filter
    pub fn finish_search(&mut self) {
        self.searching = false;
    }

    pub fn clear_search(&mut self) {
        self.searching = false;
        self.filter.clear();
        self.selected = 0;
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.selected = 0;
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.selected = 0;
    }

    pub fn select_next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn select_previous(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
        }
    }

    /// Move the selection onto the conversation with `id`
    pub fn select_id(&mut self, conversations: &[Conversation], id: &str) {
        if let Some(i) = conversations.iter().position(|c| c.id == id) {
            self.selected = i;
        }
    }

    /// Keep the selection inside a list of `len` rows
    pub fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Selected conversation from the list being displayed
    pub fn selected_in<'c>(&self, conversations: &'c [Conversation]) -> Option<&'c Conversation> {
        conversations.get(self.selected)
    }
}

/// Conversation list widget. Each row shows the category icon and title,
/// then the relative date and the last message preview.
pub struct Sidebar<'a> {
    conversations: &'a [Conversation],
    active_id: Option<&'a str>,
    theme: &'a Theme,
    focused: bool,
    now: DateTime<Utc>,
}

impl<'a> Sidebar<'a> {
    pub fn new(conversations: &'a [Conversation], theme: &'a Theme) -> Self {
        Self {
            conversations,
            active_id: None,
            theme,
            focused: false,
            now: Utc::now(),
        }
    }

    pub fn active(mut self, id: Option<&'a str>) -> Self {
        self.active_id = id;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Reference time for relative dates
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn row(&self, conversation: &Conversation, width: usize) -> ListItem<'static> {
        let is_active = self.active_id == Some(conversation.id.as_str());
        let marker = if is_active { "● " } else { "  " };
        let title_style = if is_active {
            self.theme.accent_bold()
        } else {
            self.theme.base_style()
        };

        let title = Line::from(vec![
            Span::styled(marker, self.theme.accent_style()),
            Span::raw(format!("{} ", conversation.category.icon())),
            Span::styled(conversation.title.clone(), title_style),
        ]);

        let date = relative_date(conversation.last_activity(), self.now);
        let budget = width.saturating_sub(date.chars().count() + 5).max(1);
        let preview = textwrap::wrap(&conversation.last_preview, budget)
            .into_iter()
            .next()
            .map(|l| l.into_owned())
            .unwrap_or_default();
        let detail = Line::from(vec![
            Span::raw("  "),
            Span::styled(date, self.theme.dim_style()),
            Span::styled(
                if preview.is_empty() {
                    String::new()
                } else {
                    format!(" · {}", preview)
                },
                self.theme.dim_style(),
            ),
        ]);

        ListItem::new(vec![title, detail])
    }
}

impl StatefulWidget for Sidebar<'_> {
    type State = SidebarState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let title = if state.searching || !state.filter.is_empty() {
            let cursor = if state.searching { "▏" } else { "" };
            format!(" 🔍 {}{} ", state.filter, cursor)
        } else {
            format!(" Conversations ({}) ", self.conversations.len())
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(self.theme.accent_bold())
            .border_style(if self.focused {
                self.theme.accent_style()
            } else {
                self.theme.border_style()
            });
        let inner_width = block.inner(area).width as usize;

        if self.conversations.is_empty() {
            let inner = block.inner(area);
            block.render(area, buf);
            let text = if state.filter.is_empty() {
                "Aucune conversation"
            } else {
                "Aucun résultat"
            };
            buf.set_span(
                inner.x + 1,
                inner.y,
                &Span::styled(text, self.theme.dim_style()),
                inner.width.saturating_sub(1),
            );
            return;
        }

        state.clamp(self.conversations.len());
        let items: Vec<ListItem> = self
            .conversations
            .iter()
            .map(|c| self.row(c, inner_width))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(if self.focused {
                self.theme.selected_style()
            } else {
                ratatui::style::Style::default()
            })
            .highlight_spacing(HighlightSpacing::Never);

        let mut list_state = ListState::default();
        list_state.select(Some(state.selected));
        StatefulWidget::render(list, area, buf, &mut list_state);
    }
}
