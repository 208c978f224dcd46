//! TUI implementation for souveraine

use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste, EventStream};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
    },
};
use souveraine_core::{
    Conversation, NoticeLevel, SendOutcome, SendPhase, SessionCoordinator, SessionEvent,
    StatusMonitor,
};
use souveraine_tui::{
    Theme,
    input::{Action, event_to_action},
    widgets::{
        InputBox, MessageList, Sidebar, SidebarState, Spinner, message_list::content_height,
        spinner::THINKING_LABEL,
    },
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::capture::FileCapture;
use crate::commands::{CommandResult, execute_command};

const SIDEBAR_WIDTH: u16 = 34;

/// Which pane receives key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Input,
    Sidebar,
}

/// TUI application state
pub struct TuiState {
    coordinator: Arc<SessionCoordinator>,
    input: InputBox,
    sidebar: SidebarState,
    show_sidebar: bool,
    focus: Focus,
    /// Message list scroll, `usize::MAX` means follow the bottom
    scroll: usize,
    /// Last notice shown in the status bar
    status: String,
    status_level: NoticeLevel,
    online: Option<bool>,
    theme: Theme,
    base_url: String,
    spinner_start: Instant,
    /// Command output shown over the chat until dismissed
    info: Option<String>,
    input_width: u16,
    /// Drafts whose send was ignored because another was in flight
    returned_drafts: mpsc::UnboundedSender<String>,
}

impl TuiState {
    pub fn new(
        coordinator: Arc<SessionCoordinator>,
        base_url: String,
        returned_drafts: mpsc::UnboundedSender<String>,
    ) -> Self {
        let mut input =
            InputBox::new().with_placeholder("Posez votre question... (/help pour les commandes)");
        input.set_focused(true);
        let theme = Theme::for_preference(coordinator.theme());

        let mut sidebar = SidebarState::default();
        if let Some(id) = coordinator.active_id() {
            sidebar.select_id(&coordinator.conversations(), &id);
        }

        Self {
            coordinator,
            input,
            sidebar,
            show_sidebar: true,
            focus: Focus::Input,
            scroll: usize::MAX,
            status: "Prêt".to_string(),
            status_level: NoticeLevel::Info,
            online: None,
            theme,
            base_url,
            spinner_start: Instant::now(),
            info: None,
            input_width: 80,
            returned_drafts,
        }
    }

    fn scroll_to_bottom(&mut self) {
        // Clamped during render
        self.scroll = usize::MAX;
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.input.set_focused(focus == Focus::Input);
    }

    /// Conversations shown in the sidebar, after the search filter
    fn visible_conversations(&self) -> Vec<Conversation> {
        if self.sidebar.filter().is_empty() {
            self.coordinator.conversations()
        } else {
            self.coordinator.search(self.sidebar.filter())
        }
    }

    pub fn set_online(&mut self, online: Option<bool>) {
        if online == Some(false) && self.online != Some(false) {
            self.status = "Le backend est hors ligne ⚠️".to_string();
            self.status_level = NoticeLevel::Error;
        }
        self.online = online;
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        if self
            .coordinator
            .active_id()
            .is_some_and(|id| event.touches_conversation(&id))
        {
            self.scroll_to_bottom();
        }

        match event {
            SessionEvent::Notice(notice) => {
                self.status = notice.text;
                self.status_level = notice.level;
            }
            SessionEvent::ActiveChanged { conversation_id } => {
                if let Some(id) = conversation_id {
                    let visible = self.visible_conversations();
                    self.sidebar.select_id(&visible, &id);
                }
                self.scroll_to_bottom();
            }
            SessionEvent::SendStarted { .. } => self.spinner_start = Instant::now(),
            SessionEvent::BackendStatus { online } => self.online = Some(online),
            SessionEvent::ConversationCreated { .. }
            | SessionEvent::ConversationDeleted { .. }
            | SessionEvent::MessageAppended { .. }
            | SessionEvent::SendFinished { .. }
            | SessionEvent::SessionIdAssigned { .. } => {}
        }
    }

    fn spawn_send(&self, text: String) {
        let coordinator = self.coordinator.clone();
        let returned_drafts = self.returned_drafts.clone();
        tokio::spawn(async move {
            match coordinator.send_text(&text).await {
                Ok(SendOutcome::Ignored) => {
                    let _ = returned_drafts.send(text);
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("send rejected: {}", e),
            }
        });
    }

    /// Put back a draft that was not sent
    pub fn restore_draft(&mut self, text: String) {
        if self.input.content().trim().is_empty() {
            self.input.set_content(text);
        }
        self.status = "Veuillez patienter, une réponse est en cours…".to_string();
        self.status_level = NoticeLevel::Info;
    }

    fn spawn_voice(&self, path: PathBuf) {
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            let capture = FileCapture::new(path);
            if let Err(e) = coordinator.capture_and_send_voice(&capture).await {
                tracing::debug!("voice send rejected: {}", e);
            }
        });
    }

    fn spawn_status_check(&self) {
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            coordinator.check_status().await;
        });
    }

    /// Apply a slash command. Returns true when the app should exit.
    fn run_command(&mut self, result: CommandResult) -> bool {
        match result {
            CommandResult::Message(text) => self.info = Some(text),
            CommandResult::Draft(text) => {
                self.input.set_content(text);
                self.set_focus(Focus::Input);
            }
            CommandResult::Voice(path) => self.spawn_voice(path),
            CommandResult::CheckStatus => self.spawn_status_check(),
            CommandResult::Unknown(cmd) => {
                self.status = format!("Commande inconnue: /{} (essayez /help)", cmd);
                self.status_level = NoticeLevel::Error;
            }
            CommandResult::Exit => return true,
        }
        // Settings commands may have changed the theme
        self.theme = Theme::for_preference(self.coordinator.theme());
        false
    }

    fn submit(&mut self) -> bool {
        let content = self.input.content().trim().to_string();
        if content.starts_with('/') {
            self.input.clear();
            if let Some(result) = execute_command(&content, &self.coordinator) {
                return self.run_command(result);
            }
            return false;
        }
        if content.is_empty() && self.coordinator.staged_attachment().is_none() {
            return false;
        }
        if self.coordinator.phase() == SendPhase::Sending {
            self.status = "Veuillez patienter, une réponse est en cours…".to_string();
            self.status_level = NoticeLevel::Info;
            return false;
        }
        self.input.clear();
        self.spawn_send(content);
        false
    }

    /// Handle one input action. Returns true when the app should exit.
    pub fn handle_action(&mut self, action: Action) -> bool {
        if self.info.is_some() {
            match action {
                Action::Escape | Action::Submit => {
                    self.info = None;
                    return false;
                }
                Action::Quit | Action::Interrupt => return true,
                _ => self.info = None,
            }
        }

        match action {
            Action::Quit | Action::Interrupt => return true,
            Action::NewConversation => {
                self.coordinator.new_conversation();
                self.sidebar.clear_search();
                self.set_focus(Focus::Input);
            }
            Action::ToggleTheme => {
                let preference = self.coordinator.toggle_theme();
                self.theme = Theme::for_preference(preference);
            }
            Action::CycleCategory => {
                let next = self.coordinator.category().next();
                self.coordinator.set_category(next);
                self.status = format!("Catégorie: {} {}", next.icon(), next.label());
                self.status_level = NoticeLevel::Info;
            }
            Action::CycleLanguage => {
                let next = self.coordinator.language().next();
                self.coordinator.set_language(next);
                self.status = format!("Langue: {}", next.label());
                self.status_level = NoticeLevel::Info;
            }
            Action::ToggleSidebar => {
                self.show_sidebar = !self.show_sidebar;
                if !self.show_sidebar {
                    self.set_focus(Focus::Input);
                }
            }
            Action::Search => {
                self.show_sidebar = true;
                self.set_focus(Focus::Sidebar);
                self.sidebar.start_search();
            }
            Action::Tab if self.show_sidebar => {
                let next = match self.focus {
                    Focus::Input => Focus::Sidebar,
                    Focus::Sidebar => Focus::Input,
                };
                self.set_focus(next);
            }
            Action::PageUp => self.scroll = self.scroll.saturating_sub(10),
            Action::PageDown => self.scroll = self.scroll.saturating_add(10),
            action => {
                return match self.focus {
                    Focus::Input => self.handle_input_action(action),
                    Focus::Sidebar => {
                        self.handle_sidebar_action(action);
                        false
                    }
                };
            }
        }
        false
    }

    fn handle_input_action(&mut self, action: Action) -> bool {
        match action {
            Action::Submit => return self.submit(),
            Action::Up => self.scroll = self.scroll.saturating_sub(1),
            Action::Down => self.scroll = self.scroll.saturating_add(1),
            Action::Escape => {
                if self.coordinator.staged_attachment().is_some() {
                    self.coordinator.clear_attachment();
                    self.status = "Fichier retiré".to_string();
                    self.status_level = NoticeLevel::Info;
                }
            }
            action => {
                self.input.handle_action(&action, self.input_width);
            }
        }
        false
    }

    fn handle_sidebar_action(&mut self, action: Action) {
        let visible = self.visible_conversations();

        if self.sidebar.is_searching() {
            match action {
                Action::Char(c) => self.sidebar.push_filter(c),
                Action::Paste(text) => text.chars().for_each(|c| self.sidebar.push_filter(c)),
                Action::Backspace => self.sidebar.pop_filter(),
                Action::Submit | Action::Down => self.sidebar.finish_search(),
                Action::Escape => self.sidebar.clear_search(),
                _ => {}
            }
            return;
        }

        match action {
            Action::Up => self.sidebar.select_previous(visible.len()),
            Action::Down => self.sidebar.select_next(visible.len()),
            Action::Char('/') => self.sidebar.start_search(),
            Action::Submit => {
                if let Some(conversation) = self.sidebar.selected_in(&visible) {
                    if let Err(e) = self.coordinator.select_conversation(&conversation.id) {
                        tracing::warn!("cannot open conversation: {}", e);
                    }
                    self.set_focus(Focus::Input);
                }
            }
            Action::Delete => {
                if let Some(conversation) = self.sidebar.selected_in(&visible) {
                    if let Err(e) = self.coordinator.delete_conversation(&conversation.id) {
                        tracing::warn!("cannot delete conversation: {}", e);
                    }
                }
            }
            Action::Escape => {
                if self.sidebar.filter().is_empty() {
                    self.set_focus(Focus::Input);
                } else {
                    self.sidebar.clear_search();
                }
            }
            _ => {}
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(self.theme.base_style()), area);

        let main = if self.show_sidebar && area.width >= SIDEBAR_WIDTH * 2 {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
                .split(area);
            self.render_sidebar(frame, columns[0]);
            columns[1]
        } else {
            area
        };

        // Layout: header (1), messages (flex), status bar (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(main);

        self.render_header(frame, chunks[0]);
        self.render_messages(frame, chunks[1]);
        self.render_status(frame, chunks[2]);

        self.input_width = chunks[3].width;
        let title = match self.coordinator.staged_attachment() {
            Some(name) => Line::from(vec![
                Span::raw(" Message "),
                Span::styled(format!("📎 {} (Échap pour retirer) ", name), self.theme.badge_style()),
            ]),
            None => Line::from(" Message "),
        };
        self.input
            .render(chunks[3], frame.buffer_mut(), &self.theme, title);

        if let Some(info) = &self.info {
            render_info(frame, main, info, &self.theme);
        }
    }

    fn render_sidebar(&mut self, frame: &mut Frame, area: Rect) {
        let conversations = self.visible_conversations();
        let active = self.coordinator.active_id();
        let sidebar = Sidebar::new(&conversations, &self.theme)
            .active(active.as_deref())
            .focused(self.focus == Focus::Sidebar);
        frame.render_stateful_widget(sidebar, area, &mut self.sidebar);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let category = self.coordinator.category();
        let (dot, dot_style) = match self.online {
            Some(true) => ("● En ligne", self.theme.success_style()),
            Some(false) => ("● Hors ligne", self.theme.error_style()),
            None => ("○ Connexion…", self.theme.dim_style()),
        };
        let line = Line::from(vec![
            Span::styled(" IA Souveraine Burkina ", self.theme.accent_bold()),
            Span::styled("│ ", self.theme.dim_style()),
            Span::raw(format!("{} {} ", category.icon(), category.label())),
            Span::styled("│ ", self.theme.dim_style()),
            Span::raw(format!("{} ", self.coordinator.language().label())),
            Span::styled("│ ", self.theme.dim_style()),
            Span::styled(dot, dot_style),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect) {
        let active = self.coordinator.active_conversation();
        let title = match &active {
            Some(c) => format!(" {} {} ", c.category.icon(), c.title),
            None => " IA Souveraine ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(title);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let messages = active.map(|c| c.messages).unwrap_or_default();
        if inner.height == 0 || messages.is_empty() {
            let welcome = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "  🇧🇫 IA Souveraine Burkina",
                    self.theme.accent_bold(),
                )),
                Line::from(Span::styled(
                    "  Intelligence artificielle locale du Burkina Faso",
                    self.theme.dim_style(),
                )),
                Line::from(""),
                Line::from("  Posez votre question en français, mooré ou dioula."),
                Line::from(Span::styled(
                    "  Ctrl+G catégorie · Ctrl+L langue · Ctrl+N nouvelle · /help commandes",
                    self.theme.dim_style(),
                )),
            ]);
            frame.render_widget(welcome, inner);
            return;
        }

        // Keep the last column for the scrollbar
        let text_width = inner.width.saturating_sub(1) as usize;
        let total = content_height(&messages, text_width, Some(self.base_url.as_str()));
        let max_scroll = total.saturating_sub(inner.height as usize);
        self.scroll = self.scroll.min(max_scroll);

        let list_area = Rect {
            width: inner.width.saturating_sub(1),
            ..inner
        };
        let list = MessageList::new(&messages, &self.theme)
            .scroll(self.scroll)
            .base_url(&self.base_url);
        frame.render_widget(list, list_area);

        if total > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(max_scroll)
                .position(self.scroll)
                .viewport_content_length(inner.height as usize);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.coordinator.phase() == SendPhase::Sending {
            let spinner =
                Spinner::new(THINKING_LABEL, &self.theme).with_start_time(self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let style = match self.status_level {
            NoticeLevel::Success => self.theme.success_style(),
            NoticeLevel::Info => self.theme.dim_style(),
            NoticeLevel::Error => self.theme.error_style(),
        };
        let left = format!(" {}", self.status);
        let right = "Tab: liste │ Ctrl+F: chercher │ Ctrl+T: thème │ Ctrl+Q: quitter ";

        let left_width = left.chars().count();
        let right_width = right.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            Line::from(vec![
                Span::styled(left, style),
                Span::raw(" ".repeat(available - left_width - right_width)),
                Span::styled(right, self.theme.dim_style()),
            ])
        } else {
            Line::from(Span::styled(left, style))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Command output popup centered over `area`
fn render_info(frame: &mut Frame, area: Rect, text: &str, theme: &Theme) {
    let width = (area.width * 4 / 5).max(20).min(area.width);
    let lines = text.lines().count() as u16;
    let height = (lines + 2).min(area.height);
    let popup = Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );

    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Info (Échap pour fermer) ")
        .title_style(theme.accent_bold())
        .border_style(theme.accent_style())
        .style(theme.base_style());
    let paragraph = Paragraph::new(text.to_string())
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup);
}

/// Run the TUI application
pub async fn run_tui(
    coordinator: Arc<SessionCoordinator>,
    monitor: &StatusMonitor,
    base_url: String,
) -> anyhow::Result<()> {
    use crossterm::{
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::{Terminal, backend::CrosstermBackend};
    use std::io;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (draft_tx, mut draft_rx) = mpsc::unbounded_channel();
    let mut state = TuiState::new(coordinator.clone(), base_url, draft_tx);
    state.set_online(monitor.status());

    let mut session_rx = coordinator.subscribe();
    let mut status_rx = monitor.subscribe();
    let mut status_open = true;
    let mut event_stream = EventStream::new();

    // Tick interval for the spinner animation
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    let result: anyhow::Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| state.render(frame)) {
            break Err(e.into());
        }

        tokio::select! {
            event = session_rx.recv() => match event {
                Ok(event) => state.handle_session_event(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "ui fell behind session events");
                }
                Err(RecvError::Closed) => break Ok(()),
            },

            changed = status_rx.changed(), if status_open => {
                if changed.is_ok() {
                    let online = *status_rx.borrow_and_update();
                    state.set_online(online);
                } else {
                    status_open = false;
                }
            }

            event = event_stream.next() => match event {
                Some(Ok(event)) => {
                    if let Some(action) = event_to_action(event) {
                        if state.handle_action(action) {
                            break Ok(());
                        }
                    }
                }
                Some(Err(e)) => break Err(e.into()),
                None => break Ok(()),
            },

            Some(draft) = draft_rx.recv() => state.restore_draft(draft),

            _ = tick_interval.tick() => {}
        }
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
