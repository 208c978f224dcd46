//! Color theme support

use ratatui::style::{Color, Modifier, Style};
use souveraine_core::ThemePreference;

/// Color theme for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Background color
    pub bg: Color,
    /// Primary text color
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Accent color (highlights, prompts)
    pub accent: Color,
    /// User message header
    pub user: Color,
    /// Assistant message header
    pub assistant: Color,
    pub error: Color,
    pub success: Color,
    pub warning: Color,
    pub border: Color,
    /// Selection/highlight background
    pub selection_bg: Color,
    /// Language and audio badges
    pub badge: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Green,
            user: Color::Yellow,
            assistant: Color::Green,
            error: Color::Red,
            success: Color::Green,
            warning: Color::Yellow,
            border: Color::DarkGray,
            selection_bg: Color::DarkGray,
            badge: Color::Magenta,
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            bg: Color::White,
            fg: Color::Black,
            dim: Color::Gray,
            accent: Color::Rgb(0, 122, 61),
            user: Color::Rgb(180, 120, 0),
            assistant: Color::Rgb(0, 122, 61),
            error: Color::Rgb(206, 17, 38),
            success: Color::Rgb(0, 122, 61),
            warning: Color::Rgb(180, 120, 0),
            border: Color::Gray,
            selection_bg: Color::LightGreen,
            badge: Color::Magenta,
        }
    }

    /// Theme matching a persisted preference
    pub fn for_preference(preference: ThemePreference) -> Self {
        match preference {
            ThemePreference::Dark => Self::dark(),
            ThemePreference::Light => Self::light(),
        }
    }

    /// Get base style
    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Get dimmed style
    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    /// Get accent style
    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    /// Get bold accent style
    pub fn accent_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn user_style(&self) -> Style {
        Style::default().fg(self.user).add_modifier(Modifier::BOLD)
    }

    pub fn assistant_style(&self) -> Style {
        Style::default()
            .fg(self.assistant)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn badge_style(&self) -> Style {
        Style::default().fg(self.badge)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Highlighted row in a list
    pub fn selected_style(&self) -> Style {
        Style::default()
            .bg(self.selection_bg)
            .add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_preference() {
        assert_eq!(Theme::for_preference(ThemePreference::Dark).bg, Color::Reset);
        assert_eq!(Theme::for_preference(ThemePreference::Light).bg, Color::White);
    }
}
