//! /category, /language, /theme

use super::CommandResult;
use souveraine_core::{Category, Language, SessionCoordinator, ThemePreference};

pub struct SettingsCommand;

impl SettingsCommand {
    /// Show the categories, or switch to the one named by `args`
    pub fn category(args: &str, coordinator: &SessionCoordinator) -> CommandResult {
        if args.is_empty() {
            let current = coordinator.category();
            let mut output = String::from("Catégories:\n");
            for category in Category::ALL {
                let marker = if category == current { "*" } else { " " };
                output.push_str(&format!(
                    "{} {} {:<12} ({})\n",
                    marker,
                    category.icon(),
                    category.label(),
                    category.id()
                ));
            }
            return CommandResult::Message(output.trim_end().to_string());
        }

        match Category::parse(args) {
            Some(category) => {
                coordinator.set_category(category);
                CommandResult::Message(format!(
                    "Catégorie: {} {}",
                    category.icon(),
                    category.label()
                ))
            }
            None => CommandResult::Message(format!("Catégorie inconnue: {}", args)),
        }
    }

    pub fn language(args: &str, coordinator: &SessionCoordinator) -> CommandResult {
        if args.is_empty() {
            let current = coordinator.language();
            let choices: Vec<String> = Language::ALL
                .iter()
                .map(|l| {
                    let marker = if *l == current { "*" } else { "" };
                    format!("{}{} ({})", marker, l.label(), l.code())
                })
                .collect();
            return CommandResult::Message(format!("Langues: {}", choices.join(", ")));
        }

        match Language::parse(args) {
            Some(language) => {
                coordinator.set_language(language);
                CommandResult::Message(format!("Langue: {}", language.label()))
            }
            None => CommandResult::Message(format!("Langue inconnue: {}", args)),
        }
    }

    /// Toggle the theme, or set it when `args` names one
    pub fn theme(args: &str, coordinator: &SessionCoordinator) -> CommandResult {
        let theme = if args.is_empty() {
            coordinator.toggle_theme()
        } else {
            match ThemePreference::parse(args) {
                Some(theme) => {
                    coordinator.set_theme(theme);
                    theme
                }
                None => return CommandResult::Message(format!("Thème inconnu: {}", args)),
            }
        };
        CommandResult::Message(format!("Thème: {}", theme.as_str()))
    }
}
