//! souveraine-tui: Terminal UI components
//!
//! Widgets for the chat view: conversation sidebar, message list with
//! list and emphasis formatting, input box and thinking spinner.

pub mod input;
pub mod theme;
pub mod widgets;

pub use theme::Theme;
