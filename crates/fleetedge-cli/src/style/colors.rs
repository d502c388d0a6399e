//! Semantic color palette backed by owo-colors.

use owo_colors::{OwoColorize, Style};

fn styled(value: &impl std::fmt::Display, style: Style) -> String {
    if super::no_color() {
        value.to_string()
    } else {
        value.style(style).to_string()
    }
}

/// Applies a named style to anything displayable.
pub trait SemanticStyle {
    /// Granted decisions, success marks (green bold).
    fn granted(&self) -> String;
    /// Denied decisions, errors (red bold).
    fn denied(&self) -> String;
    /// Not-applicable steps, secondary text (dimmed).
    fn muted(&self) -> String;
    /// Warnings and critical markers (yellow).
    fn warning(&self) -> String;
    /// Section headings (bold).
    fn header(&self) -> String;
    /// Ids, actions and paths (blue).
    fn code(&self) -> String;
}

impl<T: std::fmt::Display> SemanticStyle for T {
    fn granted(&self) -> String {
        styled(self, Style::new().green().bold())
    }

    fn denied(&self) -> String {
        styled(self, Style::new().red().bold())
    }

    fn muted(&self) -> String {
        styled(self, Style::new().dimmed())
    }

    fn warning(&self) -> String {
        styled(self, Style::new().yellow())
    }

    fn header(&self) -> String {
        styled(self, Style::new().bold())
    }

    fn code(&self) -> String {
        styled(self, Style::new().blue())
    }
}
