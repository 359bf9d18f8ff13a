//! Terminal styles for the puffnotes CLI.
//!
//! Code refers to styles by what the text *is* (a note name, a timestamp, a
//! warning), never by color. The palette is warm and muted, picked to read on
//! both light and dark terminals, and registered once through
//! `once_cell::sync::Lazy`.
//!
//! `console` drops the escape codes on its own when stdout is not a terminal,
//! so piped output and the end-to-end tests see plain text.

use console::Style;
use once_cell::sync::Lazy;
use puffnotesapp::notice::MessageLevel;

pub struct Styles {
    pub title: Style,
    pub note_name: Style,
    pub muted: Style,
    pub time: Style,
    pub success: Style,
    pub info: Style,
    pub warning: Style,
    pub error: Style,
    pub indicator: Style,
    pub prompt: Style,
}

pub static STYLES: Lazy<Styles> = Lazy::new(|| Styles {
    title: Style::new().bold(),
    note_name: Style::new().color256(137),
    muted: Style::new().color256(245),
    time: Style::new().color256(245).italic(),
    success: Style::new().green(),
    info: Style::new().cyan(),
    warning: Style::new().yellow().bold(),
    error: Style::new().red().bold(),
    indicator: Style::new().color256(180),
    prompt: Style::new().color256(137).bold(),
});

impl Styles {
    pub fn for_level(&self, level: MessageLevel) -> &Style {
        match level {
            MessageLevel::Info => &self.info,
            MessageLevel::Success => &self.success,
            MessageLevel::Warning => &self.warning,
            MessageLevel::Error => &self.error,
        }
    }
}
