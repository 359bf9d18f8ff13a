//! # Rendering
//!
//! Everything the CLI prints goes through here. Functions take library values
//! (entries, snapshots, notices) and return strings, so the handlers stay free
//! of layout and the output can be tested without a terminal.

use super::styles::STYLES;
use chrono::{DateTime, Utc};
use puffnotesapp::beautify::BeautifyPhase;
use puffnotesapp::editor::{EditorSnapshot, SaveIndicator};
use puffnotesapp::model::DocumentEntry;
use puffnotesapp::notice::Notice;

pub const PREVIEW_RULE: &str = "─── AI preview ───";

pub fn render_list(entries: &[DocumentEntry]) -> String {
    if entries.is_empty() {
        return format!("{}\n", STYLES.muted.apply_to("No notes yet."));
    }
    let width = entries.len().to_string().len();
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{:>width$}. {}\n",
            i + 1,
            STYLES.note_name.apply_to(entry.display_name()),
            width = width
        ));
    }
    out
}

pub fn render_notice(notice: &Notice) -> String {
    STYLES
        .for_level(notice.level())
        .apply_to(notice.to_string())
        .to_string()
}

pub fn render_preview(preview: &str) -> String {
    let mut out = format!("{}\n{}", STYLES.muted.apply_to(PREVIEW_RULE), preview);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// One line describing the open note: name, save indicator, last save.
pub fn status_line(snapshot: &EditorSnapshot, now: DateTime<Utc>) -> String {
    let mut parts = vec![STYLES.title.apply_to(&snapshot.display_name).to_string()];

    if snapshot.indicator != SaveIndicator::Steady {
        parts.push(
            STYLES
                .indicator
                .apply_to(snapshot.indicator.label())
                .to_string(),
        );
    }
    match snapshot.last_saved_at {
        Some(at) => parts.push(
            STYLES
                .time
                .apply_to(format!("saved {}", format_time_ago(at, now)))
                .to_string(),
        ),
        None => parts.push(STYLES.muted.apply_to("never saved").to_string()),
    }
    match snapshot.beautify {
        BeautifyPhase::Idle => {}
        BeautifyPhase::Requesting => parts.push(STYLES.info.apply_to("beautifying…").to_string()),
        BeautifyPhase::PreviewReady => parts.push(
            STYLES
                .info
                .apply_to("preview ready (:accept / :reject)")
                .to_string(),
        ),
    }
    if !snapshot.bound {
        parts.push(
            STYLES
                .warning
                .apply_to(format!("no {} folder", snapshot.store))
                .to_string(),
        );
    }
    parts.join(&STYLES.muted.apply_to(" · ").to_string())
}

pub fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now
        .signed_duration_since(timestamp)
        .to_std()
        .unwrap_or_default();
    timeago::Formatter::new().convert(elapsed)
}
