//! Markdown preview and HTML export.

use crate::error::Result;
use crate::model::DEFAULT_NOTE_NAME;
use pulldown_cmark::{html, Options, Parser};
use std::fs;
use std::path::Path;

const PAGE_STYLE: &str = "body{background:#fdfbf7;color:#1f2937;font-family:ui-monospace,monospace;\
font-size:14px;line-height:1.625;max-width:46rem;margin:2rem auto;padding:0 1rem}\
header{color:#a8a29a;font-family:serif;font-size:9pt;margin-bottom:1.5rem}\
blockquote{color:#4b5563;border-left:3px solid #e6ddcc;margin-left:0;padding-left:1rem}\
pre,code{background:#fdf6ec}table{border-collapse:collapse}\
th,td{border:1px solid #e6ddcc;padding:.25rem .5rem}";

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render note markdown to an HTML fragment.
pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// A complete HTML page for a note.
pub fn standalone_html(title: &str, markdown: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>{style}</style>\n</head>\n<body>\n<header>puffnotes</header>\n<main>\n{body}</main>\n</body>\n</html>\n",
        title = title,
        style = PAGE_STYLE,
        body = render_html(markdown),
    )
}

/// File name for an export of the note called `display_name`.
pub fn export_file_name(display_name: &str) -> String {
    let safe: String = display_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim();
    let stem = if safe.is_empty() { DEFAULT_NOTE_NAME } else { safe };
    format!("{}.html", stem)
}

pub fn write_export(path: &Path, title: &str, markdown: &str) -> Result<()> {
    fs::write(path, standalone_html(title, markdown))?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
