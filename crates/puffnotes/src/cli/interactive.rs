//! # Line Editing Session
//!
//! `puffnotes edit` puts the editor on its own task (see
//! `puffnotesapp::session`) and feeds it from stdin:
//!
//! - A plain line is appended to the note, followed by a newline. Autosave
//!   kicks in once typing pauses for the configured debounce.
//! - A line starting with `:` is a command (`:help` lists them).
//!
//! The command list is printed on the first session for each storage mode
//! and remembered in the preferences file.
//!
//! Notices from the session (saves, failures, key prompts) are printed as
//! they arrive. End of input behaves like `:quit`: pending edits are flushed
//! before the process exits.

use super::render;
use super::styles::STYLES;
use anyhow::Result;
use chrono::Utc;
use puffnotesapp::beautify::BeautifyPhase;
use puffnotesapp::config::Backend;
use puffnotesapp::error::PuffError;
use puffnotesapp::init::PuffContext;
use puffnotesapp::notice::Notice;
use puffnotesapp::session::{self, Command, EditorHandle, Session};
use puffnotesapp::store::BindOutcome;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;

const HELP: &str = "\
Type to append lines to the note. Commands:
  :name NAME   rename the note
  :save        save now
  :new         start a new note
  :open NAME   open another note
  :list        list notes
  :show        print the note
  :beautify    ask the AI for a polished version
  :regen       ask again, from the same original
  :accept      replace the note with the preview
  :reject      keep the note as it is
  :status      show the save state
  :quit        save pending changes and leave";

#[derive(Debug)]
enum Input {
    Send(Command),
    Append(String),
    List,
    Show,
    Status,
    Help,
    Quit,
    Unknown(String),
}

fn parse_line(line: &str) -> Input {
    let Some(rest) = line.strip_prefix(':') else {
        return Input::Append(format!("{}\n", line));
    };
    let (word, arg) = match rest.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (rest.trim(), ""),
    };
    match (word, arg) {
        ("name" | "rename", name) if !name.is_empty() => Input::Send(Command::Rename(name.into())),
        ("open" | "o", name) if !name.is_empty() => Input::Send(Command::Open(name.into())),
        ("save" | "w", _) => Input::Send(Command::SaveNow),
        ("new" | "n", _) => Input::Send(Command::NewNote),
        ("beautify" | "b", _) => Input::Send(Command::Beautify),
        ("regen" | "r", _) => Input::Send(Command::Regenerate),
        ("accept", _) => Input::Send(Command::Accept),
        ("reject", _) => Input::Send(Command::Reject),
        ("list" | "ls", _) => Input::List,
        ("show" | "p", _) => Input::Show,
        ("status" | "s", _) => Input::Status,
        ("help" | "h" | "?", _) => Input::Help,
        ("quit" | "q" | "wq", _) => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

pub async fn run(ctx: &mut PuffContext, name: Option<String>) -> Result<()> {
    let mut editor = ctx.editor();
    if editor.bind_root().await? == BindOutcome::Cancelled {
        eprintln!(
            "{}",
            STYLES.warning.apply_to(format!(
                "No {} notes folder is available; edits will not be saved.",
                ctx.store.kind().label()
            ))
        );
    }
    if let Some(name) = name {
        match editor.open_named(&name).await {
            Ok(()) => {}
            Err(PuffError::NotFound(_)) => {
                editor.new_note();
                editor.rename(name, Instant::now());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let Session {
        handle,
        mut notices,
        task,
    } = session::spawn(editor);

    print_status(&handle).await?;
    let variant = onboarding_variant(ctx.backend);
    if ctx.preferences.onboarding_complete(variant) {
        println!("{}", STYLES.muted.apply_to("Type :help for commands."));
    } else {
        println!("{}", HELP);
        ctx.preferences.mark_onboarding_complete(variant)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_input(&handle, parse_line(&line)).await? {
                    break;
                }
            }
            Some(notice) = notices.recv() => print_notice(&notice),
        }
    }

    let last = handle.shutdown().await?;
    let _ = task.await;
    while let Ok(notice) = notices.try_recv() {
        print_notice(&notice);
    }
    println!("{}", render::status_line(&last, Utc::now()));
    Ok(())
}

/// First-run help is shown once per storage mode.
fn onboarding_variant(backend: Backend) -> &'static str {
    match backend {
        Backend::Local => "offline",
        Backend::Drive => "online",
    }
}

/// Returns `false` when the session should end.
async fn handle_input(handle: &EditorHandle, input: Input) -> Result<bool> {
    match input {
        Input::Send(command) => handle.send(command).await?,
        Input::Append(text) => handle.append(text).await?,
        Input::List => {
            handle.send(Command::Refresh).await?;
            let snapshot = handle.snapshot().await?;
            print!("{}", render::render_list(&snapshot.entries));
        }
        Input::Show => {
            let snapshot = handle.snapshot().await?;
            print!("{}", snapshot.content);
            if !snapshot.content.ends_with('\n') {
                println!();
            }
        }
        Input::Status => print_status(handle).await?,
        Input::Help => println!("{}", HELP),
        Input::Quit => return Ok(false),
        Input::Unknown(line) => eprintln!(
            "{}",
            STYLES
                .warning
                .apply_to(format!("Unknown command {:?}; type :help", line))
        ),
    }
    Ok(true)
}

async fn print_status(handle: &EditorHandle) -> Result<()> {
    let snapshot = handle.snapshot().await?;
    println!("{}", render::status_line(&snapshot, Utc::now()));
    if snapshot.beautify == BeautifyPhase::PreviewReady {
        if let Some(preview) = &snapshot.preview {
            print!("{}", render::render_preview(preview));
        }
    }
    Ok(())
}

fn print_notice(notice: &Notice) {
    println!("{}", render::render_notice(notice));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_append_with_newline() {
        assert!(matches!(parse_line("hello"), Input::Append(t) if t == "hello\n"));
        assert!(matches!(parse_line(""), Input::Append(t) if t == "\n"));
    }

    #[test]
    fn commands_with_arguments() {
        assert!(matches!(
            parse_line(":name  week 3 "),
            Input::Send(Command::Rename(n)) if n == "week 3"
        ));
        assert!(matches!(
            parse_line(":open ideas"),
            Input::Send(Command::Open(n)) if n == "ideas"
        ));
    }

    #[test]
    fn name_without_argument_is_unknown() {
        assert!(matches!(parse_line(":name"), Input::Unknown(l) if l == ":name"));
    }

    #[test]
    fn short_forms() {
        assert!(matches!(parse_line(":w"), Input::Send(Command::SaveNow)));
        assert!(matches!(parse_line(":q"), Input::Quit));
        assert!(matches!(parse_line(":b"), Input::Send(Command::Beautify)));
    }
}
