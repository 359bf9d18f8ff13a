//! # CLI Layer
//!
//! The only place that knows about stdout, stderr and exit codes.
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: clap, in `setup.rs`
//! 2. **Context Setup**: configuration, store and preferences via `puffnotesapp::init`
//! 3. **Dispatch**: one handler per command
//! 4. **Output Formatting**: `render.rs`
//!
//! One-shot commands drive an [`Editor`] directly: they bind the store, do
//! their one thing, and run any save job to completion before returning.
//! `edit` is the exception and hands the editor to the session actor (see
//! `interactive.rs`).

use super::interactive;
use super::render;
use super::setup::{Cli, Commands, KeyCommands};
use super::styles::STYLES;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use puffnotesapp::beautify::mask_key;
use puffnotesapp::config::{PuffConfig, CONFIG_FILE_NAME};
use puffnotesapp::editor::Editor;
use puffnotesapp::init::{initialize, InitOptions, PuffContext, PuffPaths};
use puffnotesapp::notice::{MessageLevel, Notice};
use puffnotesapp::preview::{export_file_name, write_export};
use puffnotesapp::store::BindOutcome;
use std::io::IsTerminal;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PUFFNOTES_LOG";

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(dispatch(cli))
}

/// Logs go to stderr so they never mix with note output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let options = InitOptions {
        backend: cli.backend.map(Into::into),
        notes_dir: cli.dir.clone(),
    };
    let mut ctx = initialize(PuffPaths::discover(), options.clone())?;
    debug!(backend = ?ctx.backend, "Context ready");

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => handle_list(&ctx).await,
        Commands::Show { name } => handle_show(&ctx, &name).await,
        Commands::New { name, text } => handle_new(&ctx, &name, text).await,
        Commands::Delete { name } => handle_delete(&ctx, &name).await,
        Commands::Edit { name } => interactive::run(&mut ctx, name).await,
        Commands::Beautify { name, accept } => handle_beautify(&ctx, &name, accept).await,
        Commands::Export { name, out } => handle_export(&ctx, &name, out).await,
        Commands::Key { action } => handle_key(&mut ctx, action),
        Commands::Config => handle_config(&ctx, &options),
    }
}

/// An editor whose store is bound, or an error explaining why it is not.
async fn bound_editor(ctx: &PuffContext) -> Result<Editor> {
    let mut editor = ctx.editor();
    if editor.bind_root().await? == BindOutcome::Cancelled {
        bail!(
            "No {} notes folder is available (see `puffnotes config`)",
            ctx.store.kind().label()
        );
    }
    Ok(editor)
}

async fn handle_list(ctx: &PuffContext) -> Result<()> {
    let editor = bound_editor(ctx).await?;
    print!("{}", render::render_list(editor.entries()));
    Ok(())
}

async fn handle_show(ctx: &PuffContext, name: &str) -> Result<()> {
    let mut editor = bound_editor(ctx).await?;
    editor.open_named(name).await?;
    let content = editor.document().content();
    print!("{}", content);
    if !content.is_empty() && !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

async fn handle_new(ctx: &PuffContext, name: &str, text: Vec<String>) -> Result<()> {
    let content = if !text.is_empty() {
        text.join(" ")
    } else if !std::io::stdin().is_terminal() {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read note text from stdin")?;
        buf
    } else {
        String::new()
    };

    let mut editor = bound_editor(ctx).await?;
    editor.new_note();
    let now = Instant::now();
    editor.rename(name, now);
    editor.edit(content, now)?;
    save_now(&mut editor).await
}

async fn handle_delete(ctx: &PuffContext, name: &str) -> Result<()> {
    let mut editor = bound_editor(ctx).await?;
    if !editor.delete_named(name).await? {
        bail!("Note not found: {}", name);
    }
    println!(
        "{}",
        render::render_notice(&Notice::Info(format!("Deleted {}", name)))
    );
    Ok(())
}

async fn handle_beautify(ctx: &PuffContext, name: &str, accept: bool) -> Result<()> {
    let mut editor = bound_editor(ctx).await?;
    editor.open_named(name).await?;

    let job = editor
        .start_beautify()
        .map_err(|e| anyhow!(Notice::from(e).to_string()))?;
    let report = job.run().await;
    editor.finish_beautify(report, Instant::now());
    report_notices(&mut editor)?;

    let preview = editor
        .beautify()
        .preview()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("The AI returned no preview"))?;

    if !accept {
        print!("{}", render::render_preview(&preview));
        println!(
            "{}",
            STYLES
                .muted
                .apply_to("Run again with --accept to replace the note with this version.")
        );
        return Ok(());
    }

    editor.accept_beautify(Instant::now())?;
    save_now(&mut editor).await
}

async fn handle_export(ctx: &PuffContext, name: &str, out: Option<PathBuf>) -> Result<()> {
    let mut editor = bound_editor(ctx).await?;
    editor.open_named(name).await?;
    let document = editor.document();
    let path = out.unwrap_or_else(|| PathBuf::from(export_file_name(document.display_name())));

    write_export(&path, document.display_name(), document.content())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Exported to {}", path.display());
    Ok(())
}

fn handle_key(ctx: &mut PuffContext, action: KeyCommands) -> Result<()> {
    let notice = match action {
        KeyCommands::Set { key } => {
            if key.trim().is_empty() {
                bail!("The key is empty; use `puffnotes key clear` to remove yours");
            }
            ctx.preferences.set_user_api_key(&key)?
        }
        KeyCommands::Clear => ctx.preferences.set_user_api_key("")?,
        KeyCommands::Show => {
            let line = match ctx.preferences.user_api_key() {
                Some(key) => format!("Using your key: {}", mask_key(&key)),
                None if ctx.keys.has_default() => "Using the default key".to_string(),
                None => "No API key set".to_string(),
            };
            println!("{}", line);
            return Ok(());
        }
    };
    if !ctx.preferences.is_persistent() {
        eprintln!(
            "{}",
            STYLES
                .warning
                .apply_to("No data directory available; the key lasts for this run only.")
        );
    }
    println!("{}", render::render_notice(&notice));
    Ok(())
}

fn handle_config(ctx: &PuffContext, options: &InitOptions) -> Result<()> {
    let mut shown: PuffConfig = ctx.config.clone();
    if !shown.default_api_key.is_empty() {
        shown.default_api_key = mask_key(&shown.default_api_key);
    }
    shown.drive_token = shown.drive_token.as_deref().map(mask_key);

    if let Some(dir) = &ctx.paths.config_dir {
        println!("# config file: {}", dir.join(CONFIG_FILE_NAME).display());
    }
    if let Some(dir) = ctx.notes_dir(options) {
        println!("# notes directory: {}", dir.display());
    }
    print!(
        "{}",
        toml::to_string_pretty(&shown).context("Failed to format configuration")?
    );
    Ok(())
}

/// Run a manual save to completion and print what happened.
async fn save_now(editor: &mut Editor) -> Result<()> {
    if let Some(job) = editor.request_save().await? {
        let report = job.run().await;
        editor.finish_save(report, Instant::now());
    }
    report_notices(editor)
}

/// Print queued notices. Errors, a missing name and a missing key fail the
/// command; other warnings only go to stderr.
fn report_notices(editor: &mut Editor) -> Result<()> {
    let mut failure = None;
    for notice in editor.drain_notices() {
        let fatal = matches!(notice, Notice::NameRequired | Notice::PromptForKey(_))
            || notice.level() == MessageLevel::Error;
        if fatal {
            failure.get_or_insert(notice);
        } else if notice.level() == MessageLevel::Warning {
            eprintln!("{}", render::render_notice(&notice));
        } else {
            println!("{}", render::render_notice(&notice));
        }
    }
    match failure {
        Some(notice) => Err(anyhow!(notice.to_string())),
        None => Ok(()),
    }
}
