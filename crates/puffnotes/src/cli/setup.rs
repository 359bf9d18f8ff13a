use clap::{Parser, Subcommand, ValueEnum};
use puffnotesapp::config::Backend;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// A directory on this machine
    Local,
    /// A folder on Google Drive
    Drive,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Local => Backend::Local,
            BackendArg::Drive => Backend::Drive,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "puffnotes",
    bin_name = "puffnotes",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Local-first markdown notes with autosave and AI beautify", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Where notes live (overrides the config file)
    #[arg(long, global = true, value_enum, help_heading = "Options")]
    pub backend: Option<BackendArg>,

    /// Notes directory for the local backend
    #[arg(long, global = true, value_name = "PATH", help_heading = "Options")]
    pub dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// List notes
    #[command(alias = "ls", display_order = 1)]
    List,

    /// Print a note
    #[command(alias = "cat", display_order = 2)]
    Show {
        /// Note name, with or without .md
        name: String,
    },

    /// Create a note (reads stdin when no text is given)
    #[command(alias = "n", display_order = 3)]
    New {
        name: String,

        /// Note text (words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Delete a note
    #[command(alias = "rm", display_order = 4)]
    Delete { name: String },

    /// Open a note in a line-by-line editing session
    #[command(display_order = 5)]
    Edit {
        /// Note to open; created on first save when it does not exist
        name: Option<String>,
    },

    /// Rewrite a note with AI and print the preview
    #[command(display_order = 10)]
    Beautify {
        name: String,

        /// Replace the note with the preview and save it
        #[arg(long)]
        accept: bool,
    },

    /// Export a note as a standalone HTML page
    #[command(display_order = 11)]
    Export {
        name: String,

        /// Output file (defaults to <name>.html in the current directory)
        #[arg(long, short, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Manage your personal Groq API key
    #[command(display_order = 20)]
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Show the effective configuration
    #[command(display_order = 21)]
    Config,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum KeyCommands {
    /// Store a key (trimmed)
    Set { key: String },
    /// Forget the stored key and use the default one
    Clear,
    /// Show which key is in use, masked
    Show,
}
