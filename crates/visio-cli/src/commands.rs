//! CLI commands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Visio - chat with hosted models from the terminal
#[derive(Parser, Debug)]
#[command(name = "visio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to visio.{jsonc,json,yml,yaml} or ~/.config/visio/)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Chat store file (defaults to ~/.visio/chats.json)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Commands taking a `chat` argument accept a full id, a unique id prefix, or
/// `current`.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a chat and make it current
    New {
        #[arg(short, long)]
        title: Option<String>,

        /// Model id from `visio models`
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List chats, newest first
    List {
        /// Only starred chats
        #[arg(long)]
        starred: bool,
    },

    /// Print a chat's messages
    Show { chat: String },

    /// Send a message and print the reply
    Send {
        chat: String,

        /// Message text
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,

        /// Image file or URL to ask about (repeatable; the first one is analyzed)
        #[arg(short, long)]
        image: Vec<String>,
    },

    /// Edit a user message and answer it again
    Edit {
        chat: String,
        message_id: String,
        text: String,
    },

    /// Drop an assistant reply and ask again
    Regenerate {
        chat: String,
        message_id: String,

        /// Switch the chat to another model first
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show what the model will receive on the next turn
    Context {
        chat: String,

        /// Print the raw entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute the chat's running summary now
    Summarize { chat: String },

    /// Rename a chat
    Rename { chat: String, title: String },

    /// Toggle a chat's star
    Star { chat: String },

    /// Delete a chat
    Delete { chat: String },

    /// Search titles and message text
    Search { query: String },

    /// Export a chat
    Export {
        chat: String,

        /// json, markdown or text
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import chats from a JSON export (one chat or an array)
    Import { file: PathBuf },

    /// List available models
    Models,

    /// Delete every chat and folder
    Clear {
        /// Required to actually clear
        #[arg(long)]
        yes: bool,
    },
}
