//! Visio - terminal chat client with running conversation summaries

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use visio_context::{build_context, format_context_preview, summary_state, SummaryState};
use visio_protocol::{
    grouped_models, AiModel, Chat, ChatId, ImageAttachment, MessageId, ModelConfigPatch, Provider,
    Role,
};
use visio_providers::{load_image_url, upload_image, ImageUploader};
use visio_session::{ChatSession, Turn};
use visio_store::{export_chat, ChatStore, ExportFormat, StoreSnapshot};

mod commands;
mod config;

use commands::{Cli, Commands};
use config::CliConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref(), cli.store.as_deref(), cli.verbose) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = visio_telemetry::init_subscriber(&config.telemetry()) {
        eprintln!("{}: {}", "Warning".yellow().bold(), e);
    }

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &CliConfig) -> Result<()> {
    tracing::debug!(store = %config.store_path.display(), "opening chat store");
    let mut store = config.open_store()?;

    match command {
        Commands::New { title, model } => run_new(&mut store, title.as_deref(), model.as_deref()),
        Commands::List { starred } => {
            run_list(&store, starred);
            Ok(())
        }
        Commands::Show { chat } => {
            let chat_id = resolve_chat(&store, &chat)?;
            print_chat(store.chat(&chat_id)?);
            Ok(())
        }
        Commands::Send { chat, text, image } => {
            let chat_id = resolve_chat(&store, &chat)?;
            let provider = store.chat(&chat_id)?.model_config.provider;
            let serving = config.client_builder().for_provider(provider).config().provider;
            let images = if image.is_empty() {
                Vec::new()
            } else if is_relay(serving) {
                let uploader = config.image_uploader()?;
                load_images(&image, Some(&uploader as &dyn ImageUploader)).await?
            } else {
                load_images(&image, None).await?
            };
            let session = open_session(store, config);
            let turn = session.send(&chat_id, &text.join(" "), images).await?;
            print_turn(&turn);
            Ok(())
        }
        Commands::Edit {
            chat,
            message_id,
            text,
        } => {
            let chat_id = resolve_chat(&store, &chat)?;
            let session = open_session(store, config);
            let turn = session
                .edit_and_resend(&chat_id, &MessageId::from(message_id.as_str()), &text)
                .await?;
            print_turn(&turn);
            Ok(())
        }
        Commands::Regenerate {
            chat,
            message_id,
            model,
        } => {
            let chat_id = resolve_chat(&store, &chat)?;
            let model = model.as_deref().map(parse_model).transpose()?;
            let session = open_session(store, config);
            let turn = session
                .regenerate(&chat_id, &MessageId::from(message_id.as_str()), model)
                .await?;
            print_turn(&turn);
            Ok(())
        }
        Commands::Context { chat, json } => {
            let chat_id = resolve_chat(&store, &chat)?;
            print_context(store.chat(&chat_id)?, json)
        }
        Commands::Summarize { chat } => run_summarize(&mut store, &chat),
        Commands::Rename { chat, title } => {
            let chat_id = resolve_chat(&store, &chat)?;
            store.rename_chat(&chat_id, &title)?;
            store.save()?;
            println!("{} {}", "Renamed to".green(), title.bold());
            Ok(())
        }
        Commands::Star { chat } => {
            let chat_id = resolve_chat(&store, &chat)?;
            let starred = store.star_chat(&chat_id)?;
            store.save()?;
            if starred {
                println!("{} {}", "★".yellow(), "Starred".green());
            } else {
                println!("{}", "Unstarred".green());
            }
            Ok(())
        }
        Commands::Delete { chat } => {
            let chat_id = resolve_chat(&store, &chat)?;
            let removed = store.delete_chat(&chat_id)?;
            store.save()?;
            println!("{} {}", "Deleted".green(), removed.title.bold());
            Ok(())
        }
        Commands::Search { query } => {
            let results = store.search_chats(&query);
            if results.is_empty() {
                println!("{}", "No matching chats.".dimmed());
            }
            for chat in results {
                print_chat_row(chat, false);
            }
            Ok(())
        }
        Commands::Export {
            chat,
            format,
            output,
        } => {
            let chat_id = resolve_chat(&store, &chat)?;
            let format: ExportFormat = format.parse()?;
            let content = export_chat(store.chat(&chat_id)?, format)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{} {}", "Exported to".green(), path.display());
                }
                None => println!("{}", content),
            }
            Ok(())
        }
        Commands::Import { file } => run_import(&mut store, &file),
        Commands::Models => {
            run_models(config);
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("Refusing to clear all chats without --yes");
            }
            store.clear_all();
            store.save()?;
            println!("{}", "All chats deleted.".green());
            Ok(())
        }
    }
}

fn run_new(store: &mut ChatStore, title: Option<&str>, model: Option<&str>) -> Result<()> {
    let chat_id = store.create_chat(title);
    if let Some(model) = model {
        store.update_model_config(&chat_id, ModelConfigPatch::model(parse_model(model)?))?;
    }
    store.save()?;

    println!("{} {}", "Created chat".green(), chat_id);
    Ok(())
}

fn run_list(store: &ChatStore, starred_only: bool) {
    let current = store.current_chat().map(|c| c.id.clone());
    let chats: Vec<&Chat> = store
        .chats()
        .iter()
        .filter(|c| !starred_only || c.is_starred)
        .collect();

    if chats.is_empty() {
        println!("{}", "No chats yet.".dimmed());
        return;
    }

    for chat in chats {
        print_chat_row(chat, current.as_ref() == Some(&chat.id));
    }
}

fn run_summarize(store: &mut ChatStore, chat: &str) -> Result<()> {
    let chat_id = resolve_chat(store, chat)?;
    if !store.update_chat_summary(&chat_id)? {
        println!("{}", "Nothing to summarize.".dimmed());
        return Ok(());
    }
    store.save()?;

    let chat = store.chat(&chat_id)?;
    println!("{}", "Summary updated".green().bold());
    if let Some(summary) = &chat.summary {
        println!("{}", summary);
    }
    Ok(())
}

#[derive(Debug)]
enum ImportPayload {
    One(Box<Chat>),
    Many(Vec<Chat>),
}

fn parse_import(content: &str) -> Result<ImportPayload> {
    let value: serde_json::Value = serde_json::from_str(content).context("Not valid JSON")?;

    let payload = if value.is_array() {
        ImportPayload::Many(serde_json::from_value(value)?)
    } else if value.get("chats").is_some() {
        let snapshot: StoreSnapshot = serde_json::from_value(value)?;
        ImportPayload::Many(snapshot.chats)
    } else if value.is_object() {
        ImportPayload::One(Box::new(serde_json::from_value(value)?))
    } else {
        bail!("Expected a chat object or an array of chats");
    };
    Ok(payload)
}

fn run_import(store: &mut ChatStore, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let chats = match parse_import(&content)
        .with_context(|| format!("Invalid chat export: {}", file.display()))?
    {
        ImportPayload::One(chat) => vec![*chat],
        ImportPayload::Many(chats) => chats,
    };
    let offered = chats.len();
    let added = store.import_chats(chats);
    store.save()?;

    println!(
        "{} {} of {} chats",
        "Imported".green(),
        added.to_string().bold(),
        offered
    );
    Ok(())
}

fn run_models(config: &CliConfig) {
    let default_model = config.config.model.model_config().model;

    for group in grouped_models() {
        println!("{}", group.label.cyan().bold());
        for model in group.models {
            let marker = if model == default_model { "*" } else { " " };
            println!(
                " {} {:<20} {} {}",
                marker.green(),
                model.id(),
                model.display_name(),
                format!("({} tokens)", model.context_window()).dimmed()
            );
        }
    }
}

fn resolve_chat(store: &ChatStore, arg: &str) -> Result<ChatId> {
    if arg == "current" {
        return store
            .current_chat()
            .map(|c| c.id.clone())
            .ok_or_else(|| anyhow!("No current chat; create one with `visio new`"));
    }
    Ok(store.resolve_chat_id(arg)?)
}

fn parse_model(id: &str) -> Result<AiModel> {
    id.parse()
        .map_err(|e| anyhow!("{}; run `visio models` for the list", e))
}

/// Relay gateways only fetch images by public URL
fn is_relay(provider: Provider) -> bool {
    matches!(provider, Provider::Resita | Provider::NekoLabs)
}

/// Local files are uploaded when an uploader is given, inlined otherwise
async fn load_images(
    paths: &[String],
    uploader: Option<&dyn ImageUploader>,
) -> Result<Vec<ImageAttachment>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let url = match uploader {
            Some(uploader) => upload_image(path, uploader).await,
            None => load_image_url(path).await,
        }
        .with_context(|| format!("Failed to load image {}", path))?;
        let mut attachment = ImageAttachment::from_url(url);
        if let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) {
            attachment.name = name.to_string();
        }
        images.push(attachment);
    }
    Ok(images)
}

/// Clients are resolved per chat provider at turn time
fn open_session(store: ChatStore, config: &CliConfig) -> ChatSession {
    ChatSession::with_factory(store, Arc::new(config.client_builder()))
}

fn print_turn(turn: &Turn) {
    println!("{}", turn.reply.content);
    println!();

    let mut footer = format!(
        "{} tokens ({} prompt, {} completion)",
        turn.usage.total(),
        turn.usage.prompt_tokens,
        turn.usage.completion_tokens
    );
    if let Some(title) = &turn.renamed_to {
        footer.push_str(&format!(" · chat renamed to \"{}\"", title));
    }
    println!("{}", footer.dimmed());
}

fn short_id(id: &ChatId) -> &str {
    let s = id.as_str();
    s.char_indices().nth(8).map_or(s, |(i, _)| &s[..i])
}

fn print_chat_row(chat: &Chat, is_current: bool) {
    let current = if is_current { "*" } else { " " };
    let star = if chat.is_starred { "★" } else { " " };
    println!(
        "{} {} {} {} {}",
        current.green(),
        short_id(&chat.id).yellow(),
        star.yellow(),
        chat.title.bold(),
        format!(
            "({} messages, {})",
            chat.messages.len(),
            chat.updated_at.format("%Y-%m-%d %H:%M")
        )
        .dimmed()
    );
}

fn print_chat(chat: &Chat) {
    println!("{}", chat.title.bold());
    println!("{}", "─".repeat(60).dimmed());
    println!("{}: {}", "Id".cyan(), chat.id);
    println!(
        "{}: {}",
        "Model".cyan(),
        chat.model_config.model.display_name().yellow()
    );
    println!("{}: {}", "Tokens".cyan(), chat.total_tokens);
    match summary_state(chat) {
        SummaryState::Summarized(index) => println!(
            "{}: messages 1-{} summarized",
            "Summary".cyan(),
            index + 1
        ),
        SummaryState::Unsummarized => println!("{}: none", "Summary".cyan()),
    }
    println!("{}", "─".repeat(60).dimmed());
    println!();

    for msg in &chat.messages {
        let role = match msg.role {
            Role::User => "User".green(),
            Role::Assistant => "Assistant".blue(),
            Role::System => "System".yellow(),
        };
        let edited = if msg.is_edited { " (edited)" } else { "" };
        println!(
            "{} {}{}",
            role.bold(),
            format!("[{}] {}", msg.id, msg.timestamp.format("%H:%M")).dimmed(),
            edited.dimmed()
        );
        for image in &msg.images {
            println!("  {} {}", "🖼".dimmed(), image.name);
        }
        println!("{}", msg.content);
        println!();
    }
}

fn print_context(chat: &Chat, json: bool) -> Result<()> {
    let entries = build_context(
        &chat.messages,
        chat.summary.as_deref(),
        chat.last_summarized_index,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    print!(
        "{}",
        format_context_preview(&chat.messages, chat.summary.as_deref())
    );
    println!();
    println!(
        "{}",
        format!("Next turn sends {} entries:", entries.len())
            .cyan()
            .bold()
    );
    for entry in &entries {
        println!("{} {}", format!("{}:", entry.role.as_str()).bold(), entry.content);
    }
    Ok(())
}
