//! Single-chat export renderers

use std::str::FromStr;
use visio_protocol::{Chat, Role};

use crate::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown export format: {0} (expected json, markdown or text)")]
pub struct UnknownExportFormat(String);

impl FromStr for ExportFormat {
    type Err = UnknownExportFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(UnknownExportFormat(s.to_string())),
        }
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::System => "System",
    }
}

/// Render one chat in the requested format
pub fn export_chat(chat: &Chat, format: ExportFormat) -> Result<String, StoreError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(chat)?),
        ExportFormat::Markdown => Ok(render_markdown(chat)),
        ExportFormat::Text => Ok(render_text(chat)),
    }
}

fn render_markdown(chat: &Chat) -> String {
    let mut out = format!("# {}\n\n", chat.title);
    out.push_str(&format!(
        "*Model: {} · Created: {}*\n\n",
        chat.model_config.model.display_name(),
        chat.created_at.format("%Y-%m-%d %H:%M UTC")
    ));

    if let Some(summary) = chat.summary.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("> {}\n\n", summary.replace('\n', "\n> ")));
    }

    for message in &chat.messages {
        out.push_str(&format!(
            "## {} ({})\n\n",
            speaker(message.role),
            message.timestamp.format("%H:%M")
        ));
        out.push_str(&format!("{}\n\n", message.content));
        for image in &message.images {
            out.push_str(&format!("![{}]({})\n\n", image.name, image.url));
        }
    }

    out
}

fn render_text(chat: &Chat) -> String {
    let mut out = format!("{}\n", chat.title);
    out.push_str(&format!("{}\n\n", "=".repeat(chat.title.chars().count())));

    for message in &chat.messages {
        out.push_str(&format!(
            "[{}] {}: {}\n\n",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            speaker(message.role),
            message.content
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use visio_protocol::Message;

    fn sample_chat() -> Chat {
        let mut chat = Chat::default();
        chat.title = "Rust questions".to_string();
        chat.messages.push(Message::user("What is ownership?"));
        chat.messages.push(Message::assistant("A set of rules."));
        chat
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("MD".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_json_export_parses_back() {
        let chat = sample_chat();
        let json = export_chat(&chat, ExportFormat::Json).unwrap();
        let parsed: Chat = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, chat);
    }

    #[test]
    fn test_markdown_export() {
        let out = export_chat(&sample_chat(), ExportFormat::Markdown).unwrap();
        assert!(out.starts_with("# Rust questions\n"));
        assert!(out.contains("## User ("));
        assert!(out.contains("What is ownership?"));
        assert!(out.contains("## Assistant ("));
    }

    #[test]
    fn test_text_export() {
        let out = export_chat(&sample_chat(), ExportFormat::Text).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("Rust questions"));
        assert_eq!(lines.next(), Some("=============="));
        assert!(out.contains("User: What is ownership?"));
        assert!(out.contains("Assistant: A set of rules."));
    }
}
