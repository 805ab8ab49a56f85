use crate::schema::VisioConfig;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Jsonc,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;

        match ext {
            "jsonc" => Some(Self::Jsonc),
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: VisioConfig,
    pub path: PathBuf,
    pub format: ConfigFormat,
}

pub fn load_config(config_path: Option<&Path>) -> Result<VisioConfig> {
    resolve_config(config_path).map(|r| r.config)
}

/// Like [`load_config`], but falls back to defaults when no file is found.
///
/// An explicitly given path must exist.
pub fn load_config_or_default(config_path: Option<&Path>) -> Result<VisioConfig> {
    match config_path {
        Some(path) => load_config_from_file(path).map(|r| r.config),
        None => match find_config_file() {
            Some(path) => load_config_from_file(&path).map(|r| r.config),
            None => Ok(VisioConfig::default()),
        },
    }
}

pub fn resolve_config(config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .or_else(find_config_file)
        .ok_or_else(|| anyhow!("No configuration file found"))?;

    load_config_from_file(&path)
}

pub fn load_config_from_file(path: &Path) -> Result<ResolvedConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| anyhow!("Unknown config format for: {}", path.display()))?;

    let config = parse_config_content(&content, format)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    Ok(ResolvedConfig {
        config: expand_env_vars(config),
        path: path.to_path_buf(),
        format,
    })
}

fn parse_config_content(content: &str, format: ConfigFormat) -> Result<VisioConfig> {
    match format {
        ConfigFormat::Jsonc => json5::from_str(content).context("Failed to parse JSONC"),
        ConfigFormat::Json => serde_json::from_str(content).context("Failed to parse JSON"),
        ConfigFormat::Yaml => serde_yaml_ng::from_str(content).context("Failed to parse YAML"),
    }
}

const CONFIG_CANDIDATES: &[&str] = &[
    "visio.jsonc",
    "visio.json",
    "visio.yml",
    "visio.yaml",
    ".visio.jsonc",
    ".visio.json",
    ".visio.yml",
    ".visio.yaml",
];

fn global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("visio"))
}

fn candidate_paths() -> impl Iterator<Item = PathBuf> {
    let local = CONFIG_CANDIDATES.iter().map(PathBuf::from);
    let global = global_config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_CANDIDATES.iter().map(move |c| dir.join(c)));
    local.chain(global)
}

fn find_config_file() -> Option<PathBuf> {
    candidate_paths().find(|path| path.exists())
}

pub fn find_all_config_files() -> Vec<PathBuf> {
    candidate_paths().filter(|path| path.exists()).collect()
}

fn expand_env_vars(mut config: VisioConfig) -> VisioConfig {
    let provider = &mut config.provider;
    provider.api_key = provider.api_key.as_deref().map(expand_env_string);
    provider.base_url = provider.base_url.as_deref().map(expand_env_string);
    provider.model = provider.model.as_deref().map(expand_env_string);
    provider.vision_model = provider.vision_model.as_deref().map(expand_env_string);

    let upload = &mut config.upload;
    upload.thumbsnap_api_key = upload.thumbsnap_api_key.as_deref().map(expand_env_string);
    upload.thumbsnap_url = upload.thumbsnap_url.as_deref().map(expand_env_string);
    upload.quax_url = upload.quax_url.as_deref().map(expand_env_string);

    config.storage.path = config.storage.path.as_deref().map(expand_env_string);
    config.telemetry.level = expand_env_string(&config.telemetry.level);
    config
}

fn expand_env_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        if chars.peek() == Some(&'{') {
            chars.next();
            let var_name: String = chars.by_ref().take_while(|&c| c != '}').collect();
            match env::var(&var_name) {
                Ok(value) => result.push_str(&value),
                Err(_) => {
                    result.push_str("${");
                    result.push_str(&var_name);
                    result.push('}');
                }
            }
            continue;
        }

        // $VAR stops at the first character that cannot be part of a name
        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                var_name.push(c);
                chars.next();
            } else {
                break;
            }
        }

        if var_name.is_empty() {
            result.push('$');
        } else if let Ok(value) = env::var(&var_name) {
            result.push_str(&value);
        } else {
            result.push('$');
            result.push_str(&var_name);
        }
    }

    result
}
