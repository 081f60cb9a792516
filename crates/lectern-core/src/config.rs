//! Configuration and data directory management.
//!
//! Values come from an optional `lectern.toml`, then environment overrides,
//! then the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "lectern.toml";

/// Keywords admitted by the default topic gate.
pub const DEFAULT_GATE_KEYWORDS: &[&str] = &[
    "bamenda",
    "university of bamenda",
    "uba",
    "uniba",
    "prof.",
    "dr.",
    "campus",
    "faculty",
    "department",
    "admission",
    "courses",
    "tuition",
    "fees",
    "library",
    "research",
    "students",
    "staff",
    "programs",
    "scholarships",
    "events",
];

/// Paths to all Lectern data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// History database directory (`data/history/`).
    pub history_dir: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
    /// Daily journal entries (`data/journal.txt`).
    pub journal_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            history_dir: root.join("history"),
            llm_config_file: root.join("llm-config.json"),
            journal_file: root.join("journal.txt"),
            root,
        };
        std::fs::create_dir_all(&paths.history_dir)?;
        Ok(paths)
    }
}

/// Origin kind of an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Web,
    Encyclopedia,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Web => write!(f, "web"),
            Self::Encyclopedia => write!(f, "encyclopedia"),
        }
    }
}

/// One configured corpus source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub kind: SourceKind,
    /// Path, URL, or search query depending on `kind`.
    pub locator: String,
}

impl SourceSpec {
    pub fn new(kind: SourceKind, locator: impl Into<String>) -> Self {
        Self {
            kind,
            locator: locator.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Per-request deadline for web and encyclopedia fetches.
    pub timeout_secs: u64,
    /// Extra attempts after a failed fetch. 0 means a single attempt.
    pub retries: u32,
    /// Articles requested per encyclopedia query.
    pub load_max_docs: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retries: 0,
            load_max_docs: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub keywords: Vec<String>,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_GATE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// User-facing wording for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub domain_name: String,
    pub rejection_message: String,
    pub no_context_message: String,
    /// Phrase the model is told to emit when the context has no answer.
    pub unknown_phrase: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            domain_name: "the University of Bamenda".into(),
            rejection_message: "I only answer questions about the University of Bamenda.".into(),
            no_context_message: "I don't know from the available documents.".into(),
            unknown_phrase: "I don't know from the available documents.".into(),
        }
    }
}

fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new(SourceKind::File, "./data/university_of_bamenda.pdf"),
        SourceSpec::new(SourceKind::Web, "https://uniba.cm/"),
        SourceSpec::new(SourceKind::Encyclopedia, "University of Bamenda About"),
        SourceSpec::new(SourceKind::Encyclopedia, "University of Bamenda History"),
        SourceSpec::new(SourceKind::Encyclopedia, "University of Bamenda"),
    ]
}

/// Shape of `lectern.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    port: Option<u16>,
    #[serde(default)]
    chunking: Option<ChunkingSettings>,
    #[serde(default)]
    retrieval: Option<RetrievalSettings>,
    #[serde(default)]
    loader: Option<LoaderSettings>,
    #[serde(default)]
    gate: Option<GateSettings>,
    #[serde(default)]
    assistant: Option<AssistantSettings>,
    #[serde(default)]
    sources: Option<Vec<SourceSpec>>,
}

/// Top-level Lectern configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LecternConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub loader: LoaderSettings,
    pub gate: GateSettings,
    pub assistant: AssistantSettings,
    pub sources: Vec<SourceSpec>,
}

impl LecternConfig {
    /// Load configuration.
    ///
    /// `path` overrides the config file location; otherwise `LECTERN_CONFIG`
    /// or `./lectern.toml` is used. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("LECTERN_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        let file = match std::fs::read_to_string(&path) {
            Ok(raw) => {
                info!("Loading configuration from {}", path.display());
                toml::from_str::<FileConfig>(&raw).map_err(|e| {
                    Error::Config(format!("invalid {}: {}", path.display(), e))
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                FileConfig::default()
            }
            Err(e) => return Err(Error::Io(e)),
        };

        Self::from_parts(file)
    }

    /// Defaults rooted at `data_dir`, ignoring files and environment.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            port: 3003,
            data_paths: DataPaths::new(data_dir)?,
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalSettings::default(),
            loader: LoaderSettings::default(),
            gate: GateSettings::default(),
            assistant: AssistantSettings::default(),
            sources: default_sources(),
        })
    }

    fn from_parts(file: FileConfig) -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .or(file.port)
            .unwrap_or(3003);

        let data_dir = std::env::var("LECTERN_DATA_DIR")
            .map(PathBuf::from)
            .ok()
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from("data"));

        let config = Self {
            port,
            data_paths: DataPaths::new(data_dir)?,
            chunking: file.chunking.unwrap_or_default(),
            retrieval: file.retrieval.unwrap_or_default(),
            loader: file.loader.unwrap_or_default(),
            gate: file.gate.unwrap_or_default(),
            assistant: file.assistant.unwrap_or_default(),
            sources: file.sources.unwrap_or_else(default_sources),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".into()));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("top_k must be positive".into()));
        }
        if self.loader.load_max_docs == 0 {
            return Err(Error::Config("load_max_docs must be positive".into()));
        }
        Ok(())
    }
}

/// Read a required API key from the environment.
pub fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{} is not set", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_config_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let raw = format!(
            r#"
data_dir = "{}"

[chunking]
chunk_size = 500
overlap = 50

[gate]
keywords = ["rust", "cargo"]

[[sources]]
kind = "web"
locator = "https://example.com"
"#,
            dir.path().join("data").display()
        );
        let file: FileConfig = toml::from_str(&raw).unwrap();
        let config = LecternConfig::from_parts(file).unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap, 50);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.gate.keywords, vec!["rust", "cargo"]);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].kind, SourceKind::Web);
        assert!(config.data_paths.history_dir.exists());
    }

    #[test]
    fn test_defaults_match_original_corpus() {
        let sources = default_sources();
        assert_eq!(sources.len(), 5);
        assert_eq!(sources[0].kind, SourceKind::File);
        assert!(GateSettings::default()
            .keywords
            .iter()
            .any(|k| k == "tuition"));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let dir = TempDir::new().unwrap();
        let file = FileConfig {
            data_dir: Some(dir.path().to_path_buf()),
            chunking: Some(ChunkingSettings {
                chunk_size: 100,
                overlap: 100,
            }),
            ..Default::default()
        };
        let result = LecternConfig::from_parts(file);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_encyclopedia_docs_is_rejected() {
        let dir = TempDir::new().unwrap();
        let raw = format!(
            "data_dir = \"{}\"\n\n[loader]\nload_max_docs = 0\n",
            dir.path().display()
        );
        let file: FileConfig = toml::from_str(&raw).unwrap();
        let err = LecternConfig::from_parts(file).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("load_max_docs")));
    }

    #[test]
    fn test_with_data_dir_creates_layout() {
        let dir = TempDir::new().unwrap();
        let config = LecternConfig::with_data_dir(dir.path().join("d")).unwrap();
        assert!(config.data_paths.history_dir.is_dir());
        assert_eq!(config.data_paths.llm_config_file, dir.path().join("d/llm-config.json"));
        assert_eq!(config.data_paths.journal_file, dir.path().join("d/journal.txt"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_require_env_missing() {
        let result = require_env("LECTERN_TEST_SURELY_UNSET_KEY");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
