//! Core configuration types.
//! - Config holds the full organization/safety snapshot with sensible defaults.
//! - Closed enums for safety mode and conflict strategy keep strategy
//!   dispatch exhaustiveness-checked at compile time.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::paths;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Whether executed plans duplicate or relocate their sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SafetyMode {
    #[default]
    Copy,
    Move,
}

impl SafetyMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "copy" => Some(SafetyMode::Copy),
            "move" => Some(SafetyMode::Move),
            _ => None,
        }
    }
}

impl fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SafetyMode::Copy => "copy",
            SafetyMode::Move => "move",
        })
    }
}

impl FromStr for SafetyMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid mode: '{s}' (expected copy|move)"))
    }
}

/// Closed enumeration of destination-collision strategies. One handler per
/// tag lives in the conflict resolver; adding a variant is a compile-checked
/// exhaustiveness change there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictStrategy {
    Skip,
    #[default]
    Rename,
    Prompt,
    KeepNewest,
    KeepOldest,
    Overwrite,
}

impl ConflictStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Some(ConflictStrategy::Skip),
            "rename" => Some(ConflictStrategy::Rename),
            "prompt" => Some(ConflictStrategy::Prompt),
            "keep_newest" => Some(ConflictStrategy::KeepNewest),
            "keep_oldest" => Some(ConflictStrategy::KeepOldest),
            "overwrite" => Some(ConflictStrategy::Overwrite),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictStrategy::Skip => "skip",
            ConflictStrategy::Rename => "rename",
            ConflictStrategy::Prompt => "prompt",
            ConflictStrategy::KeepNewest => "keep_newest",
            ConflictStrategy::KeepOldest => "keep_oldest",
            ConflictStrategy::Overwrite => "overwrite",
        })
    }
}

impl FromStr for ConflictStrategy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("invalid conflict strategy: '{s}' (expected skip|rename|prompt|keep_newest|keep_oldest|overwrite)")
        })
    }
}

/// One category with its extension set. First matching category in table
/// order wins.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub name: String,
    /// Extensions without the leading dot, lowercase.
    pub extensions: Vec<String>,
}

/// One project-detection pattern. Patterns are evaluated in definition order,
/// first match wins; configuration authors put the most specific first.
#[derive(Debug, Clone)]
pub struct ProjectPattern {
    pub name: String,
    pub keywords: Vec<String>,
}

/// File-naming rules applied before the destination template sees {filename}.
#[derive(Debug, Clone)]
pub struct NamingRules {
    pub template: String,
    pub date_format: String,
    pub lowercase: bool,
    /// Replacement for spaces in the rendered stem; None keeps spaces.
    pub replace_spaces: Option<String>,
    /// Hard cap applied to the stem only; the extension is preserved.
    pub max_length: usize,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            template: "{original_name}".to_string(),
            date_format: "%Y%m%d".to_string(),
            lowercase: false,
            replace_spaces: None,
            max_length: 255,
        }
    }
}

/// Immutable configuration snapshot passed explicitly into each component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the normalized destination layout.
    pub base_path: PathBuf,
    /// Destination template, e.g. "{project}/{category}/{year}/{filename}".
    pub structure: String,
    /// Ordered category table.
    pub categories: Vec<CategoryRule>,
    pub default_category: String,
    /// Ordered project patterns.
    pub projects: Vec<ProjectPattern>,
    pub default_project: String,
    pub naming: NamingRules,
    pub mode: SafetyMode,
    pub conflict_strategy: ConflictStrategy,
    /// Upper bound on rename suffix probing before a conflict is reported.
    pub rename_limit: u32,
    pub create_backup: bool,
    pub backup_path: PathBuf,
    /// Default used when the CLI does not force dry-run.
    pub dry_run: bool,
    pub preserve_timestamps: bool,
    /// Path components excluded by the local scanner.
    pub exclude_patterns: Vec<String>,
    /// Transaction journal location.
    pub journal_path: PathBuf,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

/// Default category table. Mirrors the template config written on first run.
pub fn default_categories() -> Vec<CategoryRule> {
    let table: &[(&str, &[&str])] = &[
        (
            "code",
            &[
                "py", "js", "java", "cpp", "h", "c", "cs", "go", "rs", "rb", "php", "swift", "kt",
                "ts", "jsx", "tsx",
            ],
        ),
        (
            "documents",
            &["pdf", "docx", "doc", "txt", "md", "rtf", "odt", "tex", "pages"],
        ),
        (
            "images",
            &["jpg", "jpeg", "png", "gif", "svg", "bmp", "webp", "ico", "tiff", "psd", "ai"],
        ),
        ("audio", &["mp3", "wav", "flac", "ogg", "m4a", "aac", "wma"]),
        (
            "video",
            &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "mpeg"],
        ),
        ("archives", &["zip", "tar", "gz", "rar", "7z", "bz2", "xz"]),
        (
            "data",
            &["json", "csv", "xml", "yaml", "yml", "sql", "db", "sqlite"],
        ),
        ("spreadsheets", &["xlsx", "xls", "ods", "numbers"]),
        ("presentations", &["pptx", "ppt", "odp", "key"]),
    ];
    table
        .iter()
        .map(|(name, exts)| CategoryRule {
            name: (*name).to_string(),
            extensions: exts.iter().map(|e| (*e).to_string()).collect(),
        })
        .collect()
}

/// Default scanner exclusions.
pub fn default_excludes() -> Vec<String> {
    [
        "node_modules",
        ".git",
        "__pycache__",
        ".venv",
        "venv",
        ".DS_Store",
        "Thumbs.db",
        ".idea",
        ".vscode",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

pub const STRUCTURE_DEFAULT: &str = "{project}/{category}/{year}/{filename}";
pub const DEFAULT_CATEGORY: &str = "other";
pub const DEFAULT_PROJECT: &str = "Uncategorized";
pub const RENAME_LIMIT_DEFAULT: u32 = 1000;

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: paths::default_base_path(),
            structure: STRUCTURE_DEFAULT.to_string(),
            categories: default_categories(),
            default_category: DEFAULT_CATEGORY.to_string(),
            projects: Vec::new(),
            default_project: DEFAULT_PROJECT.to_string(),
            naming: NamingRules::default(),
            mode: SafetyMode::Copy,
            conflict_strategy: ConflictStrategy::Rename,
            rename_limit: RENAME_LIMIT_DEFAULT,
            create_backup: true,
            backup_path: paths::default_backup_path(),
            dry_run: false,
            preserve_timestamps: true,
            exclude_patterns: default_excludes(),
            journal_path: paths::default_journal_path(),
            log_level: LogLevel::Normal,
            log_file: paths::default_log_path().ok(),
        }
    }
}

impl Config {
    /// Construct a Config with an explicit destination base; other fields use
    /// defaults. Test and library callers use this to avoid touching the
    /// user's real config locations.
    pub fn with_base(base_path: impl Into<PathBuf>) -> Self {
        let base = base_path.into();
        Self {
            backup_path: base.join(".shelver").join("backups"),
            journal_path: base.join(".shelver").join("journal.jsonl"),
            base_path: base,
            log_file: None,
            ..Default::default()
        }
    }
}
