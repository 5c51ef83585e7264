//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a commented template if missing (unless SHELVER_CONFIG is set).
//!
//! Notes:
//! - This module only reads/writes the config file; directory validation
//!   happens in `validate`.
//! - Unknown XML fields are a hard error (serde deny_unknown_fields) so
//!   config typos surface before any filesystem mutation.

use anyhow::{Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::paths::{default_config_path, path_has_symlink_ancestor};
use super::types::{
    CategoryRule, Config, ConflictStrategy, LogLevel, NamingRules, ProjectPattern, SafetyMode,
};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    base_path: Option<String>,
    structure: Option<String>,
    default_category: Option<String>,
    default_project: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<XmlCategory>,
    #[serde(rename = "project", default)]
    projects: Vec<XmlProject>,
    naming: Option<XmlNaming>,
    mode: Option<String>,
    conflict_resolution: Option<String>,
    rename_limit: Option<u32>,
    create_backup: Option<bool>,
    backup_path: Option<String>,
    dry_run: Option<bool>,
    preserve_timestamps: Option<bool>,
    /// Whitespace-separated path components to skip while scanning.
    exclude: Option<String>,
    journal: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
}

/// `<category name="code">py js rs</category>`
#[derive(Debug, Deserialize)]
struct XmlCategory {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "$text")]
    extensions: Option<String>,
}

/// `<project name="thesis">thesis dissertation</project>` — document order is
/// preserved, which is what makes "most specific first" configurable.
#[derive(Debug, Deserialize)]
struct XmlProject {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "$text")]
    keywords: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlNaming {
    #[serde(rename = "@template")]
    template: Option<String>,
    #[serde(rename = "@date_format")]
    date_format: Option<String>,
    #[serde(rename = "@lowercase")]
    lowercase: Option<bool>,
    #[serde(rename = "@replace_spaces")]
    replace_spaces: Option<String>,
    #[serde(rename = "@max_length")]
    max_length: Option<usize>,
}

fn split_words(s: &str) -> Vec<String> {
    s.split_whitespace().map(|w| w.to_string()).collect()
}

// Map XmlConfig -> Config, filling unset fields from defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(s) = parsed.base_path.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.base_path = PathBuf::from(trimmed);
        }
    }
    if let Some(s) = parsed.structure.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.structure = trimmed.to_string();
        }
    }
    if let Some(s) = parsed.default_category {
        cfg.default_category = s.trim().to_string();
    }
    if let Some(s) = parsed.default_project {
        cfg.default_project = s.trim().to_string();
    }

    if !parsed.categories.is_empty() {
        cfg.categories = parsed
            .categories
            .into_iter()
            .map(|c| CategoryRule {
                name: c.name,
                extensions: split_words(&c.extensions.unwrap_or_default().to_lowercase()),
            })
            .collect();
    }
    // Patterns replace (not extend) the default empty set; order is kept.
    cfg.projects = parsed
        .projects
        .into_iter()
        .map(|p| ProjectPattern {
            name: p.name,
            keywords: split_words(&p.keywords.unwrap_or_default()),
        })
        .collect();

    if let Some(n) = parsed.naming {
        let defaults = NamingRules::default();
        cfg.naming = NamingRules {
            template: n.template.unwrap_or(defaults.template),
            date_format: n.date_format.unwrap_or(defaults.date_format),
            lowercase: n.lowercase.unwrap_or(defaults.lowercase),
            replace_spaces: n.replace_spaces.filter(|s| !s.is_empty()),
            max_length: n.max_length.unwrap_or(defaults.max_length),
        };
    }

    if let Some(s) = parsed.mode.as_deref() {
        cfg.mode = SafetyMode::parse(s.trim())
            .with_context(|| format!("invalid <mode> in config: '{}'", s.trim()))?;
    }
    if let Some(s) = parsed.conflict_resolution.as_deref() {
        cfg.conflict_strategy = ConflictStrategy::parse(s.trim())
            .with_context(|| format!("invalid <conflict_resolution> in config: '{}'", s.trim()))?;
    }
    if let Some(n) = parsed.rename_limit {
        cfg.rename_limit = n;
    }
    if let Some(b) = parsed.create_backup {
        cfg.create_backup = b;
    }
    if let Some(s) = parsed.backup_path.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.backup_path = PathBuf::from(trimmed);
        }
    }
    if let Some(b) = parsed.dry_run {
        cfg.dry_run = b;
    }
    if let Some(b) = parsed.preserve_timestamps {
        cfg.preserve_timestamps = b;
    }
    if let Some(s) = parsed.exclude.as_deref() {
        cfg.exclude_patterns = split_words(s);
    }
    if let Some(s) = parsed.journal.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.journal_path = PathBuf::from(trimmed);
        }
    }
    if let Some(s) = parsed.log_level.as_deref() {
        if let Some(level) = LogLevel::parse(s.trim()) {
            cfg.log_level = level;
        }
    }
    if let Some(s) = parsed.log_file.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_file = Some(PathBuf::from(trimmed));
        }
    }

    Ok(cfg)
}

/// Load a Config from a specific XML file path (quick_xml).
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed)
}

/// Result of the startup config lookup.
pub enum LoadResult {
    Loaded(Config),
    /// No config existed; a template was written for the user to edit.
    CreatedTemplate(PathBuf),
    /// No config path could be determined; caller falls back to defaults.
    Defaults,
}

/// Load the config from SHELVER_CONFIG or the platform default path,
/// writing a template on first run (only at the default location).
pub fn load_or_init() -> Result<LoadResult> {
    let env_set = env::var_os("SHELVER_CONFIG").is_some();
    let cfg_path = match default_config_path() {
        Ok(p) => p,
        Err(_) => return Ok(LoadResult::Defaults),
    };

    if !cfg_path.exists() {
        if env_set {
            anyhow::bail!(
                "SHELVER_CONFIG points at '{}' but no file exists there",
                cfg_path.display()
            );
        }
        create_template_config(&cfg_path)?;
        return Ok(LoadResult::CreatedTemplate(cfg_path));
    }

    let cfg = load_config_from_xml_path(&cfg_path)?;
    Ok(LoadResult::Loaded(cfg))
}

/// Create default template config file and parent directory (best-effort
/// permissions). Refuses symlinked ancestors.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        anyhow::bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }

    fs::write(path, template_contents())
        .with_context(|| format!("write template config '{}'", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }

    info!("Created template config at {}", path.display());
    Ok(())
}

fn template_contents() -> String {
    let defaults = Config::default();
    let mut category_lines = String::new();
    for rule in &defaults.categories {
        category_lines.push_str(&format!(
            "  <category name=\"{}\">{}</category>\n",
            rule.name,
            rule.extensions.join(" ")
        ));
    }
    format!(
        "<!--\n  shelver configuration (XML)\n\n  Fields:\n    base_path            -> root of the organized layout\n    structure            -> destination template; placeholders: {{project}} {{category}}\n                            {{year}} {{month}} {{day}} {{filename}} {{original_name}} {{extension}}\n    category             -> repeated; name attribute + whitespace-separated extensions\n    project              -> repeated, ORDER MATTERS (first match wins);\n                            name attribute + whitespace-separated keywords\n    naming               -> filename template ({{original_name}} {{date}} {{year}} {{month}} {{day}}\n                            {{project}} {{category}}), date_format, lowercase,\n                            replace_spaces, max_length\n    mode                 -> copy | move\n    conflict_resolution  -> skip | rename | prompt | keep_newest | keep_oldest | overwrite\n    rename_limit         -> max numeric suffixes probed before giving up\n    create_backup        -> back up a destination before overwriting it\n    dry_run              -> default when the dry-run flag is not passed\n    exclude              -> whitespace-separated path components skipped by the scanner\n    journal              -> transaction journal file (JSON lines)\n\n  Notes:\n    - CLI flags override XML values.\n-->\n<config>\n  <base_path>{}</base_path>\n  <structure>{}</structure>\n  <default_category>{}</default_category>\n  <default_project>{}</default_project>\n{}  <naming template=\"{{original_name}}\" date_format=\"%Y%m%d\" lowercase=\"false\" max_length=\"255\"/>\n  <mode>copy</mode>\n  <conflict_resolution>rename</conflict_resolution>\n  <rename_limit>{}</rename_limit>\n  <create_backup>true</create_backup>\n  <backup_path>{}</backup_path>\n  <dry_run>false</dry_run>\n  <preserve_timestamps>true</preserve_timestamps>\n  <exclude>{}</exclude>\n  <journal>{}</journal>\n  <log_level>normal</log_level>\n</config>\n",
        defaults.base_path.display(),
        defaults.structure,
        defaults.default_category,
        defaults.default_project,
        category_lines,
        defaults.rename_limit,
        defaults.backup_path.display(),
        defaults.exclude_patterns.join(" "),
        defaults.journal_path.display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn template_parses_back_into_defaults() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.xml");
        fs::write(&p, template_contents()).unwrap();
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.structure, Config::default().structure);
        assert_eq!(cfg.mode, SafetyMode::Copy);
        assert_eq!(cfg.conflict_strategy, ConflictStrategy::Rename);
        assert!(cfg.create_backup);
        assert!(cfg.categories.iter().any(|c| c.name == "documents"));
    }

    #[test]
    fn ordered_projects_survive_parsing() {
        let xml = r#"<config>
  <project name="thesis">thesis dissertation</project>
  <project name="work">report invoice</project>
</config>"#;
        let td = tempdir().unwrap();
        let p = td.path().join("config.xml");
        fs::write(&p, xml).unwrap();
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.projects.len(), 2);
        assert_eq!(cfg.projects[0].name, "thesis");
        assert_eq!(cfg.projects[1].keywords, vec!["report", "invoice"]);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let xml = "<config><basepath>/tmp</basepath></config>";
        let td = tempdir().unwrap();
        let p = td.path().join("config.xml");
        fs::write(&p, xml).unwrap();
        assert!(load_config_from_xml_path(&p).is_err());
    }

    #[test]
    fn bad_strategy_is_rejected() {
        let xml = "<config><conflict_resolution>maybe</conflict_resolution></config>";
        let td = tempdir().unwrap();
        let p = td.path().join("config.xml");
        fs::write(&p, xml).unwrap();
        assert!(load_config_from_xml_path(&p).is_err());
    }
}
