//! Project detection.
//! Ordered keyword patterns evaluated first-match-wins over the record's path
//! string and source hints (GitHub repo name, parent folder). Order is
//! significant: configuration authors put the most specific pattern first.

use crate::config::{Config, ProjectPattern};
use crate::model::FileRecord;

pub struct ProjectDetector {
    patterns: Vec<ProjectPattern>,
    default: String,
}

impl ProjectDetector {
    pub fn new(cfg: &Config) -> Self {
        Self {
            patterns: cfg.projects.clone(),
            default: cfg.default_project.clone(),
        }
    }

    /// Assign a project label to a record. A pattern matches if any of its
    /// keywords occurs (case-insensitive substring) in the path string or in
    /// the source hints.
    pub fn detect(&self, record: &FileRecord) -> String {
        let mut haystack = record.source_path.to_string_lossy().to_lowercase();
        if let Some(repo) = &record.repo {
            haystack.push(' ');
            haystack.push_str(&repo.to_lowercase());
        }
        if let Some(folder) = &record.parent_folder {
            haystack.push(' ');
            haystack.push_str(&folder.to_lowercase());
        }

        for pattern in &self.patterns {
            if pattern
                .keywords
                .iter()
                .any(|kw| haystack.contains(&kw.to_lowercase()))
            {
                return pattern.name.clone();
            }
        }
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceKind;
    use chrono::Utc;
    use std::path::PathBuf;

    fn record(path: &str, repo: Option<&str>) -> FileRecord {
        FileRecord {
            source_path: PathBuf::from(path),
            size: 1,
            modified: Utc::now(),
            source: SourceKind::Local,
            repo: repo.map(|s| s.to_string()),
            parent_folder: PathBuf::from(path)
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned()),
            materialized: true,
        }
    }

    fn detector(patterns: &[(&str, &[&str])]) -> ProjectDetector {
        let mut cfg = Config::with_base("/tmp");
        cfg.projects = patterns
            .iter()
            .map(|(name, kws)| ProjectPattern {
                name: (*name).to_string(),
                keywords: kws.iter().map(|k| (*k).to_string()).collect(),
            })
            .collect();
        ProjectDetector::new(&cfg)
    }

    #[test]
    fn keyword_matches_path_case_insensitively() {
        let d = detector(&[("Thesis", &["thesis", "dissertation"])]);
        assert_eq!(d.detect(&record("/docs/My-THESIS-draft.pdf", None)), "Thesis");
    }

    #[test]
    fn first_pattern_wins_on_overlap() {
        let d = detector(&[("Specific", &["annual-report"]), ("General", &["report"])]);
        assert_eq!(d.detect(&record("/x/annual-report.pdf", None)), "Specific");
        assert_eq!(d.detect(&record("/x/weekly-report.pdf", None)), "General");
    }

    #[test]
    fn repo_hint_is_searched() {
        let d = detector(&[("Webapp", &["frontend"])]);
        assert_eq!(
            d.detect(&record("/clones/src/index.ts", Some("acme-frontend"))),
            "Webapp"
        );
    }

    #[test]
    fn no_match_yields_default() {
        let d = detector(&[("Thesis", &["thesis"])]);
        assert_eq!(d.detect(&record("/x/notes.txt", None)), "Uncategorized");
    }
}
