//! Extension-based categorization.
//! Pure lookup against the configured category table; the only "failure mode"
//! is falling back to the default label.

use std::path::Path;

use crate::config::{CategoryRule, Config};

pub struct Categorizer {
    rules: Vec<CategoryRule>,
    default: String,
}

impl Categorizer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            rules: cfg.categories.clone(),
            default: cfg.default_category.clone(),
        }
    }

    /// Map a path's extension (case-insensitive) to a category label.
    /// First category in table order whose extension set contains it wins.
    pub fn categorize(&self, path: &Path) -> String {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e.to_ascii_lowercase(),
            None => return self.default.clone(),
        };
        for rule in &self.rules {
            if rule.extensions.iter().any(|e| *e == ext) {
                return rule.name.clone();
            }
        }
        self.default.clone()
    }
}
