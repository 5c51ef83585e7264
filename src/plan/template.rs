//! Path and filename template rendering.
//! Pure string substitution with no filesystem access. Unknown placeholders
//! are rejected (not silently dropped) so configuration typos surface before
//! any plan is executed.

use crate::config::NamingRules;
use crate::errors::OrganizerError;
use crate::model::FileRecord;
use chrono::Datelike;

/// Expand `{key}` placeholders from `vars`. Errors on a placeholder missing
/// from the set and on an unterminated `{`.
fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, OrganizerError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '{' {
            out.push(ch);
            continue;
        }
        let mut key = String::new();
        let mut closed = false;
        for inner in chars.by_ref() {
            if inner == '}' {
                closed = true;
                break;
            }
            key.push(inner);
        }
        if !closed {
            return Err(OrganizerError::Template {
                template: template.to_string(),
                placeholder: key,
            });
        }
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => {
                return Err(OrganizerError::Template {
                    template: template.to_string(),
                    placeholder: key,
                });
            }
        }
    }
    Ok(out)
}

/// Render the final filename from the naming rules, then sanitize:
/// optional lowercasing, optional space replacement, and hard truncation of
/// the stem (extension preserved).
pub fn render_filename(
    naming: &NamingRules,
    record: &FileRecord,
    project: &str,
    category: &str,
) -> Result<String, OrganizerError> {
    let stem = record.stem();
    let extension = record.extension();
    let date = record.modified.format(&naming.date_format).to_string();
    let year = record.modified.year().to_string();
    let month = format!("{:02}", record.modified.month());
    let day = format!("{:02}", record.modified.day());

    let vars: &[(&str, &str)] = &[
        ("original_name", &stem),
        ("date", &date),
        ("year", &year),
        ("month", &month),
        ("day", &day),
        ("project", project),
        ("category", category),
    ];
    let mut name = render(&naming.template, vars)?;

    if naming.lowercase {
        name = name.to_lowercase();
    }
    if let Some(rep) = &naming.replace_spaces {
        name = name.replace(' ', rep);
    }

    // Truncate the stem only; the extension always survives.
    let stem_max = naming.max_length.saturating_sub(extension.len());
    if name.chars().count() > stem_max {
        name = name.chars().take(stem_max).collect();
    }
    name.push_str(&extension);
    Ok(name)
}

/// Render the destination structure template to a relative path string.
/// `{date}` is deliberately absent here: it is a naming-template-only
/// placeholder and using it in the structure is a configuration typo.
pub fn render_structure(
    structure: &str,
    record: &FileRecord,
    project: &str,
    category: &str,
    filename: &str,
) -> Result<String, OrganizerError> {
    let original_name = record.filename();
    let extension_bare = record.extension().trim_start_matches('.').to_string();
    let year = record.modified.year().to_string();
    let month = format!("{:02}", record.modified.month());
    let day = format!("{:02}", record.modified.day());

    let vars: &[(&str, &str)] = &[
        ("project", project),
        ("category", category),
        ("year", &year),
        ("month", &month),
        ("day", &day),
        ("filename", filename),
        ("original_name", &original_name),
        ("extension", &extension_bare),
    ];
    render(structure, vars)
}
