//! Storage key generation
//!
//! Keys are derived from a folder template, the owning entity and the
//! resolved object name: `{folder}/{name}/{segment...}`, joined with forward
//! slashes on every OS. Folder templates may contain `:identifier`
//! placeholders substituted with normalized entity field values; a missing
//! value is an error rather than a malformed path.
//!
//! `normalize_file_name` is the sole defense against path traversal and
//! unsafe storage keys. It must be applied to every user-supplied segment
//! before concatenation; generated identifiers (UUIDs) are already safe by
//! construction and are not normalized.

use std::sync::LazyLock;

use affix_core::{AttachmentError, AttachmentHost, AttachmentResult};
use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z0-9_]+)").expect("placeholder pattern"));

/// Normalize a user-supplied file name or path segment: every character
/// outside `[A-Za-z0-9.-]` becomes `_`, the result is percent-encoded and
/// lowercased.
pub fn normalize_file_name(file_name: &str) -> String {
    let replaced: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    urlencoding::encode(&replaced).to_lowercase()
}

/// Build the storage key for `name` under `folder_template`, substituting
/// `:identifier` placeholders with stringified field values read from
/// `entity`. Fails with `MissingPlaceholderValue` when a referenced field is
/// absent; fields computed only after the first flush (auto-generated
/// primary keys) must raise here instead of producing a malformed path.
pub fn generate_key(
    folder_template: &str,
    entity: &dyn AttachmentHost,
    name: &str,
    segments: &[&str],
) -> AttachmentResult<String> {
    let mut missing: Option<AttachmentError> = None;
    let folder = PLACEHOLDER.replace_all(folder_template, |caps: &Captures| {
        let field = &caps[1];
        match entity.placeholder_value(field) {
            Some(value) => normalize_file_name(&value),
            None => {
                if missing.is_none() {
                    missing = Some(AttachmentError::MissingPlaceholderValue {
                        field: field.to_string(),
                        entity: entity.entity_name().to_string(),
                    });
                }
                String::new()
            }
        }
    });
    if let Some(err) = missing {
        return Err(err);
    }

    let mut parts: Vec<&str> = Vec::with_capacity(2 + segments.len());
    if !folder.is_empty() {
        parts.push(&folder);
    }
    if !name.is_empty() {
        parts.push(name);
    }
    parts.extend(segments.iter().filter(|s| !s.is_empty()));
    Ok(parts.join("/"))
}
