//! Repository and branch name validation.
//!
//! Branch names appear as a single URL path segment, so on top of the
//! git-style rules they must not contain `/`:
//! - Must be non-empty
//! - Must not contain whitespace, `/`, `~`, `^`, `:`, `?`, `*`, `[`, `\`, `%`, `#`
//! - Must not contain `..` (double dot) or `@{`
//! - Must not start or end with `.`
//! - Must not end with `.lock`
//!
//! Repository names are DNS-label-like: at most 63 characters of lowercase
//! ASCII letters, digits and `-`, starting with a letter or digit.

use crate::error::{CatalogError, CatalogResult};

/// Characters that are forbidden anywhere in a branch name.
const FORBIDDEN_CHARS: &[char] = &[
    ' ', '\t', '\n', '\r', '/', '~', '^', ':', '?', '*', '[', '\\', '%', '#',
];

/// Validate a branch name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use vos_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature-auth").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("feature/auth").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> CatalogResult<()> {
    let invalid = |reason: String| CatalogError::InvalidBranchName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("branch name must not be empty".into()));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(format!("contains forbidden character: {ch:?}")));
        }
    }

    if name.chars().any(char::is_control) {
        return Err(invalid("contains control character".into()));
    }

    if name.contains("..") {
        return Err(invalid("must not contain '..'".into()));
    }

    // Reflog syntax.
    if name.contains("@{") {
        return Err(invalid("must not contain '@{'".into()));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid("must not start or end with '.'".into()));
    }

    if name.ends_with(".lock") {
        return Err(invalid("must not end with '.lock'".into()));
    }

    Ok(())
}

/// Validate a repository name, returning `Ok(())` if valid.
pub fn validate_repository_name(name: &str) -> CatalogResult<()> {
    let invalid = |reason: &str| CatalogError::InvalidRepositoryName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if !(1..=63).contains(&name.len()) {
        return Err(invalid("must be 1 to 63 characters long"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("may only contain lowercase letters, digits and '-'"));
    }
    if name.starts_with('-') {
        return Err(invalid("must start with a letter or digit"));
    }
    Ok(())
}

/// Validate a storage namespace URI such as `s3://bucket/prefix` or
/// `local:///var/lib/vos`.
pub fn validate_storage_namespace(namespace: &str) -> CatalogResult<()> {
    let Some((scheme, rest)) = namespace.split_once("://") else {
        return Err(CatalogError::InvalidStorageNamespace(format!(
            "{namespace}: missing scheme"
        )));
    };
    if scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '+')
    {
        return Err(CatalogError::InvalidStorageNamespace(format!(
            "{namespace}: invalid scheme"
        )));
    }
    if rest.trim_matches('/').is_empty() {
        return Err(CatalogError::InvalidStorageNamespace(format!(
            "{namespace}: missing location"
        )));
    }
    Ok(())
}
