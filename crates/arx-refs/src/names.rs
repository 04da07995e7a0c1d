//! Name rules for branches, tags, remotes and full ref paths.
//!
//! Ref names become file paths under the repository directory, so the rules
//! keep them portable and unambiguous:
//!
//! - non-empty, no whitespace or any of `~ ^ : ? * [ \`
//! - no `..` and no `@{`
//! - no leading or trailing `.` or `/`, no `//`
//! - no component starting with `.`, and no `.lock` suffix

use crate::error::{RefError, Result};

/// Prefix of branch refs.
pub const HEADS: &str = "refs/heads/";
/// Prefix of tag refs.
pub const TAGS: &str = "refs/tags/";
/// Prefix of remote-tracking refs.
pub const REMOTES: &str = "refs/remotes/";
/// The HEAD ref.
pub const HEAD: &str = "HEAD";

const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn check_components(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "must not be empty"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(name, format!("contains forbidden character {ch:?}")));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.starts_with(['.', '/']) || name.ends_with(['.', '/']) {
        return Err(invalid(name, "must not start or end with '.' or '/'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "must not contain '//'"));
        }
        if component.starts_with('.') {
            return Err(invalid(name, format!("component {component:?} starts with '.'")));
        }
    }
    Ok(())
}

/// Validate a short branch name such as `main` or `feature/hvac-retrofit`.
pub fn validate_branch_name(name: &str) -> Result<()> {
    check_components(name)
}

/// Validate a short tag name. Same rules as branch names.
pub fn validate_tag_name(name: &str) -> Result<()> {
    check_components(name)
}

/// Validate a remote name. A single component, no slashes.
pub fn validate_remote_name(name: &str) -> Result<()> {
    check_components(name)?;
    if name.contains('/') {
        return Err(invalid(name, "remote name must not contain '/'"));
    }
    Ok(())
}

/// Validate a full ref path: `HEAD` or `refs/<namespace>/<name>`.
pub fn validate_ref_path(path: &str) -> Result<()> {
    if path == HEAD {
        return Ok(());
    }
    let Some(rest) = path.strip_prefix("refs/") else {
        return Err(invalid(path, "must be HEAD or start with 'refs/'"));
    };
    check_components(rest).map_err(|_| invalid(path, "malformed ref path"))?;
    if !rest.contains('/') {
        return Err(invalid(path, "missing name after namespace"));
    }
    Ok(())
}

/// `refs/heads/<name>`.
pub fn branch_ref(name: &str) -> String {
    format!("{HEADS}{name}")
}

/// `refs/tags/<name>`.
pub fn tag_ref(name: &str) -> String {
    format!("{TAGS}{name}")
}

/// `refs/remotes/<remote>/<branch>`.
pub fn remote_ref(remote: &str, branch: &str) -> String {
    format!("{REMOTES}{remote}/{branch}")
}
