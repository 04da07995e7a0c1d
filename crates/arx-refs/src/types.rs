//! Ref values and reflog entries.

use std::fmt;

use arx_types::ObjectId;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RefError, Result};

const SYMBOLIC_PREFIX: &str = "ref: ";

/// What a ref file holds: an object id or an indirection to another ref.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "target")]
pub enum RefValue {
    Direct(ObjectId),
    Symbolic(String),
}

impl RefValue {
    /// Parse the stored form: 64 hex characters or `ref: <path>`.
    pub fn parse(name: &str, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Some(target) = raw.strip_prefix(SYMBOLIC_PREFIX) {
            let target = target.trim();
            if target.is_empty() {
                return Err(RefError::CorruptRef {
                    name: name.to_string(),
                    value: raw.to_string(),
                });
            }
            return Ok(RefValue::Symbolic(target.to_string()));
        }
        ObjectId::from_hex(raw)
            .map(RefValue::Direct)
            .map_err(|_| RefError::CorruptRef {
                name: name.to_string(),
                value: raw.to_string(),
            })
    }

    /// The object id, if this is a direct value.
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            RefValue::Direct(id) => Some(*id),
            RefValue::Symbolic(_) => None,
        }
    }

    /// The target path, if this is a symbolic value.
    pub fn as_symbolic(&self) -> Option<&str> {
        match self {
            RefValue::Direct(_) => None,
            RefValue::Symbolic(target) => Some(target),
        }
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, RefValue::Symbolic(_))
    }

    /// Whitespace-free form used inside reflog lines.
    fn log_token(value: Option<&RefValue>) -> String {
        match value {
            None => ObjectId::null().to_hex(),
            Some(RefValue::Direct(id)) => id.to_hex(),
            Some(RefValue::Symbolic(target)) => format!("ref:{target}"),
        }
    }

    fn from_log_token(token: &str) -> Option<Option<RefValue>> {
        if let Some(target) = token.strip_prefix("ref:") {
            return Some(Some(RefValue::Symbolic(target.to_string())));
        }
        let id = ObjectId::from_hex(token).ok()?;
        Some(if id.is_null() { None } else { Some(RefValue::Direct(id)) })
    }
}

impl fmt::Display for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefValue::Direct(id) => write!(f, "{id}"),
            RefValue::Symbolic(target) => write!(f, "{SYMBOLIC_PREFIX}{target}"),
        }
    }
}

impl From<ObjectId> for RefValue {
    fn from(id: ObjectId) -> Self {
        RefValue::Direct(id)
    }
}

/// One line of a ref's history: `old new timestamp message`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflogEntry {
    pub old: Option<RefValue>,
    pub new: Option<RefValue>,
    /// Seconds since the UNIX epoch.
    pub timestamp: i64,
    pub message: String,
}

impl ReflogEntry {
    pub fn new(
        old: Option<RefValue>,
        new: Option<RefValue>,
        timestamp: i64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            old,
            new,
            timestamp,
            message: message.into(),
        }
    }

    /// Encode as a single log line (no trailing newline).
    pub fn to_line(&self) -> String {
        let message = self.message.replace(['\n', '\r'], " ");
        format!(
            "{} {} {} {}",
            RefValue::log_token(self.old.as_ref()),
            RefValue::log_token(self.new.as_ref()),
            self.timestamp,
            message
        )
    }

    /// Decode a log line. Returns `None` for malformed lines.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(4, ' ');
        let old = RefValue::from_log_token(parts.next()?)?;
        let new = RefValue::from_log_token(parts.next()?)?;
        let timestamp = parts.next()?.parse().ok()?;
        let message = parts.next().unwrap_or_default().to_string();
        Some(Self {
            old,
            new,
            timestamp,
            message,
        })
    }

    /// The entry's time as a UTC instant.
    pub fn time(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_direct_and_symbolic() {
        let id = ObjectId::from_bytes(b"x");
        assert_eq!(
            RefValue::parse("HEAD", &format!("{id}\n")).unwrap(),
            RefValue::Direct(id)
        );
        assert_eq!(
            RefValue::parse("HEAD", "ref: refs/heads/main\n").unwrap(),
            RefValue::Symbolic("refs/heads/main".into())
        );
        assert!(matches!(
            RefValue::parse("HEAD", "garbage"),
            Err(RefError::CorruptRef { .. })
        ));
        assert!(RefValue::parse("HEAD", "ref: ").is_err());
    }

    #[test]
    fn display_is_stored_form() {
        let v = RefValue::Symbolic("refs/heads/main".into());
        assert_eq!(v.to_string(), "ref: refs/heads/main");
        assert_eq!(RefValue::parse("HEAD", &v.to_string()).unwrap(), v);
    }

    #[test]
    fn reflog_line_format() {
        let id = ObjectId::from_bytes(b"c1");
        let entry = ReflogEntry::new(None, Some(id.into()), 1_700_000_000, "commit: initial");
        let line = entry.to_line();
        assert_eq!(
            line,
            format!("{} {} 1700000000 commit: initial", ObjectId::null(), id)
        );
        assert_eq!(ReflogEntry::parse_line(&line).unwrap(), entry);
    }

    #[test]
    fn reflog_symbolic_values_have_no_spaces() {
        let entry = ReflogEntry::new(
            Some(RefValue::Symbolic("refs/heads/main".into())),
            Some(RefValue::Symbolic("refs/heads/dev".into())),
            5,
            "checkout: moving from main to dev",
        );
        let parsed = ReflogEntry::parse_line(&entry.to_line()).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn malformed_line_is_none() {
        assert!(ReflogEntry::parse_line("not a reflog line").is_none());
    }
}
