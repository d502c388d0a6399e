//! CLI command implementations.

pub mod authorize;
pub mod config;
pub mod jit;
pub mod policy;
pub mod scenarios;
pub mod version;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use fleetedge::{ActionName, AttributeBag, AttributeValue};

pub(crate) fn parse_action(value: &str) -> Result<ActionName> {
    ActionName::parse(value).with_context(|| format!("invalid action '{value}'"))
}

pub(crate) fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("invalid RFC 3339 time '{value}'"))?
        .with_timezone(&Utc))
}

/// Parses `key=value` pairs. Values are read as bool, integer, float, a
/// bracketed list, then text.
pub(crate) fn parse_context(pairs: &[String]) -> Result<AttributeBag> {
    let mut bag = AttributeBag::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("context '{pair}' is not KEY=VALUE");
        };
        if key.is_empty() {
            bail!("context '{pair}' has an empty key");
        }
        bag.insert(key, AttributeValue::parse_literal(raw));
    }
    Ok(bag)
}
