use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Deserializes a string field through a fallible parser, tagging the
/// parser's message with the field kind for the serde error.
pub fn parse_via_string<'de, D, T>(
    deserializer: D,
    kind: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(|err| D::Error::custom(format!("invalid {kind} `{raw}`: {err}")))
}

/// Deserializes a string field through an infallible classifier. Unknown
/// values land in the classifier's fallback variant rather than failing the
/// whole document, which keeps ingest tolerant of new watcher channels.
pub fn classify_via_string<'de, D, T>(
    deserializer: D,
    classify: impl FnOnce(&str) -> T,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(classify(&raw))
}
