use serde::{Deserialize, Deserializer};

/// Parses a numeric identifier cell.
///
/// Exports disagree on how ids are written: `0022400061`, `22400061` and
/// `22400061.0` all name the same game. Anything with a non-zero fraction or
/// a sign is rejected.
pub fn parse_id(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<u64>() {
        return Some(n);
    }
    let (whole, frac) = trimmed.split_once('.')?;
    if whole.is_empty() || !frac.chars().all(|c| c == '0') {
        return None;
    }
    whole.parse::<u64>().ok()
}

/// Season and date labels keep their leading zeros and only lose a
/// trailing `.0`.
pub fn normalize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.split_once('.') {
        Some((whole, frac)) if !whole.is_empty() && frac.chars().all(|c| c == '0') => {
            whole.to_string()
        }
        _ => trimmed.to_string(),
    }
}

pub fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_id(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid id {raw:?}")))
}

pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_id))
}

/// Empty and whitespace-only cells read as `None`.
pub fn deserialize_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}
