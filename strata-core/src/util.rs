//! Option validation helpers shared by the workflow builders and the CLI.

use crate::error::CoreError;
use std::collections::HashSet;
use std::path::Path;

/// Validate a database name: ASCII letters, digits, and underscores only.
pub fn validate_db_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::EmptyDbName);
    }
    for character in name.chars() {
        if !character.is_ascii_alphanumeric() && character != '_' {
            return Err(CoreError::InvalidDbNameCharacter { character });
        }
    }
    Ok(())
}

/// Validate that a required path option is present and absolute.
pub fn validate_absolute_path(path: &str, label: &'static str) -> Result<(), CoreError> {
    if path.is_empty() || !Path::new(path).is_absolute() {
        return Err(CoreError::PathNotAbsolute { label, path: path.to_string() });
    }
    Ok(())
}

/// Collapse duplicate separators and trailing slashes in a path prefix.
pub fn clean_path_prefix(path: &str) -> String {
    let mut cleaned = String::with_capacity(path.len());
    let mut last_was_slash = false;
    for character in path.chars() {
        if character == '/' {
            if !last_was_slash {
                cleaned.push(character);
            }
            last_was_slash = true;
        } else {
            cleaned.push(character);
            last_was_slash = false;
        }
    }
    if cleaned.len() > 1 && cleaned.ends_with('/') {
        cleaned.pop();
    }
    cleaned
}

/// Validate a depot size: either a percentage within `0..=100` (`"25%"`)
/// or a positive number with a `K`/`M`/`G`/`T` suffix (`"10G"`).
pub fn validate_depot_size(size: &str) -> Result<(), CoreError> {
    let invalid = |cause: &str| CoreError::InvalidDepotSize {
        size: size.to_string(),
        cause: cause.to_string(),
    };

    let trimmed = size.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if let Some(number) = unsigned.strip_suffix('%') {
        let value: i64 = number.parse().map_err(|_| invalid("not a number"))?;
        let negative = trimmed.starts_with('-');
        if negative || value < 0 {
            return Err(invalid("it is less than 0%"));
        }
        if value > 100 {
            return Err(invalid("it is greater than 100%"));
        }
        return Ok(());
    }

    let (number, suffix) = unsigned.split_at(unsigned.len().saturating_sub(1));
    if !matches!(suffix, "K" | "M" | "G" | "T") {
        return Err(invalid("expected a % or K/M/G/T suffix"));
    }
    let value: i64 = if trimmed.starts_with('-') {
        -number.parse::<i64>().map_err(|_| invalid("not a number"))?
    } else {
        number.parse().map_err(|_| invalid("not a number"))?
    };
    if value <= 0 {
        return Err(invalid("it is <= 0"));
    }
    Ok(())
}

/// Split a comma-separated host list, trimming, lowercasing, and deduping
/// while preserving first-seen order.
pub fn split_host_list(hosts: &str) -> Result<Vec<String>, CoreError> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for host in hosts.split(',') {
        let host = host.trim().to_lowercase();
        if host.is_empty() {
            continue;
        }
        if seen.insert(host.clone()) {
            result.push(host);
        }
    }
    if result.is_empty() {
        return Err(CoreError::EmptyHostList);
    }
    Ok(result)
}

/// Elements of `a` that are not in `b`.
pub fn slice_diff(a: &[String], b: &[String]) -> Vec<String> {
    let exclude: HashSet<&String> = b.iter().collect();
    a.iter().filter(|x| !exclude.contains(x)).cloned().collect()
}

/// Elements common to `a` and `b`, in `a`'s order.
pub fn slice_common(a: &[String], b: &[String]) -> Vec<String> {
    let include: HashSet<&String> = b.iter().collect();
    a.iter().filter(|x| include.contains(x)).cloned().collect()
}

/// Read an environment variable, falling back to a default.
pub fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_name_accepts_alnum_and_underscore() {
        assert!(validate_db_name("test_db").is_ok());
        assert!(validate_db_name("db1").is_ok());
    }

    #[test]
    fn db_name_rejects_special_characters() {
        for (name, bad) in [("test$db", '$'), ("[db1]", '['), ("!!??!!db1", '!')] {
            match validate_db_name(name) {
                Err(CoreError::InvalidDbNameCharacter { character }) => {
                    assert_eq!(character, bad)
                }
                other => panic!("unexpected result for {name:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn depot_size_percentages() {
        assert!(validate_depot_size("19%").is_ok());
        assert!(validate_depot_size("+19%").is_ok());
        let err = validate_depot_size("-19%").unwrap_err();
        assert!(err.to_string().contains("it is less than 0%"));
        let err = validate_depot_size("119%").unwrap_err();
        assert!(err.to_string().contains("it is greater than 100%"));
    }

    #[test]
    fn depot_size_byte_suffixes() {
        assert!(validate_depot_size("+119T").is_ok());
        assert!(validate_depot_size("10G").is_ok());
        let err = validate_depot_size("-119K").unwrap_err();
        assert!(err.to_string().contains("it is <= 0"));
        assert!(validate_depot_size("10Q").is_err());
    }

    #[test]
    fn host_list_splits_and_dedupes() {
        let hosts = split_host_list("10.0.0.1, 10.0.0.2,10.0.0.1,VNODE3 ").unwrap();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "vnode3"]);
        assert!(split_host_list(" , ,").is_err());
    }

    #[test]
    fn path_prefix_cleaning() {
        assert_eq!(clean_path_prefix("/data//db/"), "/data/db");
        assert_eq!(clean_path_prefix("/"), "/");
    }

    #[test]
    fn set_operations() {
        let a = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let b = vec!["b".to_string()];
        assert_eq!(slice_diff(&a, &b), vec!["a", "c"]);
        assert_eq!(slice_common(&a, &b), vec!["b"]);
    }
}
