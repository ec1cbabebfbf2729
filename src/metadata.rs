//! Header-comment metadata extraction.
//!
//! Every package script embeds one header comment of the form
//! `<delim-open> uppm <min-core-version> <hjson-object> <delim-close>`. The
//! delimiters are supplied by the owning [`crate::engine::ScriptEngine`] as
//! regex fragments (e.g. `/\*` / `\*/` for the C#-like engine); this module
//! only knows how to locate the header once it has them and hand the HJSON
//! payload off to the `hjson` collaborator.

use crate::error::{Error, Result};
use crate::version::{Version, VersionRequirement};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// The two fields §4.C extracts from a header comment before the caller
/// (the package loader, §4.I) folds them into a `PackageMeta`.
pub struct ExtractedHeader {
    pub required_core_version: VersionRequirement,
    pub metadata_object: Value,
}

fn header_pattern_cache() -> &'static Mutex<HashMap<(String, String), Regex>> {
    static CACHE: OnceLock<Mutex<HashMap<(String, String), Regex>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn header_regex(delim_open: &str, delim_close: &str) -> Result<Regex> {
    let key = (delim_open.to_string(), delim_close.to_string());
    let mut cache = header_pattern_cache().lock().unwrap();
    if let Some(re) = cache.get(&key) {
        return Ok(re.clone());
    }
    let pattern = format!(r"(?s){delim_open}\s*uppm\s+(\S+)\s+(.*?)\s*{delim_close}");
    let re = Regex::new(&pattern)?;
    cache.insert(key, re.clone());
    Ok(re)
}

/// Locate and parse the header comment in `text`, using `delim_open` /
/// `delim_close` as the engine's regex-fragment delimiters.
///
/// Fails with [`Error::MalformedHeader`] if no header is found,
/// [`Error::CoreTooOld`] if the header's minimum core version exceeds this
/// build, and [`Error::MalformedMetadata`] if the HJSON payload is missing
/// `name` or `version`.
pub fn extract(text: &str, delim_open: &str, delim_close: &str, source_label: &str) -> Result<ExtractedHeader> {
    let re = header_regex(delim_open, delim_close)?;
    let caps = re
        .captures(text)
        .ok_or_else(|| Error::MalformedHeader(source_label.to_string()))?;

    let version_str = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let hjson_text = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

    let min_core_version = Version::parse(version_str)?;
    let required_core_version = VersionRequirement::new(min_core_version);
    if !required_core_version.compatible {
        return Err(Error::CoreTooOld {
            package: source_label.to_string(),
            required: required_core_version.min_version.to_string(),
            running: crate::version::core_version().to_string(),
        });
    }

    let metadata_object: Value = hjson::from_str(hjson_text)
        .map_err(|e| Error::MalformedMetadata(source_label.to_string(), e.to_string()))?;

    let obj = metadata_object
        .as_object()
        .ok_or_else(|| Error::MalformedMetadata(source_label.to_string(), "header is not an object".to_string()))?;

    for required in ["name", "version"] {
        if !obj.contains_key(required) || !obj[required].is_string() {
            return Err(Error::MalformedMetadata(
                source_label.to_string(),
                format!("missing required field '{required}'"),
            ));
        }
    }

    Ok(ExtractedHeader {
        required_core_version,
        metadata_object,
    })
}

/// Read a required string field out of a parsed metadata object.
pub fn field_str<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Read an optional array-of-strings field (used for `dependencies` and
/// `imports`), defaulting to an empty vec when absent.
pub fn field_str_array(obj: &Value, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Read an optional bool field, defaulting to `false` (used for
/// `forceGlobal`).
pub fn field_bool(obj: &Value, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: &str = r"/\*";
    const CLOSE: &str = r"\*/";

    #[test]
    fn extracts_well_formed_header() {
        let text = r#"
/*
uppm 0.0.1
{
  name: my-package
  version: 1.0.0
  targetApp: studio
  dependencies: [other:1.0]
}
*/
print("hello")
"#;
        let extracted = extract(text, OPEN, CLOSE, "test.csup").unwrap();
        assert!(extracted.required_core_version.compatible);
        assert_eq!(field_str(&extracted.metadata_object, "name"), Some("my-package"));
        assert_eq!(field_str(&extracted.metadata_object, "version"), Some("1.0.0"));
        assert_eq!(field_str_array(&extracted.metadata_object, "dependencies"), vec!["other:1.0"]);
    }

    #[test]
    fn missing_header_is_malformed() {
        let text = "print(\"no header here\")";
        let err = extract(text, OPEN, CLOSE, "test.csup").unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
    }

    #[test]
    fn missing_required_fields_is_malformed_metadata() {
        let text = r#"/* uppm 0.0.1 { name: only-a-name } */"#;
        let err = extract(text, OPEN, CLOSE, "test.csup").unwrap_err();
        assert!(matches!(err, Error::MalformedMetadata(_, _)));
    }

    #[test]
    fn future_core_version_is_rejected() {
        let text = r#"/* uppm 999.0.0 { name: x, version: 1.0 } */"#;
        let err = extract(text, OPEN, CLOSE, "test.csup").unwrap_err();
        assert!(matches!(err, Error::CoreTooOld { .. }));
    }
}
