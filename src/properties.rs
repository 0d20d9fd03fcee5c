//! A minimal `key=value` properties-file reader for the shell's `in properties`
//! mode. One property per line, `#` starts a comment, blank lines are ignored.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Reads `path` into a map of trimmed keys to trimmed values.
pub fn read(path: &Path) -> Result<HashMap<String, String>> {
    let contents = fs::read_to_string(path)?;
    let mut out = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| {
            Error::ReadWriteError(format!("malformed property line: {line:?}"))
        })?;
        out.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(out)
}

/// Looks up `key` in `props` and parses it, failing with a descriptive error.
pub fn parse_field(props: &HashMap<String, String>, key: &str) -> Result<usize> {
    let raw = props
        .get(key)
        .ok_or_else(|| Error::ReadWriteError(format!("missing property {key:?}")))?;
    raw.parse()
        .map_err(|_| Error::ReadWriteError(format!("property {key:?} is not a number: {raw:?}")))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_key_value_pairs_skipping_comments_and_blanks() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            "# a comment\n\nB=64\nN = 64\nI=24\nM=5\n",
        )
        .unwrap();
        let props = read(file.path()).unwrap();
        assert_eq!(parse_field(&props, "B").unwrap(), 64);
        assert_eq!(parse_field(&props, "N").unwrap(), 64);
        assert_eq!(parse_field(&props, "I").unwrap(), 24);
        assert_eq!(parse_field(&props, "M").unwrap(), 5);
    }

    #[test]
    fn missing_field_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "B=64\n").unwrap();
        let props = read(file.path()).unwrap();
        assert!(matches!(parse_field(&props, "N"), Err(Error::ReadWriteError(_))));
    }
}
