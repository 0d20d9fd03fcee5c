//! Parses the shell binary's startup mode from `argv`, the same
//! hand-rolled-loop-over-`std::env::args()` style this codebase's other
//! command-line tools use instead of an external parsing crate.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::properties;

/// How the shell should bring up its single mounted [`crate::fs::FileSystem`].
pub enum Mount {
    /// `in backup <file> <M>` — restore a previously saved device.
    Backup { file: PathBuf, m: usize },
    /// `in input <B> <N> <I> <M>` — format a fresh device.
    Input { b: usize, n: usize, i: usize, m: usize },
    /// `in properties <file>` — read `B N I M` from a properties file.
    Properties { file: PathBuf },
}

/// Parses the arguments following the program name (i.e. `std::env::args().skip(1)`).
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Mount> {
    let args: Vec<String> = args.into_iter().collect();
    match args.first().map(String::as_str) {
        Some("in") => parse_in(&args[1..]),
        _ => Err(Error::ReadWriteError(
            "usage: in backup <file> <M> | in input <B> <N> <I> <M> | in properties <file>".to_string(),
        )),
    }
}

fn parse_in(rest: &[String]) -> Result<Mount> {
    match rest {
        [mode, file, m] if mode == "backup" => Ok(Mount::Backup {
            file: PathBuf::from(file),
            m: parse_usize(m)?,
        }),
        [mode, b, n, i, m] if mode == "input" => Ok(Mount::Input {
            b: parse_usize(b)?,
            n: parse_usize(n)?,
            i: parse_usize(i)?,
            m: parse_usize(m)?,
        }),
        [mode, file] if mode == "properties" => Ok(Mount::Properties { file: PathBuf::from(file) }),
        _ => Err(Error::ReadWriteError(format!("invalid `in` arguments: {rest:?}"))),
    }
}

fn parse_usize(s: &str) -> Result<usize> {
    s.parse()
        .map_err(|_| Error::ReadWriteError(format!("expected a number, got {s:?}")))
}

/// Resolves an `in properties <file>` mount into the same parameters `in input` takes.
pub fn resolve_properties(file: &std::path::Path) -> Result<(usize, usize, usize, usize)> {
    let props = properties::read(file)?;
    Ok((
        properties::parse_field(&props, "B")?,
        properties::parse_field(&props, "N")?,
        properties::parse_field(&props, "I")?,
        properties::parse_field(&props, "M")?,
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn parses_input_mode() {
        let m = parse(args("in input 64 64 24 5")).unwrap();
        assert!(matches!(m, Mount::Input { b: 64, n: 64, i: 24, m: 5 }));
    }

    #[test]
    fn parses_backup_mode() {
        let m = parse(args("in backup dev.bak 5")).unwrap();
        assert!(matches!(m, Mount::Backup { m: 5, .. }));
    }

    #[test]
    fn parses_properties_mode() {
        let m = parse(args("in properties fs.properties")).unwrap();
        assert!(matches!(m, Mount::Properties { .. }));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse(args("in bogus")).is_err());
        assert!(parse(args("nope")).is_err());
    }
}
