//! The interactive shell: a thin REPL over a single mounted [`sfs::FileSystem`].
//!
//! It owns no file-system state of its own beyond the mounted instance and does
//! no validation beyond arity/parse-ability — the façade is the authority on
//! every other rule, and its errors are just printed back to the user.

use std::io::{self, BufRead, Write};
use std::path::Path;

use sfs::args::{self, Mount};
use sfs::FileSystem;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match args::parse(args) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("sfs-shell: {e}");
            std::process::exit(1);
        }
    };

    let mut fs = match mount(mode) {
        Ok(fs) => fs,
        Err(e) => {
            eprintln!("sfs-shell: {e}");
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    run(&mut fs, stdin.lock(), stdout.lock());
}

fn mount(mode: Mount) -> sfs::Result<FileSystem> {
    match mode {
        Mount::Input { b, n, i, m } => {
            log::info!("formatting a fresh device: B={b} N={n} I={i} M={m}");
            FileSystem::init(b, n, i, m)
        }
        Mount::Backup { file, m } => {
            log::info!("restoring device from {}", file.display());
            FileSystem::restore_from_file(&file, m)
        }
        Mount::Properties { file } => {
            let (b, n, i, m) = args::resolve_properties(&file)?;
            log::info!("formatting from properties {}: B={b} N={n} I={i} M={m}", file.display());
            FileSystem::init(b, n, i, m)
        }
    }
}

/// Reads whitespace-separated command lines from `input` and dispatches each
/// to `fs`, writing responses to `output`. Returns when `exit` is seen or the
/// input is exhausted.
fn run(fs: &mut FileSystem, input: impl BufRead, mut output: impl Write) {
    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = words.first() else { continue };
        if cmd == "exit" {
            break;
        }
        let response = dispatch(fs, cmd, &words[1..]);
        let _ = writeln!(output, "{response}");
    }
}

fn dispatch(fs: &mut FileSystem, cmd: &str, rest: &[&str]) -> String {
    match cmd {
        "sv" => cmd_save(fs, rest),
        "cr" => with_name(rest, |name| fs.create(name).map(|_| format!("created {name}"))),
        "de" => with_name(rest, |name| fs.destroy(name).map(|_| format!("destroyed {name}"))),
        "op" => with_name(rest, |name| fs.open(name).map(|slot| format!("opened {name} as {slot}"))),
        "cl" => with_slot(rest, |slot| fs.close(slot).map(|_| format!("closed {slot}"))),
        "rd" => cmd_read(fs, rest),
        "wr" => cmd_write(fs, rest),
        "sk" => cmd_seek(fs, rest),
        "dr" => cmd_directory(fs),
        "in" => "already mounted".to_string(),
        _ => format!("unknown command: {cmd}"),
    }
}

fn with_name(rest: &[&str], f: impl FnOnce(&str) -> sfs::Result<String>) -> String {
    match rest {
        [name] => report(f(name)),
        _ => "usage: <cmd> <name>".to_string(),
    }
}

fn with_slot(rest: &[&str], f: impl FnOnce(i64) -> sfs::Result<String>) -> String {
    match rest {
        [slot] => match slot.parse() {
            Ok(slot) => report(f(slot)),
            Err(_) => format!("invalid slot: {slot}"),
        },
        _ => "usage: <cmd> <slot>".to_string(),
    }
}

fn cmd_save(fs: &FileSystem, rest: &[&str]) -> String {
    match rest {
        [file] => report(fs.save_to_file(Path::new(file)).map(|_| format!("saved to {file}"))),
        _ => "usage: sv <file>".to_string(),
    }
}

fn cmd_read(fs: &mut FileSystem, rest: &[&str]) -> String {
    let (slot, count) = match rest {
        [slot, count] => (slot.parse::<i64>(), count.parse::<i64>()),
        _ => return "usage: rd <slot> <count>".to_string(),
    };
    let (Ok(slot), Ok(count)) = (slot, count) else {
        return "invalid slot or count".to_string();
    };
    match fs.read(slot, count) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => format!("error: {e}"),
    }
}

fn cmd_write(fs: &mut FileSystem, rest: &[&str]) -> String {
    let (slot, ch, count) = match rest {
        [slot, ch, count] => (slot.parse::<i64>(), ch.chars().next(), count.parse::<usize>()),
        _ => return "usage: wr <slot> <ch> <count>".to_string(),
    };
    let (Ok(slot), Some(ch), Ok(count)) = (slot, ch, count) else {
        return "invalid slot, character, or count".to_string();
    };
    let payload: Vec<u8> = std::iter::repeat(ch as u8).take(count).collect();
    report(fs.write(slot, &payload).map(|_| format!("wrote {count} bytes to {slot}")))
}

fn cmd_seek(fs: &mut FileSystem, rest: &[&str]) -> String {
    match rest {
        [slot, pos] => match (slot.parse::<i64>(), pos.parse::<i64>()) {
            (Ok(slot), Ok(pos)) => report(fs.lseek(slot, pos).map(|_| format!("seeked {slot} to {pos}"))),
            _ => "invalid slot or position".to_string(),
        },
        _ => "usage: sk <slot> <pos>".to_string(),
    }
}

fn cmd_directory(fs: &mut FileSystem) -> String {
    match fs.directory() {
        Ok(entries) => entries
            .into_iter()
            .map(|(name, length)| format!("{name}\t{length}B"))
            .collect::<Vec<_>>()
            .join("\n"),
        Err(e) => format!("error: {e}"),
    }
}

fn report(result: sfs::Result<String>) -> String {
    match result {
        Ok(msg) => msg,
        Err(e) => format!("error: {e}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run_lines(fs: &mut FileSystem, lines: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for line in lines {
            let words: Vec<&str> = line.split_whitespace().collect();
            let Some(&cmd) = words.first() else { continue };
            out.push(dispatch(fs, cmd, &words[1..]));
        }
        out
    }

    #[test]
    fn create_write_read_round_trips_through_the_shell() {
        let mut fs = FileSystem::init(64, 64, 24, 5).unwrap();
        let out = run_lines(&mut fs, &["cr f", "op f", "wr 1 x 4", "cl 1", "op f", "rd 1 4"]);
        assert_eq!(out.last().unwrap(), "xxxx");
    }

    #[test]
    fn directory_listing_format() {
        let mut fs = FileSystem::init(64, 64, 24, 5).unwrap();
        run_lines(&mut fs, &["cr a", "cr bb"]);
        assert_eq!(dispatch(&mut fs, "dr", &[]), "a\t0B\nbb\t0B");
    }

    #[test]
    fn unknown_command_reported() {
        let mut fs = FileSystem::init(64, 64, 24, 5).unwrap();
        assert_eq!(dispatch(&mut fs, "zz", &[]), "unknown command: zz");
    }
}
