//! Hygiene: keeps the joystick core pure and panic-free.
//!
//! The core makes every control decision; the session runtime in the host
//! binary owns the clock, the timers and the network. These tests scan
//! `src/` for code that would break that split or crash the control loop.
//! Each pattern has a budget of zero.

use std::fs;
use std::path::Path;

struct SourceFile {
    path: String,
    content: String,
}

/// Production `.rs` files under `src/`, excluding `*_test.rs`.
fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            let path_str = path.to_string_lossy().to_string();
            if path_str.ends_with("_test.rs") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(&path) {
                out.push(SourceFile { path: path_str, content });
            }
        }
    }
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<String> {
    files
        .iter()
        .flat_map(|file| {
            file.content
                .lines()
                .enumerate()
                .filter(|(_, line)| line.contains(pattern))
                .map(|(n, line)| format!("  {}:{}: {}", file.path, n + 1, line.trim()))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn assert_absent(group: &str, patterns: &[&str]) {
    let files = source_files();
    assert!(!files.is_empty(), "no sources found; run from the joystick crate root");
    let found: Vec<String> = patterns.iter().flat_map(|p| hits(&files, p)).collect();
    assert!(found.is_empty(), "{group}: found {} forbidden pattern(s):\n{}", found.len(), found.join("\n"));
}

#[test]
fn no_panics() {
    assert_absent(
        "panics",
        &[".unwrap()", ".expect(", "panic!(", "unreachable!(", "todo!(", "unimplemented!("],
    );
}

#[test]
fn no_silent_discards() {
    assert_absent("silent discards", &["let _ =", ".ok()"]);
}

#[test]
fn no_wall_clock() {
    // Time is injected as milliseconds so decisions are replayable in tests.
    assert_absent("wall clock", &["Instant::now", "SystemTime::now", "std::thread::sleep"]);
}

#[test]
fn no_io() {
    assert_absent("io", &["println!(", "eprintln!(", "std::net", "std::fs", "tokio::", "reqwest::"]);
}

#[test]
fn no_dead_code_allowances() {
    assert_absent("dead code", &["#[allow(dead_code)]"]);
}
