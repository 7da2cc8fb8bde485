// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Log rotation (§4.1, §6): on each `start`, non-empty log files in a closed
//! set are renamed with a UTC timestamp suffix; rotated files older than
//! 7 days are deleted. Unknown files under `logs/` are left untouched.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub const ROTATION_RETENTION_DAYS: i64 = 7;

/// The closed set of basenames the supervisor ever writes.
pub const ROTATABLE_BASENAMES: &[&str] = &[
    "backend.log",
    "backend.err",
    "workflow-worker.log",
    "workflow-worker.err",
    "agent-worker.log",
    "agent-worker.err",
    "engine.log",
    "engine.err",
    "llm.log",
    "llm.err",
];

pub fn rotated_name(basename: &str, now: DateTime<Utc>) -> String {
    format!("{basename}.{}", now.format("%Y-%m-%d-%H%M%S"))
}

/// Rotates every non-empty file in `ROTATABLE_BASENAMES` found under
/// `logs_dir`, then deletes rotated files older than
/// `ROTATION_RETENTION_DAYS`.
pub fn rotate_logs(logs_dir: &Path, now: DateTime<Utc>) -> std::io::Result<()> {
    std::fs::create_dir_all(logs_dir)?;

    for basename in ROTATABLE_BASENAMES {
        let path = logs_dir.join(basename);
        let Ok(metadata) = std::fs::metadata(&path) else {
            continue;
        };
        if metadata.len() == 0 {
            continue;
        }
        let rotated = logs_dir.join(rotated_name(basename, now));
        std::fs::rename(&path, &rotated)?;
    }

    delete_stale_rotated_files(logs_dir, now)
}

fn delete_stale_rotated_files(logs_dir: &Path, now: DateTime<Utc>) -> std::io::Result<()> {
    let cutoff = now - chrono::Duration::days(ROTATION_RETENTION_DAYS);
    for entry in std::fs::read_dir(logs_dir)? {
        let entry = entry?;
        let Some(rotated_at) = parse_rotation_timestamp(&entry.file_name().to_string_lossy()) else {
            continue;
        };
        if rotated_at < cutoff {
            let _ = std::fs::remove_file(entry.path());
        }
    }
    Ok(())
}

fn parse_rotation_timestamp(filename: &str) -> Option<DateTime<Utc>> {
    let is_known_basename = ROTATABLE_BASENAMES.iter().any(|b| filename.starts_with(&format!("{b}.")));
    if !is_known_basename {
        return None;
    }
    let suffix = filename.rsplit_once('.')?.1;
    let naive = chrono::NaiveDateTime::parse_from_str(suffix, "%Y-%m-%d-%H%M%S").ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// The merged-log view for the `logs` subcommand (§4.1): reads every
/// requested component's log file, splits into lines, and sorts across
/// sources by each line's leading timestamp where one can be parsed,
/// falling back to file order otherwise.
pub fn merged_lines(paths: &[PathBuf], tag: impl Fn(&Path) -> String) -> Vec<String> {
    let mut lines: Vec<(Option<DateTime<Utc>>, String)> = Vec::new();
    for path in paths {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        let prefix = tag(path);
        for line in contents.lines() {
            let timestamp = leading_timestamp(line);
            lines.push((timestamp, format!("[{prefix:<16}] {line}")));
        }
    }
    lines.sort_by(|a, b| a.0.cmp(&b.0));
    lines.into_iter().map(|(_, line)| line).collect()
}

/// Tolerant of RFC3339 (`tracing`'s default) and the bare
/// `YYYY-MM-DD HH:MM:SS` format some components may emit.
fn leading_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let candidate = line.split_whitespace().next()?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
        return Some(dt.with_timezone(&Utc));
    }
    let two_token = line.splitn(3, ' ').take(2).collect::<Vec<_>>().join(" ");
    chrono::NaiveDateTime::parse_from_str(&two_token, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_files_are_not_rotated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("backend.log"), "").unwrap();
        rotate_logs(dir.path(), Utc::now()).unwrap();
        assert!(dir.path().join("backend.log").exists());
    }

    #[test]
    fn non_empty_files_are_renamed_with_timestamp_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("backend.log"), "hello\n").unwrap();
        let now = Utc::now();
        rotate_logs(dir.path(), now).unwrap();
        assert!(!dir.path().join("backend.log").exists());
        assert!(dir.path().join(rotated_name("backend.log", now)).exists());
    }

    #[test]
    fn unknown_files_are_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scratch.txt"), "keep me\n").unwrap();
        rotate_logs(dir.path(), Utc::now()).unwrap();
        assert!(dir.path().join("scratch.txt").exists());
    }

    #[test]
    fn stale_rotated_files_beyond_retention_are_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let old = now - chrono::Duration::days(ROTATION_RETENTION_DAYS + 1);
        let stale_name = rotated_name("backend.log", old);
        std::fs::write(dir.path().join(&stale_name), "old\n").unwrap();
        rotate_logs(dir.path(), now).unwrap();
        assert!(!dir.path().join(&stale_name).exists());
    }

    #[test]
    fn recent_rotated_files_survive() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let recent = now - chrono::Duration::days(1);
        let recent_name = rotated_name("backend.log", recent);
        std::fs::write(dir.path().join(&recent_name), "recent\n").unwrap();
        rotate_logs(dir.path(), now).unwrap();
        assert!(dir.path().join(&recent_name).exists());
    }
}
