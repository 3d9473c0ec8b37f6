use std::io::{self, Write};
use std::time::{Duration, SystemTime};

use crate::model::FileEntry;

const DISPOSABLE_SUFFIXES: [&str; 7] = [
    ".ds_store",
    "thumbs.db",
    "desktop.ini",
    ".tmp",
    ".temp",
    ".cache",
    ".log",
];
const SECONDS_PER_DAY: u64 = 86_400;

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Caches, temporaries and OS litter that are usually safe to remove.
pub fn looks_disposable(entry: &FileEntry) -> bool {
    let name = entry.name.to_lowercase();
    if DISPOSABLE_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
    {
        return true;
    }
    entry.file_type.contains("cache") || entry.file_type.contains("temporary")
}

/// Coarse family of a MIME-like type string.
pub fn type_family(file_type: &str) -> &'static str {
    match file_type.split('/').next() {
        Some("image") => "image",
        Some("video") => "video",
        Some("audio") => "audio",
        Some("text") => "text",
        _ => "file",
    }
}

pub fn format_age(age: Option<Duration>) -> String {
    match age {
        None => "-".to_string(),
        Some(age) => {
            let days = age.as_secs() / SECONDS_PER_DAY;
            match days {
                0 => "today".to_string(),
                1 => "1 day".to_string(),
                _ => format!("{days} days"),
            }
        }
    }
}

/// Keeps entries idle for at least `days`, preserving order. Entries without an
/// access time are kept only when no age filter is given.
pub fn filter_idle(entries: &[FileEntry], days: Option<u64>, now: SystemTime) -> Vec<&FileEntry> {
    match days {
        None => entries.iter().collect(),
        Some(days) => {
            let threshold = Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY));
            entries
                .iter()
                .filter(|entry| entry.idle_for(now).is_some_and(|idle| idle >= threshold))
                .collect()
        }
    }
}

pub fn write_table<W: Write>(
    out: &mut W,
    entries: &[&FileEntry],
    now: SystemTime,
) -> io::Result<()> {
    writeln!(
        out,
        "{:>10}  {:>10}  {:<6}  {:<4}  PATH",
        "SIZE", "ACCESSED", "KIND", "JUNK"
    )?;
    for entry in entries {
        writeln!(
            out,
            "{:>10}  {:>10}  {:<6}  {:<4}  {}",
            format_bytes(entry.size),
            format_age(entry.idle_for(now)),
            type_family(&entry.file_type),
            if looks_disposable(entry) { "yes" } else { "" },
            entry.path.display()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;

    fn entry(name: &str, file_type: &str, idle_days: Option<u64>, now: SystemTime) -> FileEntry {
        FileEntry {
            path: PathBuf::from("/data").join(name),
            name: name.to_string(),
            size: 2048,
            last_modified: None,
            last_accessed: idle_days
                .map(|days| now - Duration::from_secs(days * SECONDS_PER_DAY)),
            file_type: Arc::from(file_type),
            is_directory: false,
        }
    }

    #[test]
    fn formats_binary_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn flags_disposable_names_and_types() {
        let now = SystemTime::now();
        assert!(looks_disposable(&entry("Thumbs.db", "unknown", None, now)));
        assert!(looks_disposable(&entry("build.LOG", "text/plain", None, now)));
        assert!(looks_disposable(&entry("blob", "application/x-cache", None, now)));
        assert!(!looks_disposable(&entry("movie.mkv", "video/x-matroska", None, now)));
    }

    #[test]
    fn families_follow_mime_prefix() {
        assert_eq!(type_family("image/png"), "image");
        assert_eq!(type_family("text/plain"), "text");
        assert_eq!(type_family("application/zip"), "file");
        assert_eq!(type_family("unknown"), "file");
    }

    #[test]
    fn idle_filter_drops_recent_and_unstamped() {
        let now = SystemTime::now();
        let entries = vec![
            entry("old.iso", "x", Some(400), now),
            entry("new.iso", "x", Some(2), now),
            entry("nostamp.iso", "x", None, now),
        ];

        let kept = filter_idle(&entries, Some(30), now);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "old.iso");
        assert_eq!(filter_idle(&entries, None, now).len(), 3);
    }

    #[test]
    fn table_lists_each_entry() {
        let now = SystemTime::now();
        let entries = [entry("a.log", "text/plain", Some(3), now)];
        let refs: Vec<&FileEntry> = entries.iter().collect();
        let mut out = Vec::new();

        write_table(&mut out, &refs, now).expect("write table");

        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("2.0 KB"));
        assert!(text.contains("3 days"));
        assert!(text.contains("yes"));
        assert!(text.contains("/data/a.log"));
    }
}
