use std::collections::HashMap;
use std::fs::Metadata;
use std::path::PathBuf;
use std::sync::Arc;

use crate::classify::{TypeClassifier, extension_of};
use crate::model::FileEntry;
use crate::scanner::session::ScanSession;

pub const BATCH_CAPACITY: usize = 100;

/// Turns a batch of stat results into result entries.
///
/// Every file counts towards the session's processed bytes whether or not it
/// passes the size filter. Type lookups are memoized for the length of the
/// batch so runs of same-extension files skip the shared cache.
pub fn process_batch(
    batch: &[(PathBuf, Metadata)],
    session: &ScanSession,
    classifier: &TypeClassifier,
    results: &mut Vec<FileEntry>,
) {
    let min_size = session.min_size();
    let mut memo: HashMap<String, Arc<str>> = HashMap::new();

    for (path, metadata) in batch {
        let size = metadata.len();
        session.add_processed(size);

        if size < min_size {
            continue;
        }

        let file_type = match extension_of(path) {
            Some(ext) => match memo.get(&ext) {
                Some(hit) => Arc::clone(hit),
                None => {
                    let resolved = classifier.classify_extension(&ext, path);
                    memo.insert(ext, Arc::clone(&resolved));
                    resolved
                }
            },
            None => classifier.classify(path),
        };

        results.push(FileEntry {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.clone(),
            size,
            last_modified: metadata.modified().ok(),
            last_accessed: metadata.accessed().ok(),
            file_type,
            is_directory: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use super::*;
    use crate::classify::TypeResolver;

    struct CountingResolver(Arc<AtomicUsize>);

    impl TypeResolver for CountingResolver {
        fn resolve(&self, extension: &str, _path: &Path) -> String {
            self.0.fetch_add(1, Ordering::SeqCst);
            format!("kind/{extension}")
        }
    }

    fn stat_batch(root: &Path, files: &[(&str, usize)]) -> Vec<(PathBuf, Metadata)> {
        files
            .iter()
            .map(|(name, len)| {
                let path = root.join(name);
                fs::write(&path, vec![0_u8; *len]).expect("write fixture");
                let metadata = fs::metadata(&path).expect("stat fixture");
                (path, metadata)
            })
            .collect()
    }

    #[test]
    fn filters_by_size_but_counts_every_byte() {
        let temp = TempDir::new().expect("temp dir");
        let batch = stat_batch(
            temp.path(),
            &[("small.txt", 10), ("big.bin", 400), ("edge.bin", 100)],
        );
        let session = ScanSession::new(100, None);
        let classifier = TypeClassifier::default();
        let mut results = Vec::new();

        process_batch(&batch, &session, &classifier, &mut results);

        let mut names: Vec<_> = results.iter().map(|entry| entry.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["big.bin", "edge.bin"]);
        assert!(results.iter().all(|entry| entry.size >= 100 && !entry.is_directory));
        assert_eq!(session.processed_bytes(), 510);
        assert_eq!(session.progress().files_seen, 3);
    }

    #[test]
    fn appends_to_existing_results() {
        let temp = TempDir::new().expect("temp dir");
        let batch = stat_batch(temp.path(), &[("one.dat", 5)]);
        let session = ScanSession::new(0, None);
        let classifier = TypeClassifier::default();
        let mut results = Vec::new();

        process_batch(&batch, &session, &classifier, &mut results);
        process_batch(&batch, &session, &classifier, &mut results);

        assert_eq!(results.len(), 2);
        assert!(results[0].last_modified.is_some());
    }

    #[test]
    fn same_extension_resolves_once() {
        let temp = TempDir::new().expect("temp dir");
        let batch = stat_batch(
            temp.path(),
            &[("a.iso", 1), ("b.ISO", 1), ("c.iso", 1), ("README", 1)],
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let classifier = TypeClassifier::new(CountingResolver(Arc::clone(&calls)));
        let session = ScanSession::new(0, None);
        let mut results = Vec::new();

        process_batch(&batch, &session, &classifier, &mut results);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let readme = results
            .iter()
            .find(|entry| entry.name == "README")
            .expect("readme entry");
        assert_eq!(&*readme.file_type, "unknown");
        assert!(
            results
                .iter()
                .filter(|entry| entry.name != "README")
                .all(|entry| &*entry.file_type == "kind/iso")
        );
    }
}
