//! Extension-keyed file type classification.
//!
//! The resolver behind [`TypeClassifier`] may be slow (it can sniff file
//! headers), so results are memoized per lowercase extension and shared by
//! every worker of every scan that holds the same classifier.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

pub const UNKNOWN_TYPE: &str = "unknown";
const FALLBACK_TYPE: &str = "application/octet-stream";
const SNIFF_LEN: usize = 8192;

/// Maps a lowercase extension to a type string.
///
/// `path` names the file that triggered the lookup; implementations may read it.
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, extension: &str, path: &Path) -> String;
}

/// Extension table with header sniffing for extensions the table does not know.
#[derive(Debug, Default, Clone, Copy)]
pub struct MimeResolver;

impl TypeResolver for MimeResolver {
    fn resolve(&self, extension: &str, path: &Path) -> String {
        if let Some(mime) = mime_for_extension(extension) {
            return mime.to_string();
        }
        sniff(path).unwrap_or_else(|| FALLBACK_TYPE.to_string())
    }
}

fn sniff(path: &Path) -> Option<String> {
    let mut header = Vec::with_capacity(SNIFF_LEN);
    File::open(path)
        .ok()?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut header)
        .ok()?;
    infer::get(&header).map(|kind| kind.mime_type().to_string())
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "mpg" | "mpeg" => "video/mpeg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "xml" => "application/xml",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "xz" => "application/x-xz",
        "zst" => "application/zstd",
        "bz2" => "application/x-bzip2",
        "7z" => "application/x-7z-compressed",
        "rar" => "application/vnd.rar",
        "iso" => "application/x-cd-image",
        "dmg" => "application/x-apple-diskimage",
        "deb" => "application/vnd.debian.binary-package",
        "rpm" => "application/x-rpm",
        "exe" | "dll" => "application/x-msdownload",
        "so" => "application/x-sharedlib",
        "sqlite" | "db" => "application/vnd.sqlite3",
        "tmp" | "temp" => "application/x-temporary",
        "cache" => "application/x-cache",
        _ => return None,
    };
    Some(mime)
}

/// Lowercase extension of `path`, or `None` when it has none.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub struct TypeClassifier {
    resolver: Box<dyn TypeResolver>,
    cache: RwLock<HashMap<String, Arc<str>>>,
    unknown: Arc<str>,
}

impl TypeClassifier {
    pub fn new(resolver: impl TypeResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            cache: RwLock::new(HashMap::new()),
            unknown: Arc::from(UNKNOWN_TYPE),
        }
    }

    pub fn classify(&self, path: &Path) -> Arc<str> {
        match extension_of(path) {
            Some(ext) => self.classify_extension(&ext, path),
            None => Arc::clone(&self.unknown),
        }
    }

    /// `ext` must already be lowercase.
    pub fn classify_extension(&self, ext: &str, path: &Path) -> Arc<str> {
        if let Some(hit) = self.cache.read().get(ext) {
            return Arc::clone(hit);
        }

        // Resolved without holding the lock; a racing miss resolves twice and
        // the first insert wins.
        let resolved: Arc<str> = Arc::from(self.resolver.resolve(ext, path));
        debug!(extension = ext, file_type = %resolved, "classified extension");

        let mut cache = self.cache.write();
        Arc::clone(cache.entry(ext.to_string()).or_insert(resolved))
    }

    pub fn cached_extensions(&self) -> usize {
        self.cache.read().len()
    }
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::new(MimeResolver)
    }
}
