//! Fixture loading: path spec → files → decoded, merged document.
//!
//! A path spec is a single file, a directory (its direct fixture files), or
//! a glob pattern. Files are decoded in resolution order and merged
//! key-by-key, later files overriding earlier ones.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs_err as fs;

use crate::cache::DocumentCache;
use crate::config::LoaderConfig;
use crate::decode::{decode_str, DecodeOptions, FixtureFormat};
use crate::error::SnapError;
use crate::model::Document;
use crate::registry::Registry;

/// Turns one fixture file into a document.
pub trait FixtureDecoder: Send + Sync {
    fn decode(
        &self,
        path: &Path,
        registry: &Registry,
        options: &DecodeOptions,
    ) -> Result<Document, SnapError>;
}

/// Reads the file from disk and decodes it by extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDecoder;

impl FixtureDecoder for FileDecoder {
    fn decode(
        &self,
        path: &Path,
        registry: &Registry,
        options: &DecodeOptions,
    ) -> Result<Document, SnapError> {
        let format =
            FixtureFormat::from_path(path).ok_or_else(|| SnapError::unsupported_file(path))?;
        let text = fs::read_to_string(path).map_err(|e| SnapError::io(path, &e))?;
        log::debug!("Decoding {} ({} bytes)", path.display(), text.len());
        decode_str(format, &text, registry, options).map_err(|e| SnapError::decode(path, e))
    }
}

/// Number of documents held by each cache tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub specs: usize,
    pub files: usize,
}

/// Resolves, decodes and merges fixtures. Safe to share across threads.
pub struct FixtureLoader {
    registry: Arc<Registry>,
    config: LoaderConfig,
    decoder: Arc<dyn FixtureDecoder>,
    cache: Option<DocumentCache>,
}

impl FixtureLoader {
    pub fn new(registry: Arc<Registry>, config: LoaderConfig) -> Self {
        let cache = config.cache_documents.then(DocumentCache::default);
        Self {
            registry,
            config,
            decoder: Arc::new(FileDecoder),
            cache,
        }
    }

    /// Replace the file decoder.
    pub fn with_decoder(mut self, decoder: impl FixtureDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// Resolve a spec to its fixture files without decoding them.
    pub fn resolve(&self, spec: &str) -> Result<Vec<PathBuf>, SnapError> {
        resolve(spec)
    }

    /// Load the document for a path spec.
    ///
    /// With caching enabled the result is cached under the spec exactly as
    /// given, and each file under its path; every call returns a fresh
    /// shallow copy.
    pub fn load(&self, spec: &str) -> Result<Document, SnapError> {
        match &self.cache {
            None => self.load_uncached(spec),
            Some(cache) => cache
                .specs
                .get_or_load(&spec.to_string(), || self.load_uncached(spec)),
        }
    }

    /// Load a single fixture file, through the file cache when enabled.
    pub fn load_file(&self, path: &Path) -> Result<Document, SnapError> {
        let options = self.config.decode_options();
        match &self.cache {
            None => self.decoder.decode(path, &self.registry, &options),
            Some(cache) => cache.files.get_or_load(&path.to_path_buf(), || {
                self.decoder.decode(path, &self.registry, &options)
            }),
        }
    }

    /// Drop every cached document. No-op without caching.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            log::debug!("Fixture cache cleared");
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| CacheStats {
            specs: cache.specs.len(),
            files: cache.files.len(),
        })
    }

    fn load_uncached(&self, spec: &str) -> Result<Document, SnapError> {
        let files = resolve(spec)?;
        if let [file] = files.as_slice() {
            return self.load_file(file);
        }

        let mut docs = Vec::with_capacity(files.len());
        for file in &files {
            docs.push(self.load_file(file)?);
        }
        log::debug!("Merging {} fixture files for '{}'", docs.len(), spec);
        Ok(merge_documents(docs))
    }
}

impl std::fmt::Debug for FixtureLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureLoader")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Whether `path` carries a recognized fixture extension.
pub fn is_fixture_file(path: &Path) -> bool {
    FixtureFormat::from_path(path).is_some()
}

/// Resolve a path spec to an ordered, non-empty list of fixture files.
///
/// - an existing regular file is returned as-is if its extension is
///   recognized, otherwise `UnsupportedFile`
/// - an existing directory yields its direct fixture files, sorted by name
/// - anything else containing `*`, `?` or `[` is expanded as a glob, sorted
pub fn resolve(spec: &str) -> Result<Vec<PathBuf>, SnapError> {
    log::debug!("Resolving fixture spec '{}'", spec);
    let path = Path::new(spec);

    let files = match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => list_dir(spec, path)?,
        Ok(meta) if meta.is_file() => {
            if !is_fixture_file(path) {
                return Err(SnapError::unsupported_file(path));
            }
            vec![path.to_path_buf()]
        }
        Ok(_) => return Err(SnapError::resolution(spec, "not a regular file or directory")),
        Err(_) if has_glob_meta(spec) => expand_glob(spec)?,
        Err(e) => return Err(SnapError::resolution(spec, e.to_string())),
    };

    if files.is_empty() {
        return Err(SnapError::resolution(spec, "no fixture files found"));
    }
    log::debug!(
        "Spec '{}' resolved to {:?}",
        spec,
        files.iter().map(|p| p.display()).collect::<Vec<_>>()
    );
    Ok(files)
}

fn has_glob_meta(spec: &str) -> bool {
    spec.contains(['*', '?', '['])
}

fn list_dir(spec: &str, dir: &Path) -> Result<Vec<PathBuf>, SnapError> {
    let entries = fs::read_dir(dir).map_err(|e| SnapError::resolution(spec, e.to_string()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SnapError::resolution(spec, e.to_string()))?;
        let path = entry.path();
        if path.is_file() && is_fixture_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, SnapError> {
    log::debug!("Expanding glob pattern '{}'", pattern);
    let paths =
        glob::glob(pattern).map_err(|e| SnapError::invalid_glob(pattern, e.to_string()))?;

    let mut files: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::debug!("Skipping unreadable glob match: {}", e);
                None
            }
        })
        .filter(|path| path.is_file() && is_fixture_file(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Merge documents key-by-key.
///
/// Keys keep the position of their first appearance; a later value for the
/// same key replaces the earlier one in place. Values are not merged
/// recursively.
pub fn merge_documents<I>(docs: I) -> Document
where
    I: IntoIterator<Item = Document>,
{
    let mut merged = Document::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for doc in docs {
        for entry in doc {
            match positions.get(&entry.key) {
                Some(&pos) => merged.entries_mut()[pos].value = entry.value,
                None => {
                    positions.insert(entry.key.clone(), merged.len());
                    merged.push_entry(entry);
                }
            }
        }
    }
    merged
}
