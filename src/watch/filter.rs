// src/watch/filter.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::Result;

/// Configuration for [`PathFilter`].
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Watched file suffixes. Entries without a leading `.` are normalised.
    pub extensions: Vec<String>,

    /// Directory basenames to prune, matched at any depth.
    pub exclude_dirs: Vec<String>,

    /// Glob patterns matched against the filename, then the relative path.
    pub exclude_files: Vec<String>,

    /// Base directory that paths are relativised against.
    pub root: PathBuf,
}

/// Stateless predicate deciding whether a changed path should produce a
/// build.
///
/// The decision order short-circuits on the first reject:
/// 1. excluded directory segment anywhere in the relative path
/// 2. excluded file glob (basename, then relative path)
/// 3. extension not in the watched set
#[derive(Debug, Clone)]
pub struct PathFilter {
    extensions: HashSet<String>,
    exclude_dirs: HashSet<String>,
    exclude_files: GlobSet,
    root: PathBuf,
}

impl PathFilter {
    pub fn new(cfg: FilterConfig) -> Result<Self> {
        let extensions = cfg
            .extensions
            .into_iter()
            .map(|ext| {
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();

        let mut builder = GlobSetBuilder::new();
        for pat in &cfg.exclude_files {
            builder.add(Glob::new(pat)?);
        }

        Ok(Self {
            extensions,
            exclude_dirs: cfg.exclude_dirs.into_iter().collect(),
            exclude_files: builder.build()?,
            root: cfg.root,
        })
    }

    /// Returns true if the path should be watched and trigger a rebuild.
    pub fn matches(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);

        if self.in_excluded_dir(rel) {
            return false;
        }

        if self.matches_excluded_file(rel) {
            return false;
        }

        if !self.extensions.is_empty() {
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            if !self.extensions.contains(&ext) {
                return false;
            }
        }

        true
    }

    fn in_excluded_dir(&self, rel: &Path) -> bool {
        let rel = rel.to_string_lossy().replace('\\', "/");
        rel.split('/').any(|part| self.exclude_dirs.contains(part))
    }

    fn matches_excluded_file(&self, rel: &Path) -> bool {
        if self.exclude_files.is_empty() {
            return false;
        }
        if let Some(base) = rel.file_name() {
            if self.exclude_files.is_match(base) {
                return true;
            }
        }
        self.exclude_files.is_match(rel)
    }
}
