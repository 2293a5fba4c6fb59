//! Known-library import resolution
//!
//! Generated contracts import OpenZeppelin by package path. Those files are
//! read from a local library root and handed to the compiler as extra source
//! units. Nothing is fetched over the network; imports outside the catalog
//! are left for the compiler to report.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use synth_core::{Error, Result};
use tracing::debug;

static IMPORT_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s+(?:[^"';]*?\s+from\s+)?["']([^"']+)["']"#).expect("import statement pattern")
});

/// Package prefix of the bundled library
pub const OPENZEPPELIN_PREFIX: &str = "@openzeppelin/contracts/";

/// Maps an import path to file content
#[async_trait]
pub trait ImportResolver: Send + Sync {
    /// Content for `import_path`, `None` when this resolver does not know it
    async fn resolve(&self, import_path: &str) -> Result<Option<String>>;
}

/// Fixed catalog of package prefixes mapped to local directories
#[derive(Debug, Clone, Default)]
pub struct LibraryCatalog {
    entries: Vec<(String, PathBuf)>,
}

impl LibraryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog for a `node_modules`-style root holding `@openzeppelin/contracts`
    pub fn openzeppelin(library_root: impl AsRef<Path>) -> Self {
        Self::new().with_prefix(OPENZEPPELIN_PREFIX, library_root.as_ref().join(OPENZEPPELIN_PREFIX))
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        self.entries.push((prefix.into(), directory.into()));
        self
    }

    /// Local file backing `import_path`, if a catalog prefix covers it
    fn locate(&self, import_path: &str) -> Option<PathBuf> {
        self.entries.iter().find_map(|(prefix, directory)| {
            let relative = Path::new(import_path.strip_prefix(prefix.as_str())?);
            // Stay inside the catalog directory
            if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
                return None;
            }
            Some(directory.join(relative))
        })
    }
}

#[async_trait]
impl ImportResolver for LibraryCatalog {
    async fn resolve(&self, import_path: &str) -> Result<Option<String>> {
        let Some(path) = self.locate(import_path) else {
            return Ok(None);
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(format!("Failed to read {}: {}", path.display(), e))),
        }
    }
}

/// Import paths in `source`, in order of appearance
pub fn import_paths(source: &str) -> Vec<String> {
    IMPORT_STATEMENT
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Resolve `import_path` relative to the unit that imports it
pub fn normalize_import(importer: &str, import_path: &str) -> String {
    if !(import_path.starts_with("./") || import_path.starts_with("../")) {
        return import_path.to_string();
    }

    let mut segments: Vec<&str> = importer.split('/').collect();
    segments.pop();

    for segment in import_path.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Walk imports transitively from the primary unit and load every resolvable one.
///
/// Returns unit name to content, excluding the primary unit.
pub async fn collect_sources(
    resolver: &dyn ImportResolver,
    primary_unit: &str,
    primary_source: &str,
) -> Result<BTreeMap<String, String>> {
    let mut resolved = BTreeMap::new();
    let mut seen = BTreeSet::from([primary_unit.to_string()]);
    let mut queue = VecDeque::from([(primary_unit.to_string(), primary_source.to_string())]);

    while let Some((unit, source)) = queue.pop_front() {
        for import in import_paths(&source) {
            let name = normalize_import(&unit, &import);
            if !seen.insert(name.clone()) {
                continue;
            }

            match resolver.resolve(&name).await? {
                Some(content) => {
                    debug!(import = %name, from = %unit, "Resolved import");
                    resolved.insert(name.clone(), content.clone());
                    queue.push_back((name, content));
                }
                None => debug!(import = %name, from = %unit, "Import not in catalog, leaving it to the compiler"),
            }
        }
    }

    Ok(resolved)
}
