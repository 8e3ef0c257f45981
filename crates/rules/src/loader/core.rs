//! Core [`RuleLoader`] struct: filesystem-backed document loading with optional hot-reload.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::registry::{AtomLookup, AtomRegistry};
use crate::schema::{RuleDocument, RuleEnvelope, RuleKind};
use crate::store::CompositionCatalog;
use crate::validation::{self, fuzzy::is_path_safe};

use super::error::{LoadResult, LoadStatus, Result, RuleError};
use super::watcher::handle_fs_event;

/// Where each loaded document lives on disk.
type PathIndex = HashMap<(RuleKind, String), PathBuf>;

/// State shared between the loader and its watcher callback.
#[derive(Clone)]
pub(super) struct Shared {
    pub(super) registry: Arc<AtomRegistry>,
    pub(super) catalog: Arc<CompositionCatalog>,
    pub(super) index: Arc<RwLock<PathIndex>>,
}

impl Shared {
    /// Validate a document and route it into the registry or the catalog.
    ///
    /// With `check_refs`, compositions must only reference registered atoms.
    pub(super) fn apply(&self, doc: RuleDocument, path: &Path, check_refs: bool) -> Result<()> {
        let key = (doc.kind(), doc.id().to_string());
        match doc {
            RuleDocument::Atom(atom) => {
                self.registry
                    .register(atom)
                    .map_err(|e| RuleError::Validation(e.to_string()))?;
            }
            RuleDocument::Composition(comp) => {
                let known = self.registry.ids();
                let known: Vec<&str> = known.iter().map(String::as_str).collect();
                let result = validation::validate_composition(&comp, check_refs.then_some(known.as_slice()));
                if !result.valid {
                    return Err(RuleError::Validation(format!(
                        "composition '{}': {}",
                        comp.id(),
                        result.summary()
                    )));
                }
                self.catalog.insert(comp);
            }
        }
        self.index
            .write()
            .expect("index lock poisoned")
            .insert(key, path.to_path_buf());
        Ok(())
    }

    /// Drop whatever document was loaded from `path`.
    pub(super) fn remove_path(&self, path: &Path) -> Option<(RuleKind, String)> {
        let key = {
            let mut index = self.index.write().expect("index lock poisoned");
            let key = index.iter().find(|(_, p)| p.as_path() == path).map(|(k, _)| k.clone())?;
            index.remove(&key);
            key
        };
        self.forget(&key.0, &key.1);
        Some(key)
    }

    fn contains(&self, kind: RuleKind, id: &str) -> bool {
        match kind {
            RuleKind::EligibilityAtom => self.registry.contains(id),
            RuleKind::RuleComposition => self.catalog.lookup(id).is_some(),
        }
    }

    fn forget(&self, kind: &RuleKind, id: &str) {
        match kind {
            RuleKind::EligibilityAtom => {
                self.registry.remove(id);
            }
            RuleKind::RuleComposition => {
                self.catalog.remove(id);
            }
        }
    }
}

/// Filesystem-backed document loader with optional hot-reload.
///
/// Scans a directory (recursively) for `*.yml` / `*.yaml` files, deserializes
/// them into [`RuleDocument`] instances via two-pass deserialization, and
/// feeds the shared registry and catalog.
pub struct RuleLoader {
    /// Root directory containing document YAML files.
    rules_dir: PathBuf,
    shared: Shared,
    /// Serializes writes and deletes so existence checks hold until the file lands.
    writes: Mutex<()>,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<RecommendedWatcher>,
}

impl RuleLoader {
    /// Create a new loader for the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(rules_dir: PathBuf, registry: Arc<AtomRegistry>, catalog: Arc<CompositionCatalog>) -> Self {
        if !rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        Self {
            rules_dir,
            shared: Shared {
                registry,
                catalog,
                index: Arc::new(RwLock::new(HashMap::new())),
            },
            writes: Mutex::new(()),
            _watcher: None,
        }
    }

    /// Recursively scan the rules directory and load all YAML files.
    ///
    /// Atoms are applied before compositions so composition references can
    /// be checked. Per-file errors are reported but do not abort the scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut files = Vec::new();
        let mut results = Vec::new();
        self.scan_dir_recursive(&self.rules_dir, &mut files, &mut results)?;
        files.sort();

        let mut parsed = Vec::with_capacity(files.len());
        for path in files {
            match self.load_file(&path) {
                Ok(doc) => parsed.push((path, doc)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load document");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed { error: e.to_string() },
                    });
                }
            }
        }

        // Atoms first, then compositions.
        parsed.sort_by_key(|(_, doc)| doc.kind() == RuleKind::RuleComposition);
        for (path, doc) in parsed {
            let kind = doc.kind();
            let id = doc.id().to_string();
            match self.shared.apply(doc, &path, true) {
                Ok(()) => {
                    info!(id = %id, kind = %kind, path = %path.display(), "loaded document");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { kind, id },
                    });
                }
                Err(e) => {
                    warn!(id = %id, path = %path.display(), error = %e, "rejected document");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed { error: e.to_string() },
                    });
                }
            }
        }

        Ok(results)
    }

    /// Collect YAML files below `dir`, recording skipped entries.
    fn scan_dir_recursive(&self, dir: &Path, files: &mut Vec<PathBuf>, results: &mut Vec<LoadResult>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            // Skip dotfiles/dotdirs
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Skipped { reason: "dotfile".to_string() },
                        });
                    }
                    continue;
                }
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, files, results)?;
                continue;
            }

            if !is_yaml(&path) {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped { reason: "not a YAML file".to_string() },
                });
                continue;
            }

            files.push(path);
        }

        Ok(())
    }

    /// Parse a single YAML file into a [`RuleDocument`] via two-pass deserialization.
    ///
    /// First pass: deserialize as [`RuleEnvelope`] to read the `kind` field.
    /// Second pass: reconstruct and deserialize into the kind-specific type.
    pub fn load_file(&self, path: &Path) -> Result<RuleDocument> {
        let contents = fs::read_to_string(path)?;
        parse_yaml(&contents)
    }

    /// Start a filesystem watcher with 500ms debounce.
    ///
    /// On file create/modify the document is re-parsed and upserted.
    /// On file delete the document is dropped from the registry or catalog.
    /// Parse errors are logged as warnings; the previous version is kept.
    pub fn watch(&mut self) -> Result<()> {
        let shared = self.shared.clone();

        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<notify::Event, notify::Error>| {
            match res {
                Ok(event) => handle_fs_event(&event, &shared),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            }
        })?;

        watcher.watch(&self.rules_dir, RecursiveMode::Recursive)?;

        let _ = watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %self.rules_dir.display(), "watching rules directory for changes (recursive)");
        self._watcher = Some(watcher);
        Ok(())
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    pub fn registry(&self) -> &Arc<AtomRegistry> {
        &self.shared.registry
    }

    pub fn catalog(&self) -> &Arc<CompositionCatalog> {
        &self.shared.catalog
    }

    /// Validate, then atomically write a document to YAML and apply it.
    ///
    /// Writes to a `.tmp` file first, then renames to the final path to
    /// avoid partial writes on crash. Documents loaded from a file keep
    /// that file; new ones go to `atoms/<id>.yml` or `compositions/<id>.yml`.
    pub fn write_document(&self, doc: &RuleDocument) -> Result<PathBuf> {
        let _guard = self.writes.lock().expect("write lock poisoned");
        self.write_locked(doc)
    }

    /// Like [`write_document`](Self::write_document), but refuses an id
    /// already loaded for that kind with [`RuleError::AlreadyExists`].
    pub fn create_document(&self, doc: &RuleDocument) -> Result<PathBuf> {
        let _guard = self.writes.lock().expect("write lock poisoned");
        if self.shared.contains(doc.kind(), doc.id()) {
            return Err(RuleError::AlreadyExists {
                kind: doc.kind(),
                id: doc.id().to_string(),
            });
        }
        self.write_locked(doc)
    }

    fn write_locked(&self, doc: &RuleDocument) -> Result<PathBuf> {
        let kind = doc.kind();
        let id = doc.id().to_string();
        check_id(&id)?;

        let known = self.shared.registry.ids();
        let known: Vec<&str> = known.iter().map(String::as_str).collect();
        let check = validation::validate_document(doc, Some(known.as_slice()));
        if !check.valid {
            return Err(RuleError::Validation(check.summary()));
        }

        let final_path = self
            .path_of(kind, &id)
            .unwrap_or_else(|| self.default_path(kind, &id));
        if let Some((other_kind, other_id)) = self.owner_of(&final_path) {
            if other_kind != kind || other_id != id {
                return Err(RuleError::Validation(format!(
                    "{} already holds {} '{}'",
                    final_path.display(),
                    other_kind,
                    other_id
                )));
            }
        }

        let dir = final_path.parent().unwrap_or(&self.rules_dir);
        fs::create_dir_all(dir)?;
        let tmp_path = dir.join(format!(".{}.tmp", id));

        let yaml = doc.to_yaml()?;
        fs::write(&tmp_path, yaml)?;
        fs::rename(&tmp_path, &final_path)?;

        info!(id = %id, kind = %kind, path = %final_path.display(), "wrote document");

        self.shared.apply(doc.clone(), &final_path, true)?;
        Ok(final_path)
    }

    /// Flip an atom's `enabled` flag and persist it.
    pub fn set_atom_enabled(&self, atom_id: &str, enabled: bool) -> Result<RuleDocument> {
        let _guard = self.writes.lock().expect("write lock poisoned");
        let atom = self.shared.registry.get(atom_id).map_err(|_| RuleError::NotFound {
            kind: RuleKind::EligibilityAtom,
            id: atom_id.to_string(),
        })?;
        let mut atom = (*atom).clone();
        atom.metadata.enabled = enabled;
        let doc = RuleDocument::Atom(atom);
        self.write_locked(&doc)?;
        Ok(doc)
    }

    /// Delete a document file and drop it from memory.
    ///
    /// Atoms still referenced by a loaded composition are refused with
    /// [`RuleError::Referenced`].
    pub fn delete_document(&self, kind: RuleKind, id: &str) -> Result<()> {
        let _guard = self.writes.lock().expect("write lock poisoned");
        if !self.shared.contains(kind, id) {
            return Err(RuleError::NotFound { kind, id: id.to_string() });
        }

        if kind == RuleKind::EligibilityAtom {
            let compositions = self.shared.catalog.referencing(id);
            if !compositions.is_empty() {
                return Err(RuleError::Referenced {
                    atom_id: id.to_string(),
                    compositions,
                });
            }
        }

        let key = (kind, id.to_string());
        let indexed = self.shared.index.write().expect("index lock poisoned").remove(&key);
        let path = indexed.or_else(|| is_path_safe(id).then(|| self.default_path(kind, id)));
        if let Some(path) = path.filter(|p| p.exists()) {
            fs::remove_file(&path)?;
        }

        self.shared.forget(&kind, id);
        info!(id = %id, kind = %kind, "deleted document");
        Ok(())
    }

    /// Where a document that was never loaded from disk is written.
    fn default_path(&self, kind: RuleKind, id: &str) -> PathBuf {
        let subdir = match kind {
            RuleKind::EligibilityAtom => "atoms",
            RuleKind::RuleComposition => "compositions",
        };
        self.rules_dir.join(subdir).join(format!("{}.yml", id))
    }

    /// The loaded document whose file is `path`, if any.
    fn owner_of(&self, path: &Path) -> Option<(RuleKind, String)> {
        self.shared
            .index
            .read()
            .expect("index lock poisoned")
            .iter()
            .find(|(_, p)| p.as_path() == path)
            .map(|(k, _)| k.clone())
    }

    fn path_of(&self, kind: RuleKind, id: &str) -> Option<PathBuf> {
        self.shared
            .index
            .read()
            .expect("index lock poisoned")
            .get(&(kind, id.to_string()))
            .cloned()
    }
}

/// Ids become file names; anything that could leave the kind directory is refused.
fn check_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(RuleError::Validation("metadata.id must not be empty".to_string()));
    }
    if !is_path_safe(id) {
        return Err(RuleError::Validation(format!(
            "metadata.id '{}' must not contain '/', '\\', '..' or start with '.'",
            id
        )));
    }
    Ok(())
}

/// Two-pass parse of YAML text, rejecting documents without an id.
pub(super) fn parse_yaml(contents: &str) -> Result<RuleDocument> {
    let envelope: RuleEnvelope = serde_yaml::from_str(contents)?;

    if envelope.metadata.id.is_empty() {
        return Err(RuleError::Validation("metadata.id must not be empty".to_string()));
    }

    envelope
        .parse_full()
        .map_err(|e| RuleError::Validation(format!("failed to parse '{}': {}", envelope.metadata.id, e)))
}

pub(super) fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}
