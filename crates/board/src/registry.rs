//! `BoardRegistry`: every `*.json` manifest in a directory, keyed by file stem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::BoardConfig;
use crate::BoardError;

/// Boards known to the build, looked up by identifier.
#[derive(Debug, Clone, Default)]
pub struct BoardRegistry {
    dir: PathBuf,
    boards: BTreeMap<String, BoardConfig>,
}

impl BoardRegistry {
    /// Load all manifests under `dir`.
    ///
    /// Non-JSON files are skipped; a malformed manifest fails the whole load
    /// so that a typo never silently hides a board.
    pub fn open(dir: &Path) -> Result<Self, BoardError> {
        let io = |source: std::io::Error| BoardError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut boards = BTreeMap::new();
        for entry in std::fs::read_dir(dir).map_err(io)? {
            let path = entry.map_err(io)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let board = BoardConfig::load(&path)?;
            tracing::debug!(board = id, path = %path.display(), "loaded board manifest");
            boards.insert(id.to_owned(), board);
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            boards,
        })
    }

    /// Register a manifest under `id`, replacing any previous one.
    pub fn insert(&mut self, id: impl Into<String>, board: BoardConfig) {
        self.boards.insert(id.into(), board);
    }

    /// Look up a board by identifier.
    pub fn get(&self, id: &str) -> Result<&BoardConfig, BoardError> {
        self.boards.get(id).ok_or_else(|| BoardError::NotFound { id: id.to_owned() })
    }

    /// Known identifiers, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.boards.keys().map(String::as_str)
    }

    /// Directory the manifests were loaded from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
