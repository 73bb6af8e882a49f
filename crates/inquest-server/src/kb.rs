//! Process-wide knowledge base shared by every session.
//!
//! - readers take a cheap `Arc` snapshot and never block each other;
//! - the learner write-locks exactly the one character it updates;
//! - file writes are serialized and go through a temp file plus rename.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{Level, event};

use inquest_bot::CharacterUpdate;
use inquest_core::model::{Catalog, CatalogError, Character, CharacterId, Question};

pub struct SharedKb {
    questions: Vec<Question>,
    index: HashMap<CharacterId, usize>,
    cells: Vec<RwLock<Character>>,
    cached: RwLock<Arc<Catalog>>,
    write: Mutex<()>,
    path: Option<PathBuf>,
}

impl SharedKb {
    /// Loads the catalog file. `persist` controls whether confirmed updates
    /// are written back to the same path.
    pub fn open(path: &Path, persist: bool) -> Result<Self, CatalogError> {
        let catalog = Catalog::from_path(path)?;
        Ok(Self::build(catalog, persist.then(|| path.to_path_buf())))
    }

    /// Wraps an in-memory catalog with no backing file.
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self::build(catalog, None)
    }

    fn build(catalog: Catalog, path: Option<PathBuf>) -> Self {
        let questions = catalog.questions().to_vec();
        let index = catalog
            .characters()
            .iter()
            .enumerate()
            .map(|(idx, character)| (character.id.clone(), idx))
            .collect();
        let cells = catalog
            .characters()
            .iter()
            .cloned()
            .map(RwLock::new)
            .collect();
        Self {
            questions,
            index,
            cells,
            cached: RwLock::new(Arc::new(catalog)),
            write: Mutex::new(()),
            path,
        }
    }

    /// Current catalog, shared with whoever already holds it. New sessions
    /// capture one of these and keep it for their whole game.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.cached.read().clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Applies one confirmed game's deltas to its character, then refreshes
    /// the snapshot handed to future sessions.
    pub fn apply(&self, update: &CharacterUpdate) -> Result<(), KbError> {
        let idx = *self
            .index
            .get(&update.character)
            .ok_or_else(|| KbError::UnknownCharacter(update.character.clone()))?;

        {
            let mut character = self.cells[idx].write();
            update.apply_to_character(&mut character);
        }

        let _serial = self.write.lock();
        let characters: Vec<Character> =
            self.cells.iter().map(|cell| cell.read().clone()).collect();
        let rebuilt = Catalog::new(characters, self.questions.clone())?;
        *self.cached.write() = Arc::new(rebuilt);
        Ok(())
    }

    /// Writes the current snapshot back to the backing file, if any.
    /// Returns false for a memory-only store.
    pub fn persist(&self) -> Result<bool, KbError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };

        let _serial = self.write.lock();
        let snapshot = self.cached.read().clone();
        snapshot.save(path).map_err(|source| KbError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
        event!(
            target: "inquest_server::kb",
            Level::DEBUG,
            path = %path.display(),
            "catalog persisted",
        );
        Ok(true)
    }
}

#[derive(Debug, Error)]
pub enum KbError {
    #[error("learned update names unknown character `{0}`")]
    UnknownCharacter(CharacterId),
    #[error("rebuilding the catalog snapshot failed: {0}")]
    Snapshot(#[from] CatalogError),
    #[error("failed to persist catalog to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}
