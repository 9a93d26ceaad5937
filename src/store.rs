use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ir::Project;
use crate::layout::LayoutSnapshot;

pub const SAVED_PROJECTS_KEY: &str = "savedProjects";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode saved projects: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
}

/// String key-value persistence, the shape of browser local storage.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let staging = path.with_extension("json.partial");
        std::fs::write(&staging, value)?;
        std::fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProject {
    pub project: Project,
    pub layout: LayoutSnapshot,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Saved projects, hydrated from storage on creation and cleared on
/// teardown. Hosts inject it instead of reaching for ambient storage.
pub struct ProjectStore {
    storage: Box<dyn Storage>,
    projects: BTreeMap<String, SavedProject>,
}

impl ProjectStore {
    /// Loads saved projects. Unreadable or corrupt data yields an empty
    /// store; the broken blob is left in place until the next save.
    pub fn hydrate(storage: Box<dyn Storage>) -> Self {
        let projects = match storage.get(SAVED_PROJECTS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<SavedProject>>(&raw) {
                Ok(saved) => saved
                    .into_iter()
                    .map(|entry| (entry.project.key().to_string(), entry))
                    .collect(),
                Err(err) => {
                    tracing::warn!(error = %err, "saved projects are corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                tracing::warn!(error = %err, "saved projects unreadable, starting empty");
                BTreeMap::new()
            }
        };
        tracing::debug!(count = projects.len(), "project store hydrated");
        Self { storage, projects }
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SavedProject> {
        self.projects.get(key)
    }

    pub fn list(&self) -> impl Iterator<Item = &SavedProject> {
        self.projects.values()
    }

    /// Inserts or replaces the project. A replacement keeps the original
    /// `saved_at` and stamps `updated_at`.
    pub fn save(&mut self, project: &Project, layout: LayoutSnapshot) -> Result<&SavedProject, StoreError> {
        self.save_at(project, layout, Utc::now())
    }

    fn save_at(
        &mut self,
        project: &Project,
        layout: LayoutSnapshot,
        now: DateTime<Utc>,
    ) -> Result<&SavedProject, StoreError> {
        let key = project.key().to_string();
        let entry = match self.projects.remove(&key) {
            Some(existing) => SavedProject {
                project: project.clone(),
                layout,
                saved_at: existing.saved_at,
                updated_at: Some(now),
            },
            None => SavedProject {
                project: project.clone(),
                layout,
                saved_at: now,
                updated_at: None,
            },
        };
        self.projects.insert(key.clone(), entry);
        self.persist()?;
        self.projects
            .get(&key)
            .ok_or_else(|| StoreError::InvalidKey(key.clone()))
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<SavedProject>, StoreError> {
        let removed = self.projects.remove(key);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Sign-out: forgets everything in memory and in storage.
    pub fn teardown(&mut self) -> Result<(), StoreError> {
        self.projects.clear();
        self.storage.clear()
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let saved: Vec<&SavedProject> = self.projects.values().collect();
        let raw = serde_json::to_string(&saved)?;
        self.storage.set(SAVED_PROJECTS_KEY, &raw)
    }
}
