use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::person::Person;
use crate::shared::photo::Photo;
use crate::storage::domain::identity_store::IdentityStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read store at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write store at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed store at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Default, Serialize, Deserialize)]
struct StoreFile {
    photos: Vec<Photo>,
    persons: Vec<Person>,
}

/// Single-JSON-file store.
///
/// Every write lands in a temp file first and renames into place, so a
/// crash mid-write leaves the previous state intact and `replace_all_persons`
/// is observable only as a whole.
pub struct JsonIdentityStore {
    path: PathBuf,
    state: StoreFile,
}

impl JsonIdentityStore {
    /// Opens the store, reading existing state. A missing file is an empty
    /// collection, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
                    path: path.clone(),
                    source: e,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => {
                return Err(StoreError::Read {
                    path,
                    source: e,
                })
            }
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(&self.state).map_err(|e| StoreError::Malformed {
                path: self.path.clone(),
                source: e,
            })?;

        let temp_path = self.path.with_extension("part");
        fs::write(&temp_path, &bytes).map_err(|e| StoreError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(())
    }
}

impl IdentityStore for JsonIdentityStore {
    fn all_photos(&self) -> Result<Vec<Photo>, Box<dyn std::error::Error>> {
        let mut photos = self.state.photos.clone();
        photos.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(photos)
    }

    fn save_photo(&mut self, photo: &Photo) -> Result<(), Box<dyn std::error::Error>> {
        self.state.photos.retain(|p| p.id != photo.id);
        self.state.photos.push(photo.clone());
        self.persist()?;
        Ok(())
    }

    fn remove_photo(&mut self, photo_id: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.state.photos.retain(|p| p.id != photo_id);
        self.persist()?;
        Ok(())
    }

    fn all_persons(&self) -> Result<Vec<Person>, Box<dyn std::error::Error>> {
        Ok(self.state.persons.clone())
    }

    fn replace_all_persons(
        &mut self,
        persons: Vec<Person>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let previous = std::mem::replace(&mut self.state.persons, persons);
        if let Err(e) = self.persist() {
            // Keep in-memory state consistent with what is on disk.
            self.state.persons = previous;
            return Err(e.into());
        }
        Ok(())
    }
}
