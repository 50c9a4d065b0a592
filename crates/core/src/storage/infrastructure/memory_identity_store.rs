use std::collections::HashMap;

use crate::shared::person::Person;
use crate::shared::photo::Photo;
use crate::storage::domain::identity_store::IdentityStore;

/// HashMap-backed store. The default for tests, the CLI without a store
/// file, and embedding hosts that persist elsewhere.
#[derive(Default)]
pub struct MemoryIdentityStore {
    photos: HashMap<String, Photo>,
    persons: Vec<Person>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_photos(photos: Vec<Photo>) -> Self {
        Self {
            photos: photos.into_iter().map(|p| (p.id.clone(), p)).collect(),
            persons: Vec::new(),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn all_photos(&self) -> Result<Vec<Photo>, Box<dyn std::error::Error>> {
        let mut photos: Vec<Photo> = self.photos.values().cloned().collect();
        photos.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(photos)
    }

    fn save_photo(&mut self, photo: &Photo) -> Result<(), Box<dyn std::error::Error>> {
        self.photos.insert(photo.id.clone(), photo.clone());
        Ok(())
    }

    fn remove_photo(&mut self, photo_id: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.photos.remove(photo_id);
        Ok(())
    }

    fn all_persons(&self) -> Result<Vec<Person>, Box<dyn std::error::Error>> {
        Ok(self.persons.clone())
    }

    fn replace_all_persons(
        &mut self,
        persons: Vec<Person>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.persons = persons;
        Ok(())
    }
}
