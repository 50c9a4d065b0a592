use crate::shared::person::Person;
use crate::shared::photo::Photo;

/// Domain interface for the persistence layer.
///
/// `replace_all_persons` is transactional: clear plus bulk insert as one
/// unit, so readers never observe a partially swapped person set.
pub trait IdentityStore: Send {
    fn all_photos(&self) -> Result<Vec<Photo>, Box<dyn std::error::Error>>;

    fn save_photo(&mut self, photo: &Photo) -> Result<(), Box<dyn std::error::Error>>;

    fn remove_photo(&mut self, photo_id: &str) -> Result<(), Box<dyn std::error::Error>>;

    fn all_persons(&self) -> Result<Vec<Person>, Box<dyn std::error::Error>>;

    fn replace_all_persons(
        &mut self,
        persons: Vec<Person>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
