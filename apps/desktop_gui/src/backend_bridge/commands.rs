//! Backend commands queued from UI to backend worker.

use shared::domain::PersonId;

pub enum BackendCommand {
    ReloadPersons,
    Submit { name: String, number: String },
    Delete { id: PersonId, name: String },
}
