//! Events flowing from the backend worker to the egui thread.

use client_core::PhonebookSnapshot;

pub enum UiEvent {
    /// Fresh controller state after an operation or a notification change.
    Snapshot(PhonebookSnapshot),
    /// The worker could not start; the window stays up to show why.
    FatalStartup(String),
}
