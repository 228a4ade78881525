use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{Person, PersonDraft, PersonId},
    error::ApiError,
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use url::Url;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("persons service unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("person not found")]
    NotFound,
    #[error("persons service rejected the request: {message}")]
    Validation { message: String },
    #[error("unexpected persons service status {status}")]
    UnexpectedStatus { status: u16 },
}

/// The remote collaborator: a conventional REST resource holding the
/// phonebook. All mutations go through here before local state changes.
#[async_trait]
pub trait PersonsService: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Person>, ServiceError>;
    async fn create(&self, draft: &PersonDraft) -> Result<Person, ServiceError>;
    async fn update(&self, id: PersonId, draft: &PersonDraft) -> Result<Person, ServiceError>;
    async fn delete(&self, id: PersonId) -> Result<(), ServiceError>;
}

/// Blocking dialog capability. `confirm` must not return until the user
/// answered; implementations decide what a dialog looks like.
pub trait UserPrompt: Send + Sync {
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
}

/// Null object for headless embedders: alerts go to the log, every
/// confirmation is declined.
pub struct DenyingPrompt;

impl UserPrompt for DenyingPrompt {
    fn alert(&self, message: &str) {
        tracing::warn!(message, "no dialog surface attached; alert dropped");
    }

    fn confirm(&self, message: &str) -> bool {
        tracing::warn!(message, "no dialog surface attached; declining");
        false
    }
}

pub struct HttpPersonsService {
    http: Client,
    base_url: String,
}

impl HttpPersonsService {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/api/persons", self.base_url)
    }

    fn member_url(&self, id: PersonId) -> String {
        format!("{}/api/persons/{}", self.base_url, id.0)
    }

    async fn error_from_response(resp: reqwest::Response) -> ServiceError {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return ServiceError::NotFound;
        }
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|api| api.error)
                .unwrap_or_else(|_| {
                    if body.is_empty() {
                        status.to_string()
                    } else {
                        body
                    }
                });
            return ServiceError::Validation { message };
        }
        ServiceError::UnexpectedStatus {
            status: status.as_u16(),
        }
    }
}

#[async_trait]
impl PersonsService for HttpPersonsService {
    async fn get_all(&self) -> Result<Vec<Person>, ServiceError> {
        let resp = self.http.get(self.collection_url()).send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn create(&self, draft: &PersonDraft) -> Result<Person, ServiceError> {
        let resp = self
            .http
            .post(self.collection_url())
            .json(draft)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn update(&self, id: PersonId, draft: &PersonDraft) -> Result<Person, ServiceError> {
        let resp = self
            .http
            .put(self.member_url(id))
            .json(draft)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn delete(&self, id: PersonId) -> Result<(), ServiceError> {
        let resp = self.http.delete(self.member_url(id)).send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Transient status message shown by the view layer until its timer fires
/// or a newer notification supersedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhonebookConfig {
    /// Clear the name/number inputs after a successful create.
    pub clear_inputs_after_create: bool,
    /// Surface a timed error notification when a submit is rejected for
    /// being too short, instead of staying silent.
    pub announce_rejected_input: bool,
    pub notification_ttl: Duration,
}

impl Default for PhonebookConfig {
    fn default() -> Self {
        Self {
            clear_inputs_after_create: false,
            announce_rejected_input: false,
            notification_ttl: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PhonebookEvent {
    PersonsLoaded(Vec<Person>),
    PersonCreated(Person),
    PersonUpdated(Person),
    PersonDeleted(PersonId),
    NotificationSet(Notification),
    NotificationCleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(Person),
    Updated(Person),
    UpdateDeclined,
    UpdateFailed,
    DuplicateNumber,
    CreateFailed,
    InputRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct PhonebookSnapshot {
    pub persons: Vec<Person>,
    pub name_input: String,
    pub number_input: String,
    pub search_input: String,
    pub notification: Option<Notification>,
}

#[derive(Debug, Default)]
struct PhonebookState {
    persons: Vec<Person>,
    name_input: String,
    number_input: String,
    search_input: String,
}

#[derive(Debug, Default)]
struct NotificationSlot {
    seq: u64,
    current: Option<Notification>,
}

/// Visible subset for a search string: the whole list when the search is
/// empty, otherwise case-insensitive substring match on the name.
pub fn filter_persons(persons: &[Person], search: &str) -> Vec<Person> {
    if search.is_empty() {
        return persons.to_vec();
    }
    let needle = search.to_lowercase();
    persons
        .iter()
        .filter(|person| person.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// The contact list controller. Owns the cached list, the form inputs and
/// the current notification; every mutation is confirmed by the persons
/// service before local state changes.
pub struct Phonebook {
    service: Arc<dyn PersonsService>,
    prompt: Arc<dyn UserPrompt>,
    config: PhonebookConfig,
    state: Mutex<PhonebookState>,
    notification: Arc<Mutex<NotificationSlot>>,
    events: broadcast::Sender<PhonebookEvent>,
}

impl Phonebook {
    pub fn new(
        service: Arc<dyn PersonsService>,
        prompt: Arc<dyn UserPrompt>,
        config: PhonebookConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            service,
            prompt,
            config,
            state: Mutex::new(PhonebookState::default()),
            notification: Arc::new(Mutex::new(NotificationSlot::default())),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PhonebookEvent> {
        self.events.subscribe()
    }

    pub async fn set_name_input(&self, value: impl Into<String>) {
        self.state.lock().await.name_input = value.into();
    }

    pub async fn set_number_input(&self, value: impl Into<String>) {
        self.state.lock().await.number_input = value.into();
    }

    pub async fn set_search_input(&self, value: impl Into<String>) {
        self.state.lock().await.search_input = value.into();
    }

    pub async fn snapshot(&self) -> PhonebookSnapshot {
        let state = self.state.lock().await;
        let notification = self.notification.lock().await.current.clone();
        PhonebookSnapshot {
            persons: state.persons.clone(),
            name_input: state.name_input.clone(),
            number_input: state.number_input.clone(),
            search_input: state.search_input.clone(),
            notification,
        }
    }

    pub async fn current_notification(&self) -> Option<Notification> {
        self.notification.lock().await.current.clone()
    }

    /// Derived view of the list under the current search input.
    pub async fn visible_persons(&self) -> Vec<Person> {
        let state = self.state.lock().await;
        filter_persons(&state.persons, &state.search_input)
    }

    /// Startup fetch. Replaces the list wholesale on success; on failure the
    /// list stays empty and the user gets a blocking alert, no retry.
    pub async fn load(&self) -> LoadOutcome {
        match self.service.get_all().await {
            Ok(persons) => {
                let count = persons.len();
                self.state.lock().await.persons = persons.clone();
                let _ = self.events.send(PhonebookEvent::PersonsLoaded(persons));
                LoadOutcome::Loaded(count)
            }
            Err(err) => {
                tracing::error!(error = %err, "initial persons fetch failed");
                self.prompt.alert("data could not be found");
                LoadOutcome::Failed
            }
        }
    }

    /// Add-or-update from the current form inputs. Conflict checks run in a
    /// fixed order: name match, then number match, then the length gate.
    pub async fn submit(&self) -> SubmitOutcome {
        let (name, number, existing, number_taken) = {
            let state = self.state.lock().await;
            let name = state.name_input.clone();
            let number = state.number_input.clone();
            let needle = name.to_lowercase();
            let existing = state
                .persons
                .iter()
                .find(|person| person.name.to_lowercase() == needle)
                .cloned();
            let number_taken = state.persons.iter().any(|person| person.number == number);
            (name, number, existing, number_taken)
        };

        if let Some(existing) = existing {
            return self.update_existing(existing, number).await;
        }

        if number_taken {
            self.prompt.alert("That number is already registered");
            return SubmitOutcome::DuplicateNumber;
        }

        if name.chars().count() > 1 && number.chars().count() > 1 {
            return self.create_person(name, number).await;
        }

        tracing::debug!(%name, %number, "submit rejected: inputs too short");
        if self.config.announce_rejected_input {
            self.notify(Notification::error("name and number are both required"))
                .await;
        }
        SubmitOutcome::InputRejected
    }

    /// Confirm-then-delete for one row. Nothing is removed locally until the
    /// service acknowledged the delete.
    pub async fn delete(&self, id: PersonId, name: &str) -> DeleteOutcome {
        if !self.prompt.confirm(&format!("Delete {name}?")) {
            return DeleteOutcome::Declined;
        }
        match self.service.delete(id).await {
            Ok(()) => {
                self.prompt.alert(&format!("Deleted {name}"));
                self.state
                    .lock()
                    .await
                    .persons
                    .retain(|person| person.id != id);
                let _ = self.events.send(PhonebookEvent::PersonDeleted(id));
                DeleteOutcome::Deleted
            }
            Err(err) => {
                tracing::warn!(person_id = id.0, error = %err, "delete failed");
                self.prompt.alert("something went wrong");
                DeleteOutcome::Failed
            }
        }
    }

    async fn update_existing(&self, existing: Person, number: String) -> SubmitOutcome {
        self.prompt
            .alert(&format!("{} is already added to phonebook", existing.name));
        let question = format!(
            "Do you want to update {}'s number with {}?",
            existing.name, number
        );
        if !self.prompt.confirm(&question) {
            return SubmitOutcome::UpdateDeclined;
        }

        let draft = PersonDraft::new(existing.name.clone(), number);
        match self.service.update(existing.id, &draft).await {
            Ok(updated) => {
                {
                    let mut state = self.state.lock().await;
                    if let Some(slot) = state
                        .persons
                        .iter_mut()
                        .find(|person| person.id == updated.id)
                    {
                        *slot = updated.clone();
                    }
                }
                let _ = self
                    .events
                    .send(PhonebookEvent::PersonUpdated(updated.clone()));
                SubmitOutcome::Updated(updated)
            }
            Err(err) => {
                tracing::warn!(person_id = existing.id.0, error = %err, "update rejected");
                self.notify(Notification::error(format!(
                    "{}'s number was not updated. The entered number must be longer than 8 characters",
                    existing.name
                )))
                .await;
                SubmitOutcome::UpdateFailed
            }
        }
    }

    async fn create_person(&self, name: String, number: String) -> SubmitOutcome {
        let draft = PersonDraft::new(name, number);
        match self.service.create(&draft).await {
            Ok(created) => {
                {
                    let mut state = self.state.lock().await;
                    match state
                        .persons
                        .iter_mut()
                        .find(|person| person.id == created.id)
                    {
                        Some(slot) => *slot = created.clone(),
                        None => state.persons.push(created.clone()),
                    }
                    if self.config.clear_inputs_after_create {
                        state.name_input.clear();
                        state.number_input.clear();
                    }
                }
                let _ = self
                    .events
                    .send(PhonebookEvent::PersonCreated(created.clone()));
                self.notify(Notification::info(format!(
                    "{} was successfully created.",
                    created.name
                )))
                .await;
                SubmitOutcome::Created(created)
            }
            Err(err) => {
                tracing::warn!(error = %err, "create rejected");
                self.notify(Notification::error(
                    "the person could not be created. Enter a name longer than 3 characters and a number longer than 8 characters",
                ))
                .await;
                SubmitOutcome::CreateFailed
            }
        }
    }

    async fn notify(&self, notification: Notification) {
        let seq = {
            let mut slot = self.notification.lock().await;
            slot.seq += 1;
            slot.current = Some(notification.clone());
            slot.seq
        };
        let _ = self
            .events
            .send(PhonebookEvent::NotificationSet(notification));

        let slot = Arc::clone(&self.notification);
        let events = self.events.clone();
        let ttl = self.config.notification_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut slot = slot.lock().await;
            // A superseding notification bumped the sequence; stale timers
            // must stand down.
            if slot.seq == seq {
                slot.current = None;
                let _ = events.send(PhonebookEvent::NotificationCleared);
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
