use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    core::state::{ListSnapshot, ListState, Submission},
    error::ListError,
    record::Entity,
    remote::{RecordStore, StoreError, StoreResult},
    view::projection::Projection,
};

use super::events::{ListEvent, Notification};

/// Tuning for a spawned list manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Rows per page.
    pub page_size: usize,
    /// Capacity of the command channel.
    pub command_queue_bound: usize,
    /// Capacity of the broadcast event channel.
    pub event_capacity: usize,
    /// Issue a load as soon as the task starts, like a page fetching on mount.
    pub load_on_spawn: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            command_queue_bound: 256,
            event_capacity: 1024,
            load_on_spawn: true,
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, ListError>>;

/// Cloneable handle to a running list manager.
pub struct ListHandle<E: Entity> {
    cmd_tx: mpsc::Sender<Command<E>>,
    events_tx: broadcast::Sender<ListEvent>,
}

impl<E: Entity> Clone for ListHandle<E> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command<E: Entity> {
    Load {
        resp: Reply<usize>,
    },
    Submit {
        resp: Reply<E>,
    },
    RemovalPrompt {
        key: E::Key,
        resp: Reply<String>,
    },
    Remove {
        key: E::Key,
        resp: Reply<()>,
    },
    ToggleStatus {
        key: E::Key,
        resp: Reply<()>,
    },
    BeginCreate {
        resp: Reply<()>,
    },
    BeginEdit {
        key: E::Key,
        resp: Reply<()>,
    },
    SetField {
        name: String,
        value: String,
        resp: Reply<()>,
    },
    SetDraft {
        draft: E,
        resp: Reply<()>,
    },
    CancelForm {
        resp: oneshot::Sender<()>,
    },
    SetSearch {
        text: String,
        resp: oneshot::Sender<Projection<E>>,
    },
    SetFilter {
        field: String,
        value: String,
        resp: oneshot::Sender<Projection<E>>,
    },
    ClearFilters {
        resp: oneshot::Sender<Projection<E>>,
    },
    SetPage {
        page: usize,
        resp: oneshot::Sender<Projection<E>>,
    },
    Tally {
        field: String,
        resp: oneshot::Sender<Vec<(String, usize)>>,
    },
    Snapshot {
        resp: oneshot::Sender<ListSnapshot<E>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

enum Completion<E: Entity> {
    Loaded(StoreResult<Vec<E>>),
    Submitted {
        create: bool,
        result: StoreResult<E>,
        resp: Reply<E>,
    },
    Removed {
        key: E::Key,
        result: StoreResult<()>,
        resp: Reply<()>,
    },
    Toggled {
        key: E::Key,
        result: StoreResult<E>,
        resp: Reply<()>,
    },
}

/// Caller waiting for a load to land.
enum Waiter<E: Entity> {
    Load(Reply<usize>),
    Submit(Reply<E>, E),
    Mutation(Reply<()>),
}

/// Failed load shared by every waiter joined on it. The first load waiter
/// receives the original error; later ones get its message.
struct LoadFailure {
    original: Option<ListError>,
    message: String,
}

impl LoadFailure {
    fn new(err: ListError) -> Self {
        let message = match &err {
            ListError::Transport(source) => source.to_string(),
            other => other.to_string(),
        };
        Self {
            original: Some(err),
            message,
        }
    }

    fn take(&mut self) -> ListError {
        self.original
            .take()
            .unwrap_or_else(|| ListError::Transport(StoreError::Message(self.message.clone())))
    }
}

impl<E: Entity> Waiter<E> {
    fn resolve(self, outcome: &mut Result<usize, LoadFailure>) {
        match self {
            Self::Load(resp) => {
                let out = match outcome {
                    Ok(count) => Ok(*count),
                    Err(failure) => Err(failure.take()),
                };
                let _ = resp.send(out);
            }
            // The mutation itself succeeded; a failed refetch is reported
            // through a notification and leaves the collection stale.
            Self::Submit(resp, saved) => {
                let _ = resp.send(Ok(saved));
            }
            Self::Mutation(resp) => {
                let _ = resp.send(Ok(()));
            }
        }
    }
}

/// Spawns the single-writer task owning the list state of `E` and `store`.
pub fn spawn_list_manager<E, S>(store: S, config: ManagerConfig) -> ListHandle<E>
where
    E: Entity,
    S: RecordStore<E>,
{
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command<E>>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<ListEvent>(config.event_capacity.max(1));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion<E>>();

    let mut driver = Driver {
        state: ListState::new(config.page_size),
        store: Arc::new(store),
        events_tx: events_tx.clone(),
        done_tx,
        load_waiters: Vec::new(),
        queued_waiters: Vec::new(),
        reload_queued: false,
    };

    tokio::spawn(async move {
        if config.load_on_spawn {
            driver.request_load(None);
        }

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    if driver.handle_command(cmd) {
                        break;
                    }
                }
                Some(done) = done_rx.recv() => {
                    driver.handle_completion(done);
                }
            }
        }
        // Completions still in flight find `done_rx` gone and are dropped.
        debug!("{} list manager stopped", E::LABEL);
    });

    ListHandle { cmd_tx, events_tx }
}

/// Removal awaiting the caller's confirmation.
pub struct RemovalRequest<E: Entity> {
    handle: ListHandle<E>,
    key: E::Key,
    prompt: String,
}

impl<E: Entity> RemovalRequest<E> {
    /// Text to put in front of the user, e.g. "Are you sure you want to
    /// delete Dr. Smith?".
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Key of the record to delete.
    pub fn key(&self) -> &E::Key {
        &self.key
    }

    /// Deletes the record and waits for the refetch.
    pub async fn confirm(self) -> Result<(), ListError> {
        let key = self.key;
        self.handle
            .request(|resp| Command::Remove { key, resp })
            .await?
    }

    /// Drops the request without contacting the store.
    pub fn cancel(self) {}
}

impl<E: Entity> ListHandle<E> {
    /// Subscribes to loads and notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events_tx.subscribe()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command<E>,
    ) -> Result<T, ListError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| ListError::ChannelClosed)?;
        rx.await.map_err(|_| ListError::ChannelClosed)
    }

    /// Fetches the whole collection. Joins a load already in flight.
    pub async fn load(&self) -> Result<usize, ListError> {
        self.request(|resp| Command::Load { resp }).await?
    }

    /// Sends the form to the store and waits for the refetch.
    pub async fn submit(&self) -> Result<E, ListError> {
        self.request(|resp| Command::Submit { resp }).await?
    }

    /// Starts a removal that only reaches the store once confirmed.
    pub async fn request_removal(&self, key: E::Key) -> Result<RemovalRequest<E>, ListError> {
        let prompt = self
            .request(|resp| Command::RemovalPrompt {
                key: key.clone(),
                resp,
            })
            .await??;
        Ok(RemovalRequest {
            handle: self.clone(),
            key,
            prompt,
        })
    }

    /// Flips the binary status of the loaded record under `key`.
    pub async fn toggle_status(&self, key: E::Key) -> Result<(), ListError> {
        self.request(|resp| Command::ToggleStatus { key, resp })
            .await?
    }

    /// Opens an empty creation form. Rejected while a submit is in flight.
    pub async fn begin_create(&self) -> Result<(), ListError> {
        self.request(|resp| Command::BeginCreate { resp }).await?
    }

    /// Opens the form on the loaded record under `key`.
    pub async fn begin_edit(&self, key: E::Key) -> Result<(), ListError> {
        self.request(|resp| Command::BeginEdit { key, resp }).await?
    }

    /// Sets one draft field from text.
    pub async fn set_field(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ListError> {
        let (name, value) = (name.into(), value.into());
        self.request(|resp| Command::SetField { name, value, resp })
            .await?
    }

    /// Replaces the whole draft.
    pub async fn set_draft(&self, draft: E) -> Result<(), ListError> {
        self.request(|resp| Command::SetDraft { draft, resp }).await?
    }

    /// Closes the form. Ignored while a submit is in flight.
    pub async fn cancel_form(&self) -> Result<(), ListError> {
        self.request(|resp| Command::CancelForm { resp }).await
    }

    /// Sets the search text and returns the new page.
    pub async fn set_search(&self, text: impl Into<String>) -> Result<Projection<E>, ListError> {
        let text = text.into();
        self.request(|resp| Command::SetSearch { text, resp }).await
    }

    /// Sets or, with an empty value, clears one filter.
    pub async fn set_filter(
        &self,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Projection<E>, ListError> {
        let (field, value) = (field.into(), value.into());
        self.request(|resp| Command::SetFilter { field, value, resp })
            .await
    }

    /// Drops every filter.
    pub async fn clear_filters(&self) -> Result<Projection<E>, ListError> {
        self.request(|resp| Command::ClearFilters { resp }).await
    }

    /// Selects a page; out-of-range values are clamped.
    pub async fn set_page(&self, page: usize) -> Result<Projection<E>, ListError> {
        self.request(|resp| Command::SetPage { page, resp }).await
    }

    /// Value counts of `field` over the filtered records.
    pub async fn tally(&self, field: impl Into<String>) -> Result<Vec<(String, usize)>, ListError> {
        let field = field.into();
        self.request(|resp| Command::Tally { field, resp }).await
    }

    /// Copies the current state.
    pub async fn snapshot(&self) -> Result<ListSnapshot<E>, ListError> {
        self.request(|resp| Command::Snapshot { resp }).await
    }

    /// Stops the manager. Responses still in flight are discarded.
    pub async fn shutdown(&self) -> Result<(), ListError> {
        self.request(|resp| Command::Shutdown { resp }).await
    }
}

struct Driver<E: Entity, S: RecordStore<E>> {
    state: ListState<E>,
    store: Arc<S>,
    events_tx: broadcast::Sender<ListEvent>,
    done_tx: mpsc::UnboundedSender<Completion<E>>,
    load_waiters: Vec<Waiter<E>>,
    queued_waiters: Vec<Waiter<E>>,
    reload_queued: bool,
}

impl<E: Entity, S: RecordStore<E>> Driver<E, S> {
    fn handle_command(&mut self, cmd: Command<E>) -> bool {
        match cmd {
            Command::Load { resp } => self.request_load(Some(Waiter::Load(resp))),
            Command::Submit { resp } => match self.state.prepare_submit() {
                Ok(submission) => self.spawn_submit(submission, resp),
                Err(err) => {
                    debug!("{} submit rejected: {err}", E::LABEL);
                    let _ = resp.send(Err(err));
                }
            },
            Command::RemovalPrompt { key, resp } => {
                let _ = resp.send(self.state.removal_prompt(&key));
            }
            Command::Remove { key, resp } => match self.state.prepare_remove(&key) {
                Ok(()) => self.spawn_remove(key, resp),
                Err(err) => {
                    let _ = resp.send(Err(err));
                }
            },
            Command::ToggleStatus { key, resp } => match self.state.prepare_toggle(&key) {
                Ok(updated) => self.spawn_toggle(key, updated, resp),
                Err(err) => {
                    let _ = resp.send(Err(err));
                }
            },
            Command::BeginCreate { resp } => {
                let _ = resp.send(self.state.begin_create());
            }
            Command::BeginEdit { key, resp } => {
                let _ = resp.send(self.state.begin_edit(&key));
            }
            Command::SetField { name, value, resp } => {
                let _ = resp.send(self.state.set_field(&name, &value));
            }
            Command::SetDraft { draft, resp } => {
                let _ = resp.send(self.state.set_draft(draft));
            }
            Command::CancelForm { resp } => {
                self.state.cancel_form();
                let _ = resp.send(());
            }
            Command::SetSearch { text, resp } => {
                let _ = resp.send(self.state.set_search(text));
            }
            Command::SetFilter { field, value, resp } => {
                let _ = resp.send(self.state.set_filter(field, value));
            }
            Command::ClearFilters { resp } => {
                let _ = resp.send(self.state.clear_filters());
            }
            Command::SetPage { page, resp } => {
                let _ = resp.send(self.state.set_page(page));
            }
            Command::Tally { field, resp } => {
                let _ = resp.send(self.state.tally(&field));
            }
            Command::Snapshot { resp } => {
                let _ = resp.send(self.state.snapshot());
            }
            Command::Shutdown { resp } => {
                let _ = resp.send(());
                return true;
            }
        }

        false
    }

    fn handle_completion(&mut self, done: Completion<E>) {
        match done {
            Completion::Loaded(result) => self.apply_load(result),
            Completion::Submitted {
                create,
                result,
                resp,
            } => match self.state.finish_submit(result) {
                Ok(saved) => {
                    let verb = if create { "added" } else { "updated" };
                    info!("{} {verb}", E::LABEL);
                    self.notify(Notification::success(format!(
                        "{} {verb} successfully!",
                        E::LABEL
                    )));
                    self.request_refetch(Waiter::Submit(resp, saved));
                }
                Err(err) => {
                    warn!("error saving {}: {err}", E::LABEL);
                    self.notify(Notification::error(format!(
                        "Error saving {}.",
                        E::LABEL.to_lowercase()
                    )));
                    let _ = resp.send(Err(err));
                }
            },
            Completion::Removed { key, result, resp } => {
                match self.state.finish_remove(&key, result) {
                    Ok(()) => {
                        info!("{} {key} deleted", E::LABEL);
                        self.notify(Notification::success(format!(
                            "{} deleted successfully!",
                            E::LABEL
                        )));
                        self.request_refetch(Waiter::Mutation(resp));
                    }
                    Err(err) => {
                        warn!("error deleting {} {key}: {err}", E::LABEL);
                        self.notify(Notification::error(format!(
                            "Error deleting {}.",
                            E::LABEL.to_lowercase()
                        )));
                        let _ = resp.send(Err(err));
                    }
                }
            }
            Completion::Toggled { key, result, resp } => {
                match self.state.finish_toggle(&key, result) {
                    Ok(()) => {
                        self.notify(Notification::success("Status updated successfully!"));
                        self.request_refetch(Waiter::Mutation(resp));
                    }
                    Err(err) => {
                        warn!("error toggling status of {} {key}: {err}", E::LABEL);
                        self.notify(Notification::error("Error updating status."));
                        let _ = resp.send(Err(err));
                    }
                }
            }
        }
    }

    fn request_load(&mut self, waiter: Option<Waiter<E>>) {
        self.load_waiters.extend(waiter);
        if self.state.begin_load() {
            self.spawn_load();
        }
    }

    /// Schedules a load that starts after every mutation completed so far.
    /// A load already in flight may predate the mutation, so a fresh one is
    /// queued behind it.
    fn request_refetch(&mut self, waiter: Waiter<E>) {
        if self.state.is_loading() {
            self.queued_waiters.push(waiter);
            self.reload_queued = true;
        } else {
            self.request_load(Some(waiter));
        }
    }

    fn apply_load(&mut self, result: StoreResult<Vec<E>>) {
        let mut outcome = match self.state.finish_load(result) {
            Ok(count) => {
                debug!("{} list loaded: {count} records", E::LABEL);
                let _ = self.events_tx.send(ListEvent::Loaded { count });
                Ok(count)
            }
            Err(err) => {
                warn!("error fetching {}: {err}", E::COLLECTION);
                self.notify(Notification::error(format!("Error fetching {}.", E::COLLECTION)));
                Err(LoadFailure::new(err))
            }
        };

        for waiter in std::mem::take(&mut self.load_waiters) {
            waiter.resolve(&mut outcome);
        }

        if self.reload_queued {
            self.reload_queued = false;
            let queued = std::mem::take(&mut self.queued_waiters);
            self.load_waiters.extend(queued);
            if self.state.begin_load() {
                self.spawn_load();
            }
        }
    }

    fn spawn_load(&self) {
        let store = Arc::clone(&self.store);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = store.list_all().await;
            let _ = done_tx.send(Completion::Loaded(result));
        });
    }

    fn spawn_submit(&self, submission: Submission<E>, resp: Reply<E>) {
        let store = Arc::clone(&self.store);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let create = submission.is_create();
            let result = match submission {
                Submission::Create(record) => store.create(record).await,
                Submission::Update { key, record } => store.update(&key, record).await,
            };
            let _ = done_tx.send(Completion::Submitted {
                create,
                result,
                resp,
            });
        });
    }

    fn spawn_remove(&self, key: E::Key, resp: Reply<()>) {
        let store = Arc::clone(&self.store);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = store.delete(&key).await;
            let _ = done_tx.send(Completion::Removed { key, result, resp });
        });
    }

    fn spawn_toggle(&self, key: E::Key, updated: E, resp: Reply<()>) {
        let store = Arc::clone(&self.store);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = store.update(&key, updated).await;
            let _ = done_tx.send(Completion::Toggled { key, result, resp });
        });
    }

    fn notify(&self, notice: Notification) {
        let _ = self.events_tx.send(ListEvent::Notice(notice));
    }
}
