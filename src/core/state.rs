use hashbrown::{HashMap, HashSet};

use crate::{
    error::{ListError, OpKind},
    form::{FormMode, FormState},
    record::Entity,
    remote::StoreResult,
    types::KeyPolicy,
    view::{
        projection::{self, Presence, Projection, filtered_indices},
        state::ViewState,
    },
};

/// Store call derived from the form on submit.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<E: Entity> {
    /// Create a new record.
    Create(E),
    /// Replace the record under `key`.
    Update {
        /// Key of the record being replaced.
        key: E::Key,
        /// Replacement record.
        record: E,
    },
}

impl<E: Entity> Submission<E> {
    /// True for a creation.
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }
}

/// Point-in-time copy of everything a list page renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<E: Entity> {
    /// Current page of the filtered collection.
    pub projection: Projection<E>,
    /// What to show in place of rows.
    pub presence: Presence,
    /// Search, filters and page.
    pub view: ViewState,
    /// Create/edit draft and surface flags.
    pub form: FormState<E>,
    /// A load is in flight.
    pub loading: bool,
    /// A mutation was issued and its refetch has not completed.
    pub stale: bool,
}

/// Authoritative local state of one management page.
///
/// Every method is synchronous. Operations that need the record store are
/// split into a `prepare_*` step, which validates and marks the operation in
/// flight, and a `finish_*` step, which applies the store's result.
#[derive(Debug)]
pub struct ListState<E: Entity> {
    records: Vec<E>,
    pos: HashMap<E::Key, usize>,
    view: ViewState,
    form: FormState<E>,
    loaded_once: bool,
    loading: bool,
    last_load_failed: bool,
    // Successful mutations so far, and how many of them the last applied
    // load was guaranteed to observe.
    mutations_done: u64,
    refetched_through: u64,
    load_base: u64,
    removing: HashSet<E::Key>,
    toggling: HashSet<E::Key>,
}

impl<E: Entity> ListState<E> {
    /// Empty, not yet loaded state.
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            pos: HashMap::new(),
            view: ViewState::new(page_size),
            form: FormState::new(),
            loaded_once: false,
            loading: false,
            last_load_failed: false,
            mutations_done: 0,
            refetched_through: 0,
            load_base: 0,
            removing: HashSet::new(),
            toggling: HashSet::new(),
        }
    }

    /// Loaded records in store order.
    pub fn records(&self) -> &[E] {
        &self.records
    }

    /// Loaded record under `key`.
    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.pos.get(key).and_then(|idx| self.records.get(*idx))
    }

    /// True when `key` is loaded.
    pub fn contains(&self, key: &E::Key) -> bool {
        self.pos.contains_key(key)
    }

    /// Search, filters and page.
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Form state.
    pub fn form(&self) -> &FormState<E> {
        &self.form
    }

    /// A load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// A mutation was issued and its refetch has not landed.
    pub fn is_stale(&self) -> bool {
        self.mutation_in_flight() || self.awaiting_refetch()
    }

    /// A successful mutation has not yet been observed by a load that
    /// started after it completed.
    pub fn awaiting_refetch(&self) -> bool {
        self.refetched_through < self.mutations_done
    }

    /// At least one load succeeded.
    pub fn has_loaded(&self) -> bool {
        self.loaded_once
    }

    /// Marks a load in flight. Returns false when one already is.
    pub fn begin_load(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        self.load_base = self.mutations_done;
        true
    }

    /// Applies a load result. Success replaces the collection wholesale;
    /// failure keeps the previous one.
    pub fn finish_load(&mut self, result: StoreResult<Vec<E>>) -> Result<usize, ListError> {
        self.loading = false;
        match result {
            Ok(records) => {
                self.replace_records(records);
                self.loaded_once = true;
                self.last_load_failed = false;
                self.refetched_through = self.refetched_through.max(self.load_base);
                Ok(self.records.len())
            }
            Err(err) => {
                self.last_load_failed = true;
                Err(ListError::Transport(err))
            }
        }
    }

    /// Validates the form and marks the submit in flight.
    pub fn prepare_submit(&mut self) -> Result<Submission<E>, ListError> {
        if self.form.is_submitting() {
            return Err(ListError::InFlight(OpKind::Submit));
        }
        if !self.form.is_open() {
            return Err(ListError::FormClosed);
        }

        let missing = self.form.missing_required();
        if !missing.is_empty() {
            return Err(ListError::MissingFields(missing));
        }

        let mut record = self.form.draft().clone();
        let submission = match self.form.mode() {
            FormMode::Editing { key } => {
                record.set_key(Some(key.clone()));
                Submission::Update {
                    key: key.clone(),
                    record,
                }
            }
            FormMode::Creating => {
                match E::KEY_POLICY {
                    KeyPolicy::StoreAssigned => record.set_key(None),
                    KeyPolicy::CallerAssigned => {
                        let key = record
                            .key()
                            .ok_or_else(|| ListError::MissingFields(vec![E::KEY_FIELD]))?;
                        if self.contains(&key) {
                            return Err(ListError::DuplicateKey(key.to_string()));
                        }
                    }
                }
                Submission::Create(record)
            }
        };

        self.form.set_submitting(true);
        Ok(submission)
    }

    /// Applies a submit result. Success closes and resets the form; failure
    /// leaves it open with the draft intact.
    pub fn finish_submit(&mut self, result: StoreResult<E>) -> Result<E, ListError> {
        self.form.set_submitting(false);
        match result {
            Ok(saved) => {
                self.form.reset();
                self.mutations_done += 1;
                Ok(saved)
            }
            Err(err) => Err(ListError::Transport(err)),
        }
    }

    /// Confirmation text for deleting `key`.
    pub fn removal_prompt(&self, key: &E::Key) -> Result<String, ListError> {
        let rec = self
            .get(key)
            .ok_or_else(|| ListError::UnknownKey(key.to_string()))?;
        Ok(format!("Are you sure you want to delete {}?", rec.describe()))
    }

    /// Marks deletion of `key` in flight.
    pub fn prepare_remove(&mut self, key: &E::Key) -> Result<(), ListError> {
        if !self.contains(key) {
            return Err(ListError::UnknownKey(key.to_string()));
        }
        if !self.removing.insert(key.clone()) {
            return Err(ListError::InFlight(OpKind::Remove));
        }
        Ok(())
    }

    /// Applies a delete result. The collection only changes on refetch.
    pub fn finish_remove(&mut self, key: &E::Key, result: StoreResult<()>) -> Result<(), ListError> {
        self.removing.remove(key);
        match result {
            Ok(()) => {
                self.mutations_done += 1;
                Ok(())
            }
            Err(err) => Err(ListError::Transport(err)),
        }
    }

    /// Builds the replacement record for a status flip and marks it in
    /// flight. Every field but the status is copied from the loaded record.
    pub fn prepare_toggle(&mut self, key: &E::Key) -> Result<E, ListError> {
        let mut updated = self
            .get(key)
            .cloned()
            .ok_or_else(|| ListError::UnknownKey(key.to_string()))?;
        let status = updated.status().ok_or(ListError::NoStatusField)?;
        if !updated.set_status(status.toggled()) {
            return Err(ListError::NoStatusField);
        }
        if !self.toggling.insert(key.clone()) {
            return Err(ListError::InFlight(OpKind::ToggleStatus));
        }
        Ok(updated)
    }

    /// Applies a status update result.
    pub fn finish_toggle(&mut self, key: &E::Key, result: StoreResult<E>) -> Result<(), ListError> {
        self.toggling.remove(key);
        match result {
            Ok(_) => {
                self.mutations_done += 1;
                Ok(())
            }
            Err(err) => Err(ListError::Transport(err)),
        }
    }

    /// Opens an empty creation form. Rejected while a submit is in flight.
    pub fn begin_create(&mut self) -> Result<(), ListError> {
        self.form.begin_create()
    }

    /// Opens the form on a copy of the loaded record under `key`.
    pub fn begin_edit(&mut self, key: &E::Key) -> Result<(), ListError> {
        let rec = self
            .get(key)
            .cloned()
            .ok_or_else(|| ListError::UnknownKey(key.to_string()))?;
        self.form.begin_edit(key.clone(), rec)
    }

    /// Sets one draft field from text.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), ListError> {
        self.form.set_field(name, value)
    }

    /// Replaces the whole draft.
    pub fn set_draft(&mut self, draft: E) -> Result<(), ListError> {
        self.form.set_draft(draft)
    }

    /// Closes the form and discards the draft. Ignored while submitting.
    pub fn cancel_form(&mut self) {
        if !self.form.is_submitting() {
            self.form.reset();
        }
    }

    /// Sets the search text and reprojects.
    pub fn set_search(&mut self, text: impl Into<String>) -> Projection<E> {
        self.view.set_search(text);
        self.projection()
    }

    /// Sets one filter and reprojects. An empty value clears it.
    pub fn set_filter(&mut self, field: impl Into<String>, value: impl Into<String>) -> Projection<E> {
        self.view.set_filter(field, value);
        self.projection()
    }

    /// Clears every filter and reprojects.
    pub fn clear_filters(&mut self) -> Projection<E> {
        self.view.clear_filters();
        self.projection()
    }

    /// Selects a page and reprojects.
    pub fn set_page(&mut self, page: usize) -> Projection<E> {
        self.view.set_page(page);
        self.projection()
    }

    /// Recomputes the current page, clamping the page index.
    pub fn projection(&mut self) -> Projection<E> {
        projection::project(&self.records, &mut self.view)
    }

    /// Per-value counts of `field` over the filtered collection.
    pub fn tally(&self, field: &str) -> Vec<(String, usize)> {
        projection::tally(&self.records, &self.view, field)
    }

    /// What the list surface should show.
    pub fn presence(&self) -> Presence {
        if !self.loaded_once {
            return if self.last_load_failed && !self.loading {
                Presence::Unavailable
            } else {
                Presence::Loading
            };
        }
        if self.records.is_empty() {
            Presence::Empty
        } else if filtered_indices(&self.records, &self.view).is_empty() {
            Presence::NoMatches
        } else {
            Presence::Rows
        }
    }

    /// Copies everything the page renders.
    pub fn snapshot(&mut self) -> ListSnapshot<E> {
        let projection = self.projection();
        ListSnapshot {
            presence: self.presence(),
            projection,
            view: self.view.clone(),
            form: self.form.clone(),
            loading: self.loading,
            stale: self.is_stale(),
        }
    }

    fn replace_records(&mut self, records: Vec<E>) {
        self.pos.clear();
        for (idx, rec) in records.iter().enumerate() {
            if let Some(key) = rec.key() {
                self.pos.entry(key).or_insert(idx);
            }
        }
        self.records = records;
        self.view.clamp_page(projection::total_pages(
            filtered_indices(&self.records, &self.view).len(),
            self.view.page_size(),
        ));
    }

    fn mutation_in_flight(&self) -> bool {
        self.form.is_submitting() || !self.removing.is_empty() || !self.toggling.is_empty()
    }
}
