//! Create/edit draft held behind the composition surface.

use crate::{
    error::{ListError, OpKind},
    record::{Entity, missing_required},
    types::KeyPolicy,
};

/// Whether the form creates a new record or replaces an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode<K> {
    /// Composing a new record.
    Creating,
    /// Replacing the record stored under `key`.
    Editing {
        /// Key of the record being replaced.
        key: K,
    },
}

/// Draft record plus mode and surface flags.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState<E: Entity> {
    mode: FormMode<E::Key>,
    draft: E,
    open: bool,
    submitting: bool,
}

impl<E: Entity> Default for FormState<E> {
    fn default() -> Self {
        Self {
            mode: FormMode::Creating,
            draft: E::default(),
            open: false,
            submitting: false,
        }
    }
}

impl<E: Entity> FormState<E> {
    /// Closed form with an empty creation draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> &FormMode<E::Key> {
        &self.mode
    }

    /// Current draft.
    pub fn draft(&self) -> &E {
        &self.draft
    }

    /// True while the composition surface is shown.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// True while a submit is in flight; the surface is disabled.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// True in editing mode.
    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Editing { .. })
    }

    /// Opens the surface with an empty creation draft.
    pub fn begin_create(&mut self) -> Result<(), ListError> {
        self.ensure_idle()?;
        *self = Self {
            open: true,
            ..Self::default()
        };
        Ok(())
    }

    /// Opens the surface populated from `record` in editing mode.
    pub fn begin_edit(&mut self, key: E::Key, mut record: E) -> Result<(), ListError> {
        self.ensure_idle()?;
        record.set_key(Some(key.clone()));
        *self = Self {
            mode: FormMode::Editing { key },
            draft: record,
            open: true,
            submitting: false,
        };
        Ok(())
    }

    /// Assigns one field from its textual form.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), ListError> {
        self.ensure_idle()?;
        if name == E::KEY_FIELD && !self.key_editable() {
            return Err(ListError::KeyImmutable);
        }
        self.draft.set_field(name, value)?;
        Ok(())
    }

    /// Replaces the whole draft.
    ///
    /// In editing mode the draft must carry the key being edited; in creating
    /// mode a store-assigned key is dropped.
    pub fn set_draft(&mut self, mut draft: E) -> Result<(), ListError> {
        self.ensure_idle()?;
        match &self.mode {
            FormMode::Editing { key } => {
                if draft.key().as_ref() != Some(key) {
                    return Err(ListError::KeyImmutable);
                }
            }
            FormMode::Creating => {
                if E::KEY_POLICY == KeyPolicy::StoreAssigned {
                    draft.set_key(None);
                }
            }
        }
        self.draft = draft;
        Ok(())
    }

    /// Closes the surface and discards the draft.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Required fields the draft leaves blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        missing_required(&self.draft)
    }

    pub(crate) fn set_submitting(&mut self, submitting: bool) {
        self.submitting = submitting;
    }

    // The surface is disabled while a submit is in flight.
    fn ensure_idle(&self) -> Result<(), ListError> {
        if self.submitting {
            return Err(ListError::InFlight(OpKind::Submit));
        }
        Ok(())
    }

    fn key_editable(&self) -> bool {
        match self.mode {
            FormMode::Creating => E::KEY_POLICY == KeyPolicy::CallerAssigned,
            FormMode::Editing { .. } => false,
        }
    }
}
