//! Generic entity collection state.
//!
//! Tours, bookings, users and reviews share the same request lifecycle:
//! `pending` sets `loading` and clears `error`, `fulfilled` applies the payload,
//! `rejected` records the reason. [`EntityState`] implements that lifecycle once.

use crate::api::Rejection;
use crate::id::EntityId;
use serde::{Deserialize, Serialize};

/// Anything addressable by an [`EntityId`]
pub trait Entity: Clone {
    /// The entity's identifier
    fn id(&self) -> &EntityId;
}

/// Collection of entities plus request status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityState<T> {
    /// Entities in server order
    pub items: Vec<T>,
    /// Entity loaded by id, if any
    pub current: Option<T>,
    /// A fetch is in flight
    pub loading: bool,
    /// Last surfaced failure
    pub error: Option<String>,
}

impl<T> Default for EntityState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current: None,
            loading: false,
            error: None,
        }
    }
}

impl<T: Entity> EntityState<T> {
    /// Request pending
    pub fn begin_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Full replacement of the collection; no merge with previous items
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
        self.loading = false;
        self.error = None;
    }

    /// Stores the entity loaded by id
    pub fn set_current(&mut self, item: T) {
        self.current = Some(item);
        self.loading = false;
        self.error = None;
    }

    /// Request rejected.
    ///
    /// Session expiry stops the spinner but leaves `error` untouched.
    pub fn fail(&mut self, rejection: &Rejection) {
        self.loading = false;
        if let Some(message) = rejection.surfaces() {
            self.error = Some(message);
        }
    }

    /// Appends `item` unless an entity with the same id is already present.
    ///
    /// Returns `true` when the item was inserted.
    pub fn insert_if_absent(&mut self, item: T) -> bool {
        if self.contains(item.id()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Replaces the entity with the same id in place, and `current` if it matches.
    ///
    /// Returns `true` when a list entry was replaced.
    pub fn replace(&mut self, item: T) -> bool {
        if self.current.as_ref().is_some_and(|c| c.id() == item.id()) {
            self.current = Some(item.clone());
        }
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(slot) => {
                *slot = item;
                true
            },
            None => false,
        }
    }

    /// Applies `f` to the entity with `id` and to `current` if it matches
    pub fn update_with(&mut self, id: &EntityId, mut f: impl FnMut(&mut T)) {
        if let Some(item) = self.items.iter_mut().find(|e| e.id() == id) {
            f(item);
        }
        if let Some(current) = self.current.as_mut().filter(|c| c.id() == id) {
            f(current);
        }
    }

    /// Removes the entity with `id` and clears `current` if it matched.
    ///
    /// Returns the removed list entry, if any.
    pub fn remove(&mut self, id: &EntityId) -> Option<T> {
        if self.current.as_ref().is_some_and(|c| c.id() == id) {
            self.current = None;
        }
        let index = self.items.iter().position(|e| e.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Looks up an entity by id
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.items.iter().find(|e| e.id() == id)
    }

    /// Returns `true` when an entity with `id` is present
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Clears the recorded error
    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
