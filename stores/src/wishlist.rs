//! Wishlist reconciliation.
//!
//! Adds and removals are applied to `items` before the backend answers. Each
//! in-flight call is tracked as a [`PendingOperation`] that ends `Confirmed` or
//! `RolledBack`:
//!
//! - a rejected add removes the item again, but only if that add inserted it;
//! - a confirmed add puts the item back if a fetch dropped it meanwhile, unless
//!   a later removal was issued for the same tour;
//! - a rejected removal never re-inserts locally. It triggers exactly one
//!   wishlist re-fetch, and the server list becomes the new state.
//!
//! `items` is a set keyed by [`EntityId`]; every write path keeps it that way.

use crate::request::{Outcome, RequestId, call_api};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tourbook_core::domain::Tour;
use tourbook_core::effect::Effect;
use tourbook_core::environment::ApiEnvironment;
use tourbook_core::reducer::Reducer;
use tourbook_core::{EntityId, Rejection, SmallVec, smallvec};

const FETCH_FAILED: &str = "Failed to fetch wishlist";
const ADD_FAILED: &str = "Failed to add to wishlist";
const REMOVE_FAILED: &str = "Failed to remove from wishlist";

/// Settled operations kept for inspection
const SETTLED_HISTORY: usize = 16;

/// Direction of a wishlist write
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// `POST /api/wishlist/add-current`
    Add,
    /// `DELETE /api/wishlist/remove-current`
    Remove,
}

/// Lifecycle of an optimistic write
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Applied locally, backend has not answered
    Optimistic,
    /// Backend accepted the write
    Confirmed,
    /// Backend rejected the write
    RolledBack,
}

/// One optimistic wishlist write
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Correlation id of the write
    pub request: RequestId,
    /// Affected tour
    pub tour_id: EntityId,
    /// Add or remove
    pub kind: OperationKind,
    /// Current phase
    pub phase: Phase,
    /// Whether this write changed `items` when it was applied
    pub applied: bool,
    /// Tour restored when this add is confirmed but the item is gone.
    ///
    /// `None` for removals and for adds overtaken by a later removal.
    pub restore: Option<Tour>,
}

/// Derived per-tour state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemState {
    /// Not in the wishlist
    Absent,
    /// Added locally, add in flight
    OptimisticAdded,
    /// In the wishlist with no write in flight
    Confirmed,
    /// Removed locally, removal in flight
    OptimisticRemoved,
}

/// Wishlist store state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WishlistState {
    /// Wishlisted tours, unique by id
    pub items: Vec<Tour>,
    /// A fetch is in flight
    pub loading: bool,
    /// Last surfaced failure
    pub error: Option<String>,
    /// Writes waiting for the backend, oldest first
    pub pending: Vec<PendingOperation>,
    /// Recently settled writes, oldest first
    pub settled: VecDeque<PendingOperation>,
}

impl WishlistState {
    /// Returns `true` when the tour is in the wishlist
    #[must_use]
    pub fn contains(&self, tour_id: &EntityId) -> bool {
        self.items.iter().any(|tour| &tour.id == tour_id)
    }

    /// Derived state of one tour
    #[must_use]
    pub fn item_state(&self, tour_id: &EntityId) -> ItemState {
        let in_flight = self
            .pending
            .iter()
            .rev()
            .find(|op| &op.tour_id == tour_id)
            .map(|op| op.kind);
        match (in_flight, self.contains(tour_id)) {
            (Some(OperationKind::Add), true) => ItemState::OptimisticAdded,
            (Some(OperationKind::Remove), false) => ItemState::OptimisticRemoved,
            (_, true) => ItemState::Confirmed,
            (_, false) => ItemState::Absent,
        }
    }

    /// Applies an add locally; a tour already present is left as is
    pub fn begin_add(&mut self, request: RequestId, tour: Tour) -> bool {
        let tour_id = tour.id.clone();
        let applied = !self.contains(&tour_id);
        if applied {
            self.items.push(tour.clone());
        }
        self.track(request, tour_id, OperationKind::Add, applied, Some(tour));
        applied
    }

    /// Applies a removal locally; removing an absent tour is a no-op
    pub fn begin_remove(&mut self, request: RequestId, tour_id: EntityId) -> bool {
        let applied = self.exclude(&tour_id);
        for op in self
            .pending
            .iter_mut()
            .filter(|op| op.tour_id == tour_id && op.kind == OperationKind::Add)
        {
            op.restore = None;
        }
        self.track(request, tour_id, OperationKind::Remove, applied, None);
        applied
    }

    /// Moves the write for `request` out of `pending` with its final phase
    pub fn settle(&mut self, request: RequestId, phase: Phase) -> Option<PendingOperation> {
        let index = self.pending.iter().position(|op| op.request == request)?;
        let mut op = self.pending.remove(index);
        op.phase = phase;
        tracing::debug!(%request, tour_id = %op.tour_id, kind = ?op.kind, ?phase, "Wishlist write settled");
        if self.settled.len() == SETTLED_HISTORY {
            self.settled.pop_front();
        }
        self.settled.push_back(op.clone());
        Some(op)
    }

    /// Removes the tour locally; returns `true` if it was present
    pub fn exclude(&mut self, tour_id: &EntityId) -> bool {
        let before = self.items.len();
        self.items.retain(|tour| &tour.id != tour_id);
        self.items.len() != before
    }

    /// Replaces every item, dropping duplicate ids
    pub fn set_items(&mut self, items: Vec<Tour>) {
        self.items.clear();
        for tour in items {
            if !self.contains(&tour.id) {
                self.items.push(tour);
            }
        }
    }

    /// Local reset used on sign-out
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn in_flight(&self, tour_id: &EntityId, kind: OperationKind) -> bool {
        self.pending
            .iter()
            .any(|op| &op.tour_id == tour_id && op.kind == kind)
    }

    /// The item is backed by the server now; adds still in flight no longer own
    /// the local insertion.
    fn disown(&mut self, tour_id: &EntityId) {
        for op in self
            .pending
            .iter_mut()
            .filter(|op| &op.tour_id == tour_id && op.kind == OperationKind::Add)
        {
            op.applied = false;
        }
    }

    fn track(
        &mut self,
        request: RequestId,
        tour_id: EntityId,
        kind: OperationKind,
        applied: bool,
        restore: Option<Tour>,
    ) {
        self.pending.push(PendingOperation {
            request,
            tour_id,
            kind,
            phase: Phase::Optimistic,
            applied,
            restore,
        });
    }

    fn surface(&mut self, rejection: &Rejection) {
        if let Some(message) = rejection.surfaces() {
            self.error = Some(message);
        }
    }
}

/// Wishlist store actions
#[derive(Clone, Debug, PartialEq)]
pub enum WishlistAction {
    /// `GET /api/wishlist/my-wishlist`
    Fetch {
        /// Correlation id
        request: RequestId,
    },
    /// Fetch finished
    Fetched {
        /// Correlation id
        request: RequestId,
        /// Server list or reason
        result: Outcome<Vec<Tour>>,
    },
    /// Optimistic add
    Add {
        /// Correlation id
        request: RequestId,
        /// Tour to add
        tour: Tour,
    },
    /// Add answered
    Added {
        /// Correlation id
        request: RequestId,
        /// Backend outcome
        result: Outcome<()>,
    },
    /// Optimistic removal
    Remove {
        /// Correlation id
        request: RequestId,
        /// Tour to remove
        tour_id: EntityId,
    },
    /// Removal answered
    Removed {
        /// Correlation id
        request: RequestId,
        /// Backend outcome
        result: Outcome<()>,
    },
    /// Drop a tour locally without a backend call
    Exclude(EntityId),
    /// Replace the list locally
    SetItems(Vec<Tour>),
    /// Empty the list locally
    Clear,
    /// Forget the last error
    ClearError,
}

impl WishlistAction {
    /// Correlation id when this is a terminal action
    #[must_use]
    pub const fn completes(&self) -> Option<RequestId> {
        match self {
            Self::Fetched { request, .. }
            | Self::Added { request, .. }
            | Self::Removed { request, .. } => Some(*request),
            _ => None,
        }
    }
}

/// Starts a full wishlist fetch
pub(crate) fn fetch(
    state: &mut WishlistState,
    request: RequestId,
    env: &ApiEnvironment,
) -> Effect<WishlistAction> {
    state.loading = true;
    state.error = None;
    call_api(
        env,
        FETCH_FAILED,
        |api| async move { api.fetch_wishlist().await },
        move |result| WishlistAction::Fetched { request, result },
    )
}

/// Reducer for [`WishlistState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct WishlistReducer;

impl Reducer for WishlistReducer {
    type State = WishlistState;
    type Action = WishlistAction;
    type Environment = ApiEnvironment;

    fn reduce(
        &self,
        state: &mut WishlistState,
        action: WishlistAction,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<WishlistAction>; 4]> {
        match action {
            WishlistAction::Fetch { request } => smallvec![fetch(state, request, env)],
            WishlistAction::Fetched { result, .. } => {
                state.loading = false;
                match result {
                    Ok(items) => {
                        state.set_items(items);
                        state.error = None;
                    },
                    Err(rejection) => state.surface(&rejection),
                }
                smallvec![Effect::None]
            },
            WishlistAction::Add { request, tour } => {
                let tour_id = tour.id.clone();
                state.begin_add(request, tour);
                smallvec![call_api(
                    env,
                    ADD_FAILED,
                    move |api| async move { api.add_to_wishlist(&tour_id).await },
                    move |result| WishlistAction::Added { request, result },
                )]
            },
            WishlistAction::Added { request, result } => {
                match result {
                    Ok(()) => {
                        if let Some(op) = state.settle(request, Phase::Confirmed) {
                            state.disown(&op.tour_id);
                            if let Some(tour) = op.restore {
                                if !state.contains(&tour.id) {
                                    tracing::debug!(
                                        %request,
                                        tour_id = %tour.id,
                                        "Restoring confirmed wishlist item"
                                    );
                                    state.items.push(tour);
                                }
                            }
                        }
                        state.error = None;
                    },
                    Err(rejection) => {
                        if let Some(op) = state.settle(request, Phase::RolledBack) {
                            if op.applied && !state.in_flight(&op.tour_id, OperationKind::Add) {
                                state.exclude(&op.tour_id);
                            }
                            metrics::counter!("wishlist.rollback").increment(1);
                        }
                        state.surface(&rejection);
                    },
                }
                smallvec![Effect::None]
            },
            WishlistAction::Remove { request, tour_id } => {
                state.begin_remove(request, tour_id.clone());
                smallvec![call_api(
                    env,
                    REMOVE_FAILED,
                    move |api| async move { api.remove_from_wishlist(&tour_id).await },
                    move |result| WishlistAction::Removed { request, result },
                )]
            },
            WishlistAction::Removed { request, result } => match result {
                Ok(()) => {
                    if let Some(op) = state.settle(request, Phase::Confirmed) {
                        if !state.in_flight(&op.tour_id, OperationKind::Add) {
                            state.exclude(&op.tour_id);
                        }
                    }
                    smallvec![Effect::None]
                },
                Err(rejection) => {
                    state.settle(request, Phase::RolledBack);
                    metrics::counter!("wishlist.rollback").increment(1);
                    tracing::debug!(%request, "Wishlist removal rejected, re-fetching");
                    let refetch = fetch(state, RequestId::new(), env);
                    state.surface(&rejection);
                    smallvec![refetch]
                },
            },
            WishlistAction::Exclude(tour_id) => {
                state.exclude(&tour_id);
                smallvec![Effect::None]
            },
            WishlistAction::SetItems(items) => {
                state.set_items(items);
                smallvec![Effect::None]
            },
            WishlistAction::Clear => {
                state.clear();
                smallvec![Effect::None]
            },
            WishlistAction::ClearError => {
                state.error = None;
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use std::sync::Arc;
    use tourbook_core::BookingApi;
    use tourbook_testing::{
        Endpoint, MockBackend, ReducerTest, assertions, bare_error, fixtures, server_error, settle,
        test_environment,
    };

    fn ids(state: &WishlistState) -> Vec<String> {
        state.items.iter().map(|t| t.id.to_string()).collect()
    }

    #[test]
    fn add_is_visible_before_the_backend_answers() {
        let env = test_environment(Arc::new(MockBackend::new()));
        let request = RequestId::new();
        ReducerTest::new(WishlistReducer)
            .with_env(env)
            .given_state(WishlistState::default())
            .when_action(WishlistAction::Add {
                request,
                tour: fixtures::tour(1, 100),
            })
            .then_state(move |state| {
                assert!(state.contains(&EntityId::from("1")));
                assert_eq!(state.item_state(&EntityId::from(1_i64)), ItemState::OptimisticAdded);
                assert_eq!(state.pending.len(), 1);
                assert_eq!(state.pending[0].request, request);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[tokio::test]
    async fn confirmed_add_keeps_the_item() {
        let backend = Arc::new(MockBackend::new().with_tours([fixtures::tour(1, 100)]));
        let env = test_environment(backend);
        let mut state = WishlistState {
            error: Some("old".to_string()),
            ..WishlistState::default()
        };

        settle(
            &WishlistReducer,
            &mut state,
            WishlistAction::Add {
                request: RequestId::new(),
                tour: fixtures::tour(1, 100),
            },
            &env,
        )
        .await;

        assert_eq!(ids(&state), vec!["1"]);
        assert_eq!(state.item_state(&EntityId::from("1")), ItemState::Confirmed);
        assert!(state.pending.is_empty());
        assert_eq!(state.settled.back().unwrap().phase, Phase::Confirmed);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn rejected_add_rolls_back() {
        let backend = Arc::new(MockBackend::new().with_tours([fixtures::tour(1, 100)]));
        backend.fail(Endpoint::AddToWishlist, bare_error(500));
        let env = test_environment(backend);
        let mut state = WishlistState::default();

        settle(
            &WishlistReducer,
            &mut state,
            WishlistAction::Add {
                request: RequestId::new(),
                tour: fixtures::tour(1, 100),
            },
            &env,
        )
        .await;

        assert!(state.items.is_empty());
        assert_eq!(state.item_state(&EntityId::from("1")), ItemState::Absent);
        assert_eq!(state.error.as_deref(), Some("Failed to add to wishlist"));
        assert_eq!(state.settled.back().unwrap().phase, Phase::RolledBack);
    }

    #[tokio::test]
    async fn duplicate_add_keeps_the_existing_item() {
        let backend = Arc::new(
            MockBackend::new()
                .with_tours([fixtures::tour(1, 100)])
                .with_wishlist([1_i64]),
        );
        let env = test_environment(backend);
        let mut state = WishlistState::default();
        state.set_items(vec![fixtures::tour(1, 100)]);

        settle(
            &WishlistReducer,
            &mut state,
            WishlistAction::Add {
                request: RequestId::new(),
                tour: fixtures::tour("1", 100),
            },
            &env,
        )
        .await;

        assert_eq!(ids(&state), vec!["1"]);
        assert_eq!(state.error.as_deref(), Some("Tour is already in wishlist"));
    }

    #[tokio::test]
    async fn rejected_removal_refetches_once() {
        let backend = Arc::new(
            MockBackend::new()
                .with_tours([fixtures::tour(1, 100), fixtures::tour(2, 200)])
                .with_wishlist([1_i64, 2]),
        );
        backend.fail(Endpoint::RemoveFromWishlist, server_error(500, "Wishlist locked"));
        let env = test_environment(Arc::clone(&backend) as Arc<dyn BookingApi>);
        let mut state = WishlistState::default();
        state.set_items(vec![fixtures::tour(1, 100), fixtures::tour(2, 200)]);

        let produced = settle(
            &WishlistReducer,
            &mut state,
            WishlistAction::Remove {
                request: RequestId::new(),
                tour_id: EntityId::from("2"),
            },
            &env,
        )
        .await;

        assert_eq!(produced.len(), 2);
        assert!(matches!(produced[0], WishlistAction::Removed { result: Err(_), .. }));
        assert!(matches!(produced[1], WishlistAction::Fetched { result: Ok(_), .. }));
        assert_eq!(backend.calls(Endpoint::FetchWishlist), 1);
        assert_eq!(ids(&state), vec!["1", "2"]);
        assert!(!state.loading);
    }

    #[test]
    fn removal_is_visible_before_the_backend_answers() {
        let env = test_environment(Arc::new(MockBackend::new()));
        let mut initial = WishlistState::default();
        initial.set_items(vec![fixtures::tour(1, 100)]);
        ReducerTest::new(WishlistReducer)
            .with_env(env)
            .given_state(initial)
            .when_action(WishlistAction::Remove {
                request: RequestId::new(),
                tour_id: EntityId::from(1_i64),
            })
            .then_state(|state| {
                assert!(state.items.is_empty());
                assert_eq!(
                    state.item_state(&EntityId::from(1_i64)),
                    ItemState::OptimisticRemoved
                );
            })
            .run();
    }

    #[tokio::test]
    async fn fetch_is_a_full_replacement() {
        let backend = Arc::new(
            MockBackend::new()
                .with_tours([fixtures::tour(3, 300)])
                .with_wishlist([3_i64]),
        );
        let env = test_environment(backend);
        let mut state = WishlistState::default();
        state.set_items(vec![fixtures::tour(1, 100), fixtures::tour(2, 200)]);

        settle(&WishlistReducer, &mut state, WishlistAction::Fetch { request: RequestId::new() }, &env)
            .await;

        assert_eq!(ids(&state), vec!["3"]);
    }

    #[test]
    fn set_items_drops_duplicate_ids() {
        let mut state = WishlistState::default();
        state.set_items(vec![
            fixtures::tour(1, 100),
            fixtures::tour("1", 100),
            fixtures::tour(2, 200),
        ]);
        assert_eq!(ids(&state), vec!["1", "2"]);
    }

    #[test]
    fn settled_history_is_bounded() {
        let mut state = WishlistState::default();
        for n in 0..(SETTLED_HISTORY + 4) {
            let request = RequestId::new();
            state.begin_add(request, fixtures::tour(i64::try_from(n).unwrap(), 10));
            state.settle(request, Phase::Confirmed);
        }
        assert_eq!(state.settled.len(), SETTLED_HISTORY);
        assert!(state.pending.is_empty());
    }

    #[test]
    fn confirmed_add_restores_an_item_dropped_by_a_fetch() {
        let env = test_environment(Arc::new(MockBackend::new()));
        let request = RequestId::new();
        ReducerTest::new(WishlistReducer)
            .with_env(env)
            .given_state(WishlistState::default())
            .when_action(WishlistAction::Add {
                request,
                tour: fixtures::tour(1, 100),
            })
            .when_action(WishlistAction::Fetched {
                request: RequestId::new(),
                result: Ok(Vec::new()),
            })
            .when_action(WishlistAction::Added {
                request,
                result: Ok(()),
            })
            .then_state(|state| {
                assert_eq!(ids(state), vec!["1"]);
                assert_eq!(state.item_state(&EntityId::from(1_i64)), ItemState::Confirmed);
                assert!(state.pending.is_empty());
            })
            .run();
    }

    #[test]
    fn confirmed_add_does_not_undo_a_later_removal() {
        let env = test_environment(Arc::new(MockBackend::new()));
        let add = RequestId::new();
        let remove = RequestId::new();
        ReducerTest::new(WishlistReducer)
            .with_env(env)
            .given_state(WishlistState::default())
            .when_action(WishlistAction::Add {
                request: add,
                tour: fixtures::tour(1, 100),
            })
            .when_action(WishlistAction::Remove {
                request: remove,
                tour_id: EntityId::from(1_i64),
            })
            .when_action(WishlistAction::Removed {
                request: remove,
                result: Ok(()),
            })
            .when_action(WishlistAction::Added {
                request: add,
                result: Ok(()),
            })
            .then_state(|state| {
                assert!(state.items.is_empty());
                assert!(state.pending.is_empty());
            })
            .run();
    }

    #[test]
    fn rejected_add_keeps_an_item_confirmed_by_a_later_add() {
        let env = test_environment(Arc::new(MockBackend::new()));
        let first = RequestId::new();
        let second = RequestId::new();
        ReducerTest::new(WishlistReducer)
            .with_env(env)
            .given_state(WishlistState::default())
            .when_action(WishlistAction::Add {
                request: first,
                tour: fixtures::tour(1, 100),
            })
            .when_action(WishlistAction::Add {
                request: second,
                tour: fixtures::tour(1, 100),
            })
            .when_action(WishlistAction::Added {
                request: second,
                result: Ok(()),
            })
            .when_action(WishlistAction::Added {
                request: first,
                result: Err(Rejection::Failed("Tour is already in wishlist".to_string())),
            })
            .then_state(|state| {
                assert_eq!(ids(state), vec!["1"]);
                assert!(state.pending.is_empty());
                assert_eq!(state.error.as_deref(), Some("Tour is already in wishlist"));
            })
            .run();
    }
}
