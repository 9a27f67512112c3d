//! Tour catalogue store.
//!
//! Catalogue fetches replace the whole list. Admin mutations apply the returned
//! entity on success; their failures are reported to the caller only and leave
//! `error` untouched. Catalogue filters are local state.

use crate::request::{Outcome, RequestId, call_api, respond};
use serde::{Deserialize, Serialize};
use tourbook_core::domain::{Tour, TourCategory, TourDraft};
use tourbook_core::effect::Effect;
use tourbook_core::environment::ApiEnvironment;
use tourbook_core::reducer::Reducer;
use tourbook_core::{ApiError, EntityId, EntityState, Money, Rejection, SmallVec, smallvec};

const FETCH_FAILED: &str = "Failed to fetch tours";
const FETCH_ONE_FAILED: &str = "Failed to fetch tour";
const CREATE_FAILED: &str = "Failed to create tour";
const UPDATE_FAILED: &str = "Failed to update tour";
const DELETE_FAILED: &str = "Failed to delete tour";
const ACTIVATE_FAILED: &str = "Failed to activate tour";
const DEACTIVATE_FAILED: &str = "Failed to deactivate tour";

/// Catalogue filters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourFilters {
    /// Only this category
    pub category: Option<TourCategory>,
    /// Case-insensitive substring of the destination; empty matches all
    pub destination: String,
    /// Inclusive lower price bound
    pub min_price: Money,
    /// Inclusive upper price bound
    pub max_price: Money,
    /// Inclusive lower duration bound, in days
    pub min_duration: u32,
    /// Inclusive upper duration bound, in days
    pub max_duration: u32,
}

impl Default for TourFilters {
    fn default() -> Self {
        Self {
            category: None,
            destination: String::new(),
            min_price: Money::ZERO,
            max_price: Money::from_units(10_000),
            min_duration: 1,
            max_duration: 30,
        }
    }
}

impl TourFilters {
    /// Returns `true` when `tour` passes every filter
    #[must_use]
    pub fn matches(&self, tour: &Tour) -> bool {
        let destination = self.destination.trim().to_lowercase();
        self.category.is_none_or(|c| tour.category == Some(c))
            && (destination.is_empty() || tour.destination.to_lowercase().contains(&destination))
            && (self.min_price..=self.max_price).contains(&tour.price)
            && (self.min_duration..=self.max_duration).contains(&tour.duration)
    }
}

/// Tour store state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToursState {
    /// Catalogue plus the tour opened by id
    pub catalogue: EntityState<Tour>,
    /// Active catalogue filters
    pub filters: TourFilters,
}

/// Tour store actions
#[derive(Clone, Debug, PartialEq)]
pub enum ToursAction {
    /// `GET /api/tours`
    Fetch {
        /// Correlation id
        request: RequestId,
    },
    /// Catalogue fetch finished
    Fetched {
        /// Correlation id
        request: RequestId,
        /// Full catalogue or reason
        result: Outcome<Vec<Tour>>,
    },
    /// `GET /api/tours/{id}`
    FetchById {
        /// Correlation id
        request: RequestId,
        /// Tour to load
        id: EntityId,
    },
    /// Single tour fetch finished
    FetchedById {
        /// Correlation id
        request: RequestId,
        /// Tour or reason
        result: Outcome<Tour>,
    },
    /// Create a tour (admin)
    Create {
        /// Correlation id
        request: RequestId,
        /// Tour fields
        draft: TourDraft,
    },
    /// Creation finished
    Created {
        /// Correlation id
        request: RequestId,
        /// Created tour or reason
        result: Outcome<Tour>,
    },
    /// Update a tour (admin)
    Update {
        /// Correlation id
        request: RequestId,
        /// Tour to update
        id: EntityId,
        /// New fields
        draft: TourDraft,
    },
    /// Update finished
    Updated {
        /// Correlation id
        request: RequestId,
        /// Updated tour or reason
        result: Outcome<Tour>,
    },
    /// Delete a tour (admin)
    Delete {
        /// Correlation id
        request: RequestId,
        /// Tour to delete
        id: EntityId,
    },
    /// Deletion finished
    Deleted {
        /// Correlation id
        request: RequestId,
        /// Deleted id or reason
        result: Outcome<EntityId>,
    },
    /// Make a tour bookable (`true`) or hide it (`false`)
    SetActive {
        /// Correlation id
        request: RequestId,
        /// Tour to change
        id: EntityId,
        /// Target flag
        active: bool,
    },
    /// Activation change finished
    ActiveSet {
        /// Correlation id
        request: RequestId,
        /// Changed id and flag, or reason
        result: Outcome<(EntityId, bool)>,
    },
    /// Replace the catalogue filters
    SetFilters(TourFilters),
    /// Restore default filters
    ClearFilters,
    /// Forget the last error
    ClearError,
    /// Forget the tour opened by id
    ClearCurrent,
}

impl ToursAction {
    /// Correlation id when this is a terminal action
    #[must_use]
    pub const fn completes(&self) -> Option<RequestId> {
        match self {
            Self::Fetched { request, .. }
            | Self::FetchedById { request, .. }
            | Self::Created { request, .. }
            | Self::Updated { request, .. }
            | Self::Deleted { request, .. }
            | Self::ActiveSet { request, .. } => Some(*request),
            _ => None,
        }
    }
}

/// Reducer for [`ToursState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ToursReducer;

impl Reducer for ToursReducer {
    type State = ToursState;
    type Action = ToursAction;
    type Environment = ApiEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut ToursState,
        action: ToursAction,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<ToursAction>; 4]> {
        match action {
            ToursAction::Fetch { request } => {
                state.catalogue.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_FAILED,
                    |api| async move { api.fetch_tours().await },
                    move |result| ToursAction::Fetched { request, result },
                )]
            },
            ToursAction::Fetched { result, .. } => {
                match result {
                    Ok(tours) => state.catalogue.replace_all(tours),
                    Err(rejection) => state.catalogue.fail(&rejection),
                }
                smallvec![Effect::None]
            },
            ToursAction::FetchById { request, id } => {
                state.catalogue.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_ONE_FAILED,
                    move |api| async move { api.fetch_tour(&id).await },
                    move |result| ToursAction::FetchedById { request, result },
                )]
            },
            ToursAction::FetchedById { result, .. } => {
                match result {
                    Ok(tour) => state.catalogue.set_current(tour),
                    Err(rejection) => state.catalogue.fail(&rejection),
                }
                smallvec![Effect::None]
            },
            ToursAction::Create { request, draft } => {
                if let Err(invalid) = draft.validate() {
                    return smallvec![respond(ToursAction::Created {
                        request,
                        result: Err(Rejection::Failed(invalid.0)),
                    })];
                }
                smallvec![call_api(
                    env,
                    CREATE_FAILED,
                    move |api| async move { api.create_tour(&draft).await },
                    move |result| ToursAction::Created { request, result },
                )]
            },
            ToursAction::Created { result, .. } => {
                if let Ok(tour) = result {
                    state.catalogue.insert_if_absent(tour);
                }
                smallvec![Effect::None]
            },
            ToursAction::Update { request, id, draft } => {
                if let Err(invalid) = draft.validate() {
                    return smallvec![respond(ToursAction::Updated {
                        request,
                        result: Err(Rejection::Failed(invalid.0)),
                    })];
                }
                smallvec![call_api(
                    env,
                    UPDATE_FAILED,
                    move |api| async move { api.update_tour(&id, &draft).await },
                    move |result| ToursAction::Updated { request, result },
                )]
            },
            ToursAction::Updated { result, .. } => {
                if let Ok(tour) = result {
                    state.catalogue.replace(tour);
                }
                smallvec![Effect::None]
            },
            ToursAction::Delete { request, id } => smallvec![call_api(
                env,
                DELETE_FAILED,
                move |api| async move { api.delete_tour(&id).await.map(|()| id) },
                move |result| ToursAction::Deleted { request, result },
            )],
            ToursAction::Deleted { result, .. } => {
                if let Ok(id) = result {
                    state.catalogue.remove(&id);
                }
                smallvec![Effect::None]
            },
            ToursAction::SetActive { request, id, active } => {
                let fallback = if active { ACTIVATE_FAILED } else { DEACTIVATE_FAILED };
                smallvec![call_api(
                    env,
                    fallback,
                    move |api| async move {
                        if active {
                            api.activate_tour(&id).await?;
                        } else {
                            api.deactivate_tour(&id).await?;
                        }
                        Ok::<_, ApiError>((id, active))
                    },
                    move |result| ToursAction::ActiveSet { request, result },
                )]
            },
            ToursAction::ActiveSet { result, .. } => {
                if let Ok((id, active)) = result {
                    state.catalogue.update_with(&id, |tour| tour.is_active = active);
                }
                smallvec![Effect::None]
            },
            ToursAction::SetFilters(filters) => {
                state.filters = filters;
                smallvec![Effect::None]
            },
            ToursAction::ClearFilters => {
                state.filters = TourFilters::default();
                smallvec![Effect::None]
            },
            ToursAction::ClearError => {
                state.catalogue.clear_error();
                smallvec![Effect::None]
            },
            ToursAction::ClearCurrent => {
                state.catalogue.current = None;
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
    use tourbook_core::domain::Difficulty;
    use tourbook_testing::{
        Endpoint, MockBackend, ReducerTest, assertions, bare_error, fixtures, server_error, settle,
        test_environment,
    };

    fn draft(title: &str) -> TourDraft {
        TourDraft {
            title: title.to_string(),
            description: "Sun and sand".to_string(),
            price: Money::from_units(999),
            duration: 7,
            destination: "Bali".to_string(),
            category: TourCategory::Beach,
            image_url: "https://img.example/bali.jpg".to_string(),
            max_group_size: 10,
            difficulty: Difficulty::Easy,
            includes: vec!["Hotel".to_string()],
            is_active: true,
        }
    }

    #[test]
    fn fetch_sets_loading_and_calls_backend() {
        let env = test_environment(Arc::new(MockBackend::new()));
        ReducerTest::new(ToursReducer)
            .with_env(env)
            .given_state(ToursState {
                catalogue: EntityState {
                    error: Some("stale".to_string()),
                    ..EntityState::default()
                },
                ..ToursState::default()
            })
            .when_action(ToursAction::Fetch {
                request: RequestId::new(),
            })
            .then_state(|state| {
                assert!(state.catalogue.loading);
                assert!(state.catalogue.error.is_none());
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[tokio::test]
    async fn fetch_replaces_the_catalogue() {
        let backend = Arc::new(MockBackend::new().with_tours([fixtures::tour(3, 300)]));
        let env = test_environment(backend);
        let mut state = ToursState::default();
        state.catalogue.replace_all(vec![fixtures::tour(1, 100), fixtures::tour(2, 200)]);

        settle(&ToursReducer, &mut state, ToursAction::Fetch { request: RequestId::new() }, &env).await;

        assert_eq!(state.catalogue.items, vec![fixtures::tour(3, 300)]);
        assert!(!state.catalogue.loading);
    }

    #[tokio::test]
    async fn fetch_failure_prefers_server_message() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_once(Endpoint::FetchTours, server_error(503, "Catalogue offline"));
        backend.fail_once(Endpoint::FetchTours, bare_error(500));
        let env = test_environment(backend);
        let mut state = ToursState::default();

        settle(&ToursReducer, &mut state, ToursAction::Fetch { request: RequestId::new() }, &env).await;
        assert_eq!(state.catalogue.error.as_deref(), Some("Catalogue offline"));

        settle(&ToursReducer, &mut state, ToursAction::Fetch { request: RequestId::new() }, &env).await;
        assert_eq!(state.catalogue.error.as_deref(), Some("Failed to fetch tours"));
        assert!(!state.catalogue.loading);
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_backend() {
        let backend = Arc::new(MockBackend::new());
        let env = test_environment(Arc::clone(&backend) as Arc<dyn tourbook_core::BookingApi>);
        let mut state = ToursState::default();
        let request = RequestId::new();

        let produced = settle(
            &ToursReducer,
            &mut state,
            ToursAction::Create {
                request,
                draft: draft("  "),
            },
            &env,
        )
        .await;

        assert_eq!(
            produced,
            vec![ToursAction::Created {
                request,
                result: Err(Rejection::Failed("Please enter a title".to_string())),
            }]
        );
        assert_eq!(backend.calls(Endpoint::CreateTour), 0);
        assert!(state.catalogue.items.is_empty());
    }

    #[tokio::test]
    async fn create_update_and_delete_apply_returned_entities() {
        let backend = Arc::new(MockBackend::new());
        let env = test_environment(backend);
        let mut state = ToursState::default();

        settle(
            &ToursReducer,
            &mut state,
            ToursAction::Create {
                request: RequestId::new(),
                draft: draft("Bali Escape"),
            },
            &env,
        )
        .await;
        let id = state.catalogue.items[0].id.clone();
        state.catalogue.set_current(state.catalogue.items[0].clone());

        settle(
            &ToursReducer,
            &mut state,
            ToursAction::Update {
                request: RequestId::new(),
                id: id.clone(),
                draft: draft("Bali Deluxe"),
            },
            &env,
        )
        .await;
        assert_eq!(state.catalogue.items[0].title, "Bali Deluxe");
        assert_eq!(state.catalogue.current.as_ref().unwrap().title, "Bali Deluxe");

        settle(
            &ToursReducer,
            &mut state,
            ToursAction::Delete {
                request: RequestId::new(),
                id,
            },
            &env,
        )
        .await;
        assert!(state.catalogue.items.is_empty());
        assert!(state.catalogue.current.is_none());
    }

    #[tokio::test]
    async fn deactivate_flips_list_entry_and_current() {
        let backend = Arc::new(MockBackend::new().with_tours([fixtures::tour(1, 100)]));
        let env = test_environment(backend);
        let mut state = ToursState::default();
        state.catalogue.replace_all(vec![fixtures::tour(1, 100)]);
        state.catalogue.set_current(fixtures::tour(1, 100));

        settle(
            &ToursReducer,
            &mut state,
            ToursAction::SetActive {
                request: RequestId::new(),
                id: EntityId::from("1"),
                active: false,
            },
            &env,
        )
        .await;

        assert!(!state.catalogue.items[0].is_active);
        assert!(!state.catalogue.current.as_ref().unwrap().is_active);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_error_untouched() {
        let backend = Arc::new(MockBackend::new());
        let env = test_environment(backend);
        let mut state = ToursState::default();
        let request = RequestId::new();

        let produced = settle(
            &ToursReducer,
            &mut state,
            ToursAction::Delete {
                request,
                id: EntityId::from("404"),
            },
            &env,
        )
        .await;

        assert!(matches!(
            produced.as_slice(),
            [ToursAction::Deleted { result: Err(Rejection::Failed(message)), .. }]
                if message == "Tour not found with id: 404"
        ));
        assert!(state.catalogue.error.is_none());
    }

    #[test]
    fn filters_match_category_destination_and_ranges() {
        let mut tour = fixtures::tour(1, 500);
        tour.destination = "Bali, Indonesia".to_string();
        tour.category = Some(TourCategory::Beach);

        let mut filters = TourFilters::default();
        assert!(filters.matches(&tour));

        filters.destination = "bali".to_string();
        filters.category = Some(TourCategory::Beach);
        assert!(filters.matches(&tour));

        filters.max_price = Money::from_units(400);
        assert!(!filters.matches(&tour));

        filters = TourFilters {
            category: Some(TourCategory::Cruise),
            ..TourFilters::default()
        };
        assert!(!filters.matches(&tour));

        filters = TourFilters {
            min_duration: 6,
            ..TourFilters::default()
        };
        assert!(!filters.matches(&tour));
    }

    #[test]
    fn clear_filters_restores_defaults() {
        let env = test_environment(Arc::new(MockBackend::new()));
        ReducerTest::new(ToursReducer)
            .with_env(env)
            .given_state(ToursState::default())
            .when_action(ToursAction::SetFilters(TourFilters {
                destination: "Alps".to_string(),
                ..TourFilters::default()
            }))
            .when_action(ToursAction::ClearFilters)
            .then_state(|state| assert_eq!(state.filters, TourFilters::default()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
