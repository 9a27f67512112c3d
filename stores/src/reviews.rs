//! Review store for the signed-in user's reviews.

use crate::request::{Outcome, RequestId, call_api, respond};
use tourbook_core::domain::{NewReview, Review, ReviewUpdate};
use tourbook_core::effect::Effect;
use tourbook_core::environment::ApiEnvironment;
use tourbook_core::reducer::Reducer;
use tourbook_core::{EntityId, EntityState, Rejection, SmallVec, smallvec};

const FETCH_FAILED: &str = "Failed to fetch reviews";
const CREATE_FAILED: &str = "Failed to create review";
const UPDATE_FAILED: &str = "Failed to update review";
const DELETE_FAILED: &str = "Failed to delete review";

/// Review store state
pub type ReviewsState = EntityState<Review>;

/// Review store actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReviewsAction {
    /// `GET /api/reviews/my-reviews`
    Fetch {
        /// Correlation id
        request: RequestId,
    },
    /// Fetch finished
    Fetched {
        /// Correlation id
        request: RequestId,
        /// Reviews or reason
        result: Outcome<Vec<Review>>,
    },
    /// `POST /api/reviews`
    Create {
        /// Correlation id
        request: RequestId,
        /// Review payload
        review: NewReview,
    },
    /// Creation finished
    Created {
        /// Correlation id
        request: RequestId,
        /// Created review or reason
        result: Outcome<Review>,
    },
    /// `PUT /api/reviews/{id}`
    Update {
        /// Correlation id
        request: RequestId,
        /// Review to change
        id: EntityId,
        /// New rating and comment
        review: ReviewUpdate,
    },
    /// Update finished
    Updated {
        /// Correlation id
        request: RequestId,
        /// Updated review or reason
        result: Outcome<Review>,
    },
    /// `DELETE /api/reviews/{id}`
    Delete {
        /// Correlation id
        request: RequestId,
        /// Review to delete
        id: EntityId,
    },
    /// Deletion finished
    Deleted {
        /// Correlation id
        request: RequestId,
        /// Deleted id or reason
        result: Outcome<EntityId>,
    },
}

impl ReviewsAction {
    /// Correlation id when this is a terminal action
    #[must_use]
    pub const fn completes(&self) -> Option<RequestId> {
        match self {
            Self::Fetched { request, .. }
            | Self::Created { request, .. }
            | Self::Updated { request, .. }
            | Self::Deleted { request, .. } => Some(*request),
            _ => None,
        }
    }
}

/// Reducer for [`ReviewsState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReviewsReducer;

impl Reducer for ReviewsReducer {
    type State = ReviewsState;
    type Action = ReviewsAction;
    type Environment = ApiEnvironment;

    fn reduce(
        &self,
        state: &mut ReviewsState,
        action: ReviewsAction,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<ReviewsAction>; 4]> {
        match action {
            ReviewsAction::Fetch { request } => {
                state.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_FAILED,
                    |api| async move { api.fetch_my_reviews().await },
                    move |result| ReviewsAction::Fetched { request, result },
                )]
            },
            ReviewsAction::Fetched { result, .. } => {
                match result {
                    Ok(reviews) => state.replace_all(reviews),
                    Err(rejection) => state.fail(&rejection),
                }
                smallvec![Effect::None]
            },
            ReviewsAction::Create { request, review } => {
                if let Err(invalid) = review.validate() {
                    return smallvec![respond(ReviewsAction::Created {
                        request,
                        result: Err(Rejection::Failed(invalid.0)),
                    })];
                }
                smallvec![call_api(
                    env,
                    CREATE_FAILED,
                    move |api| async move { api.create_review(&review).await },
                    move |result| ReviewsAction::Created { request, result },
                )]
            },
            ReviewsAction::Created { result, .. } => {
                if let Ok(review) = result {
                    state.insert_if_absent(review);
                }
                smallvec![Effect::None]
            },
            ReviewsAction::Update {
                request,
                id,
                review,
            } => {
                if let Err(invalid) = review.validate() {
                    return smallvec![respond(ReviewsAction::Updated {
                        request,
                        result: Err(Rejection::Failed(invalid.0)),
                    })];
                }
                smallvec![call_api(
                    env,
                    UPDATE_FAILED,
                    move |api| async move { api.update_review(&id, &review).await },
                    move |result| ReviewsAction::Updated { request, result },
                )]
            },
            ReviewsAction::Updated { result, .. } => {
                if let Ok(review) = result {
                    state.replace(review);
                }
                smallvec![Effect::None]
            },
            ReviewsAction::Delete { request, id } => smallvec![call_api(
                env,
                DELETE_FAILED,
                move |api| async move { api.delete_review(&id).await.map(|()| id) },
                move |result| ReviewsAction::Deleted { request, result },
            )],
            ReviewsAction::Deleted { result, .. } => {
                if let Ok(id) = result {
                    state.remove(&id);
                }
                smallvec![Effect::None]
            },
        }
    }
}
