//! Request/response facade over the application [`Store`].
//!
//! Every operation sends a request action tagged with a fresh [`RequestId`] and
//! waits for the terminal action carrying the same id. Failures come back as
//! [`AppError::Rejected`] with the message the store surfaced; late feedback
//! (re-fetches after a checkout or a failed removal) keeps running after the
//! call returns, see [`TourbookApp::wait_idle`].

use crate::app::{AppAction, AppReducer, AppState};
use crate::bookings::{BookingsAction, StatusChange};
use crate::error::AppError;
use crate::request::{Outcome, RequestId};
use crate::reviews::ReviewsAction;
use crate::tours::{ToursAction, TourFilters};
use crate::users::UsersAction;
use crate::wishlist::WishlistAction;
use std::time::Duration;
use tourbook_core::domain::{
    Booking, BookingStats, BookingStatus, NewBooking, NewReview, PaymentStatus, ProfileUpdate,
    Review, ReviewUpdate, Tour, TourDraft, User,
};
use tourbook_core::environment::ApiEnvironment;
use tourbook_core::{EntityId, NaiveDate};
use tourbook_runtime::{Store, StoreConfig};

/// Store type behind [`TourbookApp`]
pub type AppStore = Store<AppState, AppAction, ApiEnvironment, AppReducer>;

/// Default time to wait for a terminal action
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client-side state layer of the booking application
#[derive(Clone)]
pub struct TourbookApp {
    store: AppStore,
    timeout: Duration,
}

impl TourbookApp {
    /// Empty state over `env` with the default store configuration
    #[must_use]
    pub fn new(env: ApiEnvironment) -> Self {
        Self::with_config(env, StoreConfig::default(), DEFAULT_REQUEST_TIMEOUT)
    }

    /// Empty state with an explicit store configuration and request timeout
    #[must_use]
    pub fn with_config(env: ApiEnvironment, config: StoreConfig, timeout: Duration) -> Self {
        Self {
            store: Store::with_config(AppState::default(), AppReducer::new(), env, config),
            timeout,
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &AppStore {
        &self.store
    }

    /// Clone of the whole state
    pub async fn snapshot(&self) -> AppState {
        self.store.snapshot().await
    }

    /// Reads the state through `f`
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&AppState) -> T,
    {
        self.store.state(f).await
    }

    async fn run<T, F, X>(&self, make: F, extract: X) -> Result<T, AppError>
    where
        F: FnOnce(RequestId) -> AppAction,
        X: FnOnce(AppAction) -> Option<Outcome<T>>,
    {
        let request = RequestId::new();
        let terminal = self
            .store
            .send_and_wait_for(
                make(request),
                move |action| action.completes() == Some(request),
                self.timeout,
            )
            .await?;
        let outcome = extract(terminal).ok_or(AppError::UnexpectedOutcome(request))?;
        Ok(outcome?)
    }

    async fn dispatch(&self, action: AppAction) -> Result<(), AppError> {
        self.store.send(action).await?;
        Ok(())
    }

    /// Waits until no effect is running, background re-fetches included
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] with a timeout when effects are still
    /// running after `timeout`.
    pub async fn wait_idle(&self, timeout: Duration) -> Result<(), AppError> {
        self.store.wait_idle(timeout).await?;
        Ok(())
    }

    /// Drops every store's data; catalogue filters survive
    ///
    /// # Errors
    ///
    /// Fails only when the store is shutting down.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        tracing::info!("Clearing client state");
        self.dispatch(AppAction::Reset).await
    }

    // Tours

    /// Loads the catalogue, replacing the previous list
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_tours(&self) -> Result<Vec<Tour>, AppError> {
        self.run(
            |request| AppAction::Tours(ToursAction::Fetch { request }),
            |action| match action {
                AppAction::Tours(ToursAction::Fetched { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Loads one tour into `tours.catalogue.current`
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_tour(&self, id: impl Into<EntityId>) -> Result<Tour, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Tours(ToursAction::FetchById { request, id }),
            |action| match action {
                AppAction::Tours(ToursAction::FetchedById { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Creates a tour (admin)
    ///
    /// # Errors
    ///
    /// Returns the validation or backend rejection.
    pub async fn create_tour(&self, draft: TourDraft) -> Result<Tour, AppError> {
        self.run(
            |request| AppAction::Tours(ToursAction::Create { request, draft }),
            |action| match action {
                AppAction::Tours(ToursAction::Created { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Replaces a tour (admin)
    ///
    /// # Errors
    ///
    /// Returns the validation or backend rejection.
    pub async fn update_tour(&self, id: impl Into<EntityId>, draft: TourDraft) -> Result<Tour, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Tours(ToursAction::Update { request, id, draft }),
            |action| match action {
                AppAction::Tours(ToursAction::Updated { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Deletes a tour (admin)
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn delete_tour(&self, id: impl Into<EntityId>) -> Result<EntityId, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Tours(ToursAction::Delete { request, id }),
            |action| match action {
                AppAction::Tours(ToursAction::Deleted { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Activates or deactivates a tour (admin)
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn set_tour_active(&self, id: impl Into<EntityId>, active: bool) -> Result<(), AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Tours(ToursAction::SetActive { request, id, active }),
            |action| match action {
                AppAction::Tours(ToursAction::ActiveSet { result, .. }) => {
                    Some(result.map(|_| ()))
                },
                _ => None,
            },
        )
        .await
    }

    /// Replaces the catalogue filters
    ///
    /// # Errors
    ///
    /// Fails only when the store is shutting down.
    pub async fn set_tour_filters(&self, filters: TourFilters) -> Result<(), AppError> {
        self.dispatch(AppAction::Tours(ToursAction::SetFilters(filters)))
            .await
    }

    /// Restores the default catalogue filters
    ///
    /// # Errors
    ///
    /// Fails only when the store is shutting down.
    pub async fn clear_tour_filters(&self) -> Result<(), AppError> {
        self.dispatch(AppAction::Tours(ToursAction::ClearFilters)).await
    }

    // Bookings

    /// Loads every booking (admin)
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_all_bookings(&self) -> Result<Vec<Booking>, AppError> {
        self.run(
            |request| AppAction::Bookings(BookingsAction::FetchAll { request }),
            |action| match action {
                AppAction::Bookings(BookingsAction::FetchedAll { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Loads the signed-in user's bookings
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_my_bookings(&self) -> Result<Vec<Booking>, AppError> {
        self.run(
            |request| AppAction::Bookings(BookingsAction::FetchMine { request }),
            |action| match action {
                AppAction::Bookings(BookingsAction::FetchedMine { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Loads one booking into `bookings.entries.current`
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_booking(&self, id: impl Into<EntityId>) -> Result<Booking, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Bookings(BookingsAction::FetchById { request, id }),
            |action| match action {
                AppAction::Bookings(BookingsAction::FetchedById { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Creates a booking without touching the wishlist
    ///
    /// # Errors
    ///
    /// Returns the validation or backend rejection.
    pub async fn create_booking(&self, booking: NewBooking) -> Result<Booking, AppError> {
        self.run(
            |request| AppAction::Bookings(BookingsAction::Create { request, booking }),
            extract_created_booking,
        )
        .await
    }

    /// Books `tour`: removes it from the wishlist, then creates the booking.
    ///
    /// The result reflects the booking creation only; a failed wishlist
    /// cleanup is logged and does not prevent the booking.
    ///
    /// # Errors
    ///
    /// Returns the validation or backend rejection of the booking.
    #[tracing::instrument(skip(self, tour), fields(tour_id = %tour.id))]
    pub async fn book_now(
        &self,
        tour: Tour,
        guests: u32,
        travel_date: NaiveDate,
    ) -> Result<Booking, AppError> {
        self.run(
            |request| AppAction::BookNow {
                request,
                tour,
                guests,
                travel_date,
            },
            extract_created_booking,
        )
        .await
    }

    async fn change_booking(&self, id: EntityId, change: StatusChange) -> Result<Booking, AppError> {
        self.run(
            |request| AppAction::Bookings(BookingsAction::ChangeStatus { request, id, change }),
            |action| match action {
                AppAction::Bookings(BookingsAction::StatusChanged { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Changes a booking's lifecycle status (admin)
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn update_booking_status(
        &self,
        id: impl Into<EntityId>,
        status: BookingStatus,
    ) -> Result<Booking, AppError> {
        self.change_booking(id.into(), StatusChange::Booking(status)).await
    }

    /// Changes a booking's payment status (admin)
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn update_payment_status(
        &self,
        id: impl Into<EntityId>,
        status: PaymentStatus,
    ) -> Result<Booking, AppError> {
        self.change_booking(id.into(), StatusChange::Payment(status)).await
    }

    /// Deletes a booking
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn delete_booking(&self, id: impl Into<EntityId>) -> Result<EntityId, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Bookings(BookingsAction::Delete { request, id }),
            |action| match action {
                AppAction::Bookings(BookingsAction::Deleted { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Loads the confirmed-count and revenue figures
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_booking_stats(&self) -> Result<BookingStats, AppError> {
        self.run(
            |request| AppAction::Bookings(BookingsAction::FetchStats { request }),
            |action| match action {
                AppAction::Bookings(BookingsAction::StatsFetched { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    // Users

    /// Loads every account (admin)
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_users(&self) -> Result<Vec<User>, AppError> {
        self.run(
            |request| AppAction::Users(UsersAction::FetchAll { request }),
            |action| match action {
                AppAction::Users(UsersAction::FetchedAll { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Loads the enabled accounts only (admin)
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_active_users(&self) -> Result<Vec<User>, AppError> {
        self.run(
            |request| AppAction::Users(UsersAction::FetchActive { request }),
            |action| match action {
                AppAction::Users(UsersAction::FetchedAll { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Replaces the user list with the accounts matching `term` (admin)
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn search_users(&self, term: impl Into<String>) -> Result<Vec<User>, AppError> {
        let term = term.into();
        self.run(
            |request| AppAction::Users(UsersAction::Search { request, term }),
            |action| match action {
                AppAction::Users(UsersAction::Searched { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Loads one account into `users.current` (admin)
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_user(&self, id: impl Into<EntityId>) -> Result<User, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Users(UsersAction::FetchById { request, id }),
            |action| match action {
                AppAction::Users(UsersAction::FetchedById { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Edits an account (admin)
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn update_user(
        &self,
        id: impl Into<EntityId>,
        update: ProfileUpdate,
    ) -> Result<User, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Users(UsersAction::Update { request, id, update }),
            |action| match action {
                AppAction::Users(UsersAction::Updated { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Deletes an account (admin)
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn delete_user(&self, id: impl Into<EntityId>) -> Result<EntityId, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Users(UsersAction::Delete { request, id }),
            |action| match action {
                AppAction::Users(UsersAction::Deleted { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Enables or disables an account (admin)
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn set_user_active(&self, id: impl Into<EntityId>, active: bool) -> Result<(), AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Users(UsersAction::SetActive { request, id, active }),
            |action| match action {
                AppAction::Users(UsersAction::ActiveSet { result, .. }) => {
                    Some(result.map(|_| ()))
                },
                _ => None,
            },
        )
        .await
    }

    /// Loads the signed-in profile
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_me(&self) -> Result<User, AppError> {
        self.run(
            |request| AppAction::Users(UsersAction::FetchMe { request }),
            |action| match action {
                AppAction::Users(UsersAction::FetchedMe { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Updates the signed-in profile
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, AppError> {
        self.run(
            |request| AppAction::Users(UsersAction::UpdateProfile { request, update }),
            |action| match action {
                AppAction::Users(UsersAction::ProfileUpdated { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    // Reviews

    /// Loads the signed-in user's reviews
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_reviews(&self) -> Result<Vec<Review>, AppError> {
        self.run(
            |request| AppAction::Reviews(ReviewsAction::Fetch { request }),
            |action| match action {
                AppAction::Reviews(ReviewsAction::Fetched { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Writes a review
    ///
    /// # Errors
    ///
    /// Returns the validation or backend rejection.
    pub async fn create_review(&self, review: NewReview) -> Result<Review, AppError> {
        self.run(
            |request| AppAction::Reviews(ReviewsAction::Create { request, review }),
            |action| match action {
                AppAction::Reviews(ReviewsAction::Created { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Edits a review
    ///
    /// # Errors
    ///
    /// Returns the validation or backend rejection.
    pub async fn update_review(
        &self,
        id: impl Into<EntityId>,
        review: ReviewUpdate,
    ) -> Result<Review, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Reviews(ReviewsAction::Update { request, id, review }),
            |action| match action {
                AppAction::Reviews(ReviewsAction::Updated { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Deletes a review
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn delete_review(&self, id: impl Into<EntityId>) -> Result<EntityId, AppError> {
        let id = id.into();
        self.run(
            |request| AppAction::Reviews(ReviewsAction::Delete { request, id }),
            |action| match action {
                AppAction::Reviews(ReviewsAction::Deleted { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    // Wishlist

    /// Loads the wishlist, replacing local items
    ///
    /// # Errors
    ///
    /// Returns the rejection surfaced by the store.
    pub async fn fetch_wishlist(&self) -> Result<Vec<Tour>, AppError> {
        self.run(
            |request| AppAction::Wishlist(WishlistAction::Fetch { request }),
            |action| match action {
                AppAction::Wishlist(WishlistAction::Fetched { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Adds `tour` to the wishlist.
    ///
    /// The tour is visible in `wishlist.items` as soon as the request is
    /// dispatched, and removed again if the backend rejects the add.
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn add_to_wishlist(&self, tour: Tour) -> Result<(), AppError> {
        self.run(
            |request| AppAction::Wishlist(WishlistAction::Add { request, tour }),
            |action| match action {
                AppAction::Wishlist(WishlistAction::Added { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Removes a tour from the wishlist.
    ///
    /// On rejection the wishlist is re-fetched once in the background.
    ///
    /// # Errors
    ///
    /// Returns the backend rejection.
    pub async fn remove_from_wishlist(&self, tour_id: impl Into<EntityId>) -> Result<(), AppError> {
        let tour_id = tour_id.into();
        self.run(
            |request| AppAction::Wishlist(WishlistAction::Remove { request, tour_id }),
            |action| match action {
                AppAction::Wishlist(WishlistAction::Removed { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Replaces the local wishlist without a backend call
    ///
    /// # Errors
    ///
    /// Fails only when the store is shutting down.
    pub async fn set_wishlist(&self, tours: Vec<Tour>) -> Result<(), AppError> {
        self.dispatch(AppAction::Wishlist(WishlistAction::SetItems(tours)))
            .await
    }

    /// Clears the wishlist error
    ///
    /// # Errors
    ///
    /// Fails only when the store is shutting down.
    pub async fn clear_wishlist_error(&self) -> Result<(), AppError> {
        self.dispatch(AppAction::Wishlist(WishlistAction::ClearError))
            .await
    }
}

fn extract_created_booking(action: AppAction) -> Option<Outcome<Booking>> {
    match action {
        AppAction::Bookings(BookingsAction::Created { result, .. }) => Some(result),
        _ => None,
    }
}
