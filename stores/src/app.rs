//! Application reducer.
//!
//! Composes the entity stores and the wishlist into one state tree through
//! [`Pullback`], and orchestrates the checkout that books a tour:
//!
//! 1. remove the tour from the wishlist on the backend, and locally if it is
//!    there. The local list may be stale, so the request is always sent. A
//!    failure here is logged and ignored;
//! 2. create the booking through the booking store;
//! 3. on success, drop the tour from the local wishlist and re-fetch the
//!    wishlist and the user's bookings;
//! 4. on failure after a failed cleanup, re-fetch the wishlist.
//!
//! The caller sees the outcome of step 2 only.

use crate::bookings::{BookingsAction, BookingsReducer, BookingsState};
use crate::request::{Outcome, RequestId, respond};
use crate::reviews::{ReviewsAction, ReviewsReducer, ReviewsState};
use crate::tours::{ToursAction, ToursReducer, ToursState};
use crate::users::{UsersAction, UsersReducer, UsersState};
use crate::wishlist::{self, Phase, WishlistAction, WishlistReducer, WishlistState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tourbook_core::composition::Pullback;
use tourbook_core::domain::{NewBooking, Tour};
use tourbook_core::effect::Effect;
use tourbook_core::environment::ApiEnvironment;
use tourbook_core::reducer::Reducer;
use tourbook_core::{EntityId, NaiveDate, Rejection, SmallVec, smallvec};

/// Whole client state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Tour catalogue
    pub tours: ToursState,
    /// Bookings
    pub bookings: BookingsState,
    /// Users and the signed-in profile
    pub users: UsersState,
    /// Own reviews
    pub reviews: ReviewsState,
    /// Wishlist
    pub wishlist: WishlistState,
    /// Checkouts in progress
    pub checkouts: Vec<Checkout>,
}

/// Result of the wishlist cleanup step of a checkout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cleanup {
    /// Removal sent, no answer yet
    InFlight,
    /// Backend removed the tour
    Removed,
    /// Backend rejected the removal
    Failed,
}

/// A booking flow started by [`AppAction::BookNow`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    /// Correlation id, shared with the booking creation
    pub request: RequestId,
    /// Booked tour
    pub tour_id: EntityId,
    /// Payload sent once cleanup is done
    pub booking: NewBooking,
    /// Cleanup step outcome
    pub cleanup: Cleanup,
}

/// Application actions
#[derive(Clone, Debug, PartialEq)]
pub enum AppAction {
    /// Tour store action
    Tours(ToursAction),
    /// Booking store action
    Bookings(BookingsAction),
    /// User store action
    Users(UsersAction),
    /// Review store action
    Reviews(ReviewsAction),
    /// Wishlist action
    Wishlist(WishlistAction),
    /// Book `tour` for `guests` starting on `travel_date`.
    ///
    /// Terminates with `Bookings(Created { request, .. })`.
    BookNow {
        /// Correlation id
        request: RequestId,
        /// Tour to book
        tour: Tour,
        /// Number of guests
        guests: u32,
        /// First day of travel
        travel_date: NaiveDate,
    },
    /// Wishlist cleanup of a checkout answered
    CheckoutCleaned {
        /// Checkout correlation id
        request: RequestId,
        /// Backend outcome
        result: Outcome<()>,
    },
    /// Drop every store's data (sign-out)
    Reset,
}

impl AppAction {
    /// Correlation id when this is a terminal action
    #[must_use]
    pub const fn completes(&self) -> Option<RequestId> {
        match self {
            Self::Tours(action) => action.completes(),
            Self::Bookings(action) => action.completes(),
            Self::Users(action) => action.completes(),
            Self::Reviews(action) => action.completes(),
            Self::Wishlist(action) => action.completes(),
            Self::BookNow { .. } | Self::CheckoutCleaned { .. } | Self::Reset => None,
        }
    }
}

/// Reducer over [`AppState`]
#[derive(Clone)]
pub struct AppReducer {
    tours: Pullback<ToursReducer, AppState, AppAction>,
    bookings: Pullback<BookingsReducer, AppState, AppAction>,
    users: Pullback<UsersReducer, AppState, AppAction>,
    reviews: Pullback<ReviewsReducer, AppState, AppAction>,
    wishlist: Pullback<WishlistReducer, AppState, AppAction>,
}

impl Default for AppReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl AppReducer {
    /// Wires every store into the application state
    #[must_use]
    pub fn new() -> Self {
        Self {
            tours: Pullback::new(ToursReducer, |s: &mut AppState| &mut s.tours, AppAction::Tours),
            bookings: Pullback::new(
                BookingsReducer,
                |s: &mut AppState| &mut s.bookings,
                AppAction::Bookings,
            ),
            users: Pullback::new(UsersReducer, |s: &mut AppState| &mut s.users, AppAction::Users),
            reviews: Pullback::new(
                ReviewsReducer,
                |s: &mut AppState| &mut s.reviews,
                AppAction::Reviews,
            ),
            wishlist: Pullback::new(
                WishlistReducer,
                |s: &mut AppState| &mut s.wishlist,
                AppAction::Wishlist,
            ),
        }
    }

    fn book_now(
        &self,
        state: &mut AppState,
        request: RequestId,
        tour: &Tour,
        guests: u32,
        travel_date: NaiveDate,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<AppAction>; 4]> {
        let booking = match NewBooking::for_tour(tour, guests, travel_date) {
            Ok(booking) => booking,
            Err(invalid) => {
                return smallvec![respond(AppAction::Bookings(BookingsAction::Created {
                    request,
                    result: Err(Rejection::Failed(invalid.0)),
                }))];
            },
        };

        tracing::debug!(%request, tour_id = %tour.id, "Removing booked tour from wishlist");
        state.wishlist.begin_remove(request, tour.id.clone());
        state.checkouts.push(Checkout {
            request,
            tour_id: tour.id.clone(),
            booking,
            cleanup: Cleanup::InFlight,
        });

        let api = Arc::clone(&env.api);
        let tour_id = tour.id.clone();
        smallvec![Effect::future(async move {
            let result = api
                .remove_from_wishlist(&tour_id)
                .await
                .map_err(|err| Rejection::from_api(&err, "Failed to remove from wishlist"));
            Some(AppAction::CheckoutCleaned { request, result })
        })]
    }

    fn cleanup_answered(
        &self,
        state: &mut AppState,
        request: RequestId,
        result: &Outcome<()>,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<AppAction>; 4]> {
        let phase = if result.is_ok() {
            Phase::Confirmed
        } else {
            Phase::RolledBack
        };
        state.wishlist.settle(request, phase);

        let Some(checkout) = state.checkouts.iter_mut().find(|c| c.request == request) else {
            return smallvec![Effect::None];
        };
        match result {
            Ok(()) => checkout.cleanup = Cleanup::Removed,
            Err(rejection) => {
                tracing::warn!(
                    %request,
                    tour_id = %checkout.tour_id,
                    reason = %rejection,
                    "Wishlist cleanup failed, booking anyway"
                );
                checkout.cleanup = Cleanup::Failed;
            },
        }
        let booking = checkout.booking.clone();
        self.create_booking(state, request, booking, env)
    }

    fn create_booking(
        &self,
        state: &mut AppState,
        request: RequestId,
        booking: NewBooking,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<AppAction>; 4]> {
        self.bookings
            .run(state, BookingsAction::Create { request, booking }, env)
    }

    /// Follow-up once the booking of a checkout has been answered
    fn finish_checkout(
        &self,
        state: &mut AppState,
        request: RequestId,
        booked: bool,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<AppAction>; 4]> {
        let Some(index) = state.checkouts.iter().position(|c| c.request == request) else {
            return SmallVec::new();
        };
        let checkout = state.checkouts.remove(index);

        if booked {
            state.wishlist.exclude(&checkout.tour_id);
            let wishlist = wishlist::fetch(&mut state.wishlist, RequestId::new(), env);
            let mut effects = smallvec![wishlist.map(AppAction::Wishlist)];
            effects.extend(self.bookings.run(
                state,
                BookingsAction::FetchMine {
                    request: RequestId::new(),
                },
                env,
            ));
            metrics::counter!("checkout.completed").increment(1);
            return effects;
        }

        if checkout.cleanup == Cleanup::Failed {
            tracing::debug!(%request, "Booking failed after cleanup failure, restoring wishlist");
            let wishlist = wishlist::fetch(&mut state.wishlist, RequestId::new(), env);
            return smallvec![wishlist.map(AppAction::Wishlist)];
        }
        SmallVec::new()
    }
}

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = ApiEnvironment;

    fn reduce(
        &self,
        state: &mut AppState,
        action: AppAction,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<AppAction>; 4]> {
        match action {
            AppAction::Tours(action) => self.tours.run(state, action, env),
            AppAction::Bookings(BookingsAction::Created { request, result }) => {
                let booked = result.is_ok();
                let mut effects = self
                    .bookings
                    .run(state, BookingsAction::Created { request, result }, env);
                effects.extend(self.finish_checkout(state, request, booked, env));
                effects
            },
            AppAction::Bookings(action) => self.bookings.run(state, action, env),
            AppAction::Users(action) => self.users.run(state, action, env),
            AppAction::Reviews(action) => self.reviews.run(state, action, env),
            AppAction::Wishlist(action) => self.wishlist.run(state, action, env),
            AppAction::BookNow {
                request,
                tour,
                guests,
                travel_date,
            } => self.book_now(state, request, &tour, guests, travel_date, env),
            AppAction::CheckoutCleaned { request, result } => {
                self.cleanup_answered(state, request, &result, env)
            },
            AppAction::Reset => {
                let filters = std::mem::take(&mut state.tours.filters);
                *state = AppState::default();
                state.tours.filters = filters;
                smallvec![Effect::None]
            },
        }
    }
}
