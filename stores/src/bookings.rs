//! Booking store.
//!
//! Two collections share one request status: `entries` holds every booking
//! (admin view) and `mine` holds the signed-in user's bookings. A created
//! booking is appended to both; status changes and deletions are applied to
//! both.

use crate::request::{Outcome, RequestId, call_api, respond};
use serde::{Deserialize, Serialize};
use tourbook_core::domain::{Booking, BookingStats, BookingStatus, NewBooking, PaymentStatus};
use tourbook_core::effect::Effect;
use tourbook_core::environment::ApiEnvironment;
use tourbook_core::reducer::Reducer;
use tourbook_core::{ApiError, Entity, EntityId, EntityState, Rejection, SmallVec, smallvec};

const FETCH_ALL_FAILED: &str = "Failed to fetch bookings";
const FETCH_MINE_FAILED: &str = "Failed to fetch current user bookings";
const FETCH_ONE_FAILED: &str = "Failed to fetch booking";
const CREATE_FAILED: &str = "Failed to create booking";
const STATUS_FAILED: &str = "Failed to update booking status";
const PAYMENT_FAILED: &str = "Failed to update payment status";
const DELETE_FAILED: &str = "Failed to delete booking";
const STATS_FAILED: &str = "Failed to fetch booking stats";

/// Booking store state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingsState {
    /// Every booking (admin) plus the shared loading/error status
    pub entries: EntityState<Booking>,
    /// Bookings of the signed-in user
    pub mine: Vec<Booking>,
    /// Figures from the stats endpoints
    pub stats: BookingStats,
}

impl BookingsState {
    /// Every booking visible to an administrator
    #[must_use]
    pub fn all(&self) -> &[Booking] {
        &self.entries.items
    }

    /// Appends a newly created booking to both collections, once
    pub fn record_created(&mut self, booking: Booking) {
        if !self.mine.iter().any(|b| b.id == booking.id) {
            self.mine.push(booking.clone());
        }
        self.entries.insert_if_absent(booking);
    }

    fn replace_everywhere(&mut self, booking: Booking) {
        if let Some(slot) = self.mine.iter_mut().find(|b| b.id == booking.id) {
            *slot = booking.clone();
        }
        self.entries.replace(booking);
    }

    fn remove_everywhere(&mut self, id: &EntityId) {
        self.mine.retain(|b| b.id() != id);
        self.entries.remove(id);
    }
}

/// Which status field an update targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusChange {
    /// Booking lifecycle status
    Booking(BookingStatus),
    /// Payment status
    Payment(PaymentStatus),
}

/// Booking store actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingsAction {
    /// `GET /api/admin/bookings`
    FetchAll {
        /// Correlation id
        request: RequestId,
    },
    /// Admin fetch finished
    FetchedAll {
        /// Correlation id
        request: RequestId,
        /// Every booking or reason
        result: Outcome<Vec<Booking>>,
    },
    /// `GET /api/bookings/my-bookings`
    FetchMine {
        /// Correlation id
        request: RequestId,
    },
    /// Own bookings fetch finished
    FetchedMine {
        /// Correlation id
        request: RequestId,
        /// Own bookings or reason
        result: Outcome<Vec<Booking>>,
    },
    /// `GET /api/bookings/{id}`
    FetchById {
        /// Correlation id
        request: RequestId,
        /// Booking to load
        id: EntityId,
    },
    /// Fetch by id finished; the booking lands in `entries.current`
    FetchedById {
        /// Correlation id
        request: RequestId,
        /// Booking or reason
        result: Outcome<Booking>,
    },
    /// `POST /api/bookings`
    Create {
        /// Correlation id
        request: RequestId,
        /// Booking payload
        booking: NewBooking,
    },
    /// Creation finished
    Created {
        /// Correlation id
        request: RequestId,
        /// Created booking or reason
        result: Outcome<Booking>,
    },
    /// Change the booking or payment status
    ChangeStatus {
        /// Correlation id
        request: RequestId,
        /// Booking to change
        id: EntityId,
        /// Target status
        change: StatusChange,
    },
    /// Status change finished
    StatusChanged {
        /// Correlation id
        request: RequestId,
        /// Updated booking or reason
        result: Outcome<Booking>,
    },
    /// `DELETE /api/bookings/{id}`
    Delete {
        /// Correlation id
        request: RequestId,
        /// Booking to delete
        id: EntityId,
    },
    /// Deletion finished
    Deleted {
        /// Correlation id
        request: RequestId,
        /// Deleted id or reason
        result: Outcome<EntityId>,
    },
    /// Load confirmed count and total revenue
    FetchStats {
        /// Correlation id
        request: RequestId,
    },
    /// Stats fetch finished
    StatsFetched {
        /// Correlation id
        request: RequestId,
        /// Figures or reason
        result: Outcome<BookingStats>,
    },
    /// Forget the last error
    ClearError,
    /// Drop both collections
    Clear,
}

impl BookingsAction {
    /// Correlation id when this is a terminal action
    #[must_use]
    pub const fn completes(&self) -> Option<RequestId> {
        match self {
            Self::FetchedAll { request, .. }
            | Self::FetchedMine { request, .. }
            | Self::FetchedById { request, .. }
            | Self::Created { request, .. }
            | Self::StatusChanged { request, .. }
            | Self::Deleted { request, .. }
            | Self::StatsFetched { request, .. } => Some(*request),
            _ => None,
        }
    }
}

/// Reducer for [`BookingsState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingsReducer;

impl Reducer for BookingsReducer {
    type State = BookingsState;
    type Action = BookingsAction;
    type Environment = ApiEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut BookingsState,
        action: BookingsAction,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<BookingsAction>; 4]> {
        match action {
            BookingsAction::FetchAll { request } => {
                state.entries.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_ALL_FAILED,
                    |api| async move { api.fetch_all_bookings().await },
                    move |result| BookingsAction::FetchedAll { request, result },
                )]
            },
            BookingsAction::FetchedAll { result, .. } => {
                match result {
                    Ok(bookings) => state.entries.replace_all(bookings),
                    Err(rejection) => state.entries.fail(&rejection),
                }
                smallvec![Effect::None]
            },
            BookingsAction::FetchMine { request } => {
                state.entries.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_MINE_FAILED,
                    |api| async move { api.fetch_my_bookings().await },
                    move |result| BookingsAction::FetchedMine { request, result },
                )]
            },
            BookingsAction::FetchedMine { result, .. } => {
                match result {
                    Ok(bookings) => {
                        state.mine = bookings;
                        state.entries.loading = false;
                        state.entries.error = None;
                    },
                    Err(rejection) => state.entries.fail(&rejection),
                }
                smallvec![Effect::None]
            },
            BookingsAction::FetchById { request, id } => {
                state.entries.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_ONE_FAILED,
                    move |api| async move { api.fetch_booking(&id).await },
                    move |result| BookingsAction::FetchedById { request, result },
                )]
            },
            BookingsAction::FetchedById { result, .. } => {
                match result {
                    Ok(booking) => state.entries.set_current(booking),
                    Err(rejection) => state.entries.fail(&rejection),
                }
                smallvec![Effect::None]
            },
            BookingsAction::Create { request, booking } => {
                if booking.guests < 1 {
                    return smallvec![respond(BookingsAction::Created {
                        request,
                        result: Err(Rejection::Failed(
                            "At least one guest is required".to_string()
                        )),
                    })];
                }
                tracing::debug!(%request, tour_id = %booking.tour_id, "Creating booking");
                smallvec![call_api(
                    env,
                    CREATE_FAILED,
                    move |api| async move { api.create_booking(&booking).await },
                    move |result| BookingsAction::Created { request, result },
                )]
            },
            BookingsAction::Created { result, .. } => {
                if let Ok(booking) = result {
                    state.record_created(booking);
                }
                smallvec![Effect::None]
            },
            BookingsAction::ChangeStatus {
                request,
                id,
                change,
            } => {
                let fallback = match change {
                    StatusChange::Booking(_) => STATUS_FAILED,
                    StatusChange::Payment(_) => PAYMENT_FAILED,
                };
                smallvec![call_api(
                    env,
                    fallback,
                    move |api| async move {
                        match change {
                            StatusChange::Booking(status) => {
                                api.update_booking_status(&id, status).await
                            },
                            StatusChange::Payment(status) => {
                                api.update_payment_status(&id, status).await
                            },
                        }
                    },
                    move |result| BookingsAction::StatusChanged { request, result },
                )]
            },
            BookingsAction::StatusChanged { result, .. } => {
                if let Ok(booking) = result {
                    state.replace_everywhere(booking);
                }
                smallvec![Effect::None]
            },
            BookingsAction::Delete { request, id } => smallvec![call_api(
                env,
                DELETE_FAILED,
                move |api| async move { api.delete_booking(&id).await.map(|()| id) },
                move |result| BookingsAction::Deleted { request, result },
            )],
            BookingsAction::Deleted { result, .. } => {
                if let Ok(id) = result {
                    state.remove_everywhere(&id);
                }
                smallvec![Effect::None]
            },
            BookingsAction::FetchStats { request } => smallvec![call_api(
                env,
                STATS_FAILED,
                |api| async move {
                    let (confirmed_count, total_revenue) =
                        tokio::try_join!(api.confirmed_count(), api.total_revenue())?;
                    Ok::<_, ApiError>(BookingStats {
                        confirmed_count,
                        total_revenue,
                    })
                },
                move |result| BookingsAction::StatsFetched { request, result },
            )],
            BookingsAction::StatsFetched { result, .. } => {
                if let Ok(stats) = result {
                    state.stats = stats;
                }
                smallvec![Effect::None]
            },
            BookingsAction::ClearError => {
                state.entries.clear_error();
                smallvec![Effect::None]
            },
            BookingsAction::Clear => {
                state.entries.items.clear();
                state.entries.current = None;
                state.mine.clear();
                smallvec![Effect::None]
            },
        }
    }
}
