//! The backend contract.
//!
//! [`BookingApi`] is the single seam between the stores and the REST backend. The
//! HTTP adapter lives in `tourbook-client`; tests use an in-memory mock. Methods
//! return boxed futures so the trait stays dyn-compatible and can be shared as
//! `Arc<dyn BookingApi>` inside the store environment.

use crate::domain::{
    Booking, BookingStatus, NewBooking, NewReview, PaymentStatus, ProfileUpdate, Review,
    ReviewUpdate, Tour, TourDraft, User, ValidationError,
};
use crate::id::EntityId;
use crate::money::Money;
use crate::wire::NormalizeError;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors raised by a [`BookingApi`] implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Network failure or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("Server error ({status}): {}", message.as_deref().unwrap_or("no message"))]
    Server {
        /// HTTP status code
        status: u16,
        /// `message` field of the error body, when present
        message: Option<String>,
    },

    /// The session token was missing, expired or rejected
    #[error("Unauthorized")]
    Unauthorized,

    /// The response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request was rejected locally before it was sent
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<NormalizeError> for ApiError {
    fn from(err: NormalizeError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl ApiError {
    /// The server message, when the backend supplied one
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
            Self::Validation(message) => Some(message),
            _ => None,
        }
    }
}

/// Result alias for backend calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Boxed future returned by every [`BookingApi`] method
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = ApiResult<T>> + Send + 'a>>;

/// Outcome of a failed store operation, as recorded in store state.
///
/// `Failed` carries the server message or the per-operation fallback.
/// `SessionExpired` is handled globally by the session and is never written
/// into a store's `error` field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Operation failed with a displayable reason
    #[error("{0}")]
    Failed(String),

    /// The backend answered 401
    #[error("Session expired")]
    SessionExpired,
}

impl Rejection {
    /// Maps an [`ApiError`], falling back to `fallback` when no server message exists
    #[must_use]
    pub fn from_api(err: &ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Unauthorized => Self::SessionExpired,
            other => Self::Failed(
                other
                    .server_message()
                    .map_or_else(|| fallback.to_string(), str::to_string),
            ),
        }
    }

    /// Displayable reason, `None` for session expiry
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            Self::SessionExpired => None,
        }
    }

    /// Value to store in a store's `error` field
    #[must_use]
    pub fn surfaces(&self) -> Option<String> {
        self.message().map(str::to_string)
    }
}

/// REST backend consumed by the stores
pub trait BookingApi: Send + Sync {
    // Tours

    /// `GET /api/tours`
    fn fetch_tours(&self) -> ApiFuture<'_, Vec<Tour>>;
    /// `GET /api/tours/{id}`
    fn fetch_tour(&self, id: &EntityId) -> ApiFuture<'_, Tour>;
    /// `POST /api/admin/tours`
    fn create_tour(&self, draft: &TourDraft) -> ApiFuture<'_, Tour>;
    /// `PUT /api/admin/tours/{id}`
    fn update_tour(&self, id: &EntityId, draft: &TourDraft) -> ApiFuture<'_, Tour>;
    /// `DELETE /api/admin/tours/{id}`
    fn delete_tour(&self, id: &EntityId) -> ApiFuture<'_, ()>;
    /// `PUT /api/tours/{id}/activate`
    fn activate_tour(&self, id: &EntityId) -> ApiFuture<'_, ()>;
    /// `PUT /api/tours/{id}/deactivate`
    fn deactivate_tour(&self, id: &EntityId) -> ApiFuture<'_, ()>;

    // Bookings

    /// `GET /api/bookings/my-bookings`
    fn fetch_my_bookings(&self) -> ApiFuture<'_, Vec<Booking>>;
    /// `GET /api/admin/bookings`
    fn fetch_all_bookings(&self) -> ApiFuture<'_, Vec<Booking>>;
    /// `GET /api/bookings/{id}`
    fn fetch_booking(&self, id: &EntityId) -> ApiFuture<'_, Booking>;
    /// `POST /api/bookings`
    fn create_booking(&self, booking: &NewBooking) -> ApiFuture<'_, Booking>;
    /// `PUT /api/bookings/{id}/status?status=`
    fn update_booking_status(&self, id: &EntityId, status: BookingStatus)
    -> ApiFuture<'_, Booking>;
    /// `PUT /api/bookings/{id}/payment-status?paymentStatus=`
    fn update_payment_status(
        &self,
        id: &EntityId,
        status: PaymentStatus,
    ) -> ApiFuture<'_, Booking>;
    /// `DELETE /api/bookings/{id}`
    fn delete_booking(&self, id: &EntityId) -> ApiFuture<'_, ()>;
    /// `GET /api/bookings/stats/confirmed-count`
    fn confirmed_count(&self) -> ApiFuture<'_, u64>;
    /// `GET /api/bookings/stats/total-revenue`
    fn total_revenue(&self) -> ApiFuture<'_, Money>;

    // Wishlist

    /// `GET /api/wishlist/my-wishlist`
    fn fetch_wishlist(&self) -> ApiFuture<'_, Vec<Tour>>;
    /// `POST /api/wishlist/add-current?tourId=`
    fn add_to_wishlist(&self, tour_id: &EntityId) -> ApiFuture<'_, ()>;
    /// `DELETE /api/wishlist/remove-current?tourId=`
    fn remove_from_wishlist(&self, tour_id: &EntityId) -> ApiFuture<'_, ()>;

    // Reviews

    /// `GET /api/reviews/my-reviews`
    fn fetch_my_reviews(&self) -> ApiFuture<'_, Vec<Review>>;
    /// `POST /api/reviews`
    fn create_review(&self, review: &NewReview) -> ApiFuture<'_, Review>;
    /// `PUT /api/reviews/{id}`
    fn update_review(&self, id: &EntityId, review: &ReviewUpdate) -> ApiFuture<'_, Review>;
    /// `DELETE /api/reviews/{id}`
    fn delete_review(&self, id: &EntityId) -> ApiFuture<'_, ()>;

    // Users

    /// `GET /api/user/me`
    fn fetch_me(&self) -> ApiFuture<'_, User>;
    /// `PUT /api/user/profile`
    fn update_profile(&self, update: &ProfileUpdate) -> ApiFuture<'_, User>;
    /// `GET /api/admin/users`
    fn fetch_users(&self) -> ApiFuture<'_, Vec<User>>;
    /// `GET /api/admin/users/active`
    fn fetch_active_users(&self) -> ApiFuture<'_, Vec<User>>;
    /// `GET /api/admin/users/search?searchTerm=`
    fn search_users(&self, term: &str) -> ApiFuture<'_, Vec<User>>;
    /// `GET /api/admin/users/{id}`
    fn fetch_user(&self, id: &EntityId) -> ApiFuture<'_, User>;
    /// `PUT /api/admin/users/{id}`; same editable fields as a profile
    fn update_user(&self, id: &EntityId, update: &ProfileUpdate) -> ApiFuture<'_, User>;
    /// `DELETE /api/admin/users/{id}`
    fn delete_user(&self, id: &EntityId) -> ApiFuture<'_, ()>;
    /// `PUT /api/admin/users/{id}/activate`
    fn activate_user(&self, id: &EntityId) -> ApiFuture<'_, ()>;
    /// `PUT /api/admin/users/{id}/deactivate`
    fn deactivate_user(&self, id: &EntityId) -> ApiFuture<'_, ()>;
}
