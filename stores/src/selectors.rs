//! Derived views.
//!
//! Pure functions over state snapshots. Sub-states that were never loaded are
//! empty collections, so every selector yields empty or zero results for them.

use crate::app::AppState;
use crate::bookings::BookingsState;
use crate::tours::ToursState;
use crate::wishlist::WishlistState;
use serde::Serialize;
use std::collections::HashSet;
use tourbook_core::domain::{
    Booking, BookingStatus, DEFAULT_PAYMENT_METHOD, PaymentStatus, Role, Tour,
};
use tourbook_core::{DateTime, EntityId, Money, Utc};

/// Title shown for bookings whose tour was not embedded
pub const UNKNOWN_TOUR: &str = "Unknown Tour";

fn sum_with_status(bookings: &[Booking], status: PaymentStatus) -> Money {
    bookings
        .iter()
        .filter(|b| b.payment_status == status)
        .map(|b| b.total_amount)
        .sum()
}

/// Sum of the amounts of paid bookings
#[must_use]
pub fn total_paid(bookings: &[Booking]) -> Money {
    sum_with_status(bookings, PaymentStatus::Paid)
}

/// Sum of the amounts of refunded bookings
#[must_use]
pub fn total_refunded(bookings: &[Booking]) -> Money {
    sum_with_status(bookings, PaymentStatus::Refunded)
}

/// Confirmed bookings whose travel starts after `now`.
///
/// Travel starts at midnight UTC of the travel date; bookings without a date
/// are skipped.
#[must_use]
pub fn upcoming_confirmed(bookings: &[Booking], now: DateTime<Utc>) -> Vec<&Booking> {
    let today = now.date_naive();
    bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .filter(|b| b.travel_date.is_some_and(|date| date > today))
        .collect()
}

/// A tour with its number of bookings
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PopularTour<'a> {
    /// The tour
    pub tour: &'a Tour,
    /// Bookings referencing it
    pub bookings: usize,
}

/// The `limit` most booked tours, most bookings first.
///
/// Ties keep catalogue order.
#[must_use]
pub fn popular_tours<'a>(tours: &'a [Tour], bookings: &[Booking], limit: usize) -> Vec<PopularTour<'a>> {
    let mut ranked: Vec<PopularTour<'a>> = tours
        .iter()
        .map(|tour| PopularTour {
            tour,
            bookings: bookings.iter().filter(|b| b.tour_id == tour.id).count(),
        })
        .collect();
    ranked.sort_by(|a, b| b.bookings.cmp(&a.bookings));
    ranked.truncate(limit);
    ranked
}

/// Administrator dashboard figures
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Bookable packages
    pub active_tours: usize,
    /// Non-administrator accounts
    pub customers: usize,
    /// Bookings known to the client
    pub total_bookings: usize,
    /// Revenue reported by the stats endpoint
    pub total_revenue: Money,
    /// Bookings awaiting confirmation
    pub pending_bookings: usize,
}

/// Dashboard figures over the whole application state
#[must_use]
pub fn dashboard_stats(state: &AppState) -> DashboardStats {
    let bookings = state.bookings.all();
    let customers: HashSet<&EntityId> = state
        .users
        .items
        .iter()
        .filter(|u| u.role == Role::User)
        .map(|u| &u.id)
        .collect();

    DashboardStats {
        active_tours: state.tours.catalogue.items.iter().filter(|t| t.is_active).count(),
        customers: customers.len(),
        total_bookings: bookings.len(),
        total_revenue: state.bookings.stats.total_revenue,
        pending_bookings: bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Pending)
            .count(),
    }
}

/// The `limit` newest bookings; bookings without a creation time come last
#[must_use]
pub fn recent_bookings(bookings: &[Booking], limit: usize) -> Vec<&Booking> {
    let mut recent: Vec<&Booking> = bookings.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(limit);
    recent
}

/// Payment history filter
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    /// Case-insensitive text matched against the tour title and booking id
    pub search: String,
    /// Only this payment status
    pub status: Option<PaymentStatus>,
}

/// One line of the payment history
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRow {
    /// Paid booking
    pub booking_id: EntityId,
    /// Booked tour title
    pub tour_title: String,
    /// Amount charged
    pub amount: Money,
    /// Payment method label
    pub method: String,
    /// Payment status
    pub status: PaymentStatus,
    /// When the booking was made
    pub date: Option<DateTime<Utc>>,
}

impl From<&Booking> for PaymentRow {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id.clone(),
            tour_title: booking
                .tour_title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNKNOWN_TOUR.to_string()),
            amount: booking.total_amount,
            method: booking
                .payment_method
                .clone()
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            status: booking.payment_status,
            date: booking.created_at,
        }
    }
}

/// Bookings projected to payment rows, in booking order
#[must_use]
pub fn payment_history(bookings: &[Booking], filter: &PaymentFilter) -> Vec<PaymentRow> {
    let search = filter.search.trim().to_lowercase();
    bookings
        .iter()
        .filter(|b| filter.status.is_none_or(|status| b.payment_status == status))
        .map(PaymentRow::from)
        .filter(|row| {
            search.is_empty()
                || row.tour_title.to_lowercase().contains(&search)
                || row.booking_id.as_str().to_lowercase().contains(&search)
        })
        .collect()
}

/// Catalogue entries passing the store filters and matching `search` in the
/// title or destination
#[must_use]
pub fn filtered_tours<'a>(state: &'a ToursState, search: &str) -> Vec<&'a Tour> {
    let search = search.trim().to_lowercase();
    state
        .catalogue
        .items
        .iter()
        .filter(|tour| state.filters.matches(tour))
        .filter(|tour| {
            search.is_empty()
                || tour.title.to_lowercase().contains(&search)
                || tour.destination.to_lowercase().contains(&search)
        })
        .collect()
}

/// Number of finished trips
#[must_use]
pub fn completed_trips(bookings: &[Booking]) -> usize {
    bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Completed)
        .count()
}

/// Number of distinct destinations across `bookings`
#[must_use]
pub fn destinations_visited(bookings: &[Booking]) -> usize {
    bookings
        .iter()
        .filter_map(|b| b.destination.as_deref())
        .filter(|d| !d.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

/// Confirmed bookings reported by the stats endpoint
#[must_use]
pub const fn confirmed_count(state: &BookingsState) -> u64 {
    state.stats.confirmed_count
}

/// Whether `tour_id` is (optimistically) wishlisted
#[must_use]
pub fn is_in_wishlist(state: &WishlistState, tour_id: &EntityId) -> bool {
    state.contains(tour_id)
}

/// Number of wishlisted tours
#[must_use]
pub fn wishlist_count(state: &WishlistState) -> usize {
    state.items.len()
}
