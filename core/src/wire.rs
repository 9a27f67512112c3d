//! Wire records and normalization.
//!
//! Backend responses are not uniform: the same booking may carry its tour title at
//! the top level or inside a nested `tour` object, travel dates arrive as
//! `travelDate` or `startDate`, and so on. Responses are decoded into the tolerant
//! `*Record` types below, then mapped once into the canonical entities of
//! [`crate::domain`]. Stores never see a record.

use crate::domain::{
    Booking, BookingStatus, Difficulty, PaymentStatus, Review, Role, Tour, TourCategory, User,
};
use crate::id::EntityId;
use crate::money::Money;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// A record could not be mapped to its canonical entity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A field without a fallback was absent
    #[error("{entity} record is missing `{field}`")]
    MissingField {
        /// Entity kind
        entity: &'static str,
        /// Field name as it appears on the wire
        field: &'static str,
    },
}

/// Maps a wire record to its canonical entity
pub trait Normalize {
    /// Canonical entity type
    type Output;

    /// Consumes the record, applying fallback orders
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] when a field with no fallback is missing.
    fn normalize(self) -> Result<Self::Output, NormalizeError>;
}

/// Normalizes every record of a list response
///
/// # Errors
///
/// Fails on the first record that cannot be normalized.
pub fn normalize_all<R: Normalize>(records: Vec<R>) -> Result<Vec<R::Output>, NormalizeError> {
    records.into_iter().map(Normalize::normalize).collect()
}

fn required<T>(value: Option<T>, entity: &'static str, field: &'static str) -> Result<T, NormalizeError> {
    value.ok_or(NormalizeError::MissingField { entity, field })
}

/// Parses a calendar date from `YYYY-MM-DD` or from the date part of a timestamp
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Parses a timestamp.
///
/// Accepts RFC 3339, a zone-less `LocalDateTime` (taken as UTC) or a bare date
/// (midnight UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// `includes` is a JSON array on current backends and a comma separated string on
/// older ones.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncludesRecord {
    /// `["Hotel", "Breakfast"]`
    List(Vec<String>),
    /// `"Hotel, Breakfast"`
    Text(String),
}

impl IncludesRecord {
    fn into_list(self) -> Vec<String> {
        match self {
            Self::List(items) => items,
            Self::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Tour as sent by `/api/tours` and `/api/wishlist/my-wishlist`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TourRecord {
    pub id: Option<EntityId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub duration: Option<u32>,
    pub destination: Option<String>,
    pub category: Option<String>,
    pub tour_image: Option<String>,
    pub image_url: Option<String>,
    pub image: Option<String>,
    pub max_group_size: Option<u32>,
    pub difficulty: Option<String>,
    pub includes: Option<IncludesRecord>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub is_active: Option<bool>,
    pub active: Option<bool>,
}

impl Normalize for TourRecord {
    type Output = Tour;

    fn normalize(self) -> Result<Tour, NormalizeError> {
        let id = required(self.id, "tour", "id")?;
        let image_url = non_blank(self.tour_image)
            .or_else(|| non_blank(self.image_url))
            .or_else(|| non_blank(self.image));

        Ok(Tour {
            id,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            price: self.price.unwrap_or(Money::ZERO),
            duration: self.duration.unwrap_or(1).max(1),
            destination: self.destination.unwrap_or_default(),
            category: self.category.and_then(|c| c.parse::<TourCategory>().ok()),
            image_url,
            max_group_size: self.max_group_size.unwrap_or(1).max(1),
            difficulty: self.difficulty.and_then(|d| d.parse::<Difficulty>().ok()),
            includes: self.includes.map(IncludesRecord::into_list).unwrap_or_default(),
            rating: self.rating.unwrap_or(0.0),
            review_count: self.review_count.unwrap_or(0),
            is_active: self.is_active.or(self.active).unwrap_or(true),
        })
    }
}

/// Tour summary embedded in booking and review records
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NestedTourRecord {
    pub id: Option<EntityId>,
    pub title: Option<String>,
    pub destination: Option<String>,
}

/// Booking as sent by the booking endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: Option<EntityId>,
    pub tour_id: Option<EntityId>,
    pub tour: Option<NestedTourRecord>,
    pub tour_title: Option<String>,
    pub destination: Option<String>,
    pub tour_destination: Option<String>,
    pub travel_date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(alias = "numberOfPeople")]
    pub guests: Option<u32>,
    pub total_amount: Option<Money>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub created_at: Option<String>,
    pub booking_date: Option<String>,
}

impl Normalize for BookingRecord {
    type Output = Booking;

    fn normalize(self) -> Result<Booking, NormalizeError> {
        let id = required(self.id, "booking", "id")?;
        let nested = self.tour.unwrap_or_default();
        let tour_id = required(self.tour_id.or(nested.id), "booking", "tourId")?;

        let destination = non_blank(self.destination)
            .or_else(|| non_blank(nested.destination))
            .or_else(|| non_blank(self.tour_destination));
        let tour_title = non_blank(self.tour_title).or_else(|| non_blank(nested.title));
        let travel_date = self
            .travel_date
            .as_deref()
            .and_then(parse_date)
            .or_else(|| self.start_date.as_deref().and_then(parse_date));
        let created_at = self
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.booking_date.as_deref().and_then(parse_timestamp));

        Ok(Booking {
            id,
            tour_id,
            tour_title,
            destination,
            travel_date,
            end_date: self.end_date.as_deref().and_then(parse_date),
            guests: self.guests.unwrap_or(1).max(1),
            total_amount: self.total_amount.unwrap_or(Money::ZERO),
            payment_method: non_blank(self.payment_method),
            status: self
                .status
                .and_then(|s| s.parse().ok())
                .unwrap_or(BookingStatus::Pending),
            payment_status: self
                .payment_status
                .and_then(|s| s.parse().ok())
                .unwrap_or(PaymentStatus::Pending),
            created_at,
        })
    }
}

/// Review as sent by the review endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewRecord {
    pub id: Option<EntityId>,
    pub tour_id: Option<EntityId>,
    pub tour: Option<NestedTourRecord>,
    pub tour_title: Option<String>,
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub created_at: Option<String>,
}

impl Normalize for ReviewRecord {
    type Output = Review;

    fn normalize(self) -> Result<Review, NormalizeError> {
        let id = required(self.id, "review", "id")?;
        let nested = self.tour.unwrap_or_default();
        let tour_id = required(self.tour_id.or(nested.id), "review", "tourId")?;

        Ok(Review {
            id,
            tour_id,
            tour_title: non_blank(self.tour_title).or_else(|| non_blank(nested.title)),
            rating: self.rating.unwrap_or(0).min(5),
            comment: self.comment.unwrap_or_default(),
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
        })
    }
}

/// User as sent by `/api/user/me` and `/api/admin/users`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Option<EntityId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub active: Option<bool>,
}

impl Normalize for UserRecord {
    type Output = User;

    fn normalize(self) -> Result<User, NormalizeError> {
        Ok(User {
            id: required(self.id, "user", "id")?,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            phone: non_blank(self.phone),
            address: non_blank(self.address),
            avatar: non_blank(self.avatar),
            role: self
                .role
                .and_then(|r| r.parse::<Role>().ok())
                .unwrap_or_default(),
            is_active: self.is_active.or(self.active).unwrap_or(true),
        })
    }
}
