//! Canonical domain entities.
//!
//! These are the shapes every store holds. Wire variations are resolved in
//! [`crate::wire`] before a value ever reaches a reducer.

use crate::entity::Entity;
use crate::id::EntityId;
use crate::money::Money;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Client-side validation failure, raised before any request is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error returned when an enum value from the wire is not recognized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl $name {
            /// All variants in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire representation
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            // Case-insensitive: older endpoints emit lowercase values.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_uppercase();
                match normalized.as_str() {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Tour package category
    TourCategory, "tour category" {
        /// Beach holidays
        Beach => "BEACH",
        /// Adventure trips
        Adventure => "ADVENTURE",
        /// Cultural tours
        Cultural => "CULTURAL",
        /// Wildlife safaris
        Wildlife => "WILDLIFE",
        /// City breaks
        City => "CITY",
        /// Mountain treks
        Mountain => "MOUNTAIN",
        /// Cruises
        Cruise => "CRUISE",
        /// Food and culinary tours
        Food => "FOOD",
    }
}

wire_enum! {
    /// Physical difficulty of a tour
    Difficulty, "difficulty" {
        /// Suitable for everyone
        Easy => "EASY",
        /// Some fitness required
        Moderate => "MODERATE",
        /// Demanding
        Difficult => "DIFFICULT",
    }
}

wire_enum! {
    /// Booking lifecycle status
    BookingStatus, "booking status" {
        /// Awaiting confirmation
        Pending => "PENDING",
        /// Confirmed by an administrator or payment
        Confirmed => "CONFIRMED",
        /// Trip finished
        Completed => "COMPLETED",
        /// Cancelled
        Cancelled => "CANCELLED",
    }
}

wire_enum! {
    /// Payment status of a booking
    PaymentStatus, "payment status" {
        /// Not yet paid
        Pending => "PENDING",
        /// Paid in full
        Paid => "PAID",
        /// Refunded
        Refunded => "REFUNDED",
    }
}

/// Account role
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer
    #[default]
    #[serde(alias = "USER", alias = "ROLE_USER")]
    User,
    /// Administrator
    #[serde(alias = "ADMIN", alias = "ROLE_ADMIN")]
    Admin,
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.trim_start_matches("role_") {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownVariant {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

/// A tour package
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    /// Unique identifier
    pub id: EntityId,
    /// Display title
    pub title: String,
    /// Long description
    pub description: String,
    /// Price per guest
    pub price: Money,
    /// Length in days (at least 1)
    pub duration: u32,
    /// Destination name
    pub destination: String,
    /// Category, when the backend sent a known one
    pub category: Option<TourCategory>,
    /// Cover image
    pub image_url: Option<String>,
    /// Maximum group size (at least 1)
    pub max_group_size: u32,
    /// Difficulty, when known
    pub difficulty: Option<Difficulty>,
    /// What the package includes, in display order
    pub includes: Vec<String>,
    /// Average rating
    pub rating: f64,
    /// Number of reviews
    pub review_count: u32,
    /// Whether the package is bookable
    pub is_active: bool,
}

impl Tour {
    /// Minimal tour carrying only an id.
    ///
    /// Used when a wishlist entry is added by id before the full record is known.
    #[must_use]
    pub fn placeholder(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            price: Money::ZERO,
            duration: 1,
            destination: String::new(),
            category: None,
            image_url: None,
            max_group_size: 1,
            difficulty: None,
            includes: Vec::new(),
            rating: 0.0,
            review_count: 0,
            is_active: true,
        }
    }
}

impl Entity for Tour {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// A booking of a tour by the current user (or any user, for administrators)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Unique identifier
    pub id: EntityId,
    /// Booked tour
    pub tour_id: EntityId,
    /// Title of the booked tour, when the backend embeds it
    pub tour_title: Option<String>,
    /// Destination of the booked tour, when the backend embeds it
    pub destination: Option<String>,
    /// First day of travel
    pub travel_date: Option<NaiveDate>,
    /// Last day of travel
    pub end_date: Option<NaiveDate>,
    /// Number of guests (at least 1)
    pub guests: u32,
    /// Price × guests at creation time
    pub total_amount: Money,
    /// Payment method label
    pub payment_method: Option<String>,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Booking {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// A review written by the current user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Unique identifier
    pub id: EntityId,
    /// Reviewed tour
    pub tour_id: EntityId,
    /// Title of the reviewed tour, when embedded
    pub tour_title: Option<String>,
    /// Rating from 1 to 5
    pub rating: u8,
    /// Free text
    pub comment: String,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Review {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// A user account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: EntityId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub phone: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Avatar URL
    pub avatar: Option<String>,
    /// Account role
    pub role: Role,
    /// Whether the account is enabled
    pub is_active: bool,
}

impl User {
    /// "First Last", trimmed
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Returns `true` for administrators
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Entity for User {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Aggregate booking figures served by the stats endpoints
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStats {
    /// Number of confirmed bookings
    pub confirmed_count: u64,
    /// Total revenue across all bookings
    pub total_revenue: Money,
}

/// Payload for creating or updating a tour (admin)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourDraft {
    /// Display title
    pub title: String,
    /// Long description
    pub description: String,
    /// Price per guest
    pub price: Money,
    /// Length in days
    pub duration: u32,
    /// Destination name
    pub destination: String,
    /// Category
    pub category: TourCategory,
    /// Cover image
    pub image_url: String,
    /// Maximum group size
    pub max_group_size: u32,
    /// Difficulty
    pub difficulty: Difficulty,
    /// Included items
    pub includes: Vec<String>,
    /// Whether the package is bookable
    pub is_active: bool,
}

impl TourDraft {
    /// Checks the same constraints as the package editor
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("Please enter a title"));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::new("Please enter a description"));
        }
        if self.price.cents() <= 0 {
            return Err(ValidationError::new("Please enter a valid price"));
        }
        if self.duration < 1 {
            return Err(ValidationError::new("Duration must be at least 1 day"));
        }
        if self.destination.trim().is_empty() {
            return Err(ValidationError::new("Please enter destination"));
        }
        if self.image_url.trim().is_empty() {
            return Err(ValidationError::new("Please provide an image URL"));
        }
        if self.max_group_size < 1 {
            return Err(ValidationError::new("Group size must be at least 1"));
        }
        Ok(())
    }
}

/// Payment method recorded for bookings made through the client
pub const DEFAULT_PAYMENT_METHOD: &str = "Credit Card";

/// Payload for `POST /api/bookings`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    /// Tour to book
    pub tour_id: EntityId,
    /// First day of travel
    pub travel_date: NaiveDate,
    /// Last day of travel
    pub end_date: NaiveDate,
    /// Number of guests
    pub guests: u32,
    /// Price × guests
    pub total_amount: Money,
    /// Payment method label
    pub payment_method: String,
}

impl NewBooking {
    /// Builds a booking for `tour`, computing the total and the end date
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when `guests` is zero, exceeds the group size,
    /// or the amount/end date cannot be represented.
    pub fn for_tour(
        tour: &Tour,
        guests: u32,
        travel_date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        if guests < 1 {
            return Err(ValidationError::new("At least one guest is required"));
        }
        if guests > tour.max_group_size.max(1) {
            return Err(ValidationError::new(format!(
                "Group size is limited to {} guests",
                tour.max_group_size
            )));
        }
        let total_amount = tour
            .price
            .checked_multiply(guests)
            .ok_or_else(|| ValidationError::new("Booking total is out of range"))?;
        let end_date = travel_date
            .checked_add_days(Days::new(u64::from(tour.duration.max(1))))
            .ok_or_else(|| ValidationError::new("Travel date is out of range"))?;

        Ok(Self {
            tour_id: tour.id.clone(),
            travel_date,
            end_date,
            guests,
            total_amount,
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        })
    }
}

/// Payload for `POST /api/reviews`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    /// Reviewed tour
    pub tour_id: EntityId,
    /// Rating from 1 to 5
    pub rating: u8,
    /// Free text
    pub comment: String,
}

/// Payload for `PUT /api/reviews/{id}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    /// Reviewed tour
    pub tour_id: EntityId,
    /// Rating from 1 to 5
    pub rating: u8,
    /// Free text
    pub comment: String,
}

fn validate_review(rating: u8, comment: &str) -> Result<(), ValidationError> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::new("Rating must be between 1 and 5"));
    }
    if comment.trim().is_empty() {
        return Err(ValidationError::new("Please write a comment"));
    }
    Ok(())
}

impl NewReview {
    /// Checks rating range and comment presence
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the rating is outside 1..=5 or the comment is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_review(self.rating, &self.comment)
    }
}

impl ReviewUpdate {
    /// Checks rating range and comment presence
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the rating is outside 1..=5 or the comment is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_review(self.rating, &self.comment)
    }
}

/// Payload for `PUT /api/user/profile`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// Given name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Postal address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Avatar URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}
