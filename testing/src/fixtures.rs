//! Canonical entities for tests.

use tourbook_core::domain::{
    Booking, BookingStatus, Difficulty, PaymentStatus, Review, Role, Tour, TourCategory, User,
};
use tourbook_core::{EntityId, Money, NaiveDate};

/// A bookable tour with a title derived from its id
#[must_use]
pub fn tour(id: impl Into<EntityId>, price_units: i64) -> Tour {
    let id = id.into();
    Tour {
        title: format!("Tour {id}"),
        description: format!("Description of tour {id}"),
        price: Money::from_units(price_units),
        duration: 5,
        destination: format!("Destination {id}"),
        category: Some(TourCategory::Adventure),
        image_url: Some(format!("https://img.example/{id}.jpg")),
        max_group_size: 12,
        difficulty: Some(Difficulty::Moderate),
        includes: vec!["Hotel".to_string(), "Guide".to_string()],
        rating: 4.5,
        review_count: 10,
        is_active: true,
        id,
    }
}

/// A confirmed booking of `tour_id` for one guest
#[must_use]
pub fn booking(
    id: impl Into<EntityId>,
    tour_id: impl Into<EntityId>,
    amount_units: i64,
    payment_status: PaymentStatus,
) -> Booking {
    let tour_id = tour_id.into();
    Booking {
        id: id.into(),
        tour_title: Some(format!("Tour {tour_id}")),
        destination: Some(format!("Destination {tour_id}")),
        travel_date: date(2025, 6, 1),
        end_date: date(2025, 6, 6),
        guests: 1,
        total_amount: Money::from_units(amount_units),
        payment_method: Some("Credit Card".to_string()),
        status: BookingStatus::Confirmed,
        payment_status,
        created_at: None,
        tour_id,
    }
}

/// A user account with the given role
#[must_use]
pub fn user(id: impl Into<EntityId>, role: Role) -> User {
    let id = id.into();
    User {
        first_name: "Test".to_string(),
        last_name: format!("User{id}"),
        email: format!("user{id}@example.com"),
        phone: None,
        address: None,
        avatar: None,
        role,
        is_active: true,
        id,
    }
}

/// A review of `tour_id`
#[must_use]
pub fn review(id: impl Into<EntityId>, tour_id: impl Into<EntityId>, rating: u8) -> Review {
    Review {
        id: id.into(),
        tour_id: tour_id.into(),
        tour_title: None,
        rating,
        comment: "Lovely trip".to_string(),
        created_at: None,
    }
}

/// Calendar date; `None` only for impossible dates
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}
