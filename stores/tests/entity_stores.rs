//! Entity store lifecycles through the store runtime.

#![allow(clippy::unwrap_used)] // Test code

use std::sync::Arc;
use tourbook_core::domain::{
    BookingStatus, Difficulty, NewReview, PaymentStatus, ProfileUpdate, ReviewUpdate, Role,
    TourCategory, TourDraft,
};
use tourbook_core::{EntityId, Money, Rejection};
use tourbook_stores::{AppError, TourbookApp, selectors};
use tourbook_testing::{Endpoint, MockBackend, fixtures, server_error, test_environment};

fn app_over(backend: &Arc<MockBackend>) -> TourbookApp {
    TourbookApp::new(test_environment(backend.clone()))
}

fn draft(title: &str) -> TourDraft {
    TourDraft {
        title: title.to_string(),
        description: "Ten days along the coast".to_string(),
        price: Money::from_units(1200),
        duration: 10,
        destination: "Portugal".to_string(),
        category: TourCategory::Beach,
        image_url: "https://img.example/coast.jpg".to_string(),
        max_group_size: 16,
        difficulty: Difficulty::Easy,
        includes: vec!["Hotel".to_string()],
        is_active: true,
    }
}

#[tokio::test]
async fn tour_admin_lifecycle() {
    let backend = Arc::new(MockBackend::new().with_tours([fixtures::tour(1, 100)]));
    let app = app_over(&backend);
    app.fetch_tours().await.unwrap();

    let created = app.create_tour(draft("Coastal Walk")).await.unwrap();
    assert_eq!(app.state(|s| s.tours.catalogue.items.len()).await, 2);

    let updated = app
        .update_tour(created.id.clone(), draft("Coastal Walk Deluxe"))
        .await
        .unwrap();
    assert_eq!(updated.title, "Coastal Walk Deluxe");

    app.set_tour_active(created.id.clone(), false).await.unwrap();
    let active = app
        .state(|s| s.tours.catalogue.get(&created.id).map(|t| t.is_active))
        .await;
    assert_eq!(active, Some(false));

    app.delete_tour(created.id.clone()).await.unwrap();
    let ids = app
        .state(|s| s.tours.catalogue.items.iter().map(|t| t.id.clone()).collect::<Vec<_>>())
        .await;
    assert_eq!(ids, vec![EntityId::from(1_i64)]);
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_backend() {
    let backend = Arc::new(MockBackend::new());
    let app = app_over(&backend);

    let result = app.create_tour(draft("  ")).await;

    assert_eq!(
        result,
        Err(AppError::Rejected(Rejection::Failed(
            "Please enter a title".to_string()
        )))
    );
    assert_eq!(backend.calls(Endpoint::CreateTour), 0);
}

#[tokio::test]
async fn failed_mutation_leaves_the_store_error_untouched() {
    let backend = Arc::new(MockBackend::new().with_tours([fixtures::tour(1, 100)]));
    backend.fail(Endpoint::DeleteTour, server_error(409, "Tour has bookings"));
    let app = app_over(&backend);
    app.fetch_tours().await.unwrap();

    let result = app.delete_tour(1_i64).await;

    assert_eq!(
        result,
        Err(AppError::Rejected(Rejection::Failed("Tour has bookings".to_string())))
    );
    assert!(app.state(|s| s.tours.catalogue.error.is_none()).await);
    assert_eq!(app.state(|s| s.tours.catalogue.items.len()).await, 1);
}

#[tokio::test]
async fn failed_fetch_records_the_fallback_message() {
    let backend = Arc::new(MockBackend::new());
    backend.fail(Endpoint::FetchTours, tourbook_testing::bare_error(503));
    let app = app_over(&backend);

    assert!(app.fetch_tours().await.is_err());

    let (loading, error) = app
        .state(|s| (s.tours.catalogue.loading, s.tours.catalogue.error.clone()))
        .await;
    assert!(!loading);
    assert_eq!(error.as_deref(), Some("Failed to fetch tours"));
}

#[tokio::test]
async fn booking_status_changes_apply_everywhere() {
    let backend = Arc::new(MockBackend::new().with_bookings([
        fixtures::booking(10, 1, 300, PaymentStatus::Pending),
        fixtures::booking(11, 1, 200, PaymentStatus::Paid),
    ]));
    let app = app_over(&backend);
    app.fetch_my_bookings().await.unwrap();
    app.fetch_all_bookings().await.unwrap();

    app.update_payment_status(10_i64, PaymentStatus::Paid)
        .await
        .unwrap();
    app.update_booking_status(11_i64, BookingStatus::Completed)
        .await
        .unwrap();

    let state = app.snapshot().await;
    assert_eq!(selectors::total_paid(&state.bookings.mine), Money::from_units(500));
    assert_eq!(selectors::completed_trips(&state.bookings.mine), 1);
    assert_eq!(selectors::total_paid(state.bookings.all()), Money::from_units(500));

    app.delete_booking(10_i64).await.unwrap();
    let remaining = app.state(|s| s.bookings.mine.len()).await;
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn booking_stats_come_from_the_stats_endpoints() {
    let backend = Arc::new(MockBackend::new().with_bookings([
        fixtures::booking(10, 1, 300, PaymentStatus::Paid),
        fixtures::booking(11, 1, 200, PaymentStatus::Pending),
    ]));
    let app = app_over(&backend);

    let stats = app.fetch_booking_stats().await.unwrap();

    assert_eq!(stats.confirmed_count, 2);
    assert_eq!(stats.total_revenue, Money::from_units(300));
    let state = app.snapshot().await;
    assert_eq!(selectors::confirmed_count(&state.bookings), 2);
    assert_eq!(selectors::dashboard_stats(&state).total_revenue, Money::from_units(300));
}

#[tokio::test]
async fn failed_stats_keep_previous_figures() {
    let backend = Arc::new(
        MockBackend::new().with_bookings([fixtures::booking(10, 1, 300, PaymentStatus::Paid)]),
    );
    let app = app_over(&backend);
    app.fetch_booking_stats().await.unwrap();
    backend.fail(Endpoint::TotalRevenue, server_error(500, "Stats offline"));

    assert!(app.fetch_booking_stats().await.is_err());

    let stats = app.state(|s| s.bookings.stats).await;
    assert_eq!(stats.total_revenue, Money::from_units(300));
}

#[tokio::test]
async fn profile_update_replaces_current_and_listed_user() {
    let admin = fixtures::user(1, Role::Admin);
    let backend = Arc::new(
        MockBackend::new()
            .with_users([admin.clone(), fixtures::user(2, Role::User)])
            .signed_in_as(admin),
    );
    let app = app_over(&backend);
    app.fetch_users().await.unwrap();
    app.fetch_me().await.unwrap();

    let updated = app
        .update_profile(ProfileUpdate {
            phone: Some("+351 555 0100".to_string()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();

    let state = app.snapshot().await;
    assert_eq!(state.users.current.as_ref(), Some(&updated));
    assert_eq!(state.users.get(&updated.id), Some(&updated));
    assert_eq!(selectors::dashboard_stats(&state).customers, 1);
}

#[tokio::test]
async fn user_list_is_denied_to_customers() {
    let customer = fixtures::user(2, Role::User);
    let backend = Arc::new(
        MockBackend::new()
            .with_users([customer.clone()])
            .signed_in_as(customer),
    );
    let app = app_over(&backend);

    let result = app.fetch_users().await;

    assert_eq!(
        result,
        Err(AppError::Rejected(Rejection::Failed("Access denied".to_string())))
    );
    assert_eq!(
        app.state(|s| s.users.error.clone()).await.as_deref(),
        Some("Access denied")
    );
}

#[tokio::test]
async fn review_lifecycle() {
    let backend = Arc::new(MockBackend::new().with_tours([fixtures::tour(1, 100)]));
    let app = app_over(&backend);

    let review = app
        .create_review(NewReview {
            tour_id: EntityId::from(1_i64),
            rating: 5,
            comment: "Unforgettable".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(review.tour_title.as_deref(), Some("Tour 1"));

    let edited = app
        .update_review(
            review.id.clone(),
            ReviewUpdate {
                tour_id: EntityId::from(1_i64),
                rating: 4,
                comment: "Great, a bit rushed".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.rating, 4);
    assert_eq!(app.state(|s| s.reviews.items.clone()).await, vec![edited]);

    app.delete_review(review.id).await.unwrap();
    assert!(app.state(|s| s.reviews.items.is_empty()).await);
}

#[tokio::test]
async fn out_of_range_rating_is_rejected_locally() {
    let backend = Arc::new(MockBackend::new().with_tours([fixtures::tour(1, 100)]));
    let app = app_over(&backend);

    let result = app
        .create_review(NewReview {
            tour_id: EntityId::from(1_i64),
            rating: 0,
            comment: "?".to_string(),
        })
        .await;

    assert!(matches!(result, Err(AppError::Rejected(Rejection::Failed(_)))));
    assert_eq!(backend.calls(Endpoint::CreateReview), 0);
}

#[tokio::test]
async fn sign_out_clears_user_data() {
    let backend = Arc::new(
        MockBackend::new()
            .with_tours([fixtures::tour(1, 100)])
            .with_wishlist([1_i64])
            .with_bookings([fixtures::booking(10, 1, 300, PaymentStatus::Paid)]),
    );
    let app = app_over(&backend);
    app.fetch_wishlist().await.unwrap();
    app.fetch_my_bookings().await.unwrap();

    app.sign_out().await.unwrap();

    let state = app.snapshot().await;
    assert!(state.wishlist.items.is_empty());
    assert!(state.bookings.mine.is_empty());
}

#[tokio::test]
async fn admin_user_lifecycle() {
    let admin = fixtures::user(1, Role::Admin);
    let backend = Arc::new(
        MockBackend::new()
            .with_users([admin.clone(), fixtures::user(2, Role::User), fixtures::user(3, Role::User)])
            .signed_in_as(admin),
    );
    let app = app_over(&backend);
    app.fetch_users().await.unwrap();

    let user = app.fetch_user(2_i64).await.unwrap();
    assert_eq!(app.state(|s| s.users.current.clone()).await, Some(user.clone()));

    let renamed = app
        .update_user(
            user.id.clone(),
            ProfileUpdate {
                first_name: Some("Renamed".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        app.state(|s| s.users.get(&renamed.id).map(|u| u.first_name.clone()))
            .await
            .as_deref(),
        Some("Renamed")
    );

    app.set_user_active(3_i64, false).await.unwrap();
    let active = app.fetch_active_users().await.unwrap();
    let ids = active.iter().map(|u| u.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids, vec![EntityId::from(1_i64), EntityId::from(2_i64)]);
    assert_eq!(app.state(|s| s.users.items.len()).await, 2);

    let found = app.search_users("user2@").await.unwrap();
    assert_eq!(found, vec![renamed]);

    app.fetch_users().await.unwrap();
    app.delete_user(3_i64).await.unwrap();
    assert!(!app.state(|s| s.users.contains(&EntityId::from(3_i64))).await);
    assert_eq!(backend.calls(Endpoint::DeleteUser), 1);
}

#[tokio::test]
async fn admin_user_operations_are_denied_to_customers() {
    let customer = fixtures::user(2, Role::User);
    let backend = Arc::new(
        MockBackend::new()
            .with_users([customer.clone(), fixtures::user(3, Role::User)])
            .signed_in_as(customer),
    );
    let app = app_over(&backend);

    let result = app.set_user_active(3_i64, false).await;

    assert_eq!(
        result,
        Err(AppError::Rejected(Rejection::Failed("Access denied".to_string())))
    );
    assert!(app.state(|s| s.users.error.is_none()).await);
}

#[tokio::test]
async fn booking_fetched_by_id_becomes_current() {
    let backend = Arc::new(MockBackend::new().with_bookings([fixtures::booking(
        5,
        1,
        250,
        PaymentStatus::Paid,
    )]));
    let app = app_over(&backend);

    let booking = app.fetch_booking(5_i64).await.unwrap();

    assert_eq!(booking.total_amount, Money::from_units(250));
    let state = app.snapshot().await;
    assert_eq!(state.bookings.entries.current.as_ref(), Some(&booking));
    assert!(!state.bookings.entries.loading);

    let missing = app.fetch_booking(6_i64).await;
    assert_eq!(
        missing,
        Err(AppError::Rejected(Rejection::Failed(
            "Booking not found with id: 6".to_string()
        )))
    );
}
