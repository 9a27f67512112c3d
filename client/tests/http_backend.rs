//! HTTP adapter tests against a local mock server

#![allow(clippy::unwrap_used)] // Test code

use serde_json::json;
use std::sync::Arc;
use tourbook_client::{ClientConfig, Credentials, HttpBackend, Session, SessionEvent};
use tourbook_core::domain::{BookingStatus, PaymentStatus, ProfileUpdate};
use tourbook_core::{ApiError, BookingApi, EntityId, Money};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer, session: Arc<Session>) -> HttpBackend {
    let config = ClientConfig {
        base_url: server.uri(),
        ..ClientConfig::default()
    };
    HttpBackend::new(&config, session).unwrap()
}

#[tokio::test]
async fn tours_are_normalized_and_carry_the_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tours"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 7,
                "title": "Bali Escape",
                "price": 1299.5,
                "duration": 5,
                "destination": "Bali",
                "category": "BEACH",
                "tourImage": "https://img/bali.jpg",
                "includes": "Hotel, Breakfast",
                "maxGroupSize": 12
            },
            { "id": "8", "title": "Alps", "active": false, "price": "899" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, Arc::new(Session::with_token("secret")));
    let tours = backend.fetch_tours().await.unwrap();

    assert_eq!(tours.len(), 2);
    assert_eq!(tours[0].id, EntityId::from(7_i64));
    assert_eq!(tours[0].price, Money::from_cents(129_950));
    assert_eq!(tours[0].image_url.as_deref(), Some("https://img/bali.jpg"));
    assert_eq!(tours[0].includes, vec!["Hotel", "Breakfast"]);
    assert!(tours[0].is_active);
    assert!(!tours[1].is_active);
    assert_eq!(tours[1].price, Money::from_units(899));
}

#[tokio::test]
async fn unauthorized_tears_down_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/my-bookings"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = Arc::new(Session::with_token("expired"));
    let events = session.subscribe();
    let backend = backend(&server, Arc::clone(&session));

    let err = backend.fetch_my_bookings().await.unwrap_err();

    assert_eq!(err, ApiError::Unauthorized);
    assert!(session.token().is_none());
    assert_eq!(*events.borrow(), SessionEvent::LoginRequired);
}

#[tokio::test]
async fn server_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/add-current"))
        .and(query_param("tourId", "42"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Tour is already in wishlist" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, Arc::new(Session::with_token("t")));
    let err = backend.add_to_wishlist(&EntityId::from(42_i64)).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Server {
            status: 400,
            message: Some("Tour is already in wishlist".to_string()),
        }
    );
}

#[tokio::test]
async fn wishlist_writes_accept_empty_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/add-current"))
        .and(query_param("tourId", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/wishlist/remove-current"))
        .and(query_param("tourId", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "tourId": 3, "message": "Removed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, Arc::new(Session::with_token("t")));
    let id = EntityId::from("3");
    backend.add_to_wishlist(&id).await.unwrap();
    backend.remove_from_wishlist(&id).await.unwrap();
}

#[tokio::test]
async fn booking_fields_fall_back_to_the_nested_tour() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/bookings/11/payment-status"))
        .and(query_param("paymentStatus", "PAID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11,
            "tour": { "id": 7, "title": "Bali Escape", "destination": "Bali" },
            "startDate": "2025-06-01",
            "bookingDate": "2025-01-15T10:30:00",
            "numberOfPeople": 2,
            "totalAmount": 2599,
            "status": "CONFIRMED",
            "paymentStatus": "PAID"
        })))
        .mount(&server)
        .await;

    let backend = backend(&server, Arc::new(Session::with_token("t")));
    let booking = backend
        .update_payment_status(&EntityId::from(11_i64), PaymentStatus::Paid)
        .await
        .unwrap();

    assert_eq!(booking.tour_id, EntityId::from("7"));
    assert_eq!(booking.tour_title.as_deref(), Some("Bali Escape"));
    assert_eq!(booking.destination.as_deref(), Some("Bali"));
    assert_eq!(booking.travel_date, tourbook_core::NaiveDate::from_ymd_opt(2025, 6, 1));
    assert!(booking.created_at.is_some());
    assert_eq!(booking.guests, 2);
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.total_amount, Money::from_units(2599));
}

#[tokio::test]
async fn single_booking_is_fetched_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/12"))
        .and(header("authorization", "Bearer t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "tourId": 7,
            "tourTitle": "Bali Escape",
            "numberOfPeople": 3,
            "totalAmount": 900,
            "status": "PENDING",
            "paymentStatus": "PENDING"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, Arc::new(Session::with_token("t")));
    let booking = backend.fetch_booking(&EntityId::from(12_i64)).await.unwrap();

    assert_eq!(booking.id, EntityId::from(12_i64));
    assert_eq!(booking.tour_id, EntityId::from(7_i64));
    assert_eq!(booking.guests, 3);
    assert_eq!(booking.status, BookingStatus::Pending);
}

#[tokio::test]
async fn admin_user_routes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/users/search"))
        .and(query_param("searchTerm", "ana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 4, "firstName": "Ana", "email": "ana@example.com", "role": "USER", "active": true }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/admin/users/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/admin/users/4/deactivate"))
        .and(header("authorization", "Bearer admin"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/admin/users/4/activate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/admin/users/4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, Arc::new(Session::with_token("admin")));
    let id = EntityId::from(4_i64);

    let found = backend.search_users("ana").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].first_name, "Ana");
    assert!(backend.fetch_active_users().await.unwrap().is_empty());
    backend.deactivate_user(&id).await.unwrap();
    backend.activate_user(&id).await.unwrap();
    backend.delete_user(&id).await.unwrap();
}

#[tokio::test]
async fn admin_user_update_sends_the_profile_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/admin/users/4"))
        .and(body_json(json!({ "phone": "+351 555 0100" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4, "firstName": "Ana", "phone": "+351 555 0100", "role": "USER"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, Arc::new(Session::with_token("admin")));
    let update = ProfileUpdate {
        phone: Some("+351 555 0100".to_string()),
        ..ProfileUpdate::default()
    };
    let user = backend.update_user(&EntityId::from(4_i64), &update).await.unwrap();

    assert_eq!(user.phone.as_deref(), Some("+351 555 0100"));
}

#[tokio::test]
async fn stats_endpoints_decode_bare_numbers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/stats/confirmed-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(17)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/stats/total-revenue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(10250.75)))
        .mount(&server)
        .await;

    let backend = backend(&server, Arc::new(Session::with_token("t")));
    assert_eq!(backend.confirmed_count().await.unwrap(), 17);
    assert_eq!(backend.total_revenue().await.unwrap(), Money::from_cents(1_025_075));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let backend = backend(&server, Arc::new(Session::with_token("t")));
    assert!(matches!(backend.fetch_me().await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn login_stores_the_issued_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "ana@tours.test", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "fresh",
            "user": { "id": 1, "firstName": "Ana", "lastName": "Silva", "email": "ana@tours.test", "role": "ROLE_USER" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(Session::default());
    let backend = backend(&server, Arc::clone(&session));
    let user = backend
        .login(&Credentials {
            email: "ana@tours.test".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.full_name(), "Ana Silva");
    assert!(!user.is_admin());
    assert_eq!(session.token().as_deref(), Some("fresh"));
    assert_eq!(session.status(), SessionEvent::Active);
}

#[tokio::test]
async fn rejected_login_keeps_the_session_signal_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })))
        .mount(&server)
        .await;

    let session = Arc::new(Session::default());
    let backend = backend(&server, Arc::clone(&session));
    let err = backend
        .login(&Credentials {
            email: "ana@tours.test".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Bad credentials"));
    assert_eq!(session.status(), SessionEvent::SignedOut);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let config = ClientConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_secs: 1,
        ..ClientConfig::default()
    };
    let backend = HttpBackend::new(&config, Arc::new(Session::default())).unwrap();
    assert!(matches!(backend.fetch_tours().await, Err(ApiError::Transport(_))));
}
