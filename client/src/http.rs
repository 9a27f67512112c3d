//! reqwest implementation of [`BookingApi`].
//!
//! Every call except login/register carries the session's bearer token. A 401
//! tears the session down before the error reaches the caller. Response bodies
//! are decoded into the tolerant wire records and normalized into domain
//! entities here, so stores never see the backend's field variants.

use crate::auth::{AuthResponse, Credentials, Registration};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::Session;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tourbook_core::api::{ApiError, ApiFuture, ApiResult, BookingApi};
use tourbook_core::domain::{
    Booking, BookingStatus, NewBooking, NewReview, PaymentStatus, ProfileUpdate, Review,
    ReviewUpdate, Tour, TourDraft, User,
};
use tourbook_core::id::EntityId;
use tourbook_core::money::Money;
use tourbook_core::wire::{
    BookingRecord, Normalize, ReviewRecord, TourRecord, UserRecord, normalize_all,
};

/// Whether a request carries the session token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Anonymous,
}

/// HTTP adapter for the Tourbook REST backend
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Builds the adapter with the configured timeout
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for an invalid configuration and
    /// [`ClientError::Build`] if the TLS backend cannot be initialised.
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self, ClientError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// The session whose token is attached to requests
    #[must_use]
    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Backend base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/auth/login`; stores the issued token in the session
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] when the backend rejects the credentials and
    /// [`ClientError::TokenFile`] if the token cannot be persisted.
    pub async fn login(&self, credentials: &Credentials) -> Result<Option<User>, ClientError> {
        let body = encode(credentials)?;
        let response = self
            .send(Method::POST, "/api/auth/login", &[], Some(body), Auth::Anonymous)
            .await?;
        self.start_session(decode(response).await?).await
    }

    /// `POST /api/auth/register`; stores the issued token in the session
    ///
    /// # Errors
    ///
    /// Same as [`HttpBackend::login`].
    pub async fn register(&self, registration: &Registration) -> Result<Option<User>, ClientError> {
        let body = encode(registration)?;
        let response = self
            .send(Method::POST, "/api/auth/register", &[], Some(body), Auth::Anonymous)
            .await?;
        self.start_session(decode(response).await?).await
    }

    async fn start_session(&self, auth: AuthResponse) -> Result<Option<User>, ClientError> {
        self.session.set_token(auth.token).await?;
        let user = auth.user.map(Normalize::normalize).transpose().map_err(ApiError::from)?;
        tracing::info!(user = ?user.as_ref().map(|u| u.email.as_str()), "Signed in");
        Ok(user)
    }

    #[tracing::instrument(level = "debug", skip(self, query, body), fields(status = tracing::field::Empty))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
        auth: Auth,
    ) -> ApiResult<Response> {
        metrics::counter!("http.requests", "method" => method.to_string()).increment(1);

        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        if auth == Auth::Bearer {
            if let Some(token) = self.session.token() {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());

        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED && auth == Auth::Bearer {
            self.session.invalidate().await;
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Server {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> ApiResult<T> {
        let response = self.send(method, path, query, body, Auth::Bearer).await?;
        decode(response).await
    }

    async fn empty(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<()> {
        self.send(method, path, query, None, Auth::Bearer).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.json(Method::GET, path, &[], None).await
    }
}

/// `message` field of a JSON error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn encode<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(format!("request body: {e}")))
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

impl BookingApi for HttpBackend {
    fn fetch_tours(&self) -> ApiFuture<'_, Vec<Tour>> {
        Box::pin(async move {
            let records: Vec<TourRecord> = self.get("/api/tours").await?;
            Ok(normalize_all(records)?)
        })
    }

    fn fetch_tour(&self, id: &EntityId) -> ApiFuture<'_, Tour> {
        let path = format!("/api/tours/{id}");
        Box::pin(async move {
            let record: TourRecord = self.get(&path).await?;
            Ok(record.normalize()?)
        })
    }

    fn create_tour(&self, draft: &TourDraft) -> ApiFuture<'_, Tour> {
        let body = encode(draft);
        Box::pin(async move {
            let record: TourRecord = self
                .json(Method::POST, "/api/admin/tours", &[], Some(body?))
                .await?;
            Ok(record.normalize()?)
        })
    }

    fn update_tour(&self, id: &EntityId, draft: &TourDraft) -> ApiFuture<'_, Tour> {
        let path = format!("/api/admin/tours/{id}");
        let body = encode(draft);
        Box::pin(async move {
            let record: TourRecord = self.json(Method::PUT, &path, &[], Some(body?)).await?;
            Ok(record.normalize()?)
        })
    }

    fn delete_tour(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let path = format!("/api/admin/tours/{id}");
        Box::pin(async move { self.empty(Method::DELETE, &path, &[]).await })
    }

    fn activate_tour(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let path = format!("/api/tours/{id}/activate");
        Box::pin(async move { self.empty(Method::PUT, &path, &[]).await })
    }

    fn deactivate_tour(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let path = format!("/api/tours/{id}/deactivate");
        Box::pin(async move { self.empty(Method::PUT, &path, &[]).await })
    }

    fn fetch_my_bookings(&self) -> ApiFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let records: Vec<BookingRecord> = self.get("/api/bookings/my-bookings").await?;
            Ok(normalize_all(records)?)
        })
    }

    fn fetch_all_bookings(&self) -> ApiFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let records: Vec<BookingRecord> = self.get("/api/admin/bookings").await?;
            Ok(normalize_all(records)?)
        })
    }

    fn fetch_booking(&self, id: &EntityId) -> ApiFuture<'_, Booking> {
        let path = format!("/api/bookings/{id}");
        Box::pin(async move {
            let record: BookingRecord = self.get(&path).await?;
            Ok(record.normalize()?)
        })
    }

    fn create_booking(&self, booking: &NewBooking) -> ApiFuture<'_, Booking> {
        let body = encode(booking);
        Box::pin(async move {
            let record: BookingRecord = self
                .json(Method::POST, "/api/bookings", &[], Some(body?))
                .await?;
            Ok(record.normalize()?)
        })
    }

    fn update_booking_status(
        &self,
        id: &EntityId,
        status: BookingStatus,
    ) -> ApiFuture<'_, Booking> {
        let path = format!("/api/bookings/{id}/status");
        Box::pin(async move {
            let record: BookingRecord = self
                .json(Method::PUT, &path, &[("status", status.as_str())], None)
                .await?;
            Ok(record.normalize()?)
        })
    }

    fn update_payment_status(
        &self,
        id: &EntityId,
        status: PaymentStatus,
    ) -> ApiFuture<'_, Booking> {
        let path = format!("/api/bookings/{id}/payment-status");
        Box::pin(async move {
            let record: BookingRecord = self
                .json(Method::PUT, &path, &[("paymentStatus", status.as_str())], None)
                .await?;
            Ok(record.normalize()?)
        })
    }

    fn delete_booking(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let path = format!("/api/bookings/{id}");
        Box::pin(async move { self.empty(Method::DELETE, &path, &[]).await })
    }

    fn confirmed_count(&self) -> ApiFuture<'_, u64> {
        Box::pin(async move {
            let count: Option<u64> = self.get("/api/bookings/stats/confirmed-count").await?;
            Ok(count.unwrap_or_default())
        })
    }

    fn total_revenue(&self) -> ApiFuture<'_, Money> {
        Box::pin(async move {
            let revenue: Option<Money> = self.get("/api/bookings/stats/total-revenue").await?;
            Ok(revenue.unwrap_or_default())
        })
    }

    fn fetch_wishlist(&self) -> ApiFuture<'_, Vec<Tour>> {
        Box::pin(async move {
            let records: Vec<TourRecord> = self.get("/api/wishlist/my-wishlist").await?;
            Ok(normalize_all(records)?)
        })
    }

    fn add_to_wishlist(&self, tour_id: &EntityId) -> ApiFuture<'_, ()> {
        let tour_id = tour_id.to_string();
        Box::pin(async move {
            self.empty(Method::POST, "/api/wishlist/add-current", &[("tourId", tour_id.as_str())])
                .await
        })
    }

    fn remove_from_wishlist(&self, tour_id: &EntityId) -> ApiFuture<'_, ()> {
        let tour_id = tour_id.to_string();
        Box::pin(async move {
            self.empty(Method::DELETE, "/api/wishlist/remove-current", &[("tourId", tour_id.as_str())])
                .await
        })
    }

    fn fetch_my_reviews(&self) -> ApiFuture<'_, Vec<Review>> {
        Box::pin(async move {
            let records: Vec<ReviewRecord> = self.get("/api/reviews/my-reviews").await?;
            Ok(normalize_all(records)?)
        })
    }

    fn create_review(&self, review: &NewReview) -> ApiFuture<'_, Review> {
        let body = encode(review);
        Box::pin(async move {
            let record: ReviewRecord = self
                .json(Method::POST, "/api/reviews", &[], Some(body?))
                .await?;
            Ok(record.normalize()?)
        })
    }

    fn update_review(&self, id: &EntityId, review: &ReviewUpdate) -> ApiFuture<'_, Review> {
        let path = format!("/api/reviews/{id}");
        let body = encode(review);
        Box::pin(async move {
            let record: ReviewRecord = self.json(Method::PUT, &path, &[], Some(body?)).await?;
            Ok(record.normalize()?)
        })
    }

    fn delete_review(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let path = format!("/api/reviews/{id}");
        Box::pin(async move { self.empty(Method::DELETE, &path, &[]).await })
    }

    fn fetch_me(&self) -> ApiFuture<'_, User> {
        Box::pin(async move {
            let record: UserRecord = self.get("/api/user/me").await?;
            Ok(record.normalize()?)
        })
    }

    fn update_profile(&self, update: &ProfileUpdate) -> ApiFuture<'_, User> {
        let body = encode(update);
        Box::pin(async move {
            let record: UserRecord = self
                .json(Method::PUT, "/api/user/profile", &[], Some(body?))
                .await?;
            Ok(record.normalize()?)
        })
    }

    fn fetch_users(&self) -> ApiFuture<'_, Vec<User>> {
        Box::pin(async move {
            let records: Vec<UserRecord> = self.get("/api/admin/users").await?;
            Ok(normalize_all(records)?)
        })
    }

    fn fetch_active_users(&self) -> ApiFuture<'_, Vec<User>> {
        Box::pin(async move {
            let records: Vec<UserRecord> = self.get("/api/admin/users/active").await?;
            Ok(normalize_all(records)?)
        })
    }

    fn search_users(&self, term: &str) -> ApiFuture<'_, Vec<User>> {
        let term = term.to_string();
        Box::pin(async move {
            let records: Vec<UserRecord> = self
                .json(Method::GET, "/api/admin/users/search", &[("searchTerm", term.as_str())], None)
                .await?;
            Ok(normalize_all(records)?)
        })
    }

    fn fetch_user(&self, id: &EntityId) -> ApiFuture<'_, User> {
        let path = format!("/api/admin/users/{id}");
        Box::pin(async move {
            let record: UserRecord = self.get(&path).await?;
            Ok(record.normalize()?)
        })
    }

    fn update_user(&self, id: &EntityId, update: &ProfileUpdate) -> ApiFuture<'_, User> {
        let path = format!("/api/admin/users/{id}");
        let body = encode(update);
        Box::pin(async move {
            let record: UserRecord = self.json(Method::PUT, &path, &[], Some(body?)).await?;
            Ok(record.normalize()?)
        })
    }

    fn delete_user(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let path = format!("/api/admin/users/{id}");
        Box::pin(async move { self.empty(Method::DELETE, &path, &[]).await })
    }

    fn activate_user(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let path = format!("/api/admin/users/{id}/activate");
        Box::pin(async move { self.empty(Method::PUT, &path, &[]).await })
    }

    fn deactivate_user(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let path = format!("/api/admin/users/{id}/deactivate");
        Box::pin(async move { self.empty(Method::PUT, &path, &[]).await })
    }
}
