//! In-memory backend for store tests.
//!
//! [`MockBackend`] implements [`BookingApi`] over plain collections and mirrors
//! the behaviour of the REST backend where the stores depend on it: duplicate
//! wishlist adds are rejected, wishlist removal is idempotent, booking creation
//! assigns ids and a `PENDING` status. Every endpoint can be scripted to fail or
//! to stall, and every call is counted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tourbook_core::domain::{
    Booking, BookingStatus, NewBooking, NewReview, PaymentStatus, ProfileUpdate, Review,
    ReviewUpdate, Role, Tour, TourDraft, User,
};
use tourbook_core::environment::Clock;
use tourbook_core::{ApiError, ApiFuture, ApiResult, BookingApi, DateTime, EntityId, Money, Utc};

/// Backend endpoints, used to script failures and inspect calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Endpoint {
    FetchTours,
    FetchTour,
    CreateTour,
    UpdateTour,
    DeleteTour,
    ActivateTour,
    DeactivateTour,
    FetchMyBookings,
    FetchAllBookings,
    FetchBooking,
    CreateBooking,
    UpdateBookingStatus,
    UpdatePaymentStatus,
    DeleteBooking,
    ConfirmedCount,
    TotalRevenue,
    FetchWishlist,
    AddToWishlist,
    RemoveFromWishlist,
    FetchMyReviews,
    CreateReview,
    UpdateReview,
    DeleteReview,
    FetchMe,
    UpdateProfile,
    FetchUsers,
    FetchActiveUsers,
    SearchUsers,
    FetchUser,
    UpdateUser,
    DeleteUser,
    ActivateUser,
    DeactivateUser,
}

#[derive(Debug, Clone)]
enum Failure {
    Once(ApiError),
    Always(ApiError),
}

#[derive(Default)]
struct Inner {
    tours: Vec<Tour>,
    my_bookings: Vec<Booking>,
    other_bookings: Vec<Booking>,
    wishlist: Vec<EntityId>,
    reviews: Vec<Review>,
    users: Vec<User>,
    me: Option<User>,
    next_id: i64,
    failures: HashMap<Endpoint, VecDeque<Failure>>,
    delays: HashMap<Endpoint, Duration>,
    calls: Vec<Endpoint>,
}

impl Inner {
    fn next_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId::from(self.next_id)
    }

    fn take_failure(&mut self, endpoint: Endpoint) -> Option<ApiError> {
        let queue = self.failures.get_mut(&endpoint)?;
        match queue.front()? {
            Failure::Always(err) => Some(err.clone()),
            Failure::Once(_) => match queue.pop_front() {
                Some(Failure::Once(err)) => Some(err),
                _ => None,
            },
        }
    }

    fn tour(&self, id: &EntityId) -> ApiResult<&Tour> {
        self.tours
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| not_found("Tour", id))
    }

    fn my_booking_mut(&mut self, id: &EntityId) -> ApiResult<&mut Booking> {
        self.my_bookings
            .iter_mut()
            .chain(self.other_bookings.iter_mut())
            .find(|b| &b.id == id)
            .ok_or_else(|| not_found("Booking", id))
    }

    /// Admin endpoints answer 403 to a signed-in customer
    fn require_admin(&self) -> ApiResult<()> {
        match self.me.as_ref().map(|me| me.role) {
            Some(Role::Admin) | None => Ok(()),
            Some(Role::User) => Err(server_error(403, "Access denied")),
        }
    }

    fn user_mut(&mut self, id: &EntityId) -> ApiResult<&mut User> {
        self.users
            .iter_mut()
            .find(|u| &u.id == id)
            .ok_or_else(|| not_found("User", id))
    }

    fn set_user_active(&mut self, id: &EntityId, active: bool) -> ApiResult<()> {
        self.require_admin()?;
        self.user_mut(id)?.is_active = active;
        Ok(())
    }

    fn all_bookings(&self) -> Vec<Booking> {
        self.my_bookings
            .iter()
            .chain(self.other_bookings.iter())
            .cloned()
            .collect()
    }
}

fn not_found(kind: &str, id: &EntityId) -> ApiError {
    ApiError::Server {
        status: 404,
        message: Some(format!("{kind} not found with id: {id}")),
    }
}

/// Error with a backend message, as the REST layer reports business failures
#[must_use]
pub fn server_error(status: u16, message: &str) -> ApiError {
    ApiError::Server {
        status,
        message: Some(message.to_string()),
    }
}

/// Error without a body, so stores fall back to their own message
#[must_use]
pub fn bare_error(status: u16) -> ApiError {
    ApiError::Server {
        status,
        message: None,
    }
}

/// Scriptable in-memory [`BookingApi`]
pub struct MockBackend {
    inner: Mutex<Inner>,
    clock: DateTime<Utc>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Empty backend; ids it assigns start at 1000
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 999,
                ..Inner::default()
            }),
            clock: crate::test_clock().now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds the tour catalogue
    #[must_use]
    pub fn with_tours(self, tours: impl IntoIterator<Item = Tour>) -> Self {
        self.lock().tours.extend(tours);
        self
    }

    /// Seeds the current user's bookings
    #[must_use]
    pub fn with_bookings(self, bookings: impl IntoIterator<Item = Booking>) -> Self {
        self.lock().my_bookings.extend(bookings);
        self
    }

    /// Seeds bookings that belong to other users (visible to administrators)
    #[must_use]
    pub fn with_other_bookings(self, bookings: impl IntoIterator<Item = Booking>) -> Self {
        self.lock().other_bookings.extend(bookings);
        self
    }

    /// Seeds the current user's wishlist by tour id
    #[must_use]
    pub fn with_wishlist<I, T>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        self.lock().wishlist.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Seeds the current user's reviews
    #[must_use]
    pub fn with_reviews(self, reviews: impl IntoIterator<Item = Review>) -> Self {
        self.lock().reviews.extend(reviews);
        self
    }

    /// Seeds the user list; the first user is also the signed-in user unless
    /// [`MockBackend::signed_in_as`] is called
    #[must_use]
    pub fn with_users(self, users: impl IntoIterator<Item = User>) -> Self {
        {
            let mut inner = self.lock();
            inner.users.extend(users);
            if inner.me.is_none() {
                inner.me = inner.users.first().cloned();
            }
        }
        self
    }

    /// Sets the signed-in user
    #[must_use]
    pub fn signed_in_as(self, user: User) -> Self {
        self.lock().me = Some(user);
        self
    }

    /// Every call to `endpoint` fails with `error` until [`MockBackend::recover`]
    pub fn fail(&self, endpoint: Endpoint, error: ApiError) {
        let mut inner = self.lock();
        let queue = inner.failures.entry(endpoint).or_default();
        queue.clear();
        queue.push_back(Failure::Always(error));
    }

    /// The next call to `endpoint` fails with `error`
    pub fn fail_once(&self, endpoint: Endpoint, error: ApiError) {
        self.lock()
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(Failure::Once(error));
    }

    /// Removes scripted failures for `endpoint`
    pub fn recover(&self, endpoint: Endpoint) {
        self.lock().failures.remove(&endpoint);
    }

    /// Calls to `endpoint` resolve after `delay`
    pub fn delay(&self, endpoint: Endpoint, delay: Duration) {
        self.lock().delays.insert(endpoint, delay);
    }

    /// Number of calls made to `endpoint`
    #[must_use]
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.iter().filter(|e| **e == endpoint).count()
    }

    /// Every call in the order it was made
    #[must_use]
    pub fn call_log(&self) -> Vec<Endpoint> {
        self.lock().calls.clone()
    }

    /// Server-side wishlist
    #[must_use]
    pub fn wishlist_ids(&self) -> Vec<EntityId> {
        self.lock().wishlist.clone()
    }

    /// Replaces the server-side wishlist
    pub fn set_wishlist<I, T>(&self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        self.lock().wishlist = ids.into_iter().map(Into::into).collect();
    }

    /// Server-side bookings of the current user
    #[must_use]
    pub fn my_bookings(&self) -> Vec<Booking> {
        self.lock().my_bookings.clone()
    }

    /// Server-side tour catalogue
    #[must_use]
    pub fn tours(&self) -> Vec<Tour> {
        self.lock().tours.clone()
    }

    fn call<'a, T, F>(&'a self, endpoint: Endpoint, op: F) -> ApiFuture<'a, T>
    where
        T: Send + 'a,
        F: FnOnce(&mut Inner, DateTime<Utc>) -> ApiResult<T> + Send + 'a,
    {
        Box::pin(async move {
            let delay = {
                let mut inner = self.lock();
                inner.calls.push(endpoint);
                inner.delays.get(&endpoint).copied()
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut inner = self.lock();
            if let Some(error) = inner.take_failure(endpoint) {
                return Err(error);
            }
            op(&mut *inner, self.clock)
        })
    }
}

fn apply_draft(tour: &mut Tour, draft: &TourDraft) {
    tour.title.clone_from(&draft.title);
    tour.description.clone_from(&draft.description);
    tour.price = draft.price;
    tour.duration = draft.duration;
    tour.destination.clone_from(&draft.destination);
    tour.category = Some(draft.category);
    tour.image_url = Some(draft.image_url.clone());
    tour.max_group_size = draft.max_group_size;
    tour.difficulty = Some(draft.difficulty);
    tour.includes.clone_from(&draft.includes);
    tour.is_active = draft.is_active;
}

impl BookingApi for MockBackend {
    fn fetch_tours(&self) -> ApiFuture<'_, Vec<Tour>> {
        self.call(Endpoint::FetchTours, |inner, _| Ok(inner.tours.clone()))
    }

    fn fetch_tour(&self, id: &EntityId) -> ApiFuture<'_, Tour> {
        let id = id.clone();
        self.call(Endpoint::FetchTour, move |inner, _| inner.tour(&id).cloned())
    }

    fn create_tour(&self, draft: &TourDraft) -> ApiFuture<'_, Tour> {
        let draft = draft.clone();
        self.call(Endpoint::CreateTour, move |inner, _| {
            let mut tour = Tour::placeholder(inner.next_id());
            apply_draft(&mut tour, &draft);
            inner.tours.push(tour.clone());
            Ok(tour)
        })
    }

    fn update_tour(&self, id: &EntityId, draft: &TourDraft) -> ApiFuture<'_, Tour> {
        let (id, draft) = (id.clone(), draft.clone());
        self.call(Endpoint::UpdateTour, move |inner, _| {
            let tour = inner
                .tours
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| not_found("Tour", &id))?;
            apply_draft(tour, &draft);
            Ok(tour.clone())
        })
    }

    fn delete_tour(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let id = id.clone();
        self.call(Endpoint::DeleteTour, move |inner, _| {
            inner.tour(&id)?;
            inner.tours.retain(|t| t.id != id);
            Ok(())
        })
    }

    fn activate_tour(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let id = id.clone();
        self.call(Endpoint::ActivateTour, move |inner, _| {
            let tour = inner
                .tours
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| not_found("Tour", &id))?;
            tour.is_active = true;
            Ok(())
        })
    }

    fn deactivate_tour(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let id = id.clone();
        self.call(Endpoint::DeactivateTour, move |inner, _| {
            let tour = inner
                .tours
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| not_found("Tour", &id))?;
            tour.is_active = false;
            Ok(())
        })
    }

    fn fetch_my_bookings(&self) -> ApiFuture<'_, Vec<Booking>> {
        self.call(Endpoint::FetchMyBookings, |inner, _| {
            Ok(inner.my_bookings.clone())
        })
    }

    fn fetch_all_bookings(&self) -> ApiFuture<'_, Vec<Booking>> {
        self.call(Endpoint::FetchAllBookings, |inner, _| Ok(inner.all_bookings()))
    }

    fn fetch_booking(&self, id: &EntityId) -> ApiFuture<'_, Booking> {
        let id = id.clone();
        self.call(Endpoint::FetchBooking, move |inner, _| {
            inner.my_booking_mut(&id).cloned()
        })
    }

    fn create_booking(&self, booking: &NewBooking) -> ApiFuture<'_, Booking> {
        let request = booking.clone();
        self.call(Endpoint::CreateBooking, move |inner, now| {
            let tour = inner.tour(&request.tour_id)?.clone();
            let booking = Booking {
                id: inner.next_id(),
                tour_id: tour.id,
                tour_title: Some(tour.title),
                destination: Some(tour.destination),
                travel_date: Some(request.travel_date),
                end_date: Some(request.end_date),
                guests: request.guests,
                total_amount: request.total_amount,
                payment_method: Some(request.payment_method),
                status: BookingStatus::Pending,
                payment_status: PaymentStatus::Pending,
                created_at: Some(now),
            };
            inner.my_bookings.push(booking.clone());
            Ok(booking)
        })
    }

    fn update_booking_status(
        &self,
        id: &EntityId,
        status: BookingStatus,
    ) -> ApiFuture<'_, Booking> {
        let id = id.clone();
        self.call(Endpoint::UpdateBookingStatus, move |inner, _| {
            let booking = inner.my_booking_mut(&id)?;
            booking.status = status;
            Ok(booking.clone())
        })
    }

    fn update_payment_status(
        &self,
        id: &EntityId,
        status: PaymentStatus,
    ) -> ApiFuture<'_, Booking> {
        let id = id.clone();
        self.call(Endpoint::UpdatePaymentStatus, move |inner, _| {
            let booking = inner.my_booking_mut(&id)?;
            booking.payment_status = status;
            Ok(booking.clone())
        })
    }

    fn delete_booking(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let id = id.clone();
        self.call(Endpoint::DeleteBooking, move |inner, _| {
            inner.my_booking_mut(&id)?;
            inner.my_bookings.retain(|b| b.id != id);
            inner.other_bookings.retain(|b| b.id != id);
            Ok(())
        })
    }

    fn confirmed_count(&self) -> ApiFuture<'_, u64> {
        self.call(Endpoint::ConfirmedCount, |inner, _| {
            let count = inner
                .all_bookings()
                .iter()
                .filter(|b| b.status == BookingStatus::Confirmed)
                .count();
            Ok(u64::try_from(count).unwrap_or(u64::MAX))
        })
    }

    fn total_revenue(&self) -> ApiFuture<'_, Money> {
        self.call(Endpoint::TotalRevenue, |inner, _| {
            Ok(inner
                .all_bookings()
                .iter()
                .filter(|b| b.payment_status == PaymentStatus::Paid)
                .map(|b| b.total_amount)
                .sum())
        })
    }

    fn fetch_wishlist(&self) -> ApiFuture<'_, Vec<Tour>> {
        self.call(Endpoint::FetchWishlist, |inner, _| {
            Ok(inner
                .wishlist
                .iter()
                .map(|id| {
                    inner
                        .tour(id)
                        .cloned()
                        .unwrap_or_else(|_| Tour::placeholder(id.clone()))
                })
                .collect())
        })
    }

    fn add_to_wishlist(&self, tour_id: &EntityId) -> ApiFuture<'_, ()> {
        let tour_id = tour_id.clone();
        self.call(Endpoint::AddToWishlist, move |inner, _| {
            inner.tour(&tour_id)?;
            if inner.wishlist.contains(&tour_id) {
                return Err(server_error(400, "Tour is already in wishlist"));
            }
            inner.wishlist.push(tour_id);
            Ok(())
        })
    }

    fn remove_from_wishlist(&self, tour_id: &EntityId) -> ApiFuture<'_, ()> {
        let tour_id = tour_id.clone();
        self.call(Endpoint::RemoveFromWishlist, move |inner, _| {
            inner.wishlist.retain(|id| *id != tour_id);
            Ok(())
        })
    }

    fn fetch_my_reviews(&self) -> ApiFuture<'_, Vec<Review>> {
        self.call(Endpoint::FetchMyReviews, |inner, _| Ok(inner.reviews.clone()))
    }

    fn create_review(&self, review: &NewReview) -> ApiFuture<'_, Review> {
        let request = review.clone();
        self.call(Endpoint::CreateReview, move |inner, now| {
            let title = inner.tour(&request.tour_id)?.title.clone();
            let review = Review {
                id: inner.next_id(),
                tour_id: request.tour_id,
                tour_title: Some(title),
                rating: request.rating,
                comment: request.comment,
                created_at: Some(now),
            };
            inner.reviews.push(review.clone());
            Ok(review)
        })
    }

    fn update_review(&self, id: &EntityId, review: &ReviewUpdate) -> ApiFuture<'_, Review> {
        let (id, update) = (id.clone(), review.clone());
        self.call(Endpoint::UpdateReview, move |inner, _| {
            let review = inner
                .reviews
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| not_found("Review", &id))?;
            review.rating = update.rating;
            review.comment = update.comment;
            Ok(review.clone())
        })
    }

    fn delete_review(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let id = id.clone();
        self.call(Endpoint::DeleteReview, move |inner, _| {
            if !inner.reviews.iter().any(|r| r.id == id) {
                return Err(not_found("Review", &id));
            }
            inner.reviews.retain(|r| r.id != id);
            Ok(())
        })
    }

    fn fetch_me(&self) -> ApiFuture<'_, User> {
        self.call(Endpoint::FetchMe, |inner, _| {
            inner.me.clone().ok_or(ApiError::Unauthorized)
        })
    }

    fn update_profile(&self, update: &ProfileUpdate) -> ApiFuture<'_, User> {
        let update = update.clone();
        self.call(Endpoint::UpdateProfile, move |inner, _| {
            let me = inner.me.as_mut().ok_or(ApiError::Unauthorized)?;
            if let Some(first_name) = update.first_name {
                me.first_name = first_name;
            }
            if let Some(last_name) = update.last_name {
                me.last_name = last_name;
            }
            if let Some(email) = update.email {
                me.email = email;
            }
            me.phone = update.phone.or(me.phone.take());
            me.address = update.address.or(me.address.take());
            me.avatar = update.avatar.or(me.avatar.take());
            let me = me.clone();
            if let Some(listed) = inner.users.iter_mut().find(|u| u.id == me.id) {
                *listed = me.clone();
            }
            Ok(me)
        })
    }

    fn fetch_users(&self) -> ApiFuture<'_, Vec<User>> {
        self.call(Endpoint::FetchUsers, |inner, _| {
            inner.require_admin()?;
            Ok(inner.users.clone())
        })
    }

    fn fetch_active_users(&self) -> ApiFuture<'_, Vec<User>> {
        self.call(Endpoint::FetchActiveUsers, |inner, _| {
            inner.require_admin()?;
            Ok(inner.users.iter().filter(|u| u.is_active).cloned().collect())
        })
    }

    fn search_users(&self, term: &str) -> ApiFuture<'_, Vec<User>> {
        let term = term.to_lowercase();
        self.call(Endpoint::SearchUsers, move |inner, _| {
            inner.require_admin()?;
            Ok(inner
                .users
                .iter()
                .filter(|u| {
                    u.full_name().to_lowercase().contains(&term)
                        || u.email.to_lowercase().contains(&term)
                })
                .cloned()
                .collect())
        })
    }

    fn fetch_user(&self, id: &EntityId) -> ApiFuture<'_, User> {
        let id = id.clone();
        self.call(Endpoint::FetchUser, move |inner, _| {
            inner.require_admin()?;
            inner.user_mut(&id).cloned()
        })
    }

    fn update_user(&self, id: &EntityId, update: &ProfileUpdate) -> ApiFuture<'_, User> {
        let (id, update) = (id.clone(), update.clone());
        self.call(Endpoint::UpdateUser, move |inner, _| {
            inner.require_admin()?;
            let user = inner.user_mut(&id)?;
            if let Some(first_name) = update.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = update.last_name {
                user.last_name = last_name;
            }
            if let Some(email) = update.email {
                user.email = email;
            }
            user.phone = update.phone.or(user.phone.take());
            user.address = update.address.or(user.address.take());
            user.avatar = update.avatar.or(user.avatar.take());
            Ok(user.clone())
        })
    }

    fn delete_user(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let id = id.clone();
        self.call(Endpoint::DeleteUser, move |inner, _| {
            inner.require_admin()?;
            inner.user_mut(&id)?;
            inner.users.retain(|u| u.id != id);
            Ok(())
        })
    }

    fn activate_user(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let id = id.clone();
        self.call(Endpoint::ActivateUser, move |inner, _| inner.set_user_active(&id, true))
    }

    fn deactivate_user(&self, id: &EntityId) -> ApiFuture<'_, ()> {
        let id = id.clone();
        self.call(Endpoint::DeactivateUser, move |inner, _| inner.set_user_active(&id, false))
    }
}
