//! # Tourbook Stores
//!
//! Client-side state of the booking application, built on the reducer/store
//! runtime:
//!
//! - [`tours`], [`bookings`], [`users`], [`reviews`]: entity stores with the
//!   pending/fulfilled/rejected request lifecycle
//! - [`wishlist`]: optimistic wishlist writes with explicit pending operations,
//!   rollback and re-fetch
//! - [`app`]: composition of the stores and the book-now checkout
//! - [`selectors`]: derived views
//! - [`TourbookApp`]: request/response facade over the store
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tourbook_core::environment::ApiEnvironment;
//! use tourbook_stores::{TourbookApp, selectors};
//!
//! # async fn demo(api: Arc<dyn tourbook_core::BookingApi>) -> Result<(), tourbook_stores::AppError> {
//! let app = TourbookApp::new(ApiEnvironment::with_system_clock(api));
//! let tours = app.fetch_tours().await?;
//! if let Some(tour) = tours.first() {
//!     app.add_to_wishlist(tour.clone()).await?;
//! }
//! let count = app.state(|s| selectors::wishlist_count(&s.wishlist)).await;
//! println!("{count} tours wishlisted");
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod bookings;
pub mod error;
pub mod facade;
pub mod request;
pub mod reviews;
pub mod selectors;
pub mod tours;
pub mod users;
pub mod wishlist;

pub use app::{AppAction, AppReducer, AppState, Checkout, Cleanup};
pub use error::AppError;
pub use facade::{AppStore, DEFAULT_REQUEST_TIMEOUT, TourbookApp};
pub use request::{Outcome, RequestId};
pub use wishlist::{ItemState, OperationKind, PendingOperation, Phase, WishlistState};
