//! # Tourbook Testing
//!
//! Testing utilities for the Tourbook stores.
//!
//! This crate provides:
//! - [`MockBackend`]: a scriptable in-memory `BookingApi`
//! - [`FixedClock`] and [`test_clock`] for deterministic time
//! - [`ReducerTest`]: Given-When-Then reducer tests, and [`settle`] to drive the
//!   feedback loop without a runtime
//! - [`fixtures`]: canonical entities
//!
//! ## Example
//!
//! ```ignore
//! use tourbook_testing::{MockBackend, fixtures, test_environment};
//!
//! #[tokio::test]
//! async fn wishlist_add() {
//!     let backend = Arc::new(MockBackend::new().with_tours([fixtures::tour(1, 100)]));
//!     let app = TourbookApp::new(test_environment(backend.clone()));
//!     app.add_to_wishlist(fixtures::tour(1, 100)).await?;
//!     assert_eq!(backend.wishlist_ids().len(), 1);
//! }
//! ```

use std::sync::Arc;
use tourbook_core::environment::{ApiEnvironment, Clock};
use tourbook_core::{BookingApi, DateTime, Utc};

pub mod fixtures;
pub mod mock_backend;
pub mod reducer_test;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// ```
    /// use tourbook_testing::mocks::FixedClock;
    /// use tourbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

pub use mock_backend::{Endpoint, MockBackend, bare_error, server_error};
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions, settle};

/// Store environment over `api` with the fixed [`test_clock`]
#[must_use]
pub fn test_environment(api: Arc<dyn BookingApi>) -> ApiEnvironment {
    ApiEnvironment::new(api, Arc::new(test_clock()))
}
