//! # Tourbook Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Owns state behind a `RwLock`, runs the reducer and executes effects
//! - **Effect Executor**: Spawns effect work on tokio and feeds resulting actions back
//! - **Effect Handles**: Let callers wait until the work started by an action is done
//!
//! ## Example
//!
//! ```ignore
//! use tourbook_runtime::Store;
//!
//! let store = Store::new(AppState::default(), AppReducer::new(), environment);
//!
//! let mut handle = store.send(AppAction::Wishlist(WishlistAction::Fetch { request })).await?;
//! handle.wait().await;
//!
//! let count = store.state(|s| s.wishlist.items.len()).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tourbook_core::{effect::Effect, reducer::Reducer};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Runtime settings for a [`Store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Number of feedback actions buffered for observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Default action broadcast capacity
    pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

    /// Set the broadcast capacity (at least 1)
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: Self::DEFAULT_BROADCAST_CAPACITY,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Effect tracking mode - controls how far an [`EffectHandle`] follows the effect tree
///
/// - **Direct**: only the effects returned for the sent action
/// - **Cascading**: also every effect produced by actions fed back from those
///   effects, transitively. A remove that fails, triggers a re-fetch, and applies
///   the fetched list is one cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    /// Track only immediate effects spawned by this action
    #[default]
    Direct,

    /// Track effects transitively through the feedback loop
    Cascading,
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Each action gets a handle that can be awaited
/// to know when its effects (and, in cascading mode, the whole feedback chain)
/// are done.
#[derive(Clone)]
pub struct EffectHandle {
    mode: TrackingMode,
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new(mode: TrackingMode) -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            mode,
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            mode,
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            mode: TrackingMode::Direct,
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait until the tracked effect counter reaches zero
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires first.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("mode", &self.mode)
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: tracking context carried through effect execution
#[derive(Clone)]
struct EffectTracking {
    mode: TrackingMode,
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }

    /// Fresh counter for one step of a sequential effect, same mode
    fn child(&self) -> (Self, watch::Receiver<()>) {
        let (tx, rx) = watch::channel(());
        let child = Self {
            mode: self.mode,
            counter: Arc::new(AtomicUsize::new(0)),
            notifier: Arc::new(tx),
        };
        (child, rx)
    }
}

/// Internal: RAII guard that decrements the effect counter on drop, even on panic
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Internal: store-wide effect counter, notified each time it drops to zero
#[derive(Clone)]
struct IdleTracker {
    pending: Arc<AtomicUsize>,
    idle: Arc<watch::Sender<()>>,
}

impl IdleTracker {
    fn new() -> Self {
        let (idle, _) = watch::channel(());
        Self {
            pending: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(idle),
        }
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn enter(&self) -> IdleGuard {
        self.pending.fetch_add(1, Ordering::SeqCst);
        IdleGuard(self.clone())
    }

    async fn wait(&self) {
        // Subscribe before reading the counter so a drop to zero in between is seen.
        let mut idle = self.idle.subscribe();
        while self.pending() > 0 {
            if idle.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Internal: leaves the [`IdleTracker`] on drop, even on panic
struct IdleGuard(IdleTracker);

impl Drop for IdleGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.send_replace(());
        }
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, DecrementGuard, Duration, Effect, EffectHandle, EffectTracking,
        IdleTracker, Ordering, Reducer, RwLock, StoreConfig, StoreError, TrackingMode,
    };
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        effects: IdleTracker,
        /// Every action produced by an effect is published here after the reducer
        /// has applied it, so observers always see state that includes it.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + Sync + Clone + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with the default [`StoreConfig`]
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                effects: IdleTracker::new(),
                action_broadcast,
            }
        }

        /// The injected environment
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// The configuration this store was built with
        pub const fn config(&self) -> StoreConfig {
            self.config
        }

        /// Number of effects currently running, across all handles
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.effects.pending()
        }

        /// Waits until no effect is running, including feedback started by
        /// effects that finished meanwhile
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Timeout`] if effects are still running after `timeout`.
        pub async fn wait_idle(&self, timeout: Duration) -> Result<(), StoreError> {
            tokio::time::timeout(timeout, self.effects.wait())
                .await
                .map_err(|_| StoreError::Timeout)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Rejects new actions, then waits for pending effects to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            if self.wait_idle(timeout).await.is_ok() {
                tracing::info!("All effects completed, shutdown successful");
                return Ok(());
            }
            let pending = self.effects.pending();
            tracing::error!(pending_effects = pending, "Shutdown timed out");
            metrics::counter!("store.shutdown.timeout").increment(1);
            Err(StoreError::ShutdownTimeout(pending))
        }

        /// Graceful shutdown with the configured timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.shutdown_timeout).await
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Starts the returned effects on tokio
        ///
        /// Returns after effects are started, not completed. The handle tracks
        /// only the immediate effects; see [`Store::send_cascading`].
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_internal(action, TrackingMode::Direct).await
        }

        /// Send an action and track its whole feedback chain
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send_cascading")]
        pub async fn send_cascading(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_internal(action, TrackingMode::Cascading).await
        }

        /// Send an action and wait for a matching result action
        ///
        /// Subscribes to the action broadcast before sending, then returns the first
        /// feedback action matching `predicate`. Use correlation ids in the
        /// predicate to tell concurrent requests apart.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action before the timeout
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to every action produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.wishlist.items.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Clone of the whole state
        pub async fn snapshot(&self) -> S
        where
            S: Clone,
        {
            self.state(Clone::clone).await
        }

        async fn send_internal(
            &self,
            action: A,
            tracking_mode: TrackingMode,
        ) -> Result<EffectHandle, StoreError> {
            let (handle, tracking) = EffectHandle::new(tracking_mode);
            self.reduce_and_execute(action, &tracking).await?;
            Ok(handle)
        }

        async fn reduce_and_execute(
            &self,
            action: A,
            tracking: &EffectTracking,
        ) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.actions.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;
                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                tracing::trace!("Reducer returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone());
            }

            Ok(())
        }

        /// Applies an action produced by an effect, then publishes it
        async fn feed_back(&self, action: A, parent: &EffectTracking) {
            let result = match parent.mode {
                TrackingMode::Direct => self
                    .send_internal(action.clone(), TrackingMode::Direct)
                    .await
                    .map(drop),
                TrackingMode::Cascading => self.reduce_and_execute(action.clone(), parent).await,
            };
            if let Err(error) = result {
                tracing::debug!(%error, "Feedback action dropped");
                return;
            }
            let _ = self.action_broadcast.send(action);
        }

        fn spawn_tracked<F>(&self, tracking: &EffectTracking, work: F)
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            tracking.increment();
            let pending_guard = self.effects.enter();
            let guard = DecrementGuard(tracking.clone());

            tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;
                work.await;
            });
        }

        /// Execute an effect with tracking
        ///
        /// Effect tasks that panic are contained by tokio; the guards keep the
        /// counters consistent.
        #[allow(clippy::needless_pass_by_value)]
        #[tracing::instrument(skip(self, effect, tracking), name = "execute_effect")]
        fn execute_effect_internal(&self, effect: Effect<A>, tracking: EffectTracking) {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let store = self.clone();
                    let parent = tracking.clone();
                    self.spawn_tracked(&tracking, async move {
                        if let Some(action) = fut.await {
                            store.feed_back(action, &parent).await;
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let store = self.clone();
                    let parent = tracking.clone();
                    self.spawn_tracked(&tracking, async move {
                        tokio::time::sleep(duration).await;
                        store.feed_back(*action, &parent).await;
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect_internal(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    let store = self.clone();
                    let parent = tracking.clone();
                    self.spawn_tracked(&tracking, async move {
                        for effect in effects {
                            let (step, mut done) = parent.child();
                            store.execute_effect_internal(effect, step.clone());
                            while step.counter.load(Ordering::SeqCst) > 0 {
                                if done.changed().await.is_err() {
                                    break;
                                }
                            }
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                config: self.config,
                shutdown: Arc::clone(&self.shutdown),
                effects: self.effects.clone(),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use tourbook_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Increment,
        Produce,
        Chain(u32),
        Delayed,
        Sequence,
    }

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut TestState,
            action: TestAction,
            _env: &(),
        ) -> SmallVec<[Effect<TestAction>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Produce => smallvec![Effect::future(async {
                    Some(TestAction::Increment)
                })],
                TestAction::Chain(0) => smallvec![Effect::None],
                TestAction::Chain(n) => {
                    state.value += 1;
                    smallvec![Effect::future(async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Some(TestAction::Chain(n - 1))
                    })]
                },
                TestAction::Delayed => smallvec![Effect::Delay {
                    duration: Duration::from_millis(10),
                    action: Box::new(TestAction::Increment),
                }],
                TestAction::Sequence => smallvec![Effect::chain(vec![
                    Effect::future(async { Some(TestAction::Increment) }),
                    Effect::future(async { Some(TestAction::Increment) }),
                ])],
            }
        }
    }

    fn store() -> Store<TestState, TestAction, (), TestReducer> {
        Store::new(TestState::default(), TestReducer, ())
    }

    #[tokio::test]
    async fn send_applies_reducer() {
        let store = store();
        let _ = store.send(TestAction::Increment).await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn future_effect_feeds_back() {
        let store = store();
        let mut handle = store.send(TestAction::Produce).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn delay_effect_fires_later() {
        let store = store();
        let mut handle = store.send(TestAction::Delayed).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 0);
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn cascading_handle_waits_for_whole_chain() {
        let store = store();
        let mut handle = store.send_cascading(TestAction::Chain(4)).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 4);
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn sequential_effects_run_in_order() {
        let store = store();
        let mut handle = store.send_cascading(TestAction::Sequence).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 2);
    }

    #[tokio::test]
    async fn send_and_wait_for_sees_applied_state() {
        let store = store();
        let action = store
            .send_and_wait_for(
                TestAction::Produce,
                |a| *a == TestAction::Increment,
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(action, TestAction::Increment);
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn send_and_wait_for_times_out() {
        let store = store();
        let result = store
            .send_and_wait_for(TestAction::Increment, |_| true, Duration::from_millis(20))
            .await;
        assert_eq!(result.unwrap_err(), StoreError::Timeout);
    }

    #[tokio::test]
    async fn wait_idle_covers_feedback_of_direct_sends() {
        let store = store();
        let _ = store.send(TestAction::Chain(4)).await.unwrap();

        store.wait_idle(Duration::from_secs(1)).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 4);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn wait_idle_times_out_while_effects_run() {
        let store = store();
        let _ = store.send(TestAction::Chain(50)).await.unwrap();

        let result = store.wait_idle(Duration::from_millis(10)).await;

        assert_eq!(result.unwrap_err(), StoreError::Timeout);
        assert!(store.pending_effects() > 0);
    }

    #[tokio::test]
    async fn wait_idle_returns_at_once_without_effects() {
        let store = store();
        store.wait_idle(Duration::from_millis(1)).await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = store();
        store.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            store.send(TestAction::Increment).await.unwrap_err(),
            StoreError::ShutdownInProgress
        );
    }

    #[test]
    fn config_clamps_capacity() {
        let config = StoreConfig::default().with_broadcast_capacity(0);
        assert_eq!(config.broadcast_capacity, 1);
    }
}
