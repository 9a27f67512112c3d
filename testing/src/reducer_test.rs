//! Ergonomic testing utilities for reducers
//!
//! [`ReducerTest`] gives a Given-When-Then syntax over a single reducer call
//! sequence. [`settle`] drives the feedback loop without a runtime, awaiting
//! every future effect in order and reducing the actions it produces.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use tourbook_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Several `when_action` calls are reduced in order; effect assertions see the
/// effects returned by the last one.
///
/// ```ignore
/// ReducerTest::new(WishlistReducer)
///     .with_env(env)
///     .given_state(WishlistState::default())
///     .when_action(WishlistAction::Add { request, tour })
///     .then_state(|state| assert!(state.contains(&tour_id)))
///     .then_effects(assertions::assert_has_future_effect)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Queue an action (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic, clippy::expect_used)] // Test helper
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Reduces `action`, then awaits every effect and reduces what it produces,
/// depth first, until no work remains.
///
/// Returns every fed-back action in the order it was reduced. `Delay` effects
/// are resolved without sleeping.
pub async fn settle<R>(
    reducer: &R,
    state: &mut R::State,
    action: R::Action,
    env: &R::Environment,
) -> Vec<R::Action>
where
    R: Reducer,
    R::Action: Clone,
{
    let mut produced = Vec::new();
    let mut queue: Vec<Effect<R::Action>> = reducer.reduce(state, action, env).into_vec();
    queue.reverse();

    while let Some(effect) = queue.pop() {
        let next = match effect {
            Effect::None => None,
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                queue.extend(effects.into_iter().rev());
                None
            },
            Effect::Delay { action, .. } => Some(*action),
            Effect::Future(fut) => fut.await,
        };
        if let Some(next) = next {
            produced.push(next.clone());
            let mut follow_up = reducer.reduce(state, next, env).into_vec();
            follow_up.reverse();
            queue.extend(follow_up);
        }
    }

    produced
}

/// Helper assertions for effects
pub mod assertions {
    use tourbook_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect does work.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects that do work
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        let actual = effects.iter().filter(|e| !e.is_none()).count();
        assert_eq!(
            actual, expected,
            "Expected {expected} effects, but found {actual}"
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        fn has_future<A>(effect: &Effect<A>) -> bool {
            match effect {
                Effect::Future(_) => true,
                Effect::Parallel(inner) | Effect::Sequential(inner) => inner.iter().any(has_future),
                Effect::None | Effect::Delay { .. } => false,
            }
        }
        assert!(
            effects.iter().any(has_future),
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourbook_core::{SmallVec, smallvec};

    #[derive(Clone, Debug, Default)]
    struct Counter {
        count: i32,
        log: Vec<&'static str>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum CounterAction {
        Increment,
        Fetch,
        Fetched(i32),
        Noted,
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = Counter;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Counter,
            action: CounterAction,
            _env: &(),
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.count += 1;
                    smallvec![Effect::None]
                },
                CounterAction::Fetch => {
                    state.log.push("fetch");
                    smallvec![Effect::future(async { Some(CounterAction::Fetched(10)) })]
                },
                CounterAction::Fetched(n) => {
                    state.count = n;
                    state.log.push("fetched");
                    smallvec![Effect::future(async { Some(CounterAction::Noted) })]
                },
                CounterAction::Noted => {
                    state.log.push("noted");
                    smallvec![Effect::None]
                },
            }
        }
    }

    #[test]
    fn actions_reduce_in_order() {
        ReducerTest::new(CounterReducer)
            .with_env(())
            .given_state(Counter::default())
            .when_action(CounterAction::Increment)
            .when_action(CounterAction::Increment)
            .then_state(|state| assert_eq!(state.count, 2))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn future_effects_are_visible() {
        ReducerTest::new(CounterReducer)
            .with_env(())
            .given_state(Counter::default())
            .when_action(CounterAction::Fetch)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[tokio::test]
    async fn settle_follows_the_feedback_chain() {
        let mut state = Counter::default();
        let produced = settle(&CounterReducer, &mut state, CounterAction::Fetch, &()).await;

        assert_eq!(
            produced,
            vec![CounterAction::Fetched(10), CounterAction::Noted]
        );
        assert_eq!(state.count, 10);
        assert_eq!(state.log, vec!["fetch", "fetched", "noted"]);
    }
}
