//! Reducer composition.
//!
//! The application reducer owns one child reducer per store. [`Pullback`] runs a
//! child reducer against a field of the parent state and lifts the child's effects
//! into the parent action type, so that feedback actions are routed back through
//! the parent.
//!
//! ```
//! use tourbook_core::composition::Pullback;
//! use tourbook_core::effect::Effect;
//! use tourbook_core::reducer::Reducer;
//! use tourbook_core::{SmallVec, smallvec};
//!
//! #[derive(Default)]
//! struct Counter { value: i32 }
//!
//! enum CounterAction { Add(i32) }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = Counter;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Counter, action: CounterAction, _env: &()) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         let CounterAction::Add(n) = action;
//!         state.value += n;
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! #[derive(Default)]
//! struct App { counter: Counter }
//!
//! enum AppAction { Counter(CounterAction) }
//!
//! let counter = Pullback::new(CounterReducer, |app: &mut App| &mut app.counter, AppAction::Counter);
//! let mut app = App::default();
//! let _ = counter.run(&mut app, CounterAction::Add(2), &());
//! assert_eq!(app.counter.value, 2);
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// A child reducer focused on part of a parent state
pub struct Pullback<R: Reducer, P, PA> {
    reducer: R,
    focus: fn(&mut P) -> &mut R::State,
    embed: fn(R::Action) -> PA,
}

impl<R: Reducer + Clone, P, PA> Clone for Pullback<R, P, PA> {
    fn clone(&self) -> Self {
        Self {
            reducer: self.reducer.clone(),
            focus: self.focus,
            embed: self.embed,
        }
    }
}

impl<R, P, PA> Pullback<R, P, PA>
where
    R: Reducer,
    R::Action: Send + 'static,
    PA: Send + 'static,
{
    /// Creates a pullback from a state lens and an action constructor
    pub const fn new(reducer: R, focus: fn(&mut P) -> &mut R::State, embed: fn(R::Action) -> PA) -> Self {
        Self {
            reducer,
            focus,
            embed,
        }
    }

    /// The wrapped child reducer
    pub const fn reducer(&self) -> &R {
        &self.reducer
    }

    /// Reduces a child action against the focused state
    pub fn run(
        &self,
        parent: &mut P,
        action: R::Action,
        env: &R::Environment,
    ) -> SmallVec<[Effect<PA>; 4]> {
        let effects = self.reducer.reduce((self.focus)(parent), action, env);
        lift(effects, self.embed)
    }
}

/// Lifts a batch of child effects into the parent action type, dropping no-ops
pub fn lift<A, B>(effects: SmallVec<[Effect<A>; 4]>, embed: fn(A) -> B) -> SmallVec<[Effect<B>; 4]>
where
    A: Send + 'static,
    B: Send + 'static,
{
    effects
        .into_iter()
        .filter(|effect| !effect.is_none())
        .map(|effect| effect.map(embed))
        .collect()
}
