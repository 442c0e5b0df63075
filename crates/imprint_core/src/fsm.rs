//! State Machine Runtime
//!
//! Flat statecharts driven by typed states and events. Guards read, and
//! actions mutate, a caller-owned context passed to [`StateMachine::send`], so
//! machines hold no shared state of their own.
//!
//! Supports:
//! - Guards (conditional transitions)
//! - Entry/exit actions
//! - Transition actions

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt::Debug;
use std::hash::Hash;

/// A guard that decides whether a transition may fire
pub type Guard<C> = Box<dyn Fn(&C) -> bool + Send>;

/// An action run during a transition or on entering/leaving a state
pub type Action<C> = Box<dyn FnMut(&mut C) + Send>;

/// A transition in the state machine
pub struct Transition<S, E, C> {
    pub from_state: S,
    pub event: E,
    pub to_state: S,
    pub guard: Option<Guard<C>>,
    pub actions: SmallVec<[Action<C>; 2]>,
}

impl<S, E, C> Transition<S, E, C> {
    /// Create a transition without guard or actions
    pub fn new(from: S, event: E, to: S) -> Self {
        Self {
            from_state: from,
            event,
            to_state: to,
            guard: None,
            actions: SmallVec::new(),
        }
    }

    /// Add a guard condition
    pub fn with_guard<F: Fn(&C) -> bool + Send + 'static>(mut self, guard: F) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    /// Add an action to execute during the transition
    pub fn with_action<F: FnMut(&mut C) + Send + 'static>(mut self, action: F) -> Self {
        self.actions.push(Box::new(action));
        self
    }
}

impl<S: PartialEq, E: PartialEq, C> Transition<S, E, C> {
    fn matches(&self, state: &S, event: &E, ctx: &C) -> bool {
        self.from_state == *state
            && self.event == *event
            && self.guard.as_ref().map_or(true, |guard| guard(ctx))
    }
}

/// Builder for creating state machines
pub struct StateMachineBuilder<S, E, C> {
    initial_state: S,
    transitions: Vec<Transition<S, E, C>>,
    entry_callbacks: FxHashMap<S, Vec<Action<C>>>,
    exit_callbacks: FxHashMap<S, Vec<Action<C>>>,
}

impl<S, E, C> StateMachineBuilder<S, E, C>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Debug,
{
    pub fn new(initial_state: S) -> Self {
        Self {
            initial_state,
            transitions: Vec::new(),
            entry_callbacks: FxHashMap::default(),
            exit_callbacks: FxHashMap::default(),
        }
    }

    /// Add a transition
    pub fn transition(mut self, transition: Transition<S, E, C>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add a simple transition (from, event, to)
    pub fn on(mut self, from: S, event: E, to: S) -> Self {
        self.transitions.push(Transition::new(from, event, to));
        self
    }

    /// Add an entry action for a state
    pub fn on_enter<F: FnMut(&mut C) + Send + 'static>(mut self, state: S, action: F) -> Self {
        self.entry_callbacks
            .entry(state)
            .or_default()
            .push(Box::new(action));
        self
    }

    /// Add an exit action for a state
    pub fn on_exit<F: FnMut(&mut C) + Send + 'static>(mut self, state: S, action: F) -> Self {
        self.exit_callbacks
            .entry(state)
            .or_default()
            .push(Box::new(action));
        self
    }

    /// Build the state machine
    pub fn build(self) -> StateMachine<S, E, C> {
        StateMachine {
            current_state: self.initial_state,
            transitions: self.transitions,
            entry_callbacks: self.entry_callbacks,
            exit_callbacks: self.exit_callbacks,
            history: Vec::new(),
        }
    }
}

/// A state machine instance
pub struct StateMachine<S, E, C> {
    current_state: S,
    transitions: Vec<Transition<S, E, C>>,
    entry_callbacks: FxHashMap<S, Vec<Action<C>>>,
    exit_callbacks: FxHashMap<S, Vec<Action<C>>>,
    /// History of state transitions (for debugging)
    history: Vec<(S, E, S)>,
}

impl<S, E, C> StateMachine<S, E, C>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Debug,
{
    /// Create a builder for a state machine
    pub fn builder(initial_state: S) -> StateMachineBuilder<S, E, C> {
        StateMachineBuilder::new(initial_state)
    }

    /// Get the current state
    pub fn current_state(&self) -> S {
        self.current_state
    }

    /// Check if we're in a specific state
    pub fn is_in(&self, state: S) -> bool {
        self.current_state == state
    }

    /// Get transition history
    pub fn history(&self) -> &[(S, E, S)] {
        &self.history
    }

    /// Check if an event would trigger a transition from the current state
    pub fn can_send(&self, event: E, ctx: &C) -> bool {
        self.transitions
            .iter()
            .any(|t| t.matches(&self.current_state, &event, ctx))
    }

    /// Send an event, running exit, transition and entry actions when a
    /// transition fires. Returns the state after the event.
    pub fn send(&mut self, event: E, ctx: &mut C) -> S {
        let current = self.current_state;

        let Some(idx) = self
            .transitions
            .iter()
            .position(|t| t.matches(&current, &event, ctx))
        else {
            tracing::trace!("fsm: {:?} ignored in {:?}", event, current);
            return current;
        };

        let to_state = self.transitions[idx].to_state;

        if let Some(callbacks) = self.exit_callbacks.get_mut(&current) {
            for callback in callbacks.iter_mut() {
                callback(ctx);
            }
        }

        for action in self.transitions[idx].actions.iter_mut() {
            action(ctx);
        }

        self.current_state = to_state;
        self.history.push((current, event, to_state));
        tracing::trace!("fsm: {:?} --{:?}--> {:?}", current, event, to_state);

        if let Some(callbacks) = self.entry_callbacks.get_mut(&to_state) {
            for callback in callbacks.iter_mut() {
                callback(ctx);
            }
        }

        to_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Door {
        Closed,
        Open,
        Locked,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Cmd {
        Open,
        Close,
        Lock,
    }

    #[derive(Default)]
    struct Ctx {
        has_key: bool,
        entries: u32,
        exits: u32,
        actions: u32,
    }

    #[test]
    fn test_simple_transitions() {
        let mut ctx = Ctx::default();
        let mut fsm = StateMachine::builder(Door::Closed)
            .on(Door::Closed, Cmd::Open, Door::Open)
            .on(Door::Open, Cmd::Close, Door::Closed)
            .build();

        assert_eq!(fsm.send(Cmd::Open, &mut ctx), Door::Open);
        assert_eq!(fsm.send(Cmd::Close, &mut ctx), Door::Closed);
    }

    #[test]
    fn test_invalid_event_no_transition() {
        let mut ctx = Ctx::default();
        let mut fsm = StateMachine::builder(Door::Closed)
            .on(Door::Closed, Cmd::Open, Door::Open)
            .build();

        fsm.send(Cmd::Close, &mut ctx);
        assert!(fsm.is_in(Door::Closed));
        assert!(fsm.history().is_empty());
    }

    #[test]
    fn test_guard_reads_context() {
        let mut ctx = Ctx::default();
        let mut fsm = StateMachine::builder(Door::Closed)
            .transition(Transition::new(Door::Closed, Cmd::Lock, Door::Locked).with_guard(|c: &Ctx| c.has_key))
            .build();

        assert!(!fsm.can_send(Cmd::Lock, &ctx));
        fsm.send(Cmd::Lock, &mut ctx);
        assert!(fsm.is_in(Door::Closed));

        ctx.has_key = true;
        assert!(fsm.can_send(Cmd::Lock, &ctx));
        fsm.send(Cmd::Lock, &mut ctx);
        assert!(fsm.is_in(Door::Locked));
    }

    #[test]
    fn test_entry_exit_and_transition_actions() {
        let mut ctx = Ctx::default();
        let mut fsm = StateMachine::builder(Door::Closed)
            .transition(
                Transition::new(Door::Closed, Cmd::Open, Door::Open)
                    .with_action(|c: &mut Ctx| c.actions += 1),
            )
            .on(Door::Open, Cmd::Close, Door::Closed)
            .on_enter(Door::Open, |c: &mut Ctx| c.entries += 1)
            .on_exit(Door::Open, |c: &mut Ctx| c.exits += 1)
            .build();

        fsm.send(Cmd::Open, &mut ctx);
        assert_eq!((ctx.entries, ctx.exits, ctx.actions), (1, 0, 1));

        fsm.send(Cmd::Close, &mut ctx);
        assert_eq!((ctx.entries, ctx.exits, ctx.actions), (1, 1, 1));

        assert_eq!(
            fsm.history(),
            &[
                (Door::Closed, Cmd::Open, Door::Open),
                (Door::Open, Cmd::Close, Door::Closed)
            ]
        );
    }
}
