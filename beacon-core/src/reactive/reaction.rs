//! Reactions
//!
//! A reaction watches one or more instances, runs a selector after each of
//! their notifications, and calls an effect only when the selected values
//! changed since the last time the effect ran.
//!
//! # Diffing
//!
//! The comparison is deliberately shallow. The new selection is compared
//! position by position against the selection the effect last saw:
//!
//! - a position whose value differs (by `PartialEq`), or that did not exist
//!   before, counts as a change;
//! - the effect runs with the new selection, which becomes the one to
//!   compare against next time;
//! - an empty selection never runs the effect, so a selector can return
//!   nothing to mean "not interesting right now";
//! - returning the very same [`Selection`] as last time skips the diff.
//!
//! The reaction starts from an empty selection, so the first non-empty
//! selection always runs the effect.
//!
//! # Example
//!
//! ```rust,ignore
//! let disposer = reaction(
//!     vec![left.clone(), right.clone()],
//!     |counters| {
//!         let sum: i64 = counters.iter().map(|c| c.read(|c| c.count)).sum();
//!         if sum % 5 == 0 && sum != 0 { vec![Value::from(sum)] } else { vec![] }
//!     },
//!     |values| println!("sum hit {:?}", values[0]),
//! )?;
//! ```

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::disposer::Disposer;
use super::hub::Hub;
use super::observable::Observable;
use super::observe::{observe_hub, observe_hub_throttled};
use crate::error::{ReactiveError, Result};

/// The values a selector picked out, in order.
///
/// Cloning is cheap and preserves identity, which lets a selector hand back
/// a previous selection to signal "nothing changed".
pub struct Selection<V> {
    values: Arc<[V]>,
}

impl<V> Selection<V> {
    pub fn empty() -> Self {
        Self {
            values: Arc::from(Vec::new()),
        }
    }

    /// Whether `self` and `other` are the same selection instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    pub fn as_slice(&self) -> &[V] {
        &self.values
    }
}

impl<V: PartialEq> Selection<V> {
    /// Whether running the effect is warranted when moving from `previous`
    /// to `self`.
    pub fn differs_from(&self, previous: &Selection<V>) -> bool {
        self.values
            .iter()
            .enumerate()
            .any(|(i, value)| previous.values.get(i) != Some(value))
    }
}

impl<V> Clone for Selection<V> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl<V> Default for Selection<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V> Deref for Selection<V> {
    type Target = [V];

    fn deref(&self) -> &[V] {
        &self.values
    }
}

impl<V> From<Vec<V>> for Selection<V> {
    fn from(values: Vec<V>) -> Self {
        Self {
            values: Arc::from(values),
        }
    }
}

impl<V, const N: usize> From<[V; N]> for Selection<V> {
    fn from(values: [V; N]) -> Self {
        Self::from(Vec::from(values))
    }
}

impl<V: fmt::Debug> fmt::Debug for Selection<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

/// A selected value of mixed kind.
///
/// Primitives compare by value; [`Value::Ref`] compares by identity, the way
/// two handles to the same object compare equal and two equal-looking
/// objects do not. Like any float comparison, `NaN` never equals itself.
///
/// A `Ref` owns a handle to its object. The selection a reaction remembers
/// therefore keeps the previous object alive, and a new object can never
/// reuse its address and pass for it.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Ref(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// An identity value for the object behind `value`.
    pub fn by_ref<T: Any + Send + Sync>(value: &Arc<T>) -> Self {
        Value::Ref(Arc::clone(value) as Arc<dyn Any + Send + Sync>)
    }

    /// The referenced object, if this is a `Ref` to a `T`.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Value::Ref(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Something a reaction can watch: one observable or a group of them.
///
/// The selector receives the targets exactly as they were passed in.
pub trait ReactionTargets: Send + Sync + 'static {
    /// The hubs to observe, in order.
    fn hubs(&self) -> SmallVec<[Arc<Hub>; 2]>;
}

impl<T: Send + Sync + 'static> ReactionTargets for Observable<T> {
    fn hubs(&self) -> SmallVec<[Arc<Hub>; 2]> {
        smallvec::smallvec![Arc::clone(self.hub())]
    }
}

impl<T: Send + Sync + 'static> ReactionTargets for Vec<Observable<T>> {
    fn hubs(&self) -> SmallVec<[Arc<Hub>; 2]> {
        self.iter().map(|target| Arc::clone(target.hub())).collect()
    }
}

impl<T: Send + Sync + 'static, const N: usize> ReactionTargets for [Observable<T>; N] {
    fn hubs(&self) -> SmallVec<[Arc<Hub>; 2]> {
        self.iter().map(|target| Arc::clone(target.hub())).collect()
    }
}

impl<A, B> ReactionTargets for (Observable<A>, Observable<B>)
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
{
    fn hubs(&self) -> SmallVec<[Arc<Hub>; 2]> {
        smallvec::smallvec![Arc::clone(self.0.hub()), Arc::clone(self.1.hub())]
    }
}

impl<A, B, C> ReactionTargets for (Observable<A>, Observable<B>, Observable<C>)
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    fn hubs(&self) -> SmallVec<[Arc<Hub>; 2]> {
        smallvec::smallvec![
            Arc::clone(self.0.hub()),
            Arc::clone(self.1.hub()),
            Arc::clone(self.2.hub()),
        ]
    }
}

/// Run `effect` whenever the values `selector` picks from `targets` change.
///
/// Fails with [`ReactiveError::EmptyTargets`] if there is nothing to watch.
///
/// # Lifetime
///
/// The reaction owns `targets`, and each target's observer set owns the
/// reaction. Dropping the returned [`Disposer`] does not break that cycle:
/// until [`Disposer::dispose`] is called, the targets stay alive even after
/// every other handle to them is gone.
pub fn reaction<S, V, Sel, Eff, Out>(targets: S, selector: Sel, effect: Eff) -> Result<Disposer>
where
    S: ReactionTargets,
    V: PartialEq + Send + Sync + 'static,
    Sel: Fn(&S) -> Out + Send + Sync + 'static,
    Out: Into<Selection<V>>,
    Eff: Fn(&[V]) + Send + Sync + 'static,
{
    build(targets, selector, effect, None)
}

/// Like [`reaction`], but each target's notifications are throttled to one
/// per `interval` (see [`observe_throttled`](super::observe_throttled)).
///
/// The same lifetime rule applies: the targets live until the reaction is
/// disposed.
pub fn reaction_throttled<S, V, Sel, Eff, Out>(
    targets: S,
    selector: Sel,
    effect: Eff,
    interval: Duration,
) -> Result<Disposer>
where
    S: ReactionTargets,
    V: PartialEq + Send + Sync + 'static,
    Sel: Fn(&S) -> Out + Send + Sync + 'static,
    Out: Into<Selection<V>>,
    Eff: Fn(&[V]) + Send + Sync + 'static,
{
    build(targets, selector, effect, Some(interval))
}

type Selector<S, V> = Box<dyn Fn(&S) -> Selection<V> + Send + Sync>;
type Effect<V> = Box<dyn Fn(&[V]) + Send + Sync>;

struct Reaction<S, V> {
    targets: S,
    selector: Selector<S, V>,
    effect: Effect<V>,
    last: Mutex<Selection<V>>,
    disposed: AtomicBool,
}

impl<S, V: PartialEq> Reaction<S, V> {
    fn run(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let next = (self.selector)(&self.targets);

        let changed = {
            let mut last = self.last.lock();
            if next.same_instance(&last) || !next.differs_from(&last) {
                false
            } else {
                *last = next.clone();
                true
            }
        };

        // The selector may have disposed us, or a dispose may have raced in.
        if changed && !self.disposed.load(Ordering::SeqCst) {
            (self.effect)(next.as_slice());
        }
    }
}

fn build<S, V, Sel, Eff, Out>(
    targets: S,
    selector: Sel,
    effect: Eff,
    interval: Option<Duration>,
) -> Result<Disposer>
where
    S: ReactionTargets,
    V: PartialEq + Send + Sync + 'static,
    Sel: Fn(&S) -> Out + Send + Sync + 'static,
    Out: Into<Selection<V>>,
    Eff: Fn(&[V]) + Send + Sync + 'static,
{
    let hubs = targets.hubs();
    if hubs.is_empty() {
        return Err(ReactiveError::EmptyTargets);
    }

    let reaction = Arc::new(Reaction {
        targets,
        selector: Box::new(move |targets: &S| -> Selection<V> { selector(targets).into() }),
        effect: Box::new(effect),
        last: Mutex::new(Selection::empty()),
        disposed: AtomicBool::new(false),
    });

    let mut registrations: SmallVec<[Disposer; 2]> = SmallVec::new();
    for hub in &hubs {
        let runner = Arc::clone(&reaction);
        let listener = move || runner.run();
        let registration = match interval {
            Some(interval) => observe_hub_throttled(hub, listener, interval),
            None => Ok(observe_hub(hub, listener)),
        };
        match registration {
            Ok(registration) => registrations.push(registration),
            Err(err) => {
                Disposer::all(registrations).dispose();
                return Err(err);
            }
        }
    }
    tracing::debug!(targets = hubs.len(), throttled = interval.is_some(), "created reaction");

    let observations = Disposer::all(registrations);
    Ok(Disposer::new(move || {
        reaction.disposed.store(true, Ordering::SeqCst);
        observations.dispose();
    }))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
