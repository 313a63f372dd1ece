//! Class Declarations
//!
//! A domain type becomes observable by declaring which of its operations are
//! *actions* (they mutate state, so cached values must be dropped and
//! observers told) and which are *computed properties* (derived values that
//! may be cached until the next action).
//!
//! # Declaring
//!
//! Declarations come from two places, merged per type:
//!
//! 1. The [`Model`] trait's associated constants, read the first time the
//!    type is used.
//! 2. Any number of [`instrument`] calls.
//!
//! ```rust,ignore
//! struct Counter { count: i64 }
//!
//! impl Model for Counter {
//!     const OBSERVABLE_ACTIONS: &'static [&'static str] = &["increment"];
//!     const COMPUTED_PROPERTIES: &'static [&'static str] = &["doubled"];
//! }
//!
//! // Or, equivalently, at runtime:
//! let class = instrument::<Counter>(&["increment"], &["doubled"]);
//! let counter = class.create(Counter { count: 0 });
//! ```
//!
//! Names are stored in ordered sets, so declaring the same name twice (or
//! instrumenting the same type twice) never wraps anything twice. A declared
//! name that no operation ever uses is simply never consulted.
//!
//! # Registry
//!
//! Declarations live in a process-wide registry keyed by [`TypeId`]. Every
//! instance of a type shares the same entry, so a later `instrument` call
//! also affects instances created before it.

use std::any::{type_name, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::RwLock;

use super::observable::Observable;

/// A domain type that can be wrapped in an [`Observable`].
///
/// The constants mirror a class-level declaration of which methods mutate
/// state and which getters are derived. Both default to empty; names can
/// also be added later with [`instrument`].
pub trait Model: Send + Sync + 'static {
    /// Names of operations that invalidate computed values and notify
    /// observers after running.
    const OBSERVABLE_ACTIONS: &'static [&'static str] = &[];

    /// Names of derived getters whose results are cached until the next
    /// action.
    const COMPUTED_PROPERTIES: &'static [&'static str] = &[];
}

/// The action and computed-property names declared for one type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    actions: IndexSet<&'static str>,
    computed: IndexSet<&'static str>,
}

impl Declarations {
    /// Build declarations from name lists, dropping duplicates.
    pub fn new(actions: &[&'static str], computed: &[&'static str]) -> Self {
        let mut declarations = Self::default();
        declarations.merge(actions, computed);
        declarations
    }

    /// Add names. Already-declared names are left as they are.
    ///
    /// Returns how many names were new.
    pub fn merge(&mut self, actions: &[&'static str], computed: &[&'static str]) -> usize {
        let before = self.actions.len() + self.computed.len();
        self.actions.extend(actions.iter().copied());
        self.computed.extend(computed.iter().copied());
        self.actions.len() + self.computed.len() - before
    }

    pub fn is_action(&self, name: &str) -> bool {
        self.actions.contains(name)
    }

    /// The interned name of a declared computed property, if declared.
    pub fn computed_key(&self, name: &str) -> Option<&'static str> {
        self.computed.get(name).copied()
    }

    pub fn actions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.iter().copied()
    }

    pub fn computed(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.computed.iter().copied()
    }
}

/// Registry entry for one type.
pub(crate) struct ClassEntry {
    name: &'static str,
    declarations: RwLock<Declarations>,
}

impl ClassEntry {
    pub(crate) fn is_action(&self, name: &str) -> bool {
        self.declarations.read().is_action(name)
    }

    pub(crate) fn computed_key(&self, name: &str) -> Option<&'static str> {
        self.declarations.read().computed_key(name)
    }
}

static CLASSES: OnceLock<DashMap<TypeId, Arc<ClassEntry>>> = OnceLock::new();

fn classes() -> &'static DashMap<TypeId, Arc<ClassEntry>> {
    CLASSES.get_or_init(DashMap::new)
}

/// Fetch the registry entry for `T`, creating it from `T`'s constants on
/// first use.
pub(crate) fn class_entry<T: Model>() -> Arc<ClassEntry> {
    let entry = classes().entry(TypeId::of::<T>()).or_insert_with(|| {
        tracing::debug!(class = type_name::<T>(), "registered observable class");
        Arc::new(ClassEntry {
            name: type_name::<T>(),
            declarations: RwLock::new(Declarations::new(
                T::OBSERVABLE_ACTIONS,
                T::COMPUTED_PROPERTIES,
            )),
        })
    });
    Arc::clone(entry.value())
}

/// Declare additional actions and computed properties for `T`.
///
/// Safe to call any number of times, with any names, including empty lists.
pub fn instrument<T: Model>(actions: &[&'static str], computed: &[&'static str]) -> Class<T> {
    let entry = class_entry::<T>();
    let added = entry.declarations.write().merge(actions, computed);
    tracing::debug!(class = entry.name, added, "instrumented class");
    Class {
        entry,
        _marker: PhantomData,
    }
}

/// Handle to the declarations of an observable type.
pub struct Class<T> {
    entry: Arc<ClassEntry>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Model> Class<T> {
    /// The class of `T`, with whatever has been declared so far.
    pub fn of() -> Self {
        Self {
            entry: class_entry::<T>(),
            _marker: PhantomData,
        }
    }

    /// Wrap a domain value in an observable instance of this class.
    pub fn create(&self, value: T) -> Observable<T> {
        Observable::with_class(value, Arc::clone(&self.entry))
    }

    /// The fully-qualified name of `T`.
    pub fn name(&self) -> &'static str {
        self.entry.name
    }

    /// A copy of the current declarations.
    pub fn declarations(&self) -> Declarations {
        self.entry.declarations.read().clone()
    }
}

impl<T> Clone for Class<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Class<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.entry.name)
            .field("declarations", &*self.entry.declarations.read())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Model for Plain {}

    struct Declared;
    impl Model for Declared {
        const OBSERVABLE_ACTIONS: &'static [&'static str] = &["save"];
        const COMPUTED_PROPERTIES: &'static [&'static str] = &["summary"];
    }

    struct Twice;
    impl Model for Twice {}

    #[test]
    fn declarations_drop_duplicates() {
        let mut declarations = Declarations::new(&["a", "a", "b"], &["c"]);
        assert_eq!(declarations.actions().collect::<Vec<_>>(), vec!["a", "b"]);

        assert_eq!(declarations.merge(&["b"], &["c"]), 0);
        assert_eq!(declarations.merge(&["d"], &[]), 1);
        assert!(declarations.is_action("d"));
        assert_eq!(declarations.computed_key("c"), Some("c"));
        assert_eq!(declarations.computed_key("missing"), None);
    }

    #[test]
    fn constants_seed_the_class() {
        let class = Class::<Declared>::of();
        let declarations = class.declarations();
        assert!(declarations.is_action("save"));
        assert_eq!(declarations.computed_key("summary"), Some("summary"));
        assert!(class.name().ends_with("Declared"));
    }

    #[test]
    fn empty_instrumentation_is_fine() {
        let class = instrument::<Plain>(&[], &[]);
        assert_eq!(class.declarations(), Declarations::default());
    }

    #[test]
    fn instrumenting_twice_does_not_double_declare() {
        instrument::<Twice>(&["bump"], &["total"]);
        let class = instrument::<Twice>(&["bump"], &["total"]);

        let declarations = class.declarations();
        assert_eq!(declarations.actions().count(), 1);
        assert_eq!(declarations.computed().count(), 1);
    }
}
