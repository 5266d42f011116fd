//! Animation targets
//!
//! Animations write named numeric fields onto arbitrary objects through the
//! [`Animatable`] accessor. The engine only ever holds weak references to its
//! targets: a target that has been dropped is skipped.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// An object exposing named numeric fields to animations
pub trait Animatable {
    /// Current value of a numeric field
    ///
    /// Returns `None` when the field is absent or not numeric. Such fields are
    /// skipped by every animation targeting this object.
    fn get_property(&self, name: &str) -> Option<f64>;

    /// Write a numeric field
    fn set_property(&mut self, name: &str, value: f64);
}

/// Shared, caller-owned animation target
pub type SharedTarget = Rc<RefCell<dyn Animatable>>;

/// Non-owning reference to an animation target
#[derive(Clone)]
pub struct TargetRef(Weak<RefCell<dyn Animatable>>);

impl TargetRef {
    /// Create a reference without taking ownership of the target
    pub fn new<T: Animatable + 'static>(target: &Rc<RefCell<T>>) -> Self {
        let shared: SharedTarget = target.clone();
        Self(Rc::downgrade(&shared))
    }

    /// Create a reference from an already type-erased target
    pub fn from_shared(target: &SharedTarget) -> Self {
        Self(Rc::downgrade(target))
    }

    /// Read a field, or `None` if the field is not numeric or the target is gone
    pub fn get(&self, name: &str) -> Option<f64> {
        let target = self.0.upgrade()?;
        let value = target.borrow().get_property(name);
        value
    }

    /// Write a field. Returns `false` if the target is gone.
    pub fn set(&self, name: &str, value: f64) -> bool {
        match self.0.upgrade() {
            Some(target) => {
                target.borrow_mut().set_property(name, value);
                true
            }
            None => false,
        }
    }

    /// Whether the target is still alive
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Upgrade to a strong reference for the duration of a callback
    pub fn upgrade(&self) -> Option<SharedTarget> {
        self.0.upgrade()
    }
}

impl std::fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetRef")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Conversion into a list of animation targets
///
/// Implemented for single targets and for slices and vectors of targets, so
/// `Timeline::add` accepts either.
pub trait IntoTargets {
    fn into_targets(self) -> Vec<TargetRef>;
}

impl<T: Animatable + 'static> IntoTargets for &Rc<RefCell<T>> {
    fn into_targets(self) -> Vec<TargetRef> {
        vec![TargetRef::new(self)]
    }
}

impl<T: Animatable + 'static> IntoTargets for &[Rc<RefCell<T>>] {
    fn into_targets(self) -> Vec<TargetRef> {
        self.iter().map(TargetRef::new).collect()
    }
}

impl<T: Animatable + 'static> IntoTargets for &Vec<Rc<RefCell<T>>> {
    fn into_targets(self) -> Vec<TargetRef> {
        self.as_slice().into_targets()
    }
}

impl IntoTargets for &SharedTarget {
    fn into_targets(self) -> Vec<TargetRef> {
        vec![TargetRef::from_shared(self)]
    }
}

impl IntoTargets for &[SharedTarget] {
    fn into_targets(self) -> Vec<TargetRef> {
        self.iter().map(TargetRef::from_shared).collect()
    }
}

impl IntoTargets for TargetRef {
    fn into_targets(self) -> Vec<TargetRef> {
        vec![self]
    }
}

impl IntoTargets for Vec<TargetRef> {
    fn into_targets(self) -> Vec<TargetRef> {
        self
    }
}

/// A bag of named numeric fields
///
/// The simplest possible [`Animatable`]: every field it holds is numeric.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyBag {
    values: FxHashMap<String, f64>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a field
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Wrap the bag for use as an animation target
    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Animatable for PropertyBag {
    fn get_property(&self, name: &str) -> Option<f64> {
        self.get(name)
    }

    fn set_property(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }
}
