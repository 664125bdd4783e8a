//! Type-erased property values.
//!
//! Only values that can be deep-copied and compared structurally may be
//! tracked. Every `T: Clone + PartialEq + Debug + Send + Sync + 'static` is a
//! [`TrackedValue`]; its `Clone` must produce an independent copy. The
//! `Send + Sync` bound keeps `Rc<RefCell<_>>` out, and lock-wrapped values
//! such as `Arc<Mutex<_>>` are not `PartialEq`, so shared mutable state
//! cannot alias a snapshot.

use std::any::{self, Any};
use std::fmt;

pub trait TrackedValue: Any + fmt::Debug + Send + Sync {
    /// Deep copy of the value.
    fn clone_value(&self) -> Box<dyn TrackedValue>;

    /// Structural equality. `None` when `other` has a different type.
    fn value_eq(&self, other: &dyn TrackedValue) -> Option<bool>;

    fn type_name(&self) -> &'static str;

    fn as_any_value(&self) -> &dyn Any;

    fn into_any_value(self: Box<Self>) -> Box<dyn Any>;
}

impl<T> TrackedValue for T
where
    T: Any + Clone + PartialEq + fmt::Debug + Send + Sync,
{
    fn clone_value(&self) -> Box<dyn TrackedValue> {
        Box::new(self.clone())
    }

    fn value_eq(&self, other: &dyn TrackedValue) -> Option<bool> {
        other
            .as_any_value()
            .downcast_ref::<T>()
            .map(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn as_any_value(&self) -> &dyn Any {
        self
    }

    fn into_any_value(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// An owned copy of a tracked property's value.
pub struct PropertyValue(Box<dyn TrackedValue>);

impl PropertyValue {
    pub fn new<T: TrackedValue>(value: T) -> Self {
        Self(Box::new(value))
    }

    pub fn try_eq(&self, other: &PropertyValue) -> Option<bool> {
        (*self.0).value_eq(&*other.0)
    }

    pub fn type_name(&self) -> &'static str {
        (*self.0).type_name()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.0).as_any_value().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).as_any_value().downcast_ref::<T>()
    }

    /// Unwraps the value. `None` when it is not a `T`.
    pub fn into_inner<T: Any>(self) -> Option<T> {
        self.0.into_any_value().downcast::<T>().ok().map(|value| *value)
    }
}

impl Clone for PropertyValue {
    fn clone(&self) -> Self {
        Self((*self.0).clone_value())
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
