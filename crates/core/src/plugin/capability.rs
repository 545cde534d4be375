use std::any::Any;
use std::marker::PhantomData;

use crate::container::instance::Instance;

/// Contract every plugin returned by a [`PluginManager`](super::PluginManager) must satisfy
pub trait Capability: Send + Sync {
    /// Check if `instance` satisfies the contract
    fn accepts(&self, instance: &Instance) -> bool;

    /// Human-readable description used in `InvalidService` errors
    fn describe(&self) -> String;
}

/// Accepts instances whose concrete type is `T`
///
/// Plugins sharing a trait are usually stored boxed, e.g.
/// `InstanceOf<Box<dyn Filter>>`.
pub struct InstanceOf<T>(PhantomData<fn() -> T>);

impl<T> InstanceOf<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for InstanceOf<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any + Send + Sync> Capability for InstanceOf<T> {
    fn accepts(&self, instance: &Instance) -> bool {
        instance.is::<T>()
    }

    fn describe(&self) -> String {
        std::any::type_name::<T>().to_string()
    }
}

impl<T> std::fmt::Debug for InstanceOf<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InstanceOf<{}>", std::any::type_name::<T>())
    }
}

/// Accepts instances matching an arbitrary check
pub struct Predicate<F> {
    description: String,
    check: F,
}

impl<F> Predicate<F>
where
    F: Fn(&Instance) -> bool + Send + Sync + 'static,
{
    pub fn new(description: impl Into<String>, check: F) -> Self {
        Self {
            description: description.into(),
            check,
        }
    }
}

impl<F> Capability for Predicate<F>
where
    F: Fn(&Instance) -> bool + Send + Sync + 'static,
{
    fn accepts(&self, instance: &Instance) -> bool {
        (self.check)(instance)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

impl<F> std::fmt::Debug for Predicate<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn sides(&self) -> u8;
    }

    struct Square;

    impl Shape for Square {
        fn sides(&self) -> u8 {
            4
        }
    }

    #[test]
    fn test_instance_of_checks_concrete_type() {
        let capability = InstanceOf::<Box<dyn Shape>>::new();
        let shape: Box<dyn Shape> = Box::new(Square);
        assert_eq!(shape.sides(), 4);

        assert!(capability.accepts(&Instance::new(shape)));
        assert!(!capability.accepts(&Instance::new(Square)));
        assert!(capability.describe().contains("Shape"));
    }

    #[test]
    fn test_predicate_capability() {
        let capability = Predicate::new("a non-empty string", |instance: &Instance| {
            instance
                .downcast_ref::<String>()
                .is_some_and(|value| !value.is_empty())
        });

        assert!(capability.accepts(&Instance::new("x".to_string())));
        assert!(!capability.accepts(&Instance::new(String::new())));
        assert!(!capability.accepts(&Instance::new(4_u8)));
        assert_eq!(capability.describe(), "a non-empty string");
    }
}
