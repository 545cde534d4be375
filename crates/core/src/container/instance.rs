use std::any::Any;
use std::sync::Arc;

/// Type-erased service instance handed out by the container
///
/// Cloning an `Instance` clones the inner `Arc`, so every clone refers to the
/// same underlying object.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    /// Wrap an owned value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without re-allocating it
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Name of the concrete type stored in this instance
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether the stored value is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Get the stored value as an `Arc<T>` if the types match
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    /// Borrow the stored value as a `T` if the types match
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Check if two instances point at the same object
    pub fn ptr_eq(a: &Instance, b: &Instance) -> bool {
        Arc::ptr_eq(&a.value, &b.value)
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.type_name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Mailer {
        host: String,
    }

    #[test]
    fn test_downcast_and_type_name() {
        let instance = Instance::new(Mailer {
            host: "smtp.local".to_string(),
        });

        assert!(instance.is::<Mailer>());
        assert!(!instance.is::<String>());
        assert!(instance.type_name().ends_with("Mailer"));
        assert_eq!(instance.downcast_ref::<Mailer>().unwrap().host, "smtp.local");
        assert!(instance.downcast::<String>().is_none());
    }

    #[test]
    fn test_clones_share_the_value() {
        let instance = Instance::new(42_u32);
        let clone = instance.clone();
        let other = Instance::new(42_u32);

        assert!(Instance::ptr_eq(&instance, &clone));
        assert!(!Instance::ptr_eq(&instance, &other));
    }

    #[test]
    fn test_from_arc_keeps_allocation() {
        let shared = Arc::new(String::from("config"));
        let instance = Instance::from_arc(shared.clone());

        assert!(Arc::ptr_eq(&instance.downcast::<String>().unwrap(), &shared));
    }
}
