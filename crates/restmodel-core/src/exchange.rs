//! The value-exchange contract and the registry of custom field kinds.
//!
//! Anything that can stand in for a field inside a container (a nested
//! model, a collection of records, an application type) implements
//! [`ValueExchange`]. Type tags that are not built-in field kinds are
//! resolved through a [`KindRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::Value;
use crate::error::Result;

/// Bulk value access shared by containers, models and iterators.
pub trait ValueExchange: fmt::Debug + Send + Sync {
    /// Current values as a single structured value.
    fn values(&self) -> Value;

    /// Replace values from a structured value.
    fn set_values(&mut self, values: Value) -> Result<()>;

    /// Validate the held values.
    fn validate(&mut self) -> bool {
        true
    }

    /// Error codes from the last validation.
    fn errors(&self) -> Vec<String> {
        Vec::new()
    }

    /// Clone behind the trait object.
    fn clone_box(&self) -> Box<dyn ValueExchange>;
}

impl Clone for Box<dyn ValueExchange> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Constructor for a custom kind.
pub type KindFactory = Arc<dyn Fn() -> Box<dyn ValueExchange> + Send + Sync>;

/// Maps extra type tags to constructors.
#[derive(Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<String, KindFactory>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a tag (case-insensitive).
    pub fn register<F>(&mut self, tag: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn ValueExchange> + Send + Sync + 'static,
    {
        self.kinds.insert(tag.to_ascii_lowercase(), Arc::new(factory));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, tag: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ValueExchange> + Send + Sync + 'static,
    {
        self.register(tag, factory);
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.kinds.contains_key(&tag.to_ascii_lowercase())
    }

    pub fn create(&self, tag: &str) -> Option<Box<dyn ValueExchange>> {
        self.kinds.get(&tag.to_ascii_lowercase()).map(|factory| factory())
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&String> = self.kinds.keys().collect();
        tags.sort();
        f.debug_struct("KindRegistry").field("tags", &tags).finish()
    }
}
