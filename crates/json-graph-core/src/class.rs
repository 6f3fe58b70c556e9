//! Class descriptors and the allow-list.
//!
//! A [`Class`] is the capability the decoder attaches to a generically
//! rebuilt instance. The decoder only ever instantiates classes it finds in
//! an [`AllowList`].

use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::{Instance, Value};

/// A named type: its wire tag plus the fields every instance starts with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Class {
    name: String,
    fields: Vec<String>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Declares the fields [`Class::instantiate`] pre-populates.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Factory: a fresh instance with every declared field set to
    /// `Undefined`, in declared order.
    pub fn instantiate(self: &Arc<Self>) -> Instance {
        let mut instance = Instance::new(Arc::clone(self));
        for field in &self.fields {
            instance.set(field.clone(), Value::Undefined);
        }
        instance
    }
}

/// Name-keyed set of classes the decoder may instantiate.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    classes: IndexMap<String, Arc<Class>>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class, replacing any entry with the same name.
    pub fn insert(&mut self, class: Arc<Class>) {
        self.classes.insert(class.name().to_string(), class);
    }

    /// Builder form of [`AllowList::insert`].
    pub fn with(mut self, class: Arc<Class>) -> Self {
        self.insert(class);
        self
    }

    pub fn extend(&mut self, classes: impl IntoIterator<Item = Arc<Class>>) {
        for class in classes {
            self.insert(class);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Class>> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Class>> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn clear(&mut self) {
        self.classes.clear();
    }
}

impl FromIterator<Arc<Class>> for AllowList {
    fn from_iter<T: IntoIterator<Item = Arc<Class>>>(iter: T) -> Self {
        let mut list = AllowList::new();
        list.extend(iter);
        list
    }
}
