//! Schema descriptions and the field maps resolved from them.
//!
//! A record kind describes its fields once, through [`Schematic::schema`]:
//!
//! ```
//! use docstore::{Schema, Schematic};
//!
//! struct Range {
//!     from: u32,
//!     to: u32,
//! }
//!
//! impl Schematic for Range {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .field("from", |r: &Range| r.from.into())
//!             .field("to", |r: &Range| r.to.into())
//!     }
//! }
//! ```
//!
//! The resolver turns that description into a [`FieldMap`], which maps each
//! external (wire) name to the accessor reaching its value. Inline
//! sub-structures are flattened into the parent's namespace; the chain of
//! inline fields crossed to reach a leaf is kept as its traversal path.
//!
//! # Naming
//!
//! A field's external name is its override when one was given with
//! [`Schema::rename`], otherwise the Rust field name with its first character
//! lowercased.
//!
//! # Caching
//!
//! Field maps are built at most once per kind per store. Each kind has its
//! own slot: the cache lock is only held to find or create the slot, and the
//! first build of one kind never blocks lookups of another. The built map is
//! immutable and handed out behind an [`Arc`].

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::error::RegistrationError;
use crate::filter::Fields;
use crate::value::{Document, Value};

/// Reads one leaf value out of a record.
pub type Accessor<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;

/// Builds a nested sub-record's accessor once its own field map is resolved.
type Deferred<T> = Box<dyn FnOnce() -> Result<Accessor<T>, RegistrationError>>;

/// A type that can describe its fields.
///
/// Kinds referring to themselves through [`Schema::nested`] and friends are
/// not supported: resolving their field map would never terminate.
pub trait Schematic: Sized + 'static {
    /// The ordered field description of this kind.
    fn schema() -> Schema<Self>;
}

enum Shape<T> {
    Leaf(Accessor<T>),
    Inline(Vec<FieldDef<T>>),
    Nested(Deferred<T>),
}

struct FieldDef<T> {
    name: &'static str,
    rename: Option<&'static str>,
    shape: Shape<T>,
}

/// Ordered description of a record kind's fields.
pub struct Schema<T> {
    fields: Vec<FieldDef<T>>,
}

impl<T: 'static> Schema<T> {
    /// Start an empty description.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a leaf field read by `get`.
    #[must_use]
    pub fn field<F>(mut self, name: &'static str, get: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.fields.push(FieldDef {
            name,
            rename: None,
            shape: Shape::Leaf(Arc::new(get)),
        });
        self
    }

    /// Override the external name of the most recently added field.
    ///
    /// Inline fields have no external name of their own; renaming one makes
    /// the field map fail to build with [`RegistrationError::InvalidFieldName`].
    #[must_use]
    pub fn rename(mut self, external: &'static str) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.rename = Some(external);
        }
        self
    }

    /// Flatten the fields of an embedded sub-structure into this kind.
    #[must_use]
    pub fn inline<S: Schematic>(mut self, name: &'static str, get: fn(&T) -> &S) -> Self {
        let children = S::schema()
            .fields
            .into_iter()
            .map(|child| lift(child, get))
            .collect();
        self.fields.push(FieldDef {
            name,
            rename: None,
            shape: Shape::Inline(children),
        });
        self
    }

    /// Expose a sub-record as a single document-valued field.
    #[must_use]
    pub fn nested<S: Schematic>(self, name: &'static str, get: fn(&T) -> &S) -> Self {
        self.deferred(name, move || {
            let map = FieldMap::<S>::build()?;
            let accessor: Accessor<T> =
                Arc::new(move |record: &T| Value::Document(map.document(get(record))));
            Ok(accessor)
        })
    }

    /// Expose an optional sub-record; `None` reads as [`Value::Null`].
    #[must_use]
    pub fn nested_option<S: Schematic>(
        self,
        name: &'static str,
        get: fn(&T) -> Option<&S>,
    ) -> Self {
        self.deferred(name, move || {
            let map = FieldMap::<S>::build()?;
            let accessor: Accessor<T> = Arc::new(move |record: &T| {
                get(record).map_or(Value::Null, |sub| Value::Document(map.document(sub)))
            });
            Ok(accessor)
        })
    }

    /// Expose a sequence of sub-records as an array of documents.
    #[must_use]
    pub fn nested_list<S: Schematic>(self, name: &'static str, get: fn(&T) -> &[S]) -> Self {
        self.deferred(name, move || {
            let map = FieldMap::<S>::build()?;
            let accessor: Accessor<T> = Arc::new(move |record: &T| {
                Value::Array(
                    get(record)
                        .iter()
                        .map(|sub| Value::Document(map.document(sub)))
                        .collect(),
                )
            });
            Ok(accessor)
        })
    }

    fn deferred<F>(mut self, name: &'static str, make: F) -> Self
    where
        F: FnOnce() -> Result<Accessor<T>, RegistrationError> + 'static,
    {
        self.fields.push(FieldDef {
            name,
            rename: None,
            shape: Shape::Nested(Box::new(make)),
        });
        self
    }
}

impl<T: 'static> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-root a sub-structure's field so it reads through the parent.
fn lift<S: 'static, T: 'static>(def: FieldDef<S>, get: fn(&T) -> &S) -> FieldDef<T> {
    let shape: Shape<T> = match def.shape {
        Shape::Leaf(inner) => Shape::Leaf(Arc::new(move |record: &T| inner(get(record)))),
        Shape::Inline(children) => {
            Shape::Inline(children.into_iter().map(|c| lift(c, get)).collect())
        }
        Shape::Nested(make) => Shape::Nested(Box::new(move || {
            let inner = make()?;
            let lifted: Accessor<T> = Arc::new(move |record: &T| inner(get(record)));
            Ok(lifted)
        })),
    };

    FieldDef {
        name: def.name,
        rename: def.rename,
        shape,
    }
}

/// The default external name: the field name with its first character lowercased.
#[must_use]
pub fn default_external_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One external name resolved to its location in a record.
pub struct ResolvedField<T> {
    path: Vec<&'static str>,
    name: &'static str,
    accessor: Accessor<T>,
}

impl<T> ResolvedField<T> {
    /// Inline fields crossed to reach this leaf, outermost first.
    #[must_use]
    pub fn path(&self) -> &[&'static str] {
        &self.path
    }

    /// The Rust field name of the leaf.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read this field's value from a record.
    pub fn get(&self, record: &T) -> Value {
        (self.accessor)(record)
    }

    fn location(&self) -> String {
        self.path
            .iter()
            .chain(std::iter::once(&self.name))
            .copied()
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Resolved mapping from external field names to accessors for one kind.
pub struct FieldMap<T> {
    kind: &'static str,
    order: Vec<String>,
    fields: HashMap<String, ResolvedField<T>>,
}

impl<T: Schematic> FieldMap<T> {
    /// Resolve the field map of `T` from its schema.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] when the schema is empty, when two
    /// fields share an external name, or when a name is invalid.
    pub fn build() -> Result<Self, RegistrationError> {
        Self::from_schema(T::schema())
    }
}

impl<T: 'static> FieldMap<T> {
    /// Resolve a field map from an explicit schema.
    ///
    /// # Errors
    ///
    /// See [`FieldMap::build`].
    pub fn from_schema(schema: Schema<T>) -> Result<Self, RegistrationError> {
        let kind = std::any::type_name::<T>();
        let mut map = Self {
            kind,
            order: Vec::new(),
            fields: HashMap::new(),
        };

        let mut path = Vec::new();
        for def in schema.fields {
            map.add(def, &mut path)?;
        }

        if map.fields.is_empty() {
            return Err(RegistrationError::EmptySchema { kind });
        }
        Ok(map)
    }

    fn add(
        &mut self,
        def: FieldDef<T>,
        path: &mut Vec<&'static str>,
    ) -> Result<(), RegistrationError> {
        match def.shape {
            Shape::Leaf(accessor) => self.insert(def.name, def.rename, path, accessor),
            Shape::Nested(make) => {
                let accessor = make()?;
                self.insert(def.name, def.rename, path, accessor)
            }
            Shape::Inline(children) => {
                if let Some(external) = def.rename {
                    return Err(RegistrationError::InvalidFieldName {
                        kind: self.kind,
                        name: external.to_string(),
                        reason: "inline fields have no external name to rename",
                    });
                }
                path.push(def.name);
                for child in children {
                    self.add(child, path)?;
                }
                path.pop();
                Ok(())
            }
        }
    }

    fn insert(
        &mut self,
        name: &'static str,
        rename: Option<&'static str>,
        path: &[&'static str],
        accessor: Accessor<T>,
    ) -> Result<(), RegistrationError> {
        let external = rename.map_or_else(|| default_external_name(name), str::to_string);

        let reason = if external.is_empty() {
            Some("names may not be empty")
        } else if external.starts_with(crate::filter::OPERATOR_PREFIX) {
            Some("names may not start with the '$' operator sentinel")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(RegistrationError::InvalidFieldName {
                kind: self.kind,
                name: external,
                reason,
            });
        }

        let field = ResolvedField {
            path: path.to_vec(),
            name,
            accessor,
        };

        if let Some(existing) = self.fields.get(&external) {
            return Err(RegistrationError::DuplicateField {
                kind: self.kind,
                name: external,
                first: existing.location(),
                second: field.location(),
            });
        }

        self.order.push(external.clone());
        self.fields.insert(external, field);
        Ok(())
    }

    /// Rust type name of the kind this map was built for.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Number of exposed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` when no field is exposed. Never true for a built map.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// External names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Look up one external name.
    #[must_use]
    pub fn get(&self, external: &str) -> Option<&ResolvedField<T>> {
        self.fields.get(external)
    }

    /// Read the value behind an external name, or `None` if it does not resolve.
    pub fn resolve(&self, record: &T, external: &str) -> Option<Value> {
        self.get(external).map(|field| field.get(record))
    }

    /// Read every exposed field into a document.
    pub fn document(&self, record: &T) -> Document {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.get(record)))
            .collect()
    }

    /// Pair this map with a record for filter evaluation.
    pub fn bind<'a>(&'a self, record: &'a T) -> BoundRecord<'a, T> {
        BoundRecord { map: self, record }
    }
}

/// A record viewed through its field map.
pub struct BoundRecord<'a, T> {
    map: &'a FieldMap<T>,
    record: &'a T,
}

impl<T: 'static> Fields for BoundRecord<'_, T> {
    fn kind(&self) -> &'static str {
        self.map.kind()
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.map.resolve(self.record, name)
    }

    fn to_value(&self) -> Value {
        Value::Document(self.map.document(self.record))
    }
}

/// Per-kind field map cache, guarded independently of the store lock.
#[derive(Default)]
pub(crate) struct FieldMapCache {
    slots: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

/// A kind's build outcome. Schemas are deterministic, so failures are kept too.
type Slot<T> = OnceLock<Result<Arc<FieldMap<T>>, RegistrationError>>;

impl FieldMapCache {
    /// Return the cached map for `T`, building it on first request.
    pub(crate) fn get_or_build<T: Schematic>(
        &self,
    ) -> Result<Arc<FieldMap<T>>, RegistrationError> {
        self.slot::<T>()
            .get_or_init(|| {
                let map = FieldMap::<T>::build()?;
                debug!(kind = map.kind(), fields = map.len(), "Built field map");
                Ok(Arc::new(map))
            })
            .clone()
    }

    fn slot<T: Schematic>(&self) -> Arc<Slot<T>> {
        let slot = Arc::clone(
            self.slots
                .lock()
                .entry(TypeId::of::<T>())
                .or_insert_with(|| Arc::new(Slot::<T>::new())),
        );
        // Slots are keyed by `TypeId`, so the downcast cannot fail.
        slot.downcast::<Slot<T>>()
            .unwrap_or_else(|_| Arc::new(Slot::<T>::new()))
    }
}
