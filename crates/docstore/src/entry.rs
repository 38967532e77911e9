//! Storable record kinds.
//!
//! A kind becomes storable by implementing [`Entry`] on top of
//! [`Schematic`]. Most kinds embed a [`Meta`] inline so their identity is
//! queryable as `_id`:
//!
//! ```
//! use docstore::{Entry, Filter, Meta, ObjectId, Schema, Schematic};
//!
//! #[derive(Clone)]
//! struct ApiKey {
//!     meta: Meta,
//!     key: String,
//!     enabled: bool,
//! }
//!
//! impl Schematic for ApiKey {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .inline("Meta", |k: &ApiKey| &k.meta)
//!             .field("Key", |k: &ApiKey| k.key.as_str().into())
//!             .field("Enabled", |k: &ApiKey| k.enabled.into())
//!     }
//! }
//!
//! impl Entry for ApiKey {
//!     const COLLECTION: &'static str = "api_keys";
//!
//!     fn id(&self) -> ObjectId {
//!         self.meta.id
//!     }
//!
//!     fn default_filter() -> Filter {
//!         Filter::new().with("enabled", true)
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::object_id::ObjectId;
use crate::schema::{Schema, Schematic};

/// A record kind that can live in a store.
pub trait Entry: Schematic + Clone + Send + Sync {
    /// Name of the collection holding this kind. Unique per store.
    const COLLECTION: &'static str;

    /// The record's identity.
    fn id(&self) -> ObjectId;

    /// A filter AND-ed into every query of this kind.
    ///
    /// Defaults to the empty filter.
    fn default_filter() -> Filter {
        Filter::new()
    }
}

/// Identity metadata, meant to be embedded inline.
///
/// Exposes a single field, `_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Meta {
    /// The record's identity.
    #[serde(rename = "_id")]
    pub id: ObjectId,
}

impl Meta {
    /// Metadata with a freshly generated id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ObjectId::new(),
        }
    }

    /// Metadata for an existing id.
    #[must_use]
    pub const fn with_id(id: ObjectId) -> Self {
        Self { id }
    }
}

impl Schematic for Meta {
    fn schema() -> Schema<Self> {
        Schema::new()
            .field("ID", |m: &Meta| m.id.into())
            .rename("_id")
    }
}
