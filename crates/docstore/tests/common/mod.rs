//! Record kinds and helpers shared across integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use docstore::{Entry, Filter, Meta, ObjectId, Schema, Schematic, Store};

/// A customer profile with list, optional and time fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub meta: Meta,
    pub name: String,
    pub domains: Vec<String>,
    pub aliases: Option<Vec<String>>,
    pub age: i32,
    pub active: bool,
    pub created: DateTime<Utc>,
    pub on_match: Option<OnMatch>,
}

/// Notification settings nested inside a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct OnMatch {
    pub send_mail: Vec<String>,
    pub retries: u8,
}

impl Schematic for OnMatch {
    fn schema() -> Schema<Self> {
        Schema::new()
            .field("SendMail", |o: &OnMatch| o.send_mail.as_slice().into())
            .field("Retries", |o: &OnMatch| o.retries.into())
    }
}

impl Schematic for Profile {
    fn schema() -> Schema<Self> {
        Schema::new()
            .inline("Meta", |p: &Profile| &p.meta)
            .field("Name", |p: &Profile| p.name.as_str().into())
            .field("Domains", |p: &Profile| p.domains.as_slice().into())
            .field("Aliases", |p: &Profile| p.aliases.clone().into())
            .field("Age", |p: &Profile| p.age.into())
            .field("Active", |p: &Profile| p.active.into())
            .field("Created", |p: &Profile| p.created.into())
            .rename("createdAt")
            .nested_option("OnMatch", |p: &Profile| p.on_match.as_ref())
    }
}

impl Entry for Profile {
    const COLLECTION: &'static str = "profiles";

    fn id(&self) -> ObjectId {
        self.meta.id
    }
}

/// A numeric postal code range.
#[derive(Debug, Clone, PartialEq)]
pub struct ZipRange {
    pub meta: Meta,
    pub from: u32,
    pub to: u32,
}

impl Schematic for ZipRange {
    fn schema() -> Schema<Self> {
        Schema::new()
            .inline("Meta", |z: &ZipRange| &z.meta)
            .field("From", |z: &ZipRange| z.from.into())
            .field("To", |z: &ZipRange| z.to.into())
    }
}

impl Entry for ZipRange {
    const COLLECTION: &'static str = "zip_ranges";

    fn id(&self) -> ObjectId {
        self.meta.id
    }
}

/// A credential whose disabled records are invisible to queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiKey {
    pub meta: Meta,
    pub key: String,
    pub enabled: bool,
}

impl Schematic for ApiKey {
    fn schema() -> Schema<Self> {
        Schema::new()
            .inline("Meta", |k: &ApiKey| &k.meta)
            .field("Key", |k: &ApiKey| k.key.as_str().into())
            .field("Enabled", |k: &ApiKey| k.enabled.into())
    }
}

impl Entry for ApiKey {
    const COLLECTION: &'static str = "api_keys";

    fn id(&self) -> ObjectId {
        self.meta.id
    }

    fn default_filter() -> Filter {
        Filter::new().with("enabled", true)
    }
}

/// Ownership details embedded inline in [`Site`].
#[derive(Debug, Clone, PartialEq)]
pub struct Ownership {
    pub domain: String,
    pub verified: bool,
}

impl Schematic for Ownership {
    fn schema() -> Schema<Self> {
        Schema::new()
            .field("Domain", |o: &Ownership| o.domain.as_str().into())
            .field("Verified", |o: &Ownership| o.verified.into())
    }
}

/// A site whose ownership fields are flattened to the top level.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub meta: Meta,
    pub title: String,
    pub ownership: Ownership,
}

impl Schematic for Site {
    fn schema() -> Schema<Self> {
        Schema::new()
            .inline("Meta", |s: &Site| &s.meta)
            .field("Title", |s: &Site| s.title.as_str().into())
            .inline("Ownership", |s: &Site| &s.ownership)
    }
}

impl Entry for Site {
    const COLLECTION: &'static str = "sites";

    fn id(&self) -> ObjectId {
        self.meta.id
    }
}

/// A fixed instant, `2021-06-01T00:00:00Z` plus `days`.
pub fn day(days: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap() + chrono::Duration::days(days)
}

pub fn profile(name: &str, domains: &[&str]) -> Profile {
    Profile {
        meta: Meta::new(),
        name: name.to_string(),
        domains: domains.iter().map(ToString::to_string).collect(),
        aliases: None,
        age: 30,
        active: true,
        created: day(0),
        on_match: None,
    }
}

pub fn zip_range(from: u32, to: u32) -> ZipRange {
    ZipRange {
        meta: Meta::new(),
        from,
        to,
    }
}

pub fn api_key(key: &str, enabled: bool) -> ApiKey {
    ApiKey {
        meta: Meta::new(),
        key: key.to_string(),
        enabled,
    }
}

pub fn site(title: &str, domain: &str) -> Site {
    Site {
        meta: Meta::new(),
        title: title.to_string(),
        ownership: Ownership {
            domain: domain.to_string(),
            verified: false,
        },
    }
}

/// Parse a JSON filter literal.
pub fn filter(json: serde_json::Value) -> Filter {
    Filter::from_json(&json).unwrap()
}

/// A store with every fixture kind registered.
pub fn store() -> Store {
    let store = Store::new();
    store
        .register::<Profile>()
        .unwrap()
        .register::<ZipRange>()
        .unwrap()
        .register::<ApiKey>()
        .unwrap()
        .register::<Site>()
        .unwrap();
    store
}
