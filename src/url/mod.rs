//! URL handling module for Attendee-Harvest
//!
//! This module provides URL normalization, the canonical identifier types
//! for parents (events) and children (profiles), and listing locator
//! templates used to address individual result pages.

mod normalize;
mod template;

use crate::UrlResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

pub use normalize::normalize_url;
pub use template::{ListingTemplate, PageLocator};

/// An identifier with a canonical, normalized string form
///
/// Two raw URLs denote the same unit exactly when their canonical forms are
/// equal, so implementors are safe to use as set and map keys across runs.
pub trait CanonicalId: Clone + Eq + Hash + fmt::Display {
    /// Parses and normalizes a raw URL into an identifier
    fn parse(raw: &str) -> UrlResult<Self>;

    /// Returns the canonical string form
    fn as_str(&self) -> &str;
}

macro_rules! canonical_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parses and normalizes a raw URL
            pub fn parse(raw: &str) -> UrlResult<Self> {
                normalize_url(raw).map(|url| Self(url.into()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl CanonicalId for $name {
            fn parse(raw: &str) -> UrlResult<Self> {
                $name::parse(raw)
            }

            fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

canonical_id!(
    /// Canonical identifier of a parent unit (an event page URL)
    ParentId
);

canonical_id!(
    /// Canonical identifier of a child result (an attendee profile URL)
    ChildId
);

impl ParentId {
    /// Returns the key used to address this unit's attendee listing
    ///
    /// This is the last path segment of the event URL, e.g. `7123` for
    /// `https://www.example.com/events/7123`. Returns None for a root URL.
    pub fn unit_key(&self) -> Option<&str> {
        let without_scheme = self.0.split_once("://").map(|(_, rest)| rest)?;
        let (_, path) = without_scheme.split_once('/')?;
        path.rsplit('/').find(|segment| !segment.is_empty())
    }
}
