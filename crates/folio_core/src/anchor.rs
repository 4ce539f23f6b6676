//! Anchor references into a document tree.
//!
//! An anchor has the form `#/<collection>/<index>` where the index is the
//! 0-based creation order inside the collection, or `#/body` for the root.
//! In JSON dumps an anchor is written as `{"$ref": "#/texts/3"}`.

use folio_common::{FolioError, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static ANCHOR_RE: OnceLock<Regex> = OnceLock::new();

fn anchor_regex() -> &'static Regex {
    ANCHOR_RE.get_or_init(|| {
        Regex::new(r"^#/(?:(?P<body>body)|(?P<collection>texts|groups|tables)/(?P<index>0|[1-9][0-9]*))$")
            .expect("anchor pattern is a valid regex")
    })
}

/// Node collection an anchor points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Texts,
    Groups,
    Tables,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Texts => "texts",
            Collection::Groups => "groups",
            Collection::Tables => "tables",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "texts" => Some(Collection::Texts),
            "groups" => Some(Collection::Groups),
            "tables" => Some(Collection::Tables),
            _ => None,
        }
    }
}

/// Stable reference to the root or to one node of a single document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Body,
    Item { collection: Collection, index: usize },
}

impl Anchor {
    pub fn item(collection: Collection, index: usize) -> Self {
        Anchor::Item { collection, index }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Body => write!(f, "#/body"),
            Anchor::Item { collection, index } => write!(f, "#/{}/{}", collection.as_str(), index),
        }
    }
}

impl FromStr for Anchor {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = anchor_regex()
            .captures(s.trim())
            .ok_or_else(|| FolioError::BadAnchor(format!("`{}` is not a valid anchor", s)))?;

        if caps.name("body").is_some() {
            return Ok(Anchor::Body);
        }

        let collection = caps
            .name("collection")
            .and_then(|m| Collection::from_name(m.as_str()))
            .ok_or_else(|| FolioError::BadAnchor(format!("`{}` names no collection", s)))?;
        let index = caps
            .name("index")
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .ok_or_else(|| FolioError::BadAnchor(format!("`{}` has an out-of-range index", s)))?;

        Ok(Anchor::Item { collection, index })
    }
}

#[derive(Serialize, Deserialize)]
struct RefItem {
    #[serde(rename = "$ref")]
    cref: String,
}

impl Serialize for Anchor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RefItem {
            cref: self.to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Anchor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let item = RefItem::deserialize(deserializer)?;
        item.cref.parse().map_err(serde::de::Error::custom)
    }
}
