//! Payload types for the todoable API.
//!
//! # Design
//! The service wraps write payloads in a resource key (`{"list": {...}}`,
//! `{"item": {...}}`) and list collections in `{"lists": [...]}`. Those
//! envelopes are private; callers only see `List`, `Item`, `NewList` and
//! `NewItem`.
//!
//! Ids are opaque strings. `GET /lists/{id}` omits the list's own id and
//! items never carry their `list_id`, so both fields default to empty and
//! the client fills them in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct List {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Only populated by `get_list`; the collection endpoint omits items.
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default)]
    pub list_id: String,
}

/// Request payload for creating or renaming a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewList {
    pub name: String,
}

impl NewList {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Request payload for creating an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
}

impl NewItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Serialize)]
pub(crate) struct ListEnvelope<'a> {
    pub list: &'a NewList,
}

#[derive(Serialize)]
pub(crate) struct ItemEnvelope<'a> {
    pub item: &'a NewItem,
}

#[derive(Deserialize)]
pub(crate) struct ListCollection {
    #[serde(default)]
    pub lists: Vec<List>,
}
