//! List and Item endpoints.
//!
//! Thin wrappers over [`TodoableClient::execute`]: each builds a path and an
//! optional JSON body, then decodes the classified outcome.

use serde::Serialize;
use serde_json::Value;

use crate::client::TodoableClient;
use crate::clock::Clock;
use crate::error::ApiError;
use crate::http::{HttpMethod, Transport};
use crate::types::{Item, ItemEnvelope, List, ListCollection, ListEnvelope, NewItem, NewList};

/// Empty ids fail with `MissingId` before a path like `/lists//items/1`
/// can be built.
fn require_id<'a>(id: &'a str, resource: &'static str) -> Result<&'a str, ApiError> {
    if id.is_empty() {
        return Err(ApiError::MissingId(resource));
    }
    Ok(id)
}

pub fn list_path(id: &str) -> Result<String, ApiError> {
    Ok(format!("/lists/{}", require_id(id, "list")?))
}

pub fn items_path(list_id: &str) -> Result<String, ApiError> {
    Ok(format!("{}/items", list_path(list_id)?))
}

pub fn item_path(list_id: &str, id: &str) -> Result<String, ApiError> {
    Ok(format!("{}/{}", items_path(list_id)?, require_id(id, "item")?))
}

fn to_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::SerializationError(e.to_string()))
}

impl<T: Transport, C: Clock> TodoableClient<T, C> {
    /// `GET /lists`. Entries carry no items.
    pub fn lists(&mut self) -> Result<Vec<List>, ApiError> {
        let collection: ListCollection = self.execute(HttpMethod::Get, "/lists", None).decode()?;
        Ok(collection.lists)
    }

    pub fn first_list(&mut self) -> Result<Option<List>, ApiError> {
        Ok(self.lists()?.into_iter().next())
    }

    pub fn create_list(&mut self, input: &NewList) -> Result<List, ApiError> {
        let body = to_body(&ListEnvelope { list: input })?;
        self.execute(HttpMethod::Post, "/lists", Some(body)).decode()
    }

    /// `GET /lists/{id}`, including items. The service leaves the id out of
    /// the detail body; it is filled in here, and every item is stamped with
    /// its `list_id`.
    pub fn get_list(&mut self, id: &str) -> Result<List, ApiError> {
        let mut list: List = self.execute(HttpMethod::Get, &list_path(id)?, None).decode()?;
        if list.id.is_empty() {
            list.id = id.to_string();
        }
        for item in &mut list.items {
            item.list_id.clone_from(&list.id);
        }
        Ok(list)
    }

    /// Rename a list. Returns `None` when the service acknowledges without a
    /// JSON body.
    pub fn update_list(&mut self, id: &str, input: &NewList) -> Result<Option<List>, ApiError> {
        let body = to_body(&ListEnvelope { list: input })?;
        let Some(value) = self.execute(HttpMethod::Patch, &list_path(id)?, Some(body)).into_result()? else {
            return Ok(None);
        };
        let mut list: List =
            serde_json::from_value(value).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        if list.id.is_empty() {
            list.id = id.to_string();
        }
        Ok(Some(list))
    }

    pub fn delete_list(&mut self, id: &str) -> Result<(), ApiError> {
        self.execute(HttpMethod::Delete, &list_path(id)?, None).accepted()
    }

    pub fn create_item(&mut self, list_id: &str, input: &NewItem) -> Result<Item, ApiError> {
        let body = to_body(&ItemEnvelope { item: input })?;
        let mut item: Item = self
            .execute(HttpMethod::Post, &items_path(list_id)?, Some(body))
            .decode()?;
        item.list_id = list_id.to_string();
        Ok(item)
    }

    /// `PUT /lists/{list_id}/items/{id}/finish`. The service answers with a
    /// plain-text acknowledgement, which is accepted as success.
    pub fn finish_item(&mut self, list_id: &str, id: &str) -> Result<(), ApiError> {
        let path = format!("{}/finish", item_path(list_id, id)?);
        self.execute(HttpMethod::Put, &path, None).accepted()
    }

    pub fn delete_item(&mut self, list_id: &str, id: &str) -> Result<(), ApiError> {
        self.execute(HttpMethod::Delete, &item_path(list_id, id)?, None).accepted()
    }
}
