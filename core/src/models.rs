//! Behavior shared by `List` and `Item`.
//!
//! Both resources have an id and a path, and can be reloaded or deleted
//! through a client. `Resource` captures that; list- and item-specific
//! operations live in inherent impls below.

use crate::client::TodoableClient;
use crate::clock::Clock;
use crate::error::ApiError;
use crate::http::{HttpMethod, Transport};
use crate::resources::{item_path, list_path};
use crate::types::{Item, List, NewList};

pub trait Resource: Sized {
    fn id(&self) -> &str;

    /// Path of this resource relative to the base URI. `MissingId` if the
    /// resource has not been saved or does not know its list.
    fn path(&self) -> Result<String, ApiError>;

    /// Fetch a fresh copy from the service.
    fn reload<T: Transport, C: Clock>(&self, client: &mut TodoableClient<T, C>) -> Result<Self, ApiError>;

    fn delete<T: Transport, C: Clock>(&self, client: &mut TodoableClient<T, C>) -> Result<(), ApiError> {
        client.execute(HttpMethod::Delete, &self.path()?, None).accepted()
    }
}

impl Resource for List {
    fn id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> Result<String, ApiError> {
        list_path(&self.id)
    }

    fn reload<T: Transport, C: Clock>(&self, client: &mut TodoableClient<T, C>) -> Result<Self, ApiError> {
        client.get_list(&self.id)
    }
}

impl Resource for Item {
    fn id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> Result<String, ApiError> {
        item_path(&self.list_id, &self.id)
    }

    /// Items have no endpoint of their own; the parent list is fetched and
    /// searched. `NotFound` if the item is gone.
    fn reload<T: Transport, C: Clock>(&self, client: &mut TodoableClient<T, C>) -> Result<Self, ApiError> {
        client
            .get_list(&self.list_id)?
            .items
            .into_iter()
            .find(|item| item.id == self.id)
            .ok_or(ApiError::NotFound)
    }
}

impl List {
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn find_item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Push the current name to the service.
    pub fn save<T: Transport, C: Clock>(&self, client: &mut TodoableClient<T, C>) -> Result<Option<List>, ApiError> {
        client.update_list(&self.id, &NewList::new(self.name.clone()))
    }
}

impl Item {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// The parent list, fetched with its items. `None` if this item was never
    /// told which list it belongs to.
    pub fn list<T: Transport, C: Clock>(&self, client: &mut TodoableClient<T, C>) -> Result<Option<List>, ApiError> {
        if self.list_id.is_empty() {
            return Ok(None);
        }
        client.get_list(&self.list_id).map(Some)
    }

    /// Mark the item finished. An item that already has `finished_at` fails
    /// with `AlreadyFinished` without touching the network.
    ///
    /// On success `finished_at` is set from the client's clock; `reload`
    /// picks up the service's own timestamp.
    pub fn finish<T: Transport, C: Clock>(&mut self, client: &mut TodoableClient<T, C>) -> Result<(), ApiError> {
        if self.is_finished() {
            return Err(ApiError::AlreadyFinished);
        }
        client.finish_item(&self.list_id, &self.id)?;
        self.finished_at = Some(client.now());
        Ok(())
    }
}
