//! In-memory item store.
//!
//! # Responsibilities
//! - Hold items keyed by id with lock-free concurrent access
//! - Enforce name uniqueness on insert
//!
//! # Design Decisions
//! - DashMap over `Mutex<HashMap>` so reads never contend with writes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::service::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Default)]
pub struct ItemStore {
    items: Arc<DashMap<u64, Item>>,
    next_id: Arc<AtomicU64>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items, ordered by id.
    pub fn list(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.iter().map(|entry| entry.value().clone()).collect();
        items.sort_by_key(|item| item.id);
        items
    }

    pub fn insert(&self, new_item: NewItem) -> Result<Item, ServiceError> {
        if self
            .items
            .iter()
            .any(|entry| entry.value().name == new_item.name)
        {
            return Err(ServiceError::Store(
                "Item with this name already exists".to_string(),
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let item = Item {
            id,
            name: new_item.name,
            description: new_item.description,
        };
        self.items.insert(id, item.clone());
        Ok(item)
    }

    pub fn get(&self, id: u64) -> Option<Item> {
        self.items.get(&id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, id: u64) -> Option<Item> {
        self.items.remove(&id).map(|(_, item)| item)
    }
}
