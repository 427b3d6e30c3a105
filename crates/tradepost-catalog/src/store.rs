// In-memory product store.
// The store exists to exercise identity flow through the service; it is not
// a persistence layer.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Subject (email) of the listing seller.
    pub owner: String,
}

#[derive(Clone, Default)]
pub struct ProductStore {
    products: Arc<RwLock<HashMap<String, Product>>>,
}

impl ProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<Product> {
        self.products.read().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Product> {
        self.products.read().get(id).cloned()
    }

    pub fn create(&self, name: String, description: String, price: f64, owner: String) -> Product {
        let product = Product {
            id: Uuid::now_v7().to_string(),
            name,
            description,
            price,
            owner,
        };
        self.products
            .write()
            .insert(product.id.clone(), product.clone());
        product
    }

    pub fn update(
        &self,
        id: &str,
        name: String,
        description: String,
        price: f64,
    ) -> Option<Product> {
        let mut products = self.products.write();
        let product = products.get_mut(id)?;
        product.name = name;
        product.description = description;
        product.price = price;
        Some(product.clone())
    }

    pub fn delete(&self, id: &str) -> bool {
        self.products.write().remove(id).is_some()
    }

    pub fn list_by_owner(&self, owner: &str) -> Vec<Product> {
        self.products
            .read()
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect()
    }

    /// Remove every listing of an owner; returns how many were removed.
    /// Backs the user-deletion workflow.
    pub fn delete_by_owner(&self, owner: &str) -> usize {
        let mut products = self.products.write();
        let before = products.len();
        products.retain(|_, p| p.owner != owner);
        before - products.len()
    }
}
