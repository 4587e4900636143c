//! A product catalogue stored in ShelfDB.
//!
//! Products are identified by their catalogue number (`iid`); the store's own
//! identity is kept alongside but not used for lookups.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use shelfdb_core::{Collection, CoreError, Database, Record, RecordMeta};
use thiserror::Error;
use tracing::debug;

/// Collection holding the products.
pub const PRODUCTS: &str = "products";

/// A catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Identity and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Product name.
    pub name: String,
    /// Brand name.
    pub brand: String,
    /// Manufacturer.
    pub company: String,
    /// Catalogue number.
    pub iid: String,
}

impl Product {
    /// Creates an unsaved product.
    pub fn new(
        iid: impl Into<String>,
        name: impl Into<String>,
        brand: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            meta: RecordMeta::default(),
            name: name.into(),
            brand: brand.into(),
            company: company.into(),
            iid: iid.into(),
        }
    }
}

impl Record for Product {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

/// Errors returned by [`ProductRepository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Nothing matched the request.
    #[error("no data")]
    NoData,

    /// The store failed.
    #[error(transparent)]
    Store(#[from] CoreError),
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Product storage over a ShelfDB database.
#[derive(Debug)]
pub struct ProductRepository<'db> {
    products: Collection<'db, Product>,
}

impl<'db> ProductRepository<'db> {
    /// Creates a repository on `db`.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in collection name; the store's name check
    /// is propagated regardless.
    pub fn new(db: &'db Database) -> RepositoryResult<Self> {
        Ok(Self {
            products: db.collection(PRODUCTS)?,
        })
    }

    /// Stores a new product and returns it with its identity set.
    pub fn create(&self, product: &mut Product) -> RepositoryResult<Product> {
        let created = self.products.create(product)?;
        debug!(id = created.id(), iid = %created.iid, "product created");
        Ok(created)
    }

    /// Returns the products with catalogue number `iid`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NoData`] if the catalogue is empty. An
    /// unknown `iid` in a non-empty catalogue yields an empty list.
    pub fn get_by_iid(&self, iid: &str) -> RepositoryResult<Vec<Product>> {
        if self.products.count()? == 0 {
            return Err(RepositoryError::NoData);
        }
        Ok(self.products.where_eq("iid", iid)?)
    }

    /// Returns every product in insertion order.
    pub fn list(&self) -> RepositoryResult<Vec<Product>> {
        Ok(self.products.all()?)
    }

    /// Copies name, brand and company of `changes` onto the product with the
    /// same catalogue number.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NoData`] if no product has that number.
    pub fn update(&self, changes: &Product) -> RepositoryResult<Product> {
        let updated = self.products.update_where(
            |p| p.iid == changes.iid,
            |p| {
                p.name.clone_from(&changes.name);
                p.brand.clone_from(&changes.brand);
                p.company.clone_from(&changes.company);
            },
        )?;
        updated.into_iter().last().ok_or(RepositoryError::NoData)
    }

    /// Removes the products with catalogue number `iid`.
    ///
    /// Returns how many were removed; removing an unknown number is not an
    /// error.
    pub fn delete(&self, iid: &str) -> RepositoryResult<usize> {
        let removed = self.products.delete_where(|p| p.iid == iid)?;
        debug!(iid, removed, "products deleted");
        Ok(removed)
    }
}
