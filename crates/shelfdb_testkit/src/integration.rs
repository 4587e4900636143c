//! Cross-crate integration test helpers.
//!
//! Provides a harness that applies operations to a database and to an
//! in-memory model side by side, then checks that both agree.

use crate::fixtures::Toy;
use shelfdb_core::{CoreError, Database, Record};
use std::collections::BTreeMap;

/// The parts of a toy that operations other than its own update keep.
#[derive(Debug, PartialEq)]
struct Projection {
    id: String,
    created_at: String,
    name: String,
    price: i64,
    soft: bool,
}

impl Projection {
    fn of(toy: &Toy) -> Self {
        Self {
            id: toy.meta.id.clone(),
            created_at: toy.meta.created_at.to_rfc3339(),
            name: toy.name.clone(),
            price: toy.price,
            soft: toy.soft,
        }
    }
}

/// Model state of one collection.
#[derive(Debug, Default, Clone)]
struct ModelCollection {
    counter: u64,
    records: Vec<Toy>,
}

/// A test harness for integration testing.
pub struct IntegrationHarness {
    /// The database instance.
    pub db: Database,
    /// Expected state per collection.
    model: BTreeMap<String, ModelCollection>,
}

impl IntegrationHarness {
    /// Creates a new integration harness with an in-memory database.
    pub fn new() -> Self {
        Self::with_database(Database::open_in_memory().expect("Failed to open database"))
    }

    /// Creates a harness over an existing, empty database.
    pub fn with_database(db: Database) -> Self {
        Self {
            db,
            model: BTreeMap::new(),
        }
    }

    /// Creates a toy and checks the assigned identity.
    pub fn create(&mut self, collection: &str, mut toy: Toy) -> Toy {
        let created = self
            .db
            .create(collection, &mut toy)
            .expect("Failed to create toy");

        let model = self.model.entry(collection.to_string()).or_default();
        model.counter += 1;
        assert_eq!(
            created.id(),
            model.counter.to_string(),
            "Unexpected identity in {collection}"
        );
        model.records.push(created.clone());
        created
    }

    /// Replaces a collection and records the new contents.
    pub fn replace(&mut self, collection: &str, mut toys: Vec<Toy>) {
        self.db
            .replace_collection(collection, &mut toys)
            .expect("Failed to replace collection");
        self.model.entry(collection.to_string()).or_default().records = toys;
    }

    /// Deletes a record by identity through the typed collection API.
    pub fn delete(&mut self, collection: &str, id: &str) -> bool {
        let removed = self
            .db
            .collection::<Toy>(collection)
            .expect("Invalid collection name")
            .delete(id)
            .expect("Failed to delete toy");

        let expected = match self.model.get_mut(collection) {
            Some(model) => {
                let before = model.records.len();
                model.records.retain(|t| t.id() != id);
                model.records.len() != before
            }
            None => false,
        };
        assert_eq!(removed, expected, "Delete disagreed with model");
        removed
    }

    /// Checks a replace against a stale version fails and changes nothing.
    pub fn expect_conflict(&mut self, collection: &str) {
        let (_, version) = self
            .db
            .fetch_versioned(collection)
            .expect("Failed to fetch collection");
        self.create(collection, Toy::new("interloper", 0));

        let result = self
            .db
            .replace_collection_checked::<Toy>(collection, &version, &mut []);
        assert!(
            matches!(result, Err(CoreError::Conflict { .. })),
            "Stale replace was not rejected: {result:?}"
        );
    }

    /// Verifies every collection in the database matches the model.
    pub fn verify_all(&self) {
        let stored_names = self.db.collection_names().expect("Failed to list collections");
        for name in self.model.keys() {
            assert!(stored_names.contains(name), "Collection {name} missing");
        }

        for (name, model) in &self.model {
            let stored: Vec<Toy> = self.db.fetch(name).expect("Failed to fetch collection");
            let stored: Vec<Projection> = stored.iter().map(Projection::of).collect();
            let expected: Vec<Projection> = model.records.iter().map(Projection::of).collect();
            assert_eq!(stored, expected, "Collection {name} mismatch");

            let counter = self.db.counter(name).expect("Failed to read counter");
            assert_eq!(counter, model.counter, "Counter of {name} mismatch");
        }
    }

    /// Returns the number of records the model expects across collections.
    pub fn record_count(&self) -> usize {
        self.model.values().map(|m| m.records.len()).sum()
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}
