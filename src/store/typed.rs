//! Typed collection facade.
//!
//! The only path service code uses to touch records: a `TypedCollection<T>`
//! binds a [`RecordSchema`] type to its store collection and runs every read
//! and write through the registry codec.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::warn;

use super::registry::{RecordSchema, SchemaRegistry};
use super::{RecordStore, StoreError};

pub struct TypedCollection<T: RecordSchema> {
    store: Arc<dyn RecordStore>,
    registry: Arc<SchemaRegistry>,
    _record: PhantomData<fn() -> T>,
}

impl<T: RecordSchema> Clone for TypedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            _record: PhantomData,
        }
    }
}

impl<T: RecordSchema> TypedCollection<T> {
    /// Bind a typed collection, registering the schema if absent.
    pub fn new(store: Arc<dyn RecordStore>, registry: Arc<SchemaRegistry>) -> Self {
        registry.register::<T>();
        Self {
            store,
            registry,
            _record: PhantomData,
        }
    }

    /// Fetch a record by key; `None` when absent
    pub async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(T::COLLECTION, key).await? {
            Some(value) => Ok(Some(self.registry.decode::<T>(value)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a record
    pub async fn put(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let value = self.registry.encode(record)?;
        self.store.put(T::COLLECTION, key, value).await
    }

    /// Delete a record by key
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(T::COLLECTION, key).await
    }

    /// All records in the collection.
    ///
    /// Records that no longer decode (schema drift on a device that skipped
    /// releases) are logged and skipped rather than failing the whole read.
    pub async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        let values = self.store.get_all(T::COLLECTION).await?;
        let mut records = Vec::with_capacity(values.len());
        for value in values {
            match self.registry.decode::<T>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(collection = T::COLLECTION, error = %e, "skipping undecodable record");
                }
            }
        }
        Ok(records)
    }
}
