//! Schema registry.
//!
//! Maps a stable type identifier to an erased encode/decode pair so the
//! store layer can round-trip records without knowing concrete types. The
//! registry is populated once at service construction; registering a type id
//! that is already present is a no-op, never an error.

use std::any::Any;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::StoreError;

/// A record type that can live in the store.
///
/// `TYPE_ID` is the registry key and must stay stable across releases;
/// `COLLECTION` names the store collection records of this type live in.
pub trait RecordSchema: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE_ID: &'static str;
    const COLLECTION: &'static str;
}

type ErasedRecord = Box<dyn Any + Send + Sync>;
type EncodeFn = fn(&(dyn Any + Send + Sync)) -> Result<Value, StoreError>;
type DecodeFn = fn(Value) -> Result<ErasedRecord, StoreError>;

/// Erased codec for one registered record type
struct SchemaCodec {
    collection: &'static str,
    encode: EncodeFn,
    decode: DecodeFn,
}

/// Process-wide mapping of type id -> codec
pub struct SchemaRegistry {
    codecs: DashMap<&'static str, SchemaCodec>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            codecs: DashMap::new(),
        }
    }

    /// Register a record type; returns whether it was newly registered.
    ///
    /// Idempotent: a second registration of the same type id leaves the
    /// existing codec in place and returns `false`.
    pub fn register<T: RecordSchema>(&self) -> bool {
        let mut inserted = false;
        self.codecs.entry(T::TYPE_ID).or_insert_with(|| {
            inserted = true;
            debug!(type_id = T::TYPE_ID, collection = T::COLLECTION, "registered schema");
            SchemaCodec {
                collection: T::COLLECTION,
                encode: encode_erased::<T>,
                decode: decode_erased::<T>,
            }
        });
        inserted
    }

    pub fn is_registered(&self, type_id: &str) -> bool {
        self.codecs.contains_key(type_id)
    }

    /// Collection a registered type lives in
    pub fn collection_of(&self, type_id: &str) -> Option<&'static str> {
        self.codecs.get(type_id).map(|codec| codec.collection)
    }

    /// Encode a record through its registered codec
    pub fn encode<T: RecordSchema>(&self, record: &T) -> Result<Value, StoreError> {
        let codec = self
            .codecs
            .get(T::TYPE_ID)
            .ok_or_else(|| StoreError::UnregisteredSchema(T::TYPE_ID.to_string()))?;
        (codec.encode)(record)
    }

    /// Decode a record through its registered codec
    pub fn decode<T: RecordSchema>(&self, value: Value) -> Result<T, StoreError> {
        let codec = self
            .codecs
            .get(T::TYPE_ID)
            .ok_or_else(|| StoreError::UnregisteredSchema(T::TYPE_ID.to_string()))?;
        let erased = (codec.decode)(value)?;
        erased
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| StoreError::Codec(format!("decoded value is not a {}", T::TYPE_ID)))
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_erased<T: RecordSchema>(record: &(dyn Any + Send + Sync)) -> Result<Value, StoreError> {
    let typed = record
        .downcast_ref::<T>()
        .ok_or_else(|| StoreError::Codec(format!("record is not a {}", T::TYPE_ID)))?;
    serde_json::to_value(typed).map_err(|e| StoreError::Codec(e.to_string()))
}

fn decode_erased<T: RecordSchema>(value: Value) -> Result<ErasedRecord, StoreError> {
    let typed: T = serde_json::from_value(value).map_err(|e| StoreError::Codec(e.to_string()))?;
    Ok(Box::new(typed))
}
