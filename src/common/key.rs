use crate::error::Result;

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::collections;

/// Maximum number of key attributes of a DynamoDB primary key.
pub const MAX_KEY_ATTRIBUTES: usize = 2;

/// Key attributes of one item, by attribute name.
///
/// A well-formed record holds the partition key and, on tables with a composite
/// primary key, the sort key. Operations that mutate by key reject records of any
/// other size.
pub type KeyRecord<T> = IndexMap<String, T>;

/// Key component.
///
/// ```rust
/// use dynamodb_provider::common::key;
///
/// let key = key::Key {
///     name: "id".to_string(),
///     value: "1".to_string(),
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Key<T> {
    /// The attribute name of the key.
    pub name: String,
    /// The value of the key.
    pub value: T,
}

/// Primary key (partition key and optional sort key).
///
/// ```rust
/// use dynamodb_provider::common::key;
///
/// let record: key::KeyRecord<String> = key::Keys {
///     partition_key: key::Key {
///         name: "id".to_string(),
///         value: "1".to_string(),
///     },
///     ..Default::default()
/// }
/// .into();
/// assert_eq!(record.len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keys<T> {
    /// The partition key (required).
    pub partition_key: Key<T>,
    /// The sort key (optional, only for tables with composite primary keys).
    pub sort_key: Option<Key<T>>,
}

impl<T> From<Keys<T>> for KeyRecord<T> {
    fn from(keys: Keys<T>) -> Self {
        let mut record = Self::with_capacity(MAX_KEY_ATTRIBUTES);
        record.insert(keys.partition_key.name, keys.partition_key.value);
        if let Some(sort_key) = keys.sort_key {
            record.insert(sort_key.name, sort_key.value);
        }
        record
    }
}

/// Serialize a key record into the attribute map DynamoDB expects.
pub(crate) fn to_key_map<T: Serialize>(
    record: KeyRecord<T>,
) -> Result<collections::HashMap<String, types::AttributeValue>> {
    let mut key = collections::HashMap::with_capacity(record.len());
    for (name, value) in record {
        key.insert(name, to_attribute_value(value)?);
    }
    Ok(key)
}
