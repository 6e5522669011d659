use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::to_attribute_value;

/// Convert a list of strings, numbers or binaries into the matching DynamoDB set.
///
/// Values that already are sets pass through unchanged. Empty lists and lists
/// mixing element types are rejected, since DynamoDB has no representation for
/// either.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_provider::common::set;
///
/// let tags = set::create_set(vec!["a", "b"]).unwrap();
/// assert_eq!(tags, AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]));
/// ```
pub fn create_set<T: Serialize>(values: T) -> Result<types::AttributeValue> {
    match to_attribute_value::<_, types::AttributeValue>(values)? {
        types::AttributeValue::L(items) => list_to_set(items),
        set @ (types::AttributeValue::Ss(_)
        | types::AttributeValue::Ns(_)
        | types::AttributeValue::Bs(_)) => Ok(set),
        _ => Err(Error::InvalidSet),
    }
}

fn list_to_set(items: Vec<types::AttributeValue>) -> Result<types::AttributeValue> {
    let set = match items.first() {
        Some(types::AttributeValue::S(_)) => types::AttributeValue::Ss(
            items
                .into_iter()
                .map(|item| match item {
                    types::AttributeValue::S(value) => Ok(value),
                    _ => Err(Error::InvalidSet),
                })
                .collect::<Result<_>>()?,
        ),
        Some(types::AttributeValue::N(_)) => types::AttributeValue::Ns(
            items
                .into_iter()
                .map(|item| match item {
                    types::AttributeValue::N(value) => Ok(value),
                    _ => Err(Error::InvalidSet),
                })
                .collect::<Result<_>>()?,
        ),
        Some(types::AttributeValue::B(_)) => types::AttributeValue::Bs(
            items
                .into_iter()
                .map(|item| match item {
                    types::AttributeValue::B(value) => Ok(value),
                    _ => Err(Error::InvalidSet),
                })
                .collect::<Result<_>>()?,
        ),
        _ => return Err(Error::InvalidSet),
    };
    Ok(set)
}
