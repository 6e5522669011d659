//! Error types shared by every operation of the crate.

use aws_sdk_dynamodb::{error, operation};
use std::fmt;
use thiserror::Error;

/// Result alias defaulting to the crate [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while compiling expressions or dispatching requests.
#[derive(Debug, Error)]
pub enum Error {
    /// A value could not be converted into a DynamoDB attribute value.
    #[error(transparent)]
    Serialization(#[from] serde_dynamo::Error),

    /// A request builder rejected its input.
    #[error(transparent)]
    Build(#[from] error::BuildError),

    /// The update parameters violate one of the update validation rules.
    #[error("malformed update parameters: {0}")]
    MalformedUpdate(MalformedUpdate),

    /// A set operation received a value that is not a homogeneous list of
    /// strings, numbers or binaries.
    #[error("set values must be a non-empty list of strings, numbers or binaries")]
    InvalidSet,

    /// Two conditions of the same expression bind different values to one placeholder.
    #[error("value placeholder `{0}` is bound to more than one value")]
    PlaceholderCollision(String),

    /// A condition-check transaction item carries no condition.
    #[error("condition check transaction items require at least one condition")]
    EmptyConditionCheck,

    /// A transaction exceeds the protocol limit of transactional items.
    #[error("transactions accept at most {max} items, got {actual}")]
    TooManyTransactionItems {
        /// The protocol limit.
        max: usize,
        /// The number of items received.
        actual: usize,
    },

    /// A batched get exhausted its retry budget with keys still unprocessed.
    #[error("batch get on `{table}` timed out with {remaining} unprocessed keys")]
    UnprocessedKeysTimeout {
        /// The table being read.
        table: String,
        /// The number of keys DynamoDB never served.
        remaining: usize,
    },

    /// The BatchGetItem call failed.
    #[error(transparent)]
    BatchGetItem(#[from] error::SdkError<operation::batch_get_item::BatchGetItemError>),

    /// The TransactWriteItems call failed.
    #[error(transparent)]
    TransactWriteItems(
        #[from] error::SdkError<operation::transact_write_items::TransactWriteItemsError>,
    ),

    /// The UpdateItem call failed.
    #[error(transparent)]
    UpdateItem(#[from] error::SdkError<operation::update_item::UpdateItemError>),
}

/// The update rule that was violated.
///
/// Every reason surfaces through the same [`Error::MalformedUpdate`] variant, so
/// callers matching on "malformed update" keep working while the reason stays
/// available for diagnostics.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MalformedUpdate {
    /// The key record does not hold one or two attributes.
    KeyAttributeCount(usize),
    /// A key attribute is also mutated by the update.
    KeyPropertyMutated(String),
    /// A property is mutated by more than one of values, remove and atomic operations.
    OverlappingMutation(String),
    /// Values, remove and atomic operations are all empty.
    EmptyUpdate,
    /// More than one condition targets the same property.
    RepeatedConditionProperty(String),
}

impl fmt::Display for MalformedUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyAttributeCount(count) => {
                write!(f, "key must have 1 or 2 attributes, got {count}")
            }
            Self::KeyPropertyMutated(property) => {
                write!(f, "key attribute `{property}` cannot be updated")
            }
            Self::OverlappingMutation(property) => {
                write!(f, "`{property}` is mutated more than once")
            }
            Self::EmptyUpdate => f.write_str("nothing to update"),
            Self::RepeatedConditionProperty(property) => {
                write!(f, "`{property}` is the target of more than one condition")
            }
        }
    }
}

impl From<MalformedUpdate> for Error {
    fn from(reason: MalformedUpdate) -> Self {
        Self::MalformedUpdate(reason)
    }
}
