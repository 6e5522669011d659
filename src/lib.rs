#![warn(missing_docs)]

//! # DynamoDB Provider
//!
//! Expression compilers and multi-request engines for Amazon DynamoDB.
//!
//! ## Overview
//!
//! This library turns structured descriptions of conditions, filters and updates into
//! DynamoDB expression strings with their placeholder maps, and runs the operations
//! that need more than one request:
//! - Conditions, filters, projections and update expressions are compiled without
//!   touching the network
//! - Updates are validated before anything is sent
//! - Batched gets are split into pages and unprocessed keys are retried with backoff
//! - Creates, updates, deletes and condition checks are grouped into one transaction
//!
//! ## Quick Example
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_provider::{common, write};
//! use indexmap::IndexMap;
//! use serde_json::{Value, json};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::from_conf(aws_sdk_dynamodb::config::Config::builder().build());
//! // Optimistic lock: bump the version only if it is still the one we read.
//! let update_item = write::update_item::UpdateItem {
//!     keys: common::key::KeyRecord::from([("id".to_string(), json!("1"))]),
//!     update: write::update_item::UpdateSpec {
//!         values: IndexMap::from([("version".to_string(), json!(4))]),
//!         atomic_operations: vec![write::update_item::AtomicOperation {
//!             property: "edits".to_string(),
//!             kind: write::update_item::AtomicOperationKind::Sum,
//!             value: json!(1),
//!         }],
//!         ..Default::default()
//!     },
//!     write_args: write::common::WriteArgs {
//!         conditions: vec![common::condition::JoinedCondition::and(
//!             common::condition::ConditionTree::leaf(
//!                 "version",
//!                 common::condition::Condition::<Value>::Equal(json!(3)),
//!             ),
//!         )],
//!         table_name: "users".to_string(),
//!         ..Default::default()
//!     },
//! };
//! // "SET #version = :version, #edits = #edits + :edits"
//! // guarded by "(#__condition_version = :__condition_version)"
//! update_item.send(&client).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@client`] - The DynamoDB calls the engines dispatch through
//! - [`mod@common`] - Placeholders, conditions, filters, keys, selections and sets
//! - [`mod@error`] - The crate error type
//! - [`mod@read`] - Batched gets and backoff
//! - [`mod@write`] - Updates and transactions

pub mod client;

/// Common building blocks for DynamoDB expressions.
pub mod common;

pub mod error;

/// Read operations for retrieving data from DynamoDB tables.
///
/// This module provides operations for:
/// - Batch retrieving arbitrarily many items
/// - Waiting between retries of unprocessed keys
pub mod read;

/// Write operations for modifying data in DynamoDB tables.
///
/// This module provides operations for:
/// - Updating items with values, atomic operations and removals
/// - Writing several items in one transaction
pub mod write;

pub use error::{Error, Result};
