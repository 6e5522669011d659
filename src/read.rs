//! Read operations for retrieving data from DynamoDB tables.
//!
//! This module provides the batched get engine and the backoff it waits on
//! between retries of unprocessed keys.

/// Backoff between retries of unprocessed keys.
pub mod backoff;

/// Batched get of arbitrarily many keys with retries of unprocessed keys.
pub mod batch_get_item;
