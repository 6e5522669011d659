//! Write operations for modifying data in DynamoDB tables.
//!
//! This module provides operations for writing data to DynamoDB:
//! - Updating items with direct values, atomic operations and removals
//! - Grouping creates, updates, deletes and condition checks into one transaction

/// Common utilities and types for write operations.
pub mod common;

/// Atomic multi-item writes.
pub mod transact_write_items;

/// Update item operation and update expression compilation.
pub mod update_item;
