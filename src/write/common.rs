use crate::common::{self, condition, placeholder::Placeholders};
use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use std::collections;

/// Prefix namespacing the placeholders of write conditions.
///
/// Keeps condition values apart from update values bound to the same attribute,
/// e.g. an optimistic lock that checks and sets `version` in one call.
pub const CONDITION_PREFIX: &str = "__condition_";

/// Compile write conditions under [`CONDITION_PREFIX`]; `None` when there are none.
pub(crate) fn compile_write_conditions<T: Serialize>(
    conditions: Vec<condition::JoinedCondition<T>>,
) -> Result<Option<common::CompiledExpression>> {
    let compiled =
        condition::compile_conditions(conditions, &Placeholders::new(CONDITION_PREFIX))?;
    Ok((!compiled.is_empty()).then_some(compiled))
}

/// Internal representation of write operation parameters.
///
/// Holds the resolved condition expression and placeholder maps, ready for the
/// DynamoDB request builders.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values:
        Option<collections::HashMap<String, types::AttributeValue>>,
    pub(crate) return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    pub(crate) return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    pub(crate) return_values: Option<types::ReturnValue>,
    pub(crate) return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    pub(crate) table_name: String,
}

impl WriteInput {
    /// Merge an expression into this write operation, returning its text.
    pub(crate) fn merge_expression(&mut self, operation: common::CompiledExpression) -> String {
        operation.merge_into(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
        )
    }
}

/// Arguments common to write operations.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteArgs<T> {
    /// Conditions that must hold for the write to succeed.
    ///
    /// Compiled into the condition expression; an empty list means no condition.
    pub conditions: Vec<condition::JoinedCondition<T>>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to return item collection metrics.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    /// Which item attributes to return in the response.
    pub return_values: Option<types::ReturnValue>,
    /// Which item attributes to return if a condition check fails.
    pub return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    /// The name of the table to write to.
    pub table_name: String,
}

impl<T> Default for WriteArgs<T> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            return_consumed_capacity: None,
            return_item_collection_metrics: None,
            return_values: None,
            return_values_on_condition_check_failure: None,
            table_name: String::new(),
        }
    }
}

impl<T: Serialize> TryFrom<WriteArgs<T>> for WriteInput {
    type Error = Error;

    fn try_from(write_args: WriteArgs<T>) -> Result<Self> {
        let mut operation = Self {
            return_consumed_capacity: write_args.return_consumed_capacity,
            return_item_collection_metrics: write_args.return_item_collection_metrics,
            return_values: write_args.return_values,
            return_values_on_condition_check_failure: write_args
                .return_values_on_condition_check_failure,
            table_name: write_args.table_name,
            ..Default::default()
        };
        if let Some(condition) = compile_write_conditions(write_args.conditions)? {
            operation.condition_expression = Some(operation.merge_expression(condition));
        }
        Ok(operation)
    }
}
