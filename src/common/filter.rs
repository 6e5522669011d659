use crate::common::{self, condition, placeholder::Placeholders};
use crate::error::Result;

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_attribute_value;

/// Prefix namespacing every filter placeholder.
///
/// Keeps filter placeholders apart from condition and update placeholders
/// compiled for the same request.
pub const FILTER_PREFIX: &str = "__filter_";

/// Filter applied to one attribute.
///
/// ```rust
/// use dynamodb_provider::common::{condition::Condition, filter::FilterValue};
///
/// // implicit equality
/// let status = FilterValue::Value(serde_json::json!("active"));
/// // implicit `in`
/// let kinds = FilterValue::Value(serde_json::json!(["a", "b"]));
/// // explicit operator
/// let age = FilterValue::Condition(Condition::BiggerThan(serde_json::json!(18)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue<T> {
    /// A bare value: lists filter with `in`, anything else with `=`.
    Value(T),
    /// An explicit condition.
    Condition(condition::Condition<T>),
}

/// Filters keyed by attribute name, compiled in insertion order.
pub type FilterMap<T> = IndexMap<String, FilterValue<T>>;

fn is_null(value: &types::AttributeValue) -> bool {
    matches!(value, types::AttributeValue::Null(_))
}

fn drop_nulls(values: Vec<types::AttributeValue>) -> Option<Vec<types::AttributeValue>> {
    let values: Vec<_> = values.into_iter().filter(|value| !is_null(value)).collect();
    (!values.is_empty()).then_some(values)
}

fn purge_condition(
    condition: condition::Condition<types::AttributeValue>,
) -> Option<condition::Condition<types::AttributeValue>> {
    use condition::Condition;

    match condition {
        Condition::In(values) => drop_nulls(values).map(Condition::In),
        Condition::NotIn(values) => drop_nulls(values).map(Condition::NotIn),
        Condition::Exists | Condition::NotExists => Some(condition),
        Condition::Between(ref low, ref high) if is_null(low) || is_null(high) => None,
        Condition::Equal(ref value)
        | Condition::NotEqual(ref value)
        | Condition::LowerThan(ref value)
        | Condition::LowerOrEqualThan(ref value)
        | Condition::BiggerThan(ref value)
        | Condition::BiggerOrEqualThan(ref value)
        | Condition::BeginsWith(ref value)
        | Condition::Contains(ref value)
        | Condition::NotContains(ref value)
            if is_null(value) =>
        {
            None
        }
        condition => Some(condition),
    }
}

/// Purge meaningless filter values, then classify what is left.
///
/// Null values, lists holding only nulls, and conditions missing their operand
/// are removed; remaining bare lists become `in` conditions and remaining bare
/// values become `=` conditions. Falsy but present values (`0`, `false`, `""`)
/// are kept.
pub fn resolve_filters<T: Serialize>(
    filters: FilterMap<T>,
) -> Result<IndexMap<String, condition::Condition<types::AttributeValue>>> {
    let mut resolved = IndexMap::with_capacity(filters.len());
    for (name, filter) in filters {
        let condition = match filter {
            FilterValue::Value(value) => match to_attribute_value::<_, types::AttributeValue>(value)? {
                types::AttributeValue::L(values) => {
                    drop_nulls(values).map(condition::Condition::In)
                }
                value if is_null(&value) => None,
                value => Some(condition::Condition::Equal(value)),
            },
            FilterValue::Condition(condition) => {
                purge_condition(condition.try_map(to_attribute_value)?)
            }
        };
        if let Some(condition) = condition {
            resolved.insert(name, condition);
        }
    }
    Ok(resolved)
}

/// Compile filters into an `and`-joined filter expression under [`FILTER_PREFIX`].
///
/// Returns `None` when every filter was purged.
///
/// ```rust
/// use dynamodb_provider::common::filter::{self, FilterMap, FilterValue};
/// use serde_json::{Value, json};
///
/// let filters = FilterMap::from([
///     ("status".to_string(), FilterValue::Value(json!("active"))),
///     ("deleted_at".to_string(), FilterValue::Value(Value::Null)),
/// ]);
/// let compiled = filter::compile_filters(filters).unwrap().unwrap();
/// assert_eq!(compiled.expression, "(#__filter_status = :__filter_status)");
/// ```
pub fn compile_filters<T: Serialize>(
    filters: FilterMap<T>,
) -> Result<Option<common::CompiledExpression>> {
    let placeholders = Placeholders::new(FILTER_PREFIX);
    let mut fragments = Vec::new();
    for (name, condition) in resolve_filters(filters)? {
        let mut fragment = condition.render(&name, &placeholders);
        fragment.expression = format!("({})", fragment.expression);
        fragments.push(fragment);
    }
    if fragments.is_empty() {
        return Ok(None);
    }
    let compiled =
        common::CompiledExpression::join(&condition::LogicalOperator::And, fragments)?;
    Ok(Some(compiled))
}
