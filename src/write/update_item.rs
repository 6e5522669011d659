use crate::client::DynamoClient;
use crate::common::{self, condition, key::KeyRecord, placeholder::Placeholders};
use crate::error::{MalformedUpdate, Result};
use crate::write;

use aws_sdk_dynamodb::{operation, types};
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::collections;

/// Server-side mutation applied by an [`AtomicOperation`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum AtomicOperationKind {
    /// `SET #p = #p + :p`
    #[default]
    Sum,
    /// `SET #p = #p - :p`
    Subtract,
    /// `ADD #p :p` (numbers, or sets already in set form)
    Add,
    /// `SET #p = if_not_exists(#ref, :p)`
    ///
    /// The existence check targets `ref_property`, defaulting to the updated
    /// property itself.
    SetIfNotExists {
        /// The attribute whose absence triggers the assignment.
        ref_property: Option<String>,
    },
    /// `ADD #p :p` with the value converted into a DynamoDB set.
    AddToSet,
    /// `DELETE #p :p` with the value converted into a DynamoDB set.
    RemoveFromSet,
}

/// Atomic operation on one attribute.
///
/// ```rust
/// use dynamodb_provider::write::update_item;
///
/// let increment = update_item::AtomicOperation {
///     property: "count".to_string(),
///     kind: update_item::AtomicOperationKind::Sum,
///     value: 1,
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AtomicOperation<T> {
    /// The attribute to mutate.
    pub property: String,
    /// The mutation to apply.
    pub kind: AtomicOperationKind,
    /// The operand.
    pub value: T,
}

/// The mutations of one update call.
///
/// Each attribute may be touched by only one of `values`, `remove` and
/// `atomic_operations`.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateSpec<T> {
    /// Direct assignments, rendered in insertion order.
    pub values: IndexMap<String, T>,
    /// Attributes to remove.
    pub remove: Vec<String>,
    /// Atomic operations, rendered in order within their clause.
    pub atomic_operations: Vec<AtomicOperation<T>>,
}

impl<T> Default for UpdateSpec<T> {
    fn default() -> Self {
        Self {
            values: IndexMap::new(),
            remove: Vec::new(),
            atomic_operations: Vec::new(),
        }
    }
}

impl<T> UpdateSpec<T> {
    fn mutated_properties(&self) -> impl Iterator<Item = &str> {
        self.values
            .keys()
            .map(String::as_str)
            .chain(self.remove.iter().map(String::as_str))
            .chain(
                self.atomic_operations
                    .iter()
                    .map(|operation| operation.property.as_str()),
            )
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty() && self.remove.is_empty() && self.atomic_operations.is_empty()
    }
}

/// Check the shape of an update before anything is compiled.
///
/// The key must hold one or two attributes, none of which may be mutated; every
/// attribute is mutated at most once; something must be mutated; and no two
/// conditions may target the same attribute.
pub fn validate_update<K, T, C>(
    key: &KeyRecord<K>,
    update: &UpdateSpec<T>,
    conditions: &[condition::JoinedCondition<C>],
) -> Result<()> {
    if key.is_empty() || key.len() > common::key::MAX_KEY_ATTRIBUTES {
        return Err(MalformedUpdate::KeyAttributeCount(key.len()).into());
    }
    if update.is_empty() {
        return Err(MalformedUpdate::EmptyUpdate.into());
    }
    let mut mutated = collections::HashSet::new();
    for property in update.mutated_properties() {
        if key.contains_key(property) {
            return Err(MalformedUpdate::KeyPropertyMutated(property.to_string()).into());
        }
        if !mutated.insert(property) {
            return Err(MalformedUpdate::OverlappingMutation(property.to_string()).into());
        }
    }
    let mut targeted = Vec::new();
    for joined in conditions {
        joined.node.collect_properties(&mut targeted);
    }
    let mut seen = collections::HashSet::with_capacity(targeted.len());
    for property in targeted {
        if !seen.insert(property) {
            return Err(MalformedUpdate::RepeatedConditionProperty(property.to_string()).into());
        }
    }
    Ok(())
}

/// Fragments of the four update clauses, each assembled independently.
#[derive(Debug, Default)]
struct UpdateClauses {
    set_clause: Vec<String>,
    add_clause: Vec<String>,
    delete_clause: Vec<String>,
    remove_clause: Vec<String>,
}

impl UpdateClauses {
    /// `SET`, `ADD`, `DELETE`, `REMOVE`, skipping clauses without fragments.
    fn render(self) -> String {
        [
            ("SET", self.set_clause),
            ("ADD", self.add_clause),
            ("DELETE", self.delete_clause),
            ("REMOVE", self.remove_clause),
        ]
        .into_iter()
        .filter(|(_, fragments)| !fragments.is_empty())
        .map(|(keyword, fragments)| format!("{keyword} {}", fragments.join(", ")))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Compile an update into a DynamoDB `UpdateExpression`.
///
/// Does not validate; see [`validate_update`].
///
/// ```rust
/// use dynamodb_provider::write::update_item::{self, UpdateSpec};
/// use indexmap::IndexMap;
///
/// let compiled = update_item::compile_update(UpdateSpec {
///     values: IndexMap::from([("a".to_string(), 1), ("b".to_string(), 2)]),
///     ..Default::default()
/// })
/// .unwrap();
/// assert_eq!(compiled.expression, "SET #a = :a, #b = :b");
/// ```
pub fn compile_update<T: Serialize>(update: UpdateSpec<T>) -> Result<common::CompiledExpression> {
    let placeholders = Placeholders::default();
    let mut compiled = common::CompiledExpression::default();
    let mut clauses = UpdateClauses::default();
    for (property, value) in update.values {
        let (name, value_placeholder) = bind(&mut compiled, &placeholders, &property);
        compiled.bind_value(value_placeholder.clone(), to_attribute_value(value)?)?;
        clauses.set_clause.push(format!("{name} = {value_placeholder}"));
    }
    for operation in update.atomic_operations {
        let (name, value_placeholder) = bind(&mut compiled, &placeholders, &operation.property);
        let value = match operation.kind {
            AtomicOperationKind::AddToSet | AtomicOperationKind::RemoveFromSet => {
                common::set::create_set(operation.value)?
            }
            _ => to_attribute_value(operation.value)?,
        };
        compiled.bind_value(value_placeholder.clone(), value)?;
        match operation.kind {
            AtomicOperationKind::Sum => clauses
                .set_clause
                .push(format!("{name} = {name} + {value_placeholder}")),
            AtomicOperationKind::Subtract => clauses
                .set_clause
                .push(format!("{name} = {name} - {value_placeholder}")),
            AtomicOperationKind::SetIfNotExists { ref_property } => {
                let reference = match ref_property {
                    Some(ref_property) => bind(&mut compiled, &placeholders, &ref_property).0,
                    None => name.clone(),
                };
                clauses.set_clause.push(format!(
                    "{name} = if_not_exists({reference}, {value_placeholder})"
                ));
            }
            AtomicOperationKind::Add | AtomicOperationKind::AddToSet => {
                clauses.add_clause.push(format!("{name} {value_placeholder}"))
            }
            AtomicOperationKind::RemoveFromSet => clauses
                .delete_clause
                .push(format!("{name} {value_placeholder}")),
        }
    }
    for property in update.remove {
        let name = placeholders.name(&property);
        compiled.bind_name(name.clone(), &property);
        clauses.remove_clause.push(name);
    }
    compiled.expression = clauses.render();
    Ok(compiled)
}

fn bind(
    compiled: &mut common::CompiledExpression,
    placeholders: &Placeholders<'_>,
    property: &str,
) -> (String, String) {
    let name = placeholders.name(property);
    compiled.bind_name(name.clone(), property);
    (name, placeholders.value(property))
}

/// Update item operation.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_provider::{common::key::KeyRecord, write};
/// use indexmap::IndexMap;
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let update_item = write::update_item::UpdateItem {
///     keys: KeyRecord::from([("id".to_string(), "1".to_string())]),
///     update: write::update_item::UpdateSpec {
///         values: IndexMap::from([("name".to_string(), "New".to_string())]),
///         ..Default::default()
///     },
///     write_args: write::common::WriteArgs {
///         table_name: "users".to_string(),
///         ..Default::default()
///     },
/// };
/// update_item.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateItem<T> {
    /// The primary key of the item to update.
    pub keys: KeyRecord<T>,
    /// The mutations to apply.
    pub update: UpdateSpec<T>,
    /// Table name, conditions and return settings.
    pub write_args: write::common::WriteArgs<T>,
}

/// The validated, compiled parts of an update shared by UpdateItem and transactions.
#[derive(Debug, PartialEq)]
pub(crate) struct CompiledUpdate {
    pub(crate) key: collections::HashMap<String, types::AttributeValue>,
    pub(crate) update_expression: String,
    pub(crate) write_operation: write::common::WriteInput,
}

impl<T: Serialize> TryFrom<UpdateItem<T>> for CompiledUpdate {
    type Error = crate::error::Error;

    fn try_from(update_item: UpdateItem<T>) -> Result<Self> {
        validate_update(
            &update_item.keys,
            &update_item.update,
            &update_item.write_args.conditions,
        )?;
        let key = common::key::to_key_map(update_item.keys)?;
        let mut write_operation: write::common::WriteInput = update_item.write_args.try_into()?;
        let update = compile_update(update_item.update)?;
        let update_expression = write_operation.merge_expression(update);
        Ok(Self {
            key,
            update_expression,
            write_operation,
        })
    }
}

impl<T: Serialize> TryFrom<UpdateItem<T>> for operation::update_item::UpdateItemInput {
    type Error = crate::error::Error;

    fn try_from(update_item: UpdateItem<T>) -> Result<Self> {
        let compiled: CompiledUpdate = update_item.try_into()?;
        let write_operation = compiled.write_operation;
        let input = Self::builder()
            .set_key(Some(compiled.key))
            .update_expression(compiled.update_expression)
            .set_condition_expression(write_operation.condition_expression)
            .set_expression_attribute_names(write_operation.expression_attribute_names)
            .set_expression_attribute_values(write_operation.expression_attribute_values)
            .set_return_consumed_capacity(write_operation.return_consumed_capacity)
            .set_return_item_collection_metrics(write_operation.return_item_collection_metrics)
            .set_return_values(write_operation.return_values)
            .set_return_values_on_condition_check_failure(
                write_operation.return_values_on_condition_check_failure,
            )
            .table_name(write_operation.table_name)
            .build()?;
        Ok(input)
    }
}

impl<T: Serialize> UpdateItem<T> {
    /// Validate, compile and execute the update item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_provider.update_item", skip_all, err)
    )]
    pub async fn send<C>(self, client: &C) -> Result<operation::update_item::UpdateItemOutput>
    where
        C: DynamoClient + ?Sized,
    {
        let input: operation::update_item::UpdateItemInput = self.try_into()?;
        client.update_item(input).await
    }
}
