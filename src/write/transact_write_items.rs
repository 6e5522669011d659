use crate::client::DynamoClient;
use crate::common::{self, condition, key::KeyRecord};
use crate::error::{Error, Result};
use crate::write::{self, update_item};

use aws_sdk_dynamodb::{operation, types};
use serde::Serialize;
use serde_dynamo::to_item;
use std::collections;

/// Maximum number of items DynamoDB accepts in one transaction.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// One write of a transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactionItem<T> {
    /// Put a whole item.
    Create {
        /// The table to write to.
        table_name: String,
        /// The item to put.
        item: T,
        /// Conditions the existing item must satisfy.
        conditions: Vec<condition::JoinedCondition<T>>,
    },
    /// Update an item, validated like a standalone update.
    Update(update_item::UpdateItem<T>),
    /// Delete an item.
    Erase {
        /// The table to delete from.
        table_name: String,
        /// The key of the item to delete.
        key: KeyRecord<T>,
        /// Conditions the existing item must satisfy.
        conditions: Vec<condition::JoinedCondition<T>>,
    },
    /// Check conditions on an item without writing it.
    Validate {
        /// The table holding the item.
        table_name: String,
        /// The key of the item to check.
        key: KeyRecord<T>,
        /// The conditions to check; must not be empty.
        conditions: Vec<condition::JoinedCondition<T>>,
    },
}

impl<T: Serialize> TryFrom<TransactionItem<T>> for types::TransactWriteItem {
    type Error = Error;

    fn try_from(transaction_item: TransactionItem<T>) -> Result<Self> {
        let builder = Self::builder();
        let builder = match transaction_item {
            TransactionItem::Create {
                table_name,
                item,
                conditions,
            } => {
                let item: collections::HashMap<String, types::AttributeValue> = to_item(item)?;
                let write_operation = write_input(table_name, conditions)?;
                let put = types::Put::builder()
                    .set_item(Some(item))
                    .set_condition_expression(write_operation.condition_expression)
                    .set_expression_attribute_names(write_operation.expression_attribute_names)
                    .set_expression_attribute_values(write_operation.expression_attribute_values)
                    .table_name(write_operation.table_name)
                    .build()?;
                builder.put(put)
            }
            TransactionItem::Update(update_item) => {
                let compiled: update_item::CompiledUpdate = update_item.try_into()?;
                let write_operation = compiled.write_operation;
                let update = types::Update::builder()
                    .set_key(Some(compiled.key))
                    .update_expression(compiled.update_expression)
                    .set_condition_expression(write_operation.condition_expression)
                    .set_expression_attribute_names(write_operation.expression_attribute_names)
                    .set_expression_attribute_values(write_operation.expression_attribute_values)
                    .set_return_values_on_condition_check_failure(
                        write_operation.return_values_on_condition_check_failure,
                    )
                    .table_name(write_operation.table_name)
                    .build()?;
                builder.update(update)
            }
            TransactionItem::Erase {
                table_name,
                key,
                conditions,
            } => {
                let write_operation = write_input(table_name, conditions)?;
                let delete = types::Delete::builder()
                    .set_key(Some(common::key::to_key_map(key)?))
                    .set_condition_expression(write_operation.condition_expression)
                    .set_expression_attribute_names(write_operation.expression_attribute_names)
                    .set_expression_attribute_values(write_operation.expression_attribute_values)
                    .table_name(write_operation.table_name)
                    .build()?;
                builder.delete(delete)
            }
            TransactionItem::Validate {
                table_name,
                key,
                conditions,
            } => {
                let write_operation = write_input(table_name, conditions)?;
                let condition_expression = write_operation
                    .condition_expression
                    .ok_or(Error::EmptyConditionCheck)?;
                let condition_check = types::ConditionCheck::builder()
                    .set_key(Some(common::key::to_key_map(key)?))
                    .condition_expression(condition_expression)
                    .set_expression_attribute_names(write_operation.expression_attribute_names)
                    .set_expression_attribute_values(write_operation.expression_attribute_values)
                    .table_name(write_operation.table_name)
                    .build()?;
                builder.condition_check(condition_check)
            }
        };
        Ok(builder.build())
    }
}

fn write_input<T: Serialize>(
    table_name: String,
    conditions: Vec<condition::JoinedCondition<T>>,
) -> Result<write::common::WriteInput> {
    write::common::WriteArgs {
        conditions,
        table_name,
        ..Default::default()
    }
    .try_into()
}

/// Transact write items operation.
///
/// `None` entries are skipped, so items can be produced conditionally.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_provider::common::{condition, key::KeyRecord};
/// use dynamodb_provider::write::transact_write_items::{TransactWriteItems, TransactionItem};
/// use serde_json::json;
///
/// # async fn example(client: &Client, archive: bool) -> Result<(), Box<dyn std::error::Error>> {
/// let transaction = TransactWriteItems {
///     items: vec![
///         Some(TransactionItem::Create {
///             table_name: "users".to_string(),
///             item: json!({"id": "2", "name": "Jane"}),
///             conditions: vec![condition::JoinedCondition::and(
///                 condition::ConditionTree::leaf("id", condition::Condition::NotExists),
///             )],
///         }),
///         archive.then(|| TransactionItem::Erase {
///             table_name: "users".to_string(),
///             key: KeyRecord::from([("id".to_string(), json!("1"))]),
///             conditions: Vec::new(),
///         }),
///     ],
///     ..Default::default()
/// };
/// transaction.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TransactWriteItems<T> {
    /// The writes, in order.
    pub items: Vec<Option<TransactionItem<T>>>,
    /// Idempotency token of the request.
    pub client_request_token: Option<String>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
}

impl<T> Default for TransactWriteItems<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            client_request_token: None,
            return_consumed_capacity: None,
        }
    }
}

impl<T: Serialize> TransactWriteItems<T> {
    /// Compile the transaction; `None` when there is nothing to write.
    pub fn into_input(
        self,
    ) -> Result<Option<operation::transact_write_items::TransactWriteItemsInput>> {
        let items: Vec<_> = self.items.into_iter().flatten().collect();
        if items.len() > MAX_TRANSACTION_ITEMS {
            return Err(Error::TooManyTransactionItems {
                max: MAX_TRANSACTION_ITEMS,
                actual: items.len(),
            });
        }
        if items.is_empty() {
            return Ok(None);
        }
        let transact_items = items
            .into_iter()
            .map(types::TransactWriteItem::try_from)
            .collect::<Result<Vec<_>>>()?;
        let input = operation::transact_write_items::TransactWriteItemsInput::builder()
            .set_transact_items(Some(transact_items))
            .set_client_request_token(self.client_request_token)
            .set_return_consumed_capacity(self.return_consumed_capacity)
            .build()?;
        Ok(Some(input))
    }

    /// Compile and execute the transaction.
    ///
    /// Resolves to `None` without calling DynamoDB when there is nothing to write.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_provider.transact_write_items",
            skip_all,
            fields(items = self.items.len()),
            err
        )
    )]
    pub async fn send<C>(
        self,
        client: &C,
    ) -> Result<Option<operation::transact_write_items::TransactWriteItemsOutput>>
    where
        C: DynamoClient + ?Sized,
    {
        let Some(input) = self.into_input()? else {
            #[cfg(feature = "tracing")]
            tracing::debug!("empty transaction, skipping request");
            return Ok(None);
        };
        let output = client.transact_write_items(input).await?;
        Ok(Some(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use crate::error::MalformedUpdate;

    use condition::{Condition, ConditionTree, JoinedCondition};
    use indexmap::IndexMap;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn record(id: &str) -> KeyRecord<Value> {
        KeyRecord::from([("id".to_string(), json!(id))])
    }

    fn key_map(id: &str) -> collections::HashMap<String, types::AttributeValue> {
        collections::HashMap::from([("id".to_string(), types::AttributeValue::S(id.to_string()))])
    }

    fn erase(id: &str) -> TransactionItem<Value> {
        TransactionItem::Erase {
            table_name: "t".to_string(),
            key: record(id),
            conditions: Vec::new(),
        }
    }

    fn update(id: &str) -> TransactionItem<Value> {
        TransactionItem::Update(update_item::UpdateItem {
            keys: record(id),
            update: update_item::UpdateSpec {
                values: IndexMap::from([("a".to_string(), json!(1))]),
                ..Default::default()
            },
            write_args: write::common::WriteArgs {
                table_name: "t".to_string(),
                ..Default::default()
            },
        })
    }

    #[test]
    fn test_envelopes_keep_order() {
        let transaction = TransactWriteItems {
            items: vec![
                Some(TransactionItem::Create {
                    table_name: "t".to_string(),
                    item: json!({"id": "1"}),
                    conditions: vec![JoinedCondition::and(ConditionTree::leaf(
                        "id",
                        Condition::NotExists,
                    ))],
                }),
                None,
                Some(update("2")),
                Some(erase("3")),
                None,
                Some(TransactionItem::Validate {
                    table_name: "t".to_string(),
                    key: record("4"),
                    conditions: vec![JoinedCondition::and(ConditionTree::leaf(
                        "status",
                        Condition::Equal(json!("open")),
                    ))],
                }),
            ],
            client_request_token: Some("token".to_string()),
            ..Default::default()
        };
        let actual = transaction.into_input().unwrap().unwrap();
        let expected = operation::transact_write_items::TransactWriteItemsInput::builder()
            .transact_items(
                types::TransactWriteItem::builder()
                    .put(
                        types::Put::builder()
                            .set_item(Some(key_map("1")))
                            .condition_expression("(attribute_not_exists(#__condition_id))")
                            .expression_attribute_names("#__condition_id", "id")
                            .table_name("t")
                            .build()
                            .unwrap(),
                    )
                    .build(),
            )
            .transact_items(
                types::TransactWriteItem::builder()
                    .update(
                        types::Update::builder()
                            .set_key(Some(key_map("2")))
                            .update_expression("SET #a = :a")
                            .expression_attribute_names("#a", "a")
                            .expression_attribute_values(
                                ":a",
                                types::AttributeValue::N("1".to_string()),
                            )
                            .table_name("t")
                            .build()
                            .unwrap(),
                    )
                    .build(),
            )
            .transact_items(
                types::TransactWriteItem::builder()
                    .delete(
                        types::Delete::builder()
                            .set_key(Some(key_map("3")))
                            .table_name("t")
                            .build()
                            .unwrap(),
                    )
                    .build(),
            )
            .transact_items(
                types::TransactWriteItem::builder()
                    .condition_check(
                        types::ConditionCheck::builder()
                            .set_key(Some(key_map("4")))
                            .condition_expression("(#__condition_status = :__condition_status)")
                            .expression_attribute_names("#__condition_status", "status")
                            .expression_attribute_values(
                                ":__condition_status",
                                types::AttributeValue::S("open".to_string()),
                            )
                            .table_name("t")
                            .build()
                            .unwrap(),
                    )
                    .build(),
            )
            .client_request_token("token")
            .build()
            .unwrap();
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::only_none(vec![None, None])]
    fn test_empty_transaction_compiles_to_nothing(
        #[case] items: Vec<Option<TransactionItem<Value>>>,
    ) {
        let transaction = TransactWriteItems {
            items,
            ..Default::default()
        };
        assert_eq!(transaction.into_input().unwrap(), None);
    }

    #[rstest]
    #[case::at_limit(MAX_TRANSACTION_ITEMS, true)]
    #[case::over_limit(MAX_TRANSACTION_ITEMS + 1, false)]
    fn test_item_limit(#[case] count: usize, #[case] accepted: bool) {
        let items = (0..count)
            .map(|index| Some(erase(&index.to_string())))
            .chain([None, None])
            .collect();
        let actual = TransactWriteItems {
            items,
            ..Default::default()
        }
        .into_input();
        if accepted {
            assert_eq!(
                actual.unwrap().unwrap().transact_items.map(|items| items.len()),
                Some(count)
            );
        } else {
            assert!(matches!(
                actual,
                Err(Error::TooManyTransactionItems { max: 100, actual: 101 })
            ));
        }
    }

    #[test]
    fn test_condition_check_requires_conditions() {
        let actual = TransactWriteItems {
            items: vec![Some(TransactionItem::Validate {
                table_name: "t".to_string(),
                key: record("1"),
                conditions: Vec::<JoinedCondition<Value>>::new(),
            })],
            ..Default::default()
        }
        .into_input();
        assert!(matches!(actual, Err(Error::EmptyConditionCheck)));
    }

    #[test]
    fn test_update_items_are_validated() {
        let actual = TransactWriteItems {
            items: vec![Some(TransactionItem::Update(update_item::UpdateItem {
                keys: record("1"),
                update: update_item::UpdateSpec::default(),
                write_args: write::common::WriteArgs {
                    table_name: "t".to_string(),
                    ..Default::default()
                },
            }))],
            ..Default::default()
        }
        .into_input();
        assert!(matches!(
            actual,
            Err(Error::MalformedUpdate(MalformedUpdate::EmptyUpdate))
        ));
    }

    #[tokio::test]
    async fn test_send_skips_empty_transaction() {
        let client = MockClient::serving_all();
        let output = TransactWriteItems::<Value> {
            items: vec![None],
            ..Default::default()
        }
        .send(&client)
        .await
        .unwrap();
        assert!(output.is_none());
        assert!(client.transact_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_dispatches_once() {
        let client = MockClient::serving_all();
        let output = TransactWriteItems {
            items: vec![Some(erase("1")), Some(update("2"))],
            return_consumed_capacity: Some(types::ReturnConsumedCapacity::Total),
            ..Default::default()
        }
        .send(&client)
        .await
        .unwrap();
        assert!(output.is_some());
        let calls = client.transact_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].transact_items.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            calls[0].return_consumed_capacity,
            Some(types::ReturnConsumedCapacity::Total)
        );
    }

    #[tokio::test]
    async fn test_oversized_transaction_is_never_sent() {
        let client = MockClient::serving_all();
        let result = TransactWriteItems {
            items: (0..=MAX_TRANSACTION_ITEMS)
                .map(|index| Some(erase(&index.to_string())))
                .collect(),
            ..Default::default()
        }
        .send(&client)
        .await;
        assert!(result.is_err());
        assert!(client.transact_calls.lock().unwrap().is_empty());
    }
}
