//! The DynamoDB client seam.
//!
//! Compilation never touches the network; only the batched get, the update and
//! the transaction operations dispatch requests, and they do so through
//! [`DynamoClient`] so that tests can script DynamoDB's answers.

use crate::error::Result;

use async_trait::async_trait;
use aws_sdk_dynamodb::{Client, operation};

/// The DynamoDB calls this crate dispatches.
///
/// Errors are propagated unchanged; nothing here retries.
#[async_trait]
pub trait DynamoClient: Send + Sync {
    /// Run a BatchGetItem request.
    async fn batch_get_item(
        &self,
        input: operation::batch_get_item::BatchGetItemInput,
    ) -> Result<operation::batch_get_item::BatchGetItemOutput>;

    /// Run an UpdateItem request.
    async fn update_item(
        &self,
        input: operation::update_item::UpdateItemInput,
    ) -> Result<operation::update_item::UpdateItemOutput>;

    /// Run a TransactWriteItems request.
    async fn transact_write_items(
        &self,
        input: operation::transact_write_items::TransactWriteItemsInput,
    ) -> Result<operation::transact_write_items::TransactWriteItemsOutput>;
}

#[async_trait]
impl DynamoClient for Client {
    async fn batch_get_item(
        &self,
        input: operation::batch_get_item::BatchGetItemInput,
    ) -> Result<operation::batch_get_item::BatchGetItemOutput> {
        let output = self
            .batch_get_item()
            .set_request_items(input.request_items)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .send()
            .await?;
        Ok(output)
    }

    async fn update_item(
        &self,
        input: operation::update_item::UpdateItemInput,
    ) -> Result<operation::update_item::UpdateItemOutput> {
        let output = self
            .update_item()
            .set_table_name(input.table_name)
            .set_key(input.key)
            .set_update_expression(input.update_expression)
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_return_values(input.return_values)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_return_values_on_condition_check_failure(
                input.return_values_on_condition_check_failure,
            )
            .send()
            .await?;
        Ok(output)
    }

    async fn transact_write_items(
        &self,
        input: operation::transact_write_items::TransactWriteItemsInput,
    ) -> Result<operation::transact_write_items::TransactWriteItemsOutput> {
        let output = self
            .transact_write_items()
            .set_transact_items(input.transact_items)
            .set_client_request_token(input.client_request_token)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .send()
            .await?;
        Ok(output)
    }
}
