use crate::client::DynamoClient;
use crate::common::{self, key::KeyRecord};
use crate::error::{Error, Result};
use crate::read::backoff::Backoff;

use aws_sdk_dynamodb::{operation, types};
use futures_util::future;
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::from_items;
use std::collections;

/// Maximum number of keys DynamoDB accepts in one BatchGetItem call.
pub const BATCH_GET_PAGE_SIZE: usize = 100;

/// Default number of requests per page before giving up on unprocessed keys.
pub const DEFAULT_MAX_RETRIES: u32 = 8;

type Item = collections::HashMap<String, types::AttributeValue>;

/// Batched get of any number of keys from one table.
///
/// Keys are split into pages of [`BATCH_GET_PAGE_SIZE`], requested concurrently.
/// Each page re-requests exactly the keys DynamoDB left unprocessed, waiting on the
/// backoff between requests, until nothing is left or the page has made
/// `max_retries` requests (the first request included).
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_provider::{common::key::KeyRecord, read};
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let batch_get = read::batch_get_item::BatchGetItem {
///     table_name: "users".to_string(),
///     keys: (0..250)
///         .map(|id| KeyRecord::from([("id".to_string(), id)]))
///         .collect(),
///     ..Default::default()
/// };
/// let items = batch_get
///     .send(client, &read::backoff::ExponentialBackoff::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BatchGetItem<T> {
    /// The table to read from.
    pub table_name: String,
    /// The keys of the items to retrieve.
    pub keys: Vec<KeyRecord<T>>,
    /// Whether to use strongly consistent reads.
    pub consistent_read: Option<bool>,
    /// Which attributes to retrieve; all of them when `None`.
    pub properties_to_retrieve: Option<Vec<String>>,
    /// Requests per page before unprocessed keys are given up on.
    pub max_retries: u32,
    /// Fail with [`Error::UnprocessedKeysTimeout`] instead of returning the items
    /// collected so far when a page gives up.
    pub throw_on_unprocessed: bool,
}

impl<T> Default for BatchGetItem<T> {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            keys: Vec::new(),
            consistent_read: None,
            properties_to_retrieve: None,
            max_retries: DEFAULT_MAX_RETRIES,
            throw_on_unprocessed: false,
        }
    }
}

/// Request settings shared by every page of one batched get.
#[derive(Debug)]
struct PageTemplate {
    table_name: String,
    consistent_read: Option<bool>,
    projection: Option<common::CompiledExpression>,
    max_retries: u32,
}

impl PageTemplate {
    fn input(&self, keys: Vec<Item>) -> Result<operation::batch_get_item::BatchGetItemInput> {
        let (names, projection_expression) = match &self.projection {
            Some(projection) => (
                Some(projection.attribute_names.clone()),
                Some(projection.expression.clone()),
            ),
            None => (None, None),
        };
        let keys_and_attributes = types::KeysAndAttributes::builder()
            .set_keys(Some(keys))
            .set_consistent_read(self.consistent_read)
            .set_expression_attribute_names(names)
            .set_projection_expression(projection_expression)
            .build()?;
        let input = operation::batch_get_item::BatchGetItemInput::builder()
            .request_items(self.table_name.clone(), keys_and_attributes)
            .build()?;
        Ok(input)
    }
}

/// How a page settled.
#[derive(Debug)]
enum PageResult {
    /// Every key was served.
    Complete(Vec<Item>),
    /// The retry budget ran out with keys still unprocessed.
    Exhausted { items: Vec<Item>, remaining: usize },
}

async fn fetch_page<C, B>(
    client: &C,
    backoff: &B,
    template: &PageTemplate,
    mut keys: Vec<Item>,
) -> Result<PageResult>
where
    C: DynamoClient + ?Sized,
    B: Backoff + ?Sized,
{
    let mut items = Vec::with_capacity(keys.len());
    let mut attempt = 1;
    loop {
        let output = client.batch_get_item(template.input(keys)?).await?;
        if let Some(mut responses) = output.responses {
            items.extend(
                responses
                    .remove(&template.table_name)
                    .unwrap_or_default(),
            );
        }
        let unprocessed = output
            .unprocessed_keys
            .and_then(|mut unprocessed| unprocessed.remove(&template.table_name))
            .map(|keys_and_attributes| keys_and_attributes.keys)
            .filter(|keys| !keys.is_empty());
        let Some(unprocessed) = unprocessed else {
            return Ok(PageResult::Complete(items));
        };
        if attempt >= template.max_retries {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                table = %template.table_name,
                attempt,
                remaining = unprocessed.len(),
                "giving up on unprocessed keys"
            );
            return Ok(PageResult::Exhausted {
                items,
                remaining: unprocessed.len(),
            });
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            table = %template.table_name,
            attempt,
            remaining = unprocessed.len(),
            "retrying unprocessed keys"
        );
        backoff.wait(attempt).await;
        attempt += 1;
        keys = unprocessed;
    }
}

impl<T: Serialize> BatchGetItem<T> {
    /// Execute the batched get, returning raw items in page order.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_provider.batch_get_item",
            skip_all,
            fields(table = %self.table_name, keys = self.keys.len()),
            err
        )
    )]
    pub async fn send<C, B>(self, client: &C, backoff: &B) -> Result<Vec<Item>>
    where
        C: DynamoClient + ?Sized,
        B: Backoff + ?Sized,
    {
        if self.keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::with_capacity(self.keys.len());
        for record in self.keys {
            keys.push(common::key::to_key_map(record)?);
        }
        let template = PageTemplate {
            projection: self
                .properties_to_retrieve
                .as_deref()
                .map(common::selection::compile_projection),
            table_name: self.table_name,
            consistent_read: self.consistent_read,
            max_retries: self.max_retries,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(
            pages = keys.len().div_ceil(BATCH_GET_PAGE_SIZE),
            "requesting pages"
        );
        let pages = keys
            .chunks(BATCH_GET_PAGE_SIZE)
            .map(|page| fetch_page(client, backoff, &template, page.to_vec()));
        // every page settles before any failure is reported
        let results = future::join_all(pages).await;
        let mut items = Vec::with_capacity(keys.len());
        for result in results {
            match result? {
                PageResult::Complete(page_items) => items.extend(page_items),
                PageResult::Exhausted { remaining, .. } if self.throw_on_unprocessed => {
                    return Err(Error::UnprocessedKeysTimeout {
                        table: template.table_name,
                        remaining,
                    });
                }
                PageResult::Exhausted {
                    items: page_items, ..
                } => items.extend(page_items),
            }
        }
        Ok(items)
    }

    /// Execute the batched get, deserializing every item into `E`.
    pub async fn send_as<E, C, B>(self, client: &C, backoff: &B) -> Result<Vec<E>>
    where
        E: DeserializeOwned,
        C: DynamoClient + ?Sized,
        B: Backoff + ?Sized,
    {
        let items = self.send(client, backoff).await?;
        Ok(from_items(items)?)
    }
}
