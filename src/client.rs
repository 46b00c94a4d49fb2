//! The store boundary.
//!
//! Every request this crate sends goes through [`StoreClient`], which takes the SDK's
//! request input and returns the SDK's output or a [`RemoteError`] already classified
//! by error code. The trait is implemented for [`aws_sdk_dynamodb::Client`]; tests
//! implement it with in-memory doubles.

use crate::error::{RemoteError, RemoteErrorKind};

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    Client,
    error::{ProvideErrorMetadata, SdkError},
    operation::{
        batch_get_item::{BatchGetItemInput, BatchGetItemOutput},
        batch_write_item::{BatchWriteItemInput, BatchWriteItemOutput},
        delete_item::{DeleteItemInput, DeleteItemOutput},
        get_item::{GetItemInput, GetItemOutput},
        put_item::{PutItemInput, PutItemOutput},
        scan::{ScanInput, ScanOutput},
        transact_write_items::{
            TransactWriteItemsError, TransactWriteItemsInput, TransactWriteItemsOutput,
        },
        update_item::{UpdateItemInput, UpdateItemOutput},
    },
};

/// Operations the execution layer needs from the store.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Creates or replaces an item.
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, RemoteError>;

    /// Reads an item by primary key.
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, RemoteError>;

    /// Updates an item by primary key.
    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, RemoteError>;

    /// Deletes an item by primary key.
    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, RemoteError>;

    /// Puts or deletes up to 25 items; some may come back unprocessed.
    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, RemoteError>;

    /// Reads up to 100 items; some keys may come back unprocessed.
    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, RemoteError>;

    /// Applies up to 25 writes atomically.
    ///
    /// A canceled transaction is reported as [`RemoteErrorKind::TransactionCanceled`]
    /// carrying one cancellation reason per submitted item.
    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, RemoteError>;

    /// Reads one page of a table scan.
    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, RemoteError>;
}

fn classify<E, R>(err: SdkError<E, R>) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    RemoteError::from_sdk(&err)
}

#[async_trait]
impl StoreClient for Client {
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, RemoteError> {
        Client::put_item(self)
            .set_item(input.item)
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_return_values(input.return_values)
            .set_return_values_on_condition_check_failure(
                input.return_values_on_condition_check_failure,
            )
            .set_table_name(input.table_name)
            .send()
            .await
            .map_err(classify)
    }

    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, RemoteError> {
        Client::get_item(self)
            .set_key(input.key)
            .set_consistent_read(input.consistent_read)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_projection_expression(input.projection_expression)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_table_name(input.table_name)
            .send()
            .await
            .map_err(classify)
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, RemoteError> {
        Client::update_item(self)
            .set_key(input.key)
            .set_update_expression(input.update_expression)
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_return_values(input.return_values)
            .set_return_values_on_condition_check_failure(
                input.return_values_on_condition_check_failure,
            )
            .set_table_name(input.table_name)
            .send()
            .await
            .map_err(classify)
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, RemoteError> {
        Client::delete_item(self)
            .set_key(input.key)
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_return_values(input.return_values)
            .set_return_values_on_condition_check_failure(
                input.return_values_on_condition_check_failure,
            )
            .set_table_name(input.table_name)
            .send()
            .await
            .map_err(classify)
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, RemoteError> {
        Client::batch_write_item(self)
            .set_request_items(input.request_items)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .send()
            .await
            .map_err(classify)
    }

    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, RemoteError> {
        Client::batch_get_item(self)
            .set_request_items(input.request_items)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .send()
            .await
            .map_err(classify)
    }

    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, RemoteError> {
        Client::transact_write_items(self)
            .set_transact_items(input.transact_items)
            .set_client_request_token(input.client_request_token)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .send()
            .await
            .map_err(|err| {
                let reasons = match err.as_service_error() {
                    Some(TransactWriteItemsError::TransactionCanceledException(canceled)) => {
                        canceled.cancellation_reasons().to_vec()
                    }
                    _ => Vec::new(),
                };
                let mut remote = RemoteError::from_sdk(&err);
                if !reasons.is_empty() {
                    remote.kind = RemoteErrorKind::TransactionCanceled;
                }
                remote.with_cancellation_reasons(reasons)
            })
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, RemoteError> {
        Client::scan(self)
            .set_exclusive_start_key(input.exclusive_start_key)
            .set_consistent_read(input.consistent_read)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_filter_expression(input.filter_expression)
            .set_index_name(input.index_name)
            .set_limit(input.limit)
            .set_projection_expression(input.projection_expression)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_segment(input.segment)
            .set_select(input.select)
            .set_table_name(input.table_name)
            .set_total_segments(input.total_segments)
            .send()
            .await
            .map_err(classify)
    }
}
