use crate::{
    client::StoreClient,
    common,
    error::{Error, Result},
    read,
};

use aws_sdk_dynamodb::{operation, types};
use serde::de::DeserializeOwned;
use serde_dynamo::from_item;

/// One page of scan results.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanPage<P> {
    /// The items of this page, after filtering.
    pub items: Vec<P>,
    /// Where the next page starts; `None` once the table is exhausted.
    pub last_evaluated_key: Option<common::Item>,
}

/// Scan operation, one page per call.
///
/// ```rust,no_run
/// use dynamodb_exec::read;
/// use serde_json::Value;
///
/// # async fn example(client: &aws_sdk_dynamodb::Client) -> dynamodb_exec::Result<()> {
/// let scan = read::scan::Scan {
///     multiple_read_args: read::common::MultipleReadArgs {
///         table_name: "orders".to_string(),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// let page: read::scan::ScanPage<Value> = scan.send_into(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scan {
    /// Additional read operation arguments (table name, filter, projection, etc.).
    pub multiple_read_args: read::common::MultipleReadArgs,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// The segment number for parallel scans (0-indexed).
    pub segment: Option<i32>,
    /// The total number of segments for parallel scans.
    pub total_segments: Option<i32>,
}

impl TryFrom<Scan> for operation::scan::ScanInput {
    type Error = Error;

    fn try_from(scan: Scan) -> Result<Self> {
        let multiple_read_operation: read::common::MultipleReadInput =
            scan.multiple_read_args.into();
        let builder = Self::builder()
            .set_return_consumed_capacity(scan.return_consumed_capacity)
            .set_segment(scan.segment)
            .set_total_segments(scan.total_segments);
        let input =
            crate::apply_multiple_read_operation!(builder, multiple_read_operation).build()?;
        Ok(input)
    }
}

impl Scan {
    /// Execute one page of the scan operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_exec.scan", skip_all, err)
    )]
    pub async fn send<C: StoreClient + ?Sized>(
        self,
        client: &C,
    ) -> Result<operation::scan::ScanOutput> {
        let input: operation::scan::ScanInput = self.try_into()?;
        client
            .scan(input)
            .await
            .map_err(|err| Error::remote("scan", err))
    }

    /// Execute one page of the scan operation and deserialize its items.
    pub async fn send_into<P, C>(self, client: &C) -> Result<ScanPage<P>>
    where
        P: DeserializeOwned,
        C: StoreClient + ?Sized,
    {
        let output = self.send(client).await?;
        let items = output.items.unwrap_or_default();
        let mut deserialized = Vec::with_capacity(items.len());
        for item in items {
            deserialized.push(from_item(item)?);
        }
        Ok(ScanPage {
            items: deserialized,
            last_evaluated_key: output.last_evaluated_key,
        })
    }
}
