//! Chart Service Client
//!
//! Thin wrapper over the generated gRPC client that collects a subscription
//! stream into domain [`BarRecord`]s.

use tonic::transport::Channel;

use super::proto::chart::v1::{
    SubscribeRequest, SubscribeResponse, chart_service_client::ChartServiceClient,
};
use super::status::Rejection;
use crate::application::ports::{BarHistory, HistoryError};
use crate::domain::streaming::{BarRecord, BarTimestamp, Ohlc};
use crate::domain::timeframe::Timeframe;

/// Client-side errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Could not connect to the service.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    /// The service refused the request before streaming.
    #[error("subscription rejected: {0}")]
    Rejected(Rejection),
    /// The call ended with a non-validation status, e.g. `UNAVAILABLE` on
    /// server shutdown or `CANCELLED` mid-stream. Records received before it
    /// are discarded.
    #[error("stream terminated: {}", .0.message())]
    Status(tonic::Status),
    /// A streamed record could not be converted.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    /// The bar history could not be queried.
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        if status.code() == tonic::Code::InvalidArgument {
            Self::Rejected(Rejection::from_status(&status))
        } else {
            Self::Status(status)
        }
    }
}

impl ClientError {
    /// Machine-readable rejection reason, if the service sent one.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Rejected(rejection) => rejection.reason.as_deref(),
            _ => None,
        }
    }
}

/// Client for the chart service.
#[derive(Debug, Clone)]
pub struct ChartClient {
    inner: ChartServiceClient<Channel>,
}

impl ChartClient {
    /// Connect to a chart service at `endpoint` (e.g. `http://127.0.0.1:50051`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if the connection fails.
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        let inner = ChartServiceClient::connect(endpoint.into()).await?;
        Ok(Self { inner })
    }

    /// Wrap an existing channel.
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: ChartServiceClient::new(channel),
        }
    }

    /// Subscribe and collect every record of the stream.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rejected` if the service rejects the request, or
    /// `ClientError::Status` if the stream ends with any other error.
    pub async fn subscribe<I, S>(
        &mut self,
        symbols: I,
        timeframe: Timeframe,
    ) -> Result<Vec<BarRecord>, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscribe_raw(symbols, Some(timeframe.index())).await
    }

    /// Subscribe with a raw wire timeframe, which may be absent or out of
    /// range.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rejected` if the service rejects the request, or
    /// `ClientError::Status` if the stream ends with any other error.
    pub async fn subscribe_raw<I, S>(
        &mut self,
        symbols: I,
        timeframe: Option<i32>,
    ) -> Result<Vec<BarRecord>, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = SubscribeRequest {
            symbol_list: symbols.into_iter().map(Into::into).collect(),
            timeframe,
        };

        let mut stream = self.inner.subscribe(request).await?.into_inner();

        let mut records = Vec::new();
        while let Some(response) = stream.message().await? {
            records.push(bar_record_from_proto(response)?);
        }

        Ok(records)
    }

    /// Subscribe to one symbol unless `history` already holds a record at or
    /// after `since`.
    ///
    /// Returns `None` when the subscription was skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the history lookup or the subscription fails.
    pub async fn subscribe_unless_recorded<H>(
        &mut self,
        history: &H,
        symbol: &str,
        timeframe: Timeframe,
        since: BarTimestamp,
    ) -> Result<Option<Vec<BarRecord>>, ClientError>
    where
        H: BarHistory + ?Sized,
    {
        if history.has_record_at_or_after(symbol, since).await? {
            tracing::debug!(symbol, since = %since, "Bar already recorded, skipping subscription");
            return Ok(None);
        }

        self.subscribe([symbol], timeframe).await.map(Some)
    }
}

fn bar_record_from_proto(response: SubscribeResponse) -> Result<BarRecord, ClientError> {
    let bar = response.bar.ok_or_else(|| {
        ClientError::MalformedRecord(format!("record for {} has no bar", response.symbol))
    })?;

    let timestamp: BarTimestamp = bar
        .timestamp_msec
        .parse()
        .map_err(|e| ClientError::MalformedRecord(format!("{e}")))?;

    Ok(BarRecord::new(
        response.symbol,
        timestamp,
        Ohlc {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        },
    ))
}
