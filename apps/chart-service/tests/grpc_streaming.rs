//! gRPC Streaming Integration Tests
//!
//! Tests the full call flow from a gRPC client request to the last streamed
//! record, including rejections and early termination.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Server};
use tonic::{Code, Request, Status, Streaming};

use chart_service::{
    BarTimestamp, ChartServer, ChartServerConfig, DuplicatePolicy, RandomBarSource,
    RandomBarSourceConfig, Rejection, SHUTDOWN_MESSAGE, ServerStats, SubscriptionService,
    SymbolRegistry,
    proto::{
        SubscribeRequest, SubscribeResponse, Timeframe, chart_service_client::ChartServiceClient,
        chart_service_server::ChartServiceServer,
    },
};

/// Record count large enough to exceed the HTTP/2 flow-control windows, so
/// the producer is still running when the test interferes.
const LONG_STREAM: usize = 200_000;

/// A running test server.
struct TestServer {
    client: ChartServiceClient<Channel>,
    stats: Arc<ServerStats>,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Start a test gRPC server on a random port and return the client.
async fn setup_test_server(duplicates: DuplicatePolicy, stream_buffer: usize) -> TestServer {
    let source = Arc::new(RandomBarSource::new(RandomBarSourceConfig::default()).unwrap());
    let service = Arc::new(SubscriptionService::new(
        Arc::new(SymbolRegistry::default()),
        source,
        duplicates,
    ));

    let shutdown = CancellationToken::new();
    let server = ChartServer::new(
        ChartServerConfig {
            version: "test-0.0.1".to_string(),
            stream_buffer,
        },
        service,
        shutdown.clone(),
    );
    let stats = server.stats();

    // Find an available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Start gRPC server
    let handle = tokio::spawn(async move {
        Server::builder()
            .add_service(ChartServiceServer::new(server))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = ChartServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();

    TestServer {
        client,
        stats,
        shutdown,
        handle,
    }
}

async fn default_server() -> TestServer {
    setup_test_server(DuplicatePolicy::Preserve, 64).await
}

fn request(symbols: &[&str], timeframe: Option<i32>) -> SubscribeRequest {
    SubscribeRequest {
        symbol_list: symbols.iter().map(ToString::to_string).collect(),
        timeframe,
    }
}

async fn open(
    client: &mut ChartServiceClient<Channel>,
    req: SubscribeRequest,
) -> Result<Streaming<SubscribeResponse>, Status> {
    client
        .subscribe(Request::new(req))
        .await
        .map(tonic::Response::into_inner)
}

async fn collect(mut stream: Streaming<SubscribeResponse>) -> Vec<SubscribeResponse> {
    let mut records = Vec::new();
    while let Some(msg) = timeout(Duration::from_secs(2), stream.message())
        .await
        .expect("timeout waiting for record")
        .unwrap()
    {
        records.push(msg);
    }
    records
}

async fn subscribe_all(
    client: &mut ChartServiceClient<Channel>,
    symbols: &[&str],
    timeframe: Option<i32>,
) -> Result<Vec<SubscribeResponse>, Status> {
    let stream = open(client, request(symbols, timeframe)).await?;
    Ok(collect(stream).await)
}

/// Read a stream to its end and return the status it failed with.
async fn stream_error(mut stream: Streaming<SubscribeResponse>) -> Status {
    loop {
        match timeout(Duration::from_secs(2), stream.message())
            .await
            .expect("timeout waiting for record")
        {
            Ok(Some(_)) => {}
            Ok(None) => panic!("stream closed without an error"),
            Err(status) => return status,
        }
    }
}

fn symbols_of(records: &[SubscribeResponse]) -> Vec<&str> {
    records.iter().map(|r| r.symbol.as_str()).collect()
}

/// Poll until the producer task for every stream has finished.
async fn wait_for_idle(stats: &ServerStats) {
    timeout(Duration::from_secs(5), async {
        while stats.snapshot().active_streams > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("streams did not finish");
}

// =============================================================================
// Successful Streams
// =============================================================================

#[tokio::test]
async fn test_one_record_per_symbol_in_request_order() {
    let mut server = default_server().await;

    let records = subscribe_all(
        &mut server.client,
        &["VOO", "AAPL", "IXUS"],
        Some(Timeframe::Unknown as i32),
    )
    .await
    .unwrap();

    assert_eq!(symbols_of(&records), ["VOO", "AAPL", "IXUS"]);

    server.handle.abort();
}

#[tokio::test]
async fn test_no_data_sentinel_has_zero_prices() {
    let mut server = default_server().await;

    let records = subscribe_all(&mut server.client, &["NO_DATA"], Some(0))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    let bar = records[0].bar.as_ref().unwrap();
    assert_eq!(records[0].symbol, "NO_DATA");
    assert_eq!((bar.open, bar.high, bar.low, bar.close), (0.0, 0.0, 0.0, 0.0));
    assert_eq!(bar.timestamp_msec.len(), 11);
    assert!(bar.timestamp_msec.chars().all(|c| c.is_ascii_digit()));

    server.handle.abort();
}

#[tokio::test]
async fn test_regular_bars_are_well_formed() {
    let mut server = default_server().await;

    let symbols = [
        "VOO", "AAPL", "NVDA", "SPY", "QQQ", "VTI", "IVV", "VEU", "IXUS", "ACWI",
    ];
    let records = subscribe_all(&mut server.client, &symbols, Some(Timeframe::Minute1 as i32))
        .await
        .unwrap();

    assert_eq!(records.len(), symbols.len());
    for record in &records {
        let bar = record.bar.as_ref().unwrap();
        assert!(bar.high >= bar.open && bar.high >= bar.close && bar.high >= bar.low);
        assert!(bar.low <= bar.open && bar.low <= bar.close);
        assert!(bar.timestamp_msec.parse::<BarTimestamp>().is_ok());
    }

    server.handle.abort();
}

#[tokio::test]
async fn test_timestamps_are_current_deciseconds() {
    let mut server = default_server().await;

    let before = BarTimestamp::now();
    let records = subscribe_all(&mut server.client, &["SPY", "QQQ"], Some(1))
        .await
        .unwrap();
    let after = BarTimestamp::now();

    for record in &records {
        let ts: BarTimestamp = record.bar.as_ref().unwrap().timestamp_msec.parse().unwrap();
        assert!(before <= ts && ts <= after, "{ts} outside {before}..={after}");
    }

    server.handle.abort();
}

#[tokio::test]
async fn test_unrecognized_timeframe_is_not_an_error() {
    let mut server = default_server().await;

    let records = subscribe_all(&mut server.client, &["VOO", "SPY"], Some(42))
        .await
        .unwrap();
    assert_eq!(symbols_of(&records), ["VOO", "SPY"]);

    let records = subscribe_all(&mut server.client, &["VOO"], Some(-7))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);

    server.handle.abort();
}

#[tokio::test]
async fn test_every_timeframe_streams_the_same_shape() {
    let mut server = default_server().await;

    for tf in [
        Timeframe::Unknown,
        Timeframe::Minute1,
        Timeframe::Minute5,
        Timeframe::Minute15,
        Timeframe::Hour1,
        Timeframe::Day1,
    ] {
        let records = subscribe_all(&mut server.client, &["VTI", "NO_DATA"], Some(tf as i32))
            .await
            .unwrap();
        assert_eq!(symbols_of(&records), ["VTI", "NO_DATA"], "{tf:?}");
    }

    server.handle.abort();
}

#[tokio::test]
async fn test_repeated_request_has_same_count_and_order() {
    let mut server = default_server().await;
    let symbols = ["ACWI", "VOO", "NO_DATA", "AAPL"];

    let first = subscribe_all(&mut server.client, &symbols, Some(3))
        .await
        .unwrap();
    let second = subscribe_all(&mut server.client, &symbols, Some(3))
        .await
        .unwrap();

    assert_eq!(symbols_of(&first), symbols_of(&second));
    assert_eq!(first.len(), symbols.len());

    server.handle.abort();
}

#[tokio::test]
async fn test_duplicates_preserved_by_default() {
    let mut server = default_server().await;

    let records = subscribe_all(&mut server.client, &["VOO", "AAPL", "VOO"], Some(1))
        .await
        .unwrap();

    assert_eq!(symbols_of(&records), ["VOO", "AAPL", "VOO"]);

    server.handle.abort();
}

#[tokio::test]
async fn test_duplicates_collapsed_when_configured() {
    let mut server = setup_test_server(DuplicatePolicy::Collapse, 64).await;

    let records = subscribe_all(&mut server.client, &["VOO", "AAPL", "VOO"], Some(1))
        .await
        .unwrap();

    assert_eq!(symbols_of(&records), ["VOO", "AAPL"]);

    server.handle.abort();
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let server = default_server().await;

    let mut tasks = Vec::new();
    for i in 0..8 {
        let mut client = server.client.clone();
        tasks.push(tokio::spawn(async move {
            let symbols: Vec<&str> = if i % 2 == 0 {
                vec!["VOO", "NO_DATA"]
            } else {
                vec!["SPY", "QQQ", "VTI"]
            };
            let records = subscribe_all(&mut client, &symbols, Some(1)).await.unwrap();
            assert_eq!(symbols_of(&records), symbols);
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    wait_for_idle(&server.stats).await;
    let snapshot = server.stats.snapshot();
    assert_eq!(snapshot.calls_accepted, 8);
    assert_eq!(snapshot.records_sent, 4 * 2 + 4 * 3);

    server.handle.abort();
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_empty_symbol_list_is_rejected() {
    let mut server = default_server().await;

    let status = subscribe_all(&mut server.client, &[], Some(1))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "symbol list cannot be empty");

    server.handle.abort();
}

#[tokio::test]
async fn test_missing_timeframe_is_rejected() {
    let mut server = default_server().await;

    let status = subscribe_all(&mut server.client, &["VOO"], None)
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "timeframe cannot be empty");

    server.handle.abort();
}

#[tokio::test]
async fn test_empty_list_checked_before_timeframe() {
    let mut server = default_server().await;

    let status = subscribe_all(&mut server.client, &[], None)
        .await
        .unwrap_err();

    assert_eq!(status.message(), "symbol list cannot be empty");

    server.handle.abort();
}

#[tokio::test]
async fn test_unsupported_symbol_fails_whole_call() {
    let mut server = default_server().await;

    let status = subscribe_all(&mut server.client, &["VOO", "AAA"], Some(1))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "unsupported symbol: AAA");

    server.handle.abort();
}

#[tokio::test]
async fn test_first_unsupported_symbol_is_reported() {
    let mut server = default_server().await;

    let status = subscribe_all(&mut server.client, &["BBB", "VOO", "AAA"], Some(1))
        .await
        .unwrap_err();

    assert_eq!(status.message(), "unsupported symbol: BBB");

    server.handle.abort();
}

#[tokio::test]
async fn test_rejection_carries_error_details() {
    let mut server = default_server().await;

    let status = subscribe_all(&mut server.client, &["voo"], Some(1))
        .await
        .unwrap_err();
    let rejection = Rejection::from_status(&status);

    assert_eq!(rejection.code, Code::InvalidArgument);
    assert_eq!(rejection.reason.as_deref(), Some("UNSUPPORTED_SYMBOL"));
    assert_eq!(rejection.field.as_deref(), Some("symbol_list"));
    assert_eq!(
        rejection.metadata.get("symbol").map(String::as_str),
        Some("voo")
    );

    server.handle.abort();
}

#[tokio::test]
async fn test_rejections_are_counted() {
    let mut server = default_server().await;

    let _ = subscribe_all(&mut server.client, &[], Some(1)).await;
    let _ = subscribe_all(&mut server.client, &["AAA"], Some(1)).await;

    let snapshot = server.stats.snapshot();
    assert_eq!(snapshot.calls_rejected, 2);
    assert_eq!(snapshot.calls_accepted, 0);
    assert_eq!(snapshot.records_sent, 0);

    server.handle.abort();
}

// =============================================================================
// Early Termination
// =============================================================================

#[tokio::test]
async fn test_client_disconnect_stops_producer() {
    let mut server = setup_test_server(DuplicatePolicy::Preserve, 1).await;
    let symbols = vec!["VOO"; LONG_STREAM];

    let mut stream = open(&mut server.client, request(&symbols, Some(1)))
        .await
        .unwrap();
    let first = timeout(Duration::from_secs(2), stream.message())
        .await
        .expect("timeout")
        .unwrap()
        .unwrap();
    assert_eq!(first.symbol, "VOO");

    drop(stream);
    wait_for_idle(&server.stats).await;

    let snapshot = server.stats.snapshot();
    assert_eq!(snapshot.streams_cancelled, 1);
    assert!(snapshot.records_sent < LONG_STREAM as u64);
    assert!(snapshot.records_sent >= 1);

    server.handle.abort();
}

#[tokio::test]
async fn test_shutdown_ends_in_flight_stream_with_unavailable() {
    let mut server = setup_test_server(DuplicatePolicy::Preserve, 1).await;
    let symbols = vec!["SPY"; LONG_STREAM];

    let mut stream = open(&mut server.client, request(&symbols, Some(1)))
        .await
        .unwrap();
    let _ = timeout(Duration::from_secs(2), stream.message())
        .await
        .expect("timeout")
        .unwrap();

    server.shutdown.cancel();

    // Delivered records are kept, then the stream fails instead of closing
    let mut received = 1;
    let status = loop {
        match timeout(Duration::from_secs(2), stream.message())
            .await
            .expect("timeout waiting for record")
        {
            Ok(Some(_)) => received += 1,
            Ok(None) => panic!("truncated stream closed cleanly after {received} records"),
            Err(status) => break status,
        }
    };

    assert_eq!(status.code(), Code::Unavailable);
    assert_eq!(status.message(), SHUTDOWN_MESSAGE);
    assert!(received < LONG_STREAM);

    wait_for_idle(&server.stats).await;
    assert_eq!(server.stats.snapshot().streams_cancelled, 1);

    server.handle.abort();
}

#[tokio::test]
async fn test_shutdown_before_first_record_is_not_a_success() {
    let mut server = setup_test_server(DuplicatePolicy::Preserve, 1).await;
    server.shutdown.cancel();

    let stream = open(&mut server.client, request(&["VOO", "SPY"], Some(1)))
        .await
        .unwrap();
    let err = stream_error(stream).await;

    assert_eq!(err.code(), Code::Unavailable);
    wait_for_idle(&server.stats).await;
    assert_eq!(server.stats.snapshot().records_sent, 0);

    server.handle.abort();
}
