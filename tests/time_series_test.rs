//! Time-series integration tests: queue ordering, range queries, eviction,
//! nearest search, and the collector-to-exporter pipeline.

mod common;

use common::{ticks, times};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tally::core::config::DrainConfig;
use tally::export::ExportFormat;
use tally::metrics::{MetricDescriptor, MetricsStore, Value, ValueKind, U64};
use tally::time_series::sinks::read_frames;
use tally::time_series::{
    handoff_queue, CollectingExporter, DataPoint, DrainLoop, Exporter, StreamExporter,
    TimeIndexedExporter, TimeSeriesCollector,
};

#[test]
fn test_queue_delivers_batches_in_push_order() {
    let (mut producer, mut consumer) = handoff_queue();
    let mut rng = fastrand::Rng::with_seed(1234);
    let sizes: Vec<usize> = (0..500).map(|_| rng.usize(0..8)).collect();
    let expected_batches = sizes.len();

    let producer_sizes = sizes.clone();
    let worker = std::thread::spawn(move || {
        let mut rng = fastrand::Rng::with_seed(5678);
        let mut next = 0u64;
        for size in producer_sizes {
            producer.push(ticks(next..next + size as u64, 1, 0));
            next += size as u64;
            if rng.u8(..) < 16 {
                std::thread::yield_now();
            }
        }
        next
    });

    let mut sink = CollectingExporter::new();
    let mut delivered = 0;
    while delivered < expected_batches {
        delivered += consumer.flush_to_exporters(&mut [&mut sink]).unwrap();
    }
    let total = worker.join().unwrap();

    assert_eq!(delivered, expected_batches);
    let lengths: Vec<usize> = sink.batches().iter().map(Vec::len).collect();
    assert_eq!(lengths, sizes);
    let all: Vec<u64> = sink.points().map(DataPoint::time).collect();
    assert_eq!(all, (0..total).collect::<Vec<_>>());
}

#[test]
fn test_range_query() {
    let mut exporter = TimeIndexedExporter::unbounded();
    exporter
        .receive_data_points(&ticks(10..20, 2, 8))
        .unwrap();

    assert_eq!(exporter.get_range(10, 15).len(), 12);
    assert_eq!(times(exporter.latest(3)), vec![17, 17, 18, 18, 19, 19]);
    assert!(exporter.get_range(0, 5).is_empty());
    assert!(exporter.get_range(25, 30).is_empty());
}

#[test]
fn test_capacity_eviction() {
    let mut exporter = TimeIndexedExporter::new(10);
    for batch in 0..5u64 {
        let start = batch * 10;
        exporter
            .receive_data_points(&ticks(start..start + 10, 2, 8))
            .unwrap();
    }
    assert_eq!(exporter.distinct_times(), 10);
    assert_eq!(exporter.len(), 20);
    assert_eq!(times(exporter.points())[0], 40);
    assert_eq!(times(exporter.latest(1)), vec![49, 49]);
}

#[test]
fn test_nearest_search() {
    let mut exporter = TimeIndexedExporter::unbounded();
    assert_eq!(exporter.find_nearest(25), None);
    exporter
        .receive_data_points(&ticks((10..1000).step_by(10), 1, 0))
        .unwrap();
    assert_eq!(exporter.find_nearest(25), Some(1));
    assert_eq!(exporter.find_nearest(24), Some(1));
    assert_eq!(exporter.find_nearest(996), Some(98));
}

fn metrics_store() -> MetricsStore {
    MetricsStore::new(vec![
        MetricDescriptor::counter("requests", "Requests served", ValueKind::U64),
        MetricDescriptor::gauge("healthy", "Health", ValueKind::Bool),
    ])
    .unwrap()
}

#[test]
fn test_collector_to_time_indexed_exporter() {
    let mut store = metrics_store();
    let mut requests = store.initialize_metric::<U64>("requests");
    let mut collector = TimeSeriesCollector::default();
    let aggregate = collector.new_aggregate("eu|node-1");
    let mut exporter = TimeIndexedExporter::new(100);

    for tick in 0..5u64 {
        requests += 10;
        let size = store.storage_bytes();
        store.copy_storage(collector.new_data_point(&aggregate, tick, size));
        collector.flush_to_exporters(&mut [&mut exporter]).unwrap();
    }

    assert_eq!(collector.pooled_len(), 1);
    let latest = exporter.latest(1);
    let view = latest[0].views().unwrap().next().unwrap();
    assert_eq!(view.value_by_name("requests"), Some(Value::U64(50)));

    let json: serde_json::Value =
        serde_json::from_str(&exporter.get_json(1, 2, true).unwrap()).unwrap();
    assert_eq!(json[0]["time"], 1);
    assert_eq!(json[1]["metrics"][0]["requests"], 30);
    assert_eq!(json[1]["aggregate"], serde_json::json!(["eu", "node-1"]));
}

#[test]
fn test_value_records_bind_against_shared_metadata() {
    let mut store = metrics_store();
    let mut requests = store.initialize_metric::<U64>("requests");
    let mut collector = TimeSeriesCollector::default();
    let aggregate = collector.new_aggregate("records");

    for tick in 0..3u64 {
        requests.increment();
        let size = store.value_record_bytes();
        store.copy_values(collector.new_data_point(&aggregate, tick, size));
    }

    let metadata = store.metadata();
    let mut view = tally::View::new();
    view.bind_metadata(&metadata).unwrap();
    let seen: Vec<u64> = collector
        .live_points()
        .iter()
        .map(|p| {
            view.bind_values(p.metrics()).unwrap();
            view.value_as::<U64>(0).unwrap()
        })
        .collect();
    assert_eq!(seen, vec![1, 2, 3]);
}

#[test]
fn test_two_thread_pipeline() {
    let (mut producer, consumer) = handoff_queue();
    let index = Arc::new(Mutex::new(TimeIndexedExporter::new(1000)));
    let running = Arc::new(AtomicBool::new(true));

    let mut drain = DrainLoop::new(consumer, &DrainConfig::default())
        .with_exporter(Arc::clone(&index))
        .with_exporter(StreamExporter::new(Vec::new(), ExportFormat::Binary));
    let flag = Arc::clone(&running);
    let worker = std::thread::spawn(move || {
        drain.run(|| flag.load(Ordering::Acquire)).unwrap();
        drain
    });

    let mut store = metrics_store();
    let mut requests = store.initialize_metric::<U64>("requests");
    let mut collector = TimeSeriesCollector::default();
    let aggregate = collector.new_aggregate("pipeline");
    for tick in 0..200u64 {
        requests.increment();
        let size = store.storage_bytes();
        store.copy_storage(collector.new_data_point(&aggregate, tick, size));
        if tick % 10 == 9 {
            producer.push(collector.take_batch());
        }
    }
    running.store(false, Ordering::Release);
    let drain = worker.join().unwrap();
    assert_eq!(drain.delivered(), 20);

    let index = index.lock();
    assert_eq!(index.len(), 200);
    assert_eq!(times(index.get_range(195, 500)), vec![195, 196, 197, 198, 199]);
    let view = index.latest(1)[0].views().unwrap().next().unwrap();
    assert_eq!(view.value_by_name("requests"), Some(Value::U64(200)));
}

#[test]
fn test_binary_stream_round_trip() {
    let mut store = metrics_store();
    store.initialize_metric::<U64>("requests").set(9);
    let mut collector = TimeSeriesCollector::default();
    let aggregate = collector.new_aggregate("a|b|c");
    let size = store.storage_bytes();
    store.copy_storage(collector.new_data_point(&aggregate, 42, size));

    let mut stream = StreamExporter::new(Vec::new(), ExportFormat::Binary);
    collector.flush_to_exporters(&mut [&mut stream]).unwrap();

    let points = read_frames(stream.get_ref(), '|').unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].time(), 42);
    assert_eq!(points[0].aggregate().segments(), ["a", "b", "c"]);
    let view = points[0].views().unwrap().next().unwrap();
    assert_eq!(view.value_by_name("requests"), Some(Value::U64(9)));
}
