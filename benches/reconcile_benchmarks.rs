use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use price_chart_sync::domain::chart::{
    CoordinateProvider, LogicalRange, OverlayCompositor, ReconciliationState, ScanResult, SeriesReconciler,
    SessionBandPoint, SessionCalendar, SurfaceSize, normalize,
};
use price_chart_sync::domain::market_data::{RawPoint, SeriesKey, SeriesKind, TimePoint, Timestamp};

/// Provider that only keeps what the reconciler writes.
struct NullProvider {
    range: Option<LogicalRange>,
}

impl CoordinateProvider for NullProvider {
    fn set_data(&mut self, points: &[TimePoint]) {
        black_box(points.len());
    }
    fn set_session_band(&mut self, band: &[SessionBandPoint]) {
        black_box(band.len());
    }
    fn time_to_coordinate(&self, time: Timestamp) -> Option<f64> {
        Some((time.value() % 2000) as f64)
    }
    fn price_to_coordinate(&self, price: f64) -> Option<f64> {
        Some(600.0 - price)
    }
    fn visible_logical_range(&self) -> Option<LogicalRange> {
        self.range
    }
    fn set_visible_logical_range(&mut self, range: LogicalRange) {
        self.range = Some(range);
    }
    fn visible_time_range(&self) -> Option<(Timestamp, Timestamp)> {
        None
    }
    fn scroll_to_live(&mut self) {}
    fn fit_content(&mut self) {}
    fn set_auto_scale(&mut self, _enabled: bool) {}
    fn resize(&mut self, _size: SurfaceSize) {}
}

/// One-minute candles with a little wobble and a duplicate every 50 bars.
fn generate_snapshot(count: usize) -> Vec<RawPoint> {
    let mut points = Vec::with_capacity(count + count / 50);
    for i in 0..count {
        let close = 500.0 + (i as f64 * 0.1).sin() * 20.0;
        let point = RawPoint {
            time: Some(1_705_276_800 + i as i64 * 60),
            open: Some(close - 1.0),
            high: Some(close + 3.0),
            low: Some(close - 3.0),
            close: Some(close),
            value: None,
        };
        points.push(point);
        if i % 50 == 0 {
            points.push(point);
        }
    }
    points
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for size in [1_000, 10_000, 50_000] {
        let snapshot = generate_snapshot(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshot, |b, snapshot| {
            b.iter(|| normalize(black_box(snapshot)))
        });
    }
    group.finish();
}

fn bench_session_band(c: &mut Criterion) {
    let calendar = SessionCalendar::default();
    let points = normalize(&generate_snapshot(10_000));
    c.bench_function("session_band_10k", |b| b.iter(|| calendar.compute_band(black_box(&points))));
}

fn bench_prepend(c: &mut Criterion) {
    let reconciler = SeriesReconciler::default();
    let key = SeriesKey::from("BTC");
    let full = generate_snapshot(5_000);
    let tail = full[1_000..].to_vec();

    c.bench_function("reconcile_prepend_5k", |b| {
        b.iter(|| {
            let mut provider = NullProvider { range: Some(LogicalRange::new(10.0, 120.0)) };
            let (state, _) =
                reconciler.reconcile(ReconciliationState::default(), &key, SeriesKind::Price, &tail, &mut provider);
            reconciler.reconcile(state, &key, SeriesKind::Price, black_box(&full), &mut provider)
        })
    });
}

fn bench_compose(c: &mut Criterion) {
    let zones: Vec<String> = (0..200)
        .map(|i| {
            format!(
                r#"{{"timeStart": {}, "timeEnd": {}, "priceStart": {}, "priceEnd": {}, "type": "supply"}}"#,
                1_705_276_800 + i * 600,
                1_705_276_800 + i * 600 + 1800,
                400 + i,
                410 + i
            )
        })
        .collect();
    let scan = ScanResult::from_json(&format!(r#"{{"zones": [{}]}}"#, zones.join(","))).unwrap_or_default();
    let provider = NullProvider { range: None };
    let compositor = OverlayCompositor::default();
    let size = SurfaceSize::new(1600.0, 600.0);

    c.bench_function("compose_200_zones", |b| b.iter(|| compositor.compose(Some(black_box(&scan)), &provider, size)));
}

criterion_group!(benches, bench_normalize, bench_session_band, bench_prepend, bench_compose);
criterion_main!(benches);
