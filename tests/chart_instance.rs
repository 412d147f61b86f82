mod common;

use common::{CollectingSink, DebugEncoder, MockProvider, RecordingSurface, candles};
use price_chart_sync::application::{ChartInstance, EngineConfig, FrameTask, FrameTransition, HistoryRequest, HoverUpdate};
use price_chart_sync::domain::chart::{
    CrosshairEvent, DrawCommand, LogicalRange, PixelBuffer, ProviderCapabilities, ScanResult, SurfaceSize,
};
use price_chart_sync::domain::market_data::{Marker, MarkerPosition, SeriesKey, SeriesKind, Timestamp};
use std::sync::Arc;

// 2024-01-15 13:00 UTC, 08:00 in New York
const NY_MORNING: i64 = 1_705_323_600;

fn chart(capabilities: ProviderCapabilities) -> ChartInstance {
    ChartInstance::new("main", SeriesKind::Price, &EngineConfig::default(), capabilities).unwrap()
}

fn loaded_chart(provider: &mut MockProvider) -> ChartInstance {
    let mut chart = chart(provider.capabilities);
    chart.apply_snapshot(&SeriesKey::from("BTC"), &candles(NY_MORNING, 10, 60), provider);
    chart
}

#[test]
fn invalid_config_is_rejected() {
    let config = EngineConfig { session_timezone: "Nowhere/Special".to_string(), ..EngineConfig::default() };
    assert!(ChartInstance::new("main", SeriesKind::Price, &config, ProviderCapabilities::default()).is_err());
}

#[test]
fn history_request_fires_once_until_debounce_expires() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    let near_start = LogicalRange::new(10.0, 60.0);

    assert_eq!(
        chart.on_visible_range_changed(near_start),
        Some(HistoryRequest { key: SeriesKey::from("BTC"), oldest: Timestamp::new(NY_MORNING) })
    );
    assert_eq!(chart.on_visible_range_changed(near_start), None);

    chart.history_load_finished(&SeriesKey::from("BTC"), 1_000);
    chart.poll_timers(1_499);
    assert!(chart.state().fetch_in_flight);
    assert_eq!(chart.on_visible_range_changed(near_start), None);

    chart.poll_timers(1_500);
    assert!(!chart.state().fetch_in_flight);
    assert!(chart.on_visible_range_changed(near_start).is_some());
}

#[test]
fn later_load_signal_replaces_pending_deadline() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    chart.on_visible_range_changed(LogicalRange::new(0.0, 30.0));

    chart.history_load_finished(&SeriesKey::from("BTC"), 1_000);
    chart.history_load_finished(&SeriesKey::from("BTC"), 1_300);
    chart.poll_timers(1_500);
    assert!(chart.state().fetch_in_flight);
    chart.poll_timers(1_800);
    assert!(!chart.state().fetch_in_flight);
}

#[test]
fn range_away_from_start_never_requests() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    assert_eq!(chart.on_visible_range_changed(LogicalRange::new(50.0, 90.0)), None);
}

#[test]
fn stale_history_page_is_dropped() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    chart.apply_snapshot(&SeriesKey::from("ETH"), &candles(NY_MORNING, 5, 60), &mut provider);

    let page = candles(NY_MORNING - 6000, 110, 60);
    assert!(chart.apply_history_page(&SeriesKey::from("BTC"), &page, &mut provider).is_none());
    assert_eq!(provider.data.len(), 5);

    let outcome = chart.apply_history_page(&SeriesKey::from("ETH"), &page, &mut provider);
    assert!(outcome.is_some());
    assert_eq!(chart.points().len(), 110);
}

#[test]
fn finished_load_for_stale_key_is_ignored() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    chart.on_visible_range_changed(LogicalRange::new(0.0, 30.0));

    chart.history_load_finished(&SeriesKey::from("ETH"), 0);
    chart.poll_timers(10_000);
    assert!(chart.state().fetch_in_flight);
}

#[test]
fn dormancy_stops_frames_but_not_timers() {
    let mut provider = MockProvider::new();
    let mut surface = RecordingSurface::new(400.0, 200.0);
    let mut chart = loaded_chart(&mut provider);

    assert_eq!(chart.set_intersecting(true), FrameTransition::Start);
    assert_eq!(chart.frame_task(), FrameTask::Running);
    chart.on_frame(0, &mut provider, &mut surface);
    assert_eq!(surface.frames.len(), 1);

    chart.on_visible_range_changed(LogicalRange::new(0.0, 30.0));
    chart.history_load_finished(&SeriesKey::from("BTC"), 0);

    assert_eq!(chart.set_dormant(true), FrameTransition::Stop);
    assert!(!chart.is_active());
    chart.on_frame(1_000, &mut provider, &mut surface);
    assert_eq!(surface.frames.len(), 1);
    assert!(!chart.state().fetch_in_flight);

    assert_eq!(chart.set_intersecting(false), FrameTransition::Unchanged);
    assert_eq!(chart.set_dormant(false), FrameTransition::Unchanged);
    assert_eq!(chart.set_intersecting(true), FrameTransition::Start);
}

#[test]
fn resize_burst_applies_latest_size_once() {
    let mut provider = MockProvider::new();
    let mut surface = RecordingSurface::new(400.0, 200.0);
    let mut chart = loaded_chart(&mut provider);

    chart.request_resize(500.0, 250.0);
    chart.request_resize(800.0, 400.0);
    chart.on_frame(0, &mut provider, &mut surface);
    chart.on_frame(16, &mut provider, &mut surface);

    assert_eq!(provider.count("resize"), 1);
    assert_eq!(provider.size, Some(SurfaceSize::new(800.0, 400.0)));
    assert_eq!(surface.size, SurfaceSize::new(800.0, 400.0));
}

#[test]
fn frame_without_scan_only_clears() {
    let mut provider = MockProvider::new();
    let mut surface = RecordingSurface::new(400.0, 200.0);
    let mut chart = loaded_chart(&mut provider);
    chart.on_frame(0, &mut provider, &mut surface);
    assert_eq!(surface.frames, vec![vec![DrawCommand::Clear]]);

    surface.fail = true;
    chart.on_frame(16, &mut provider, &mut surface);
    assert_eq!(surface.frames.len(), 1);
}

#[test]
fn hover_shows_tooltip_once_per_bar() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);

    let HoverUpdate::Show(payload) = chart.on_crosshair_move(CrosshairEvent::at(10.0, 20.0, NY_MORNING)) else {
        panic!("expected tooltip");
    };
    assert_eq!((payload.x, payload.y), (10.0, 20.0));
    assert_eq!(payload.primary_label, "O 99.00  H 102.00  L 98.00  C 100.00");
    assert_eq!(payload.secondary_label, "Jan 15 08:00 · New York AM");

    assert_eq!(chart.on_crosshair_move(CrosshairEvent::at(12.0, 20.0, NY_MORNING)), HoverUpdate::Unchanged);
    assert!(matches!(chart.on_crosshair_move(CrosshairEvent::at(30.0, 20.0, NY_MORNING + 60)), HoverUpdate::Show(_)));

    let HoverUpdate::Hide(Some(legend)) = chart.on_crosshair_move(CrosshairEvent::left()) else {
        panic!("expected legend");
    };
    assert_eq!(legend.time, Timestamp::new(NY_MORNING + 540));
    assert_eq!(legend.label, "O 108.00  H 111.00  L 107.00  C 109.00");
    assert_eq!(chart.on_crosshair_move(CrosshairEvent::left()), HoverUpdate::Unchanged);
}

#[test]
fn hover_over_unknown_time_hides() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    chart.on_crosshair_move(CrosshairEvent::at(10.0, 20.0, NY_MORNING));
    assert!(matches!(chart.on_crosshair_move(CrosshairEvent::at(10.0, 20.0, NY_MORNING + 7)), HoverUpdate::Hide(_)));
}

#[test]
fn hover_is_ignored_while_dormant() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    chart.set_dormant(true);
    assert_eq!(chart.on_crosshair_move(CrosshairEvent::at(10.0, 20.0, NY_MORNING)), HoverUpdate::Unchanged);
}

#[test]
fn markers_are_forwarded_only_when_supported_and_changed() {
    let marker = |time: i64| Marker {
        time: Timestamp::new(time),
        position: MarkerPosition::BelowBar,
        shape: "arrowUp".to_string(),
        color: "#22c55e".to_string(),
        text: "entry".to_string(),
    };

    let mut plain = MockProvider::new();
    let mut chart = loaded_chart(&mut plain);
    assert!(!chart.set_markers(vec![marker(NY_MORNING)], &mut plain));
    assert!(plain.markers.is_empty());

    let mut provider = MockProvider::new();
    provider.capabilities.markers = true;
    let mut chart = loaded_chart(&mut provider);
    assert!(chart.set_markers(vec![marker(NY_MORNING)], &mut provider));
    assert!(!chart.set_markers(vec![marker(NY_MORNING)], &mut provider));
    assert!(chart.set_markers(vec![marker(NY_MORNING + 60)], &mut provider));
    assert_eq!(provider.markers.len(), 2);
}

#[test]
fn snapshot_composites_overlay_and_flashes_on_manual_capture() {
    let mut provider = MockProvider::new();
    provider.capabilities.screenshot = true;
    provider.screenshot = Some(PixelBuffer::filled(2, 2, [0, 0, 0, 255]));
    let mut surface = RecordingSurface::new(2.0, 2.0);
    surface.pixels = Some(PixelBuffer::filled(1, 1, [255, 255, 255, 128]));
    let sink = CollectingSink::default();
    let mut chart = loaded_chart(&mut provider);

    assert!(chart.export_snapshot(&provider, &surface, &DebugEncoder, &sink, false, 1_000));
    assert_eq!(sink.delivered.borrow().as_slice(), &[("2x2:[128, 128, 128, 255]".to_string(), false)]);
    assert!(chart.is_flashing(1_100));
    assert!(!chart.is_flashing(1_300));

    assert!(chart.export_snapshot(&provider, &surface, &DebugEncoder, &sink, true, 5_000));
    assert!(!chart.is_flashing(5_001));
    assert_eq!(sink.delivered.borrow().len(), 2);
}

#[test]
fn snapshot_without_capability_never_reaches_sink() {
    let mut provider = MockProvider::new();
    provider.screenshot = Some(PixelBuffer::filled(2, 2, [0, 0, 0, 255]));
    let surface = RecordingSurface::new(2.0, 2.0);
    let sink = CollectingSink::default();
    let mut chart = loaded_chart(&mut provider);

    assert!(!chart.export_snapshot(&provider, &surface, &DebugEncoder, &sink, false, 0));
    assert!(sink.delivered.borrow().is_empty());
    assert!(!chart.is_flashing(1));
}

#[test]
fn failed_screenshot_is_swallowed() {
    let mut provider = MockProvider::new();
    provider.capabilities.screenshot = true;
    let surface = RecordingSurface::new(2.0, 2.0);
    let sink = CollectingSink::default();
    let mut chart = loaded_chart(&mut provider);

    assert!(!chart.export_snapshot(&provider, &surface, &DebugEncoder, &sink, false, 0));
    assert!(sink.delivered.borrow().is_empty());
}

#[test]
fn click_resolves_exact_bar() {
    let mut provider = MockProvider::new();
    let chart = loaded_chart(&mut provider);
    assert_eq!(chart.on_click(Timestamp::new(NY_MORNING + 120)).map(|p| p.time.value()), Some(NY_MORNING + 120));
    assert!(chart.on_click(Timestamp::new(NY_MORNING + 121)).is_none());
}

#[test]
fn sync_frame_starts_task_for_visible_chart() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    assert_eq!(chart.frame_task(), FrameTask::Idle);
    assert_eq!(chart.sync_frame(), FrameTransition::Start);
    assert_eq!(chart.sync_frame(), FrameTransition::Unchanged);
    assert_eq!(chart.set_dormant(true), FrameTransition::Stop);
}

#[test]
fn key_swap_clears_previous_scan() {
    let mut provider = MockProvider::with_visible(0, 6_000, 0.1);
    let mut surface = RecordingSurface::new(600.0, 300.0);
    let mut chart = loaded_chart(&mut provider);
    let scan = ScanResult::from_json(
        r#"{"zones": [{"timeStart": 600, "timeEnd": 1200, "priceStart": 150, "priceEnd": 160, "type": "supply"}]}"#,
    )
    .unwrap();
    chart.set_scan_result(Some(Arc::new(scan)));

    chart.on_frame(0, &mut provider, &mut surface);
    assert!(surface.frames[0].iter().any(|c| matches!(c, DrawCommand::FillRect { .. })));

    let outcome = chart.apply_snapshot(&SeriesKey::from("ETH"), &candles(0, 50, 60), &mut provider);
    assert!(outcome.key_changed);
    assert!(chart.scan_result().is_none());

    chart.on_frame(16, &mut provider, &mut surface);
    assert_eq!(surface.frames[1], vec![DrawCommand::Clear]);
}

#[test]
fn scan_survives_updates_for_same_key() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    chart.set_scan_result(Some(Arc::new(ScanResult::default())));

    chart.apply_snapshot(&SeriesKey::from("BTC"), &candles(0, 101, 60), &mut provider);
    assert!(chart.scan_result().is_some());
}

#[test]
fn host_dormancy_outlasts_tab_visibility() {
    let mut provider = MockProvider::new();
    let mut chart = loaded_chart(&mut provider);
    assert_eq!(chart.sync_frame(), FrameTransition::Start);

    assert_eq!(chart.set_dormant(true), FrameTransition::Stop);
    assert_eq!(chart.set_tab_hidden(true), FrameTransition::Unchanged);
    assert_eq!(chart.set_tab_hidden(false), FrameTransition::Unchanged);
    assert!(!chart.is_active());

    assert_eq!(chart.set_dormant(false), FrameTransition::Start);
    assert_eq!(chart.set_tab_hidden(true), FrameTransition::Stop);
    assert_eq!(chart.set_tab_hidden(false), FrameTransition::Start);
}
