use crate::application::ChartInstance;
use crate::domain::chart::ScanResult;
use crate::domain::market_data::SeriesKey;
use std::sync::Arc;

/// ECS component containing one chart container.
pub struct ChartComponent(pub ChartInstance);

/// ECS component carrying a scan result for one series key. Consumed by
/// [`super::systems::apply_scans`].
#[derive(Debug, Clone)]
pub struct ScanComponent {
    pub key: SeriesKey,
    pub scan: Arc<ScanResult>,
}
