use hecs::{Entity, World};

use super::components::{ChartComponent, ScanComponent};

/// Hand queued scan results to the charts showing their key and remove the
/// processed scan entities.
pub fn apply_scans(world: &mut World) {
    let scans: Vec<(Entity, ScanComponent)> =
        world.query::<&ScanComponent>().iter().map(|(e, s)| (e, s.clone())).collect();

    if scans.is_empty() {
        return;
    }

    for (_, scan) in &scans {
        for (_, chart) in world.query::<&mut ChartComponent>().iter() {
            if chart.0.state().is_current(&scan.key) {
                chart.0.set_scan_result(Some(scan.scan.clone()));
            }
        }
    }

    for (e, _) in scans {
        let _ = world.despawn(e);
    }
}

/// Poll every chart's debounce timers; returns the active charts, which are
/// the only ones due for a redraw.
pub fn tick_system(world: &mut World, now_ms: u64) -> Vec<Entity> {
    let mut active = Vec::new();
    for (entity, chart) in world.query::<&mut ChartComponent>().iter() {
        chart.0.poll_timers(now_ms);
        if chart.0.is_active() {
            active.push(entity);
        }
    }
    active
}
