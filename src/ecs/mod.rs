use hecs::{Entity, World};

use crate::application::ChartInstance;

pub mod components;
pub mod systems;

/// Dashboard registry: every mounted chart container is one entity.
#[derive(Default)]
pub struct EcsWorld {
    pub world: World,
}

impl EcsWorld {
    /// Create a new empty ECS world.
    pub fn new() -> Self {
        Self { world: World::new() }
    }

    /// Spawn a new chart entity with its component.
    pub fn spawn_chart(&mut self, chart: ChartInstance) -> Entity {
        use crate::ecs::components::ChartComponent;
        self.world.spawn((ChartComponent(chart),))
    }

    /// Remove a chart on unmount. Unknown entities are ignored.
    pub fn despawn_chart(&mut self, entity: Entity) {
        let _ = self.world.despawn(entity);
    }

    /// Queue a scan result for every chart currently showing its key.
    pub fn publish_scan(&mut self, scan: components::ScanComponent) -> Entity {
        self.world.spawn((scan,))
    }

    /// Advance timers and return the charts that should draw this frame.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Entity> {
        systems::apply_scans(&mut self.world);
        systems::tick_system(&mut self.world, now_ms)
    }
}
