use crate::ecs::EcsWorld;
use leptos::*;
use once_cell::sync::{Lazy, OnceCell};
use std::sync::Mutex;

/// Dashboard-wide reactive state shared by every mounted chart.
pub struct Globals {
    /// Charts currently visible and not dormant, refreshed on every registry tick.
    pub active_charts: RwSignal<usize>,
    /// Browser tab hidden; applied to new mounts.
    pub tab_hidden: RwSignal<bool>,
}

static GLOBALS: OnceCell<Globals> = OnceCell::new();

pub fn globals() -> &'static Globals {
    GLOBALS.get_or_init(|| Globals { active_charts: create_rw_signal(0), tab_hidden: create_rw_signal(false) })
}

pub fn active_charts() -> RwSignal<usize> {
    globals().active_charts
}

pub fn tab_hidden() -> RwSignal<bool> {
    globals().tab_hidden
}

static REGISTRY: Lazy<Mutex<EcsWorld>> = Lazy::new(|| Mutex::new(EcsWorld::new()));

/// Registry of every mounted chart instance.
pub fn registry() -> &'static Mutex<EcsWorld> {
    &REGISTRY
}
