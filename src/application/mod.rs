pub mod chart_service;
pub mod config;
pub mod history;
pub mod lifecycle;

pub use chart_service::*;
pub use config::*;
pub use history::*;
pub use lifecycle::*;
