pub mod collector;
pub mod config;
pub mod inspector;

pub use collector::{filter_libraries, DependencyCollector};
pub use config::DependencyConfig;
pub use inspector::{InspectionTool, ToolAvailability, ToolFlavor};
