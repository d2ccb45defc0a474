pub mod consumption;
pub mod dashboard_service;
pub mod expiry;
pub mod inventory_service;

pub use dashboard_service::DashboardService;
pub use inventory_service::InventoryService;
