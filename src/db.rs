pub mod store;
pub use store::InventoryStore;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod memory_store;
pub use memory_store::MemoryStore;
