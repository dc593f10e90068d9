pub mod memory_transfer_repository;
pub mod postgres_transfer_repository;

pub use memory_transfer_repository::MemoryTransferRepository;
pub use postgres_transfer_repository::PostgresTransferRepository;
