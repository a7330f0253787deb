// src/repositories/postgres/mod.rs

pub mod codes;
pub mod grid_config;
pub mod packs;
pub mod tickets;
pub mod tiers;

pub use codes::PostgresCodeRepository;
pub use grid_config::PostgresGridConfigRepository;
pub use packs::PostgresPackRepository;
pub use tickets::PostgresTicketRepository;
pub use tiers::PostgresTierRepository;
