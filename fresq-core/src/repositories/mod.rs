// src/repositories/mod.rs

pub use fresq_common::traits::repository_traits::{
    CodeRepository, GridConfigRepository, PackRepository, TicketRepository, TierRepository,
};

pub use postgres::{
    PostgresCodeRepository, PostgresGridConfigRepository, PostgresPackRepository,
    PostgresTicketRepository, PostgresTierRepository,
};

pub mod postgres;
