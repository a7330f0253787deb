// src/lib.rs

pub mod db;
pub mod repositories;
pub mod eventbus;
pub mod services;
pub mod utils;
pub mod test_utils;

pub use db::Database;
pub use fresq_common::error::Error;
pub use fresq_common::models;
