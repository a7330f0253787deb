// File: fresq-core/src/utils/code_gen.rs

use chrono::Utc;
use rand::Rng;
use fresq_common::models::code::{CODE_ALPHABET, CODE_LENGTH};

/// How many times a unique value is regenerated after a conflict before
/// giving up.
pub const MAX_GENERATION_ATTEMPTS: usize = 10;

fn random_from_alphabet(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// A fresh access code, e.g. `ABCD2345`.
pub fn generate_code() -> String {
    random_from_alphabet(CODE_LENGTH)
}

/// A fresh order identifier, `ORDER-<millis>-<9 chars>`.
pub fn generate_order_id() -> String {
    format!("ORDER-{}-{}", Utc::now().timestamp_millis(), random_from_alphabet(9))
}
