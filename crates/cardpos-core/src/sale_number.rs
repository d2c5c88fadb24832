//! Sale number formatting.
//!
//! `V{yyyyMMdd}-{HHmmss}` in UTC. The first sale in a given second keeps the
//! base; later ones in the same second get `-2`, `-3`, ...

use chrono::{DateTime, Utc};

/// The second-resolution base number for a sale created at `at`.
pub fn base_sale_number(at: DateTime<Utc>) -> String {
    at.format("V%Y%m%d-%H%M%S").to_string()
}

/// Appends the same-second sequence to `base`. `sequence` starts at 1.
pub fn with_sequence(base: &str, sequence: u32) -> String {
    if sequence <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, sequence)
    }
}
