//! Unique-name generation for test resources.
//!
//! Names are a four-digit random suffix (`1000..=9999`). Each thread draws
//! from rand's thread-local generator, which is seeded from OS entropy once
//! and never reseeded per call, so parallel tests need no shared counter
//! and no lock. Collisions are possible and surface as ordinary
//! "already exists" failures from the cloud provider.

use rand::Rng;

/// Lowest id produced.
pub const MIN_ID: u16 = 1000;
/// Highest id produced.
pub const MAX_ID: u16 = 9999;

/// Generate a short random numeric id, e.g. `"4821"`.
#[must_use]
pub fn unique_id() -> String {
    rand::rng().random_range(MIN_ID..=MAX_ID).to_string()
}

/// Generate `"{prefix}-{id}"`, e.g. `"test-4821"`.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", unique_id())
}

/// Check that `id` looks like something `unique_id` would return.
#[must_use]
pub fn is_valid_unique_id(id: &str) -> bool {
    id.len() == 4
        && id.bytes().all(|b| b.is_ascii_digit())
        && id
            .parse::<u16>()
            .is_ok_and(|n| (MIN_ID..=MAX_ID).contains(&n))
}
