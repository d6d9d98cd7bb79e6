//! Shared test infrastructure.
//!
//! - `TestDatabase`: disposable PostgreSQL container with the workspace
//!   migrations applied (feature `postgres`, on by default)
//! - `TestDataBuilder`: deterministic, per-test unique data
//! - `assertions`: small assertion helpers
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_postgres_test");
//!
//!     let email = builder.email("owner");
//!     let nickname = builder.nickname("owner");
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

/// Password that satisfies the account password policy.
pub const STRONG_PASSWORD: &str = "Sup3r$ecret!";

/// Seeded generator so every test gets its own, reproducible identifiers.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed derived from the test name.
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_register_user");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    pub fn user_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// Free-form label, e.g. `test-bio-1234-long`.
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// URL-safe nickname, well under the 50 character limit.
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let nickname = TestDataBuilder::new(42).nickname("alice");
    /// assert_eq!(nickname, "alice_42");
    /// ```
    pub fn nickname(&self, suffix: &str) -> String {
        format!("{}_{}", suffix, self.seed % 1_000_000_000)
    }

    pub fn email(&self, suffix: &str) -> String {
        format!("{}.{}@example.com", suffix, self.seed)
    }
}

pub mod assertions {
    use uuid::Uuid;

    pub fn assert_uuid_eq(actual: Uuid, expected: Uuid, context: &str) {
        assert_eq!(
            actual, expected,
            "{}: expected UUID {}, got {}",
            context, expected, actual
        );
    }

    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
