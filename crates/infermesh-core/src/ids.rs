//! Unique-id generation seam.

/// Generates opaque unique identifiers.
///
/// Used for token ids (`jti`) and job ids. Injected so that tests can
/// assert on predictable ids.
pub trait IdGenerator: Send + Sync {
    /// Produce a new unique id.
    fn generate(&self) -> String;
}

/// Production generator producing random UUIDv4 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic generator for tests: `prefix-0`, `prefix-1`, ...
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: std::sync::atomic::AtomicU64,
}

#[cfg(any(test, feature = "test-utils"))]
impl SequentialIdGenerator {
    /// Create a generator with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}
