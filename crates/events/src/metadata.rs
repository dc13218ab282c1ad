//! Session-wide correlation id shared by every event of one invocation.

use std::sync::OnceLock;
use uuid::Uuid;

static CORRELATION_ID: OnceLock<Uuid> = OnceLock::new();

/// Get or create the correlation ID for this process.
#[must_use]
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

/// Set the correlation ID before any event is emitted.
///
/// Returns `false` if an ID was already assigned.
pub fn set_correlation_id(id: Uuid) -> bool {
    CORRELATION_ID.set(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_is_stable() {
        let first = correlation_id();
        assert_eq!(first, correlation_id());
        assert!(!set_correlation_id(Uuid::new_v4()));
        assert_eq!(first, correlation_id());
    }
}
