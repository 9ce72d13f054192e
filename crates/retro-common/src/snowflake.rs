//! Time-sortable ID generation.
//!
//! Retrospectives, items and groups get UUID v7 identifiers: globally
//! unique, generated without coordination, and ordered by creation time so
//! `ORDER BY id` doubles as chronological order.

use uuid::Uuid;

/// Generate a new time-sortable ID.
pub fn generate_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_sortable() {
        let first = generate_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = generate_id();
        assert_ne!(first, second);
        assert!(first < second);
    }
}
