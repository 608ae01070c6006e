//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Ordering records for every sequenced list.
    ///
    /// Keyed by `(list_kind, item_id)`: an item appears at most once per list.
    sequence_entries (list_kind, item_id) {
        /// Wire name of the list, for example `course_modules`.
        list_kind -> Text,
        /// Catalogue entity being ordered.
        item_id -> Uuid,
        /// Parent entity of the scope; the nil UUID for global lists.
        scope_id -> Uuid,
        /// Position `1..=N`, or `-1` for the sentinel.
        sequence -> Int4,
        /// Whether the item takes part in the visible order.
        active -> Bool,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}
