//! Diesel table definitions for the PostgreSQL schema.
//!
//! Must match `backend/migrations` exactly; regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Annotation records.
    ///
    /// One row per `(username, case_id, ai)`; `ai` is `true` for the
    /// with-aid pass.
    records (username, case_id, ai) {
        username -> Varchar,
        case_id -> Varchar,
        ai -> Bool,
        /// Opaque payload bytes (JSON text as written by the service).
        data -> Bytea,
        /// Accumulated annotation time in seconds.
        elapsed_time -> Int8,
        completed -> Bool,
        /// Server-assigned write time; never moves backwards.
        last_update -> Timestamptz,
    }
}
