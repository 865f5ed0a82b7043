//! Infrastructure layer: datastore adapters and external collaborators.
//!
//! The boundary only needs point lookups and upserts keyed by id/unique
//! columns (§ store traits), plus a black-box mail dispatcher for password
//! resets. Each store trait ships an in-memory implementation (dev/test)
//! and a Postgres implementation (see `migrations/0001_schema.sql`).

pub mod mail;
pub mod store;

pub use mail::{LogMailer, MailDispatcher, MailError, UnconfiguredMailer};
pub use store::{
    AccountStore, AuditEntry, AuditQuery, AuditStore, BranchStore, ResetToken, ResetTokenStore,
    SectionOverrideStore, StoreError, DEFAULT_AUDIT_LIMIT,
};
