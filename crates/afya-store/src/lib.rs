//! Record store for the AfyaMkononi backend
//!
//! This crate provides:
//! - The [`RecordStore`] contract the memory agent writes interactions through
//! - SQLite storage for consultation records and the vitals log

pub mod records;
pub mod sqlite;

pub use records::{
    ConsultationRecord, InteractionRecord, RecordStore, SaveOutcome, VitalKind, VitalStatus,
    VitalsRecord,
};
pub use sqlite::ConsultationDb;
