//! SQLite persistence of days, runs and benchmark sessions.

mod records;
mod schema;
mod store;

pub use records::{DayRecord, NewRun, NewSession, RunRecord, SessionRecord};
pub use store::Store;
