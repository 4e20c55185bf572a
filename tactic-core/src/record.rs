//! Types and traits for recording training metrics.
//!
//! * [`Record`] - A container of key-value pairs of various data types
//! * [`RecordValue`] - Values that can be stored in a [`Record`]
//! * [`Recorder`] - Interface for writing, storing and flushing records
//! * [`RecordStorage`] - Aggregation of stored records
//! * [`LogRecorder`] - Writes aggregated records with the `log` crate
//! * [`BufferedRecorder`] - Keeps records in memory
//!
//! ```rust
//! use tactic_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("episode", RecordValue::Scalar(3.0));
//! record.insert("loss_policy", RecordValue::Scalar(-0.02));
//! assert_eq!(record.get_scalar("episode").unwrap(), 3.0);
//! ```
mod base;
mod buffered_recorder;
mod log_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use log_recorder::LogRecorder;
pub use recorder::Recorder;
pub use storage::RecordStorage;
