use super::{Record, RecordStorage, RecordValue, Recorder};
use log::info;

/// Writes records with [`log::info!`].
///
/// Stored records are aggregated by [`RecordStorage`] and written on flush.
#[derive(Default)]
pub struct LogRecorder {
    storage: RecordStorage,
}

impl LogRecorder {
    /// Constructs the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn format(record: &Record) -> String {
        let mut entries = record
            .iter()
            .map(|(k, v)| match v {
                RecordValue::Scalar(v) => format!("{}={:.5}", k, v),
                RecordValue::String(s) => format!("{}={}", k, s),
            })
            .collect::<Vec<_>>();
        entries.sort();
        entries.join(", ")
    }
}

impl Recorder for LogRecorder {
    fn write(&mut self, record: Record) {
        info!("{}", Self::format(&record));
    }

    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        if self.storage.is_empty() {
            return;
        }
        let record = self.storage.aggregate();
        info!("[{}] {}", step, Self::format(&record));
    }
}
