use super::Record;

/// Destination of the records of a training run.
///
/// Per-optimization records are written immediately. Per-episode records
/// are stored and written as aggregates when the trainer flushes.
pub trait Recorder {
    /// Writes a record immediately.
    fn write(&mut self, record: Record);

    /// Keeps a record for the next flush.
    fn store(&mut self, record: Record);

    /// Writes the aggregate of the stored records, tagged with `step`, and
    /// forgets them.
    fn flush(&mut self, step: i64);
}
