//! Record storage and aggregation.
use super::{Record, RecordValue};
use std::collections::BTreeSet;

/// A storage of records with aggregation.
///
/// Scalars are summarized with min, max, mean and median. For other value
/// types the most recent value is kept.
#[derive(Default)]
pub struct RecordStorage {
    data: Vec<Record>,
}

fn min(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().copied().fold(f32::INFINITY, f32::min))
}

fn max(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().copied().fold(f32::NEG_INFINITY, f32::max))
}

fn mean(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().sum::<f32>() / vs.len() as f32)
}

/// Sorts the values in place.
fn median(mut vs: Vec<f32>) -> RecordValue {
    vs.sort_by(|x, y| x.total_cmp(y));
    RecordValue::Scalar(vs[vs.len() / 2])
}

impl RecordStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self { data: vec![] }
    }

    /// Stores a record.
    pub fn store(&mut self, record: Record) {
        self.data.push(record);
    }

    /// The number of stored records.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn keys(&self) -> BTreeSet<String> {
        self.data
            .iter()
            .flat_map(|record| record.keys().cloned())
            .collect()
    }

    fn latest(&self, key: &str) -> Option<RecordValue> {
        self.data
            .iter()
            .rev()
            .find_map(|record| record.get(key).cloned())
    }

    fn scalar(&self, key: &str) -> Record {
        let vs: Vec<f32> = self
            .data
            .iter()
            .filter_map(|record| match record.get(key) {
                Some(RecordValue::Scalar(v)) => Some(*v),
                _ => None,
            })
            .collect();

        if vs.len() == 1 {
            Record::from_scalar(key, vs[0])
        } else {
            Record::from_slice(&[
                (format!("{}_min", key), min(&vs)),
                (format!("{}_max", key), max(&vs)),
                (format!("{}_mean", key), mean(&vs)),
                (format!("{}_median", key), median(vs)),
            ])
        }
    }

    /// Aggregates all stored records and clears the storage.
    pub fn aggregate(&mut self) -> Record {
        let mut record = Record::empty();

        for key in self.keys().iter() {
            match self.latest(key) {
                Some(RecordValue::Scalar(_)) => record.merge_inplace(self.scalar(key)),
                Some(value) => record.insert(key.clone(), value),
                None => {}
            }
        }

        self.data.clear();

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_scalars() {
        let mut storage = RecordStorage::new();
        for v in [3.0, 1.0, 2.0] {
            storage.store(Record::from_scalar("loss", v));
        }
        storage.store(Record::from_scalar("episode", 7.0));

        let record = storage.aggregate();
        assert_eq!(record.get_scalar("loss_min").unwrap(), 1.0);
        assert_eq!(record.get_scalar("loss_max").unwrap(), 3.0);
        assert_eq!(record.get_scalar("loss_mean").unwrap(), 2.0);
        assert_eq!(record.get_scalar("loss_median").unwrap(), 2.0);
        assert_eq!(record.get_scalar("episode").unwrap(), 7.0);
        assert!(storage.is_empty());
    }
}
