//! Records of named values.
use crate::error::TacticError;
use std::collections::{hash_map, HashMap};

/// A value in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A metric such as a loss or a return.
    Scalar(f32),

    /// Free text, e.g. the name of a scenario.
    String(String),
}

/// Named values emitted by environments, agents and the trainer.
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// A record without entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A record with a single scalar.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        let mut record = Self::empty();
        record.insert(name, RecordValue::Scalar(value));
        record
    }

    /// Builds a record from `(name, value)` pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        let mut record = Self::empty();
        for (k, v) in s.iter() {
            record.insert(k.clone(), v.clone());
        }
        record
    }

    /// Names of the entries.
    pub fn keys(&self) -> hash_map::Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> hash_map::Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Inserts a value, replacing the one with the same name.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Gets a value of any type.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Moves every entry of `record` into `self`, overwriting on collision.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    /// Gets a scalar.
    pub fn get_scalar(&self, k: &str) -> Result<f32, TacticError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(TacticError::RecordValueTypeError(format!("{} is not a scalar", k))),
            None => Err(TacticError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string.
    pub fn get_string(&self, k: &str) -> Result<String, TacticError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(TacticError::RecordValueTypeError(format!("{} is not a string", k))),
            None => Err(TacticError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns `true` if the record has no entry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let mut record = Record::from_scalar("loss_policy", 0.5);
        record.insert("scenario", RecordValue::String("MoveToBeacon".into()));

        assert_eq!(record.get_scalar("loss_policy").unwrap(), 0.5);
        assert_eq!(record.get_string("scenario").unwrap(), "MoveToBeacon");
        assert!(matches!(
            record.get_scalar("scenario"),
            Err(TacticError::RecordValueTypeError(_))
        ));
        assert!(matches!(
            record.get_scalar("loss_value"),
            Err(TacticError::RecordKeyError(_))
        ));
    }

    #[test]
    fn test_merge_overwrites() {
        let mut record = Record::from_slice(&[
            ("ticks", RecordValue::Scalar(3.0)),
            ("connection_faults", RecordValue::Scalar(0.0)),
        ]);
        record.merge_inplace(Record::from_scalar("ticks", 5.0));
        assert_eq!(record.get_scalar("ticks").unwrap(), 5.0);
        assert_eq!(record.len(), 2);
    }
}
