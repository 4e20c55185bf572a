//! Snapshots of named parameters.
//!
//! A [`ParamSnapshot`] is an immutable deep copy of every variable of a
//! [`VarMap`]. Restoring it into another map of the same architecture makes
//! both networks compute identical outputs, which is how the frozen target
//! network of PPO is synchronized.
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::VarMap;
use std::collections::HashMap;
use tactic_core::error::TacticError;

fn poisoned() -> TacticError {
    TacticError::InvalidState("parameter store lock is poisoned".into())
}

/// Immutable copy of named parameters.
pub struct ParamSnapshot {
    tensors: HashMap<String, Tensor>,
}

impl ParamSnapshot {
    /// Copies every variable of `varmap`.
    pub fn snapshot(varmap: &VarMap) -> Result<Self> {
        let data = varmap.data().lock().map_err(|_| poisoned())?;
        let mut tensors = HashMap::with_capacity(data.len());
        for (name, var) in data.iter() {
            tensors.insert(name.clone(), var.as_tensor().copy()?.detach());
        }
        Ok(Self { tensors })
    }

    /// Overwrites the variables of `varmap` with the copied values.
    ///
    /// Fails if a variable of `varmap` has no counterpart in the snapshot.
    pub fn restore_into(&self, varmap: &VarMap) -> Result<()> {
        let data = varmap.data().lock().map_err(|_| poisoned())?;
        if data.len() != self.tensors.len() {
            return Err(TacticError::InvalidState(format!(
                "snapshot holds {} parameters, store holds {}",
                self.tensors.len(),
                data.len()
            ))
            .into());
        }
        for (name, var) in data.iter() {
            let src = self.tensors.get(name).ok_or_else(|| {
                TacticError::InvalidState(format!("parameter {} is not in the snapshot", name))
            })?;
            var.set(src)?;
        }
        Ok(())
    }

    /// The number of parameters.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Returns `true` if the snapshot holds no parameter.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Copied value of a parameter.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::Init;

    fn varmap_with(values: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        vm.get((values.len(),), "w", init, DType::F32, &Device::Cpu)?;
        let t = Tensor::from_slice(values, (values.len(),), &Device::Cpu)?;
        vm.data().lock().unwrap().get("w").unwrap().set(&t)?;
        Ok(vm)
    }

    fn values(vm: &VarMap) -> Vec<f32> {
        let data = vm.data().lock().unwrap();
        data.get("w").unwrap().as_tensor().to_vec1::<f32>().unwrap()
    }

    #[test]
    fn test_snapshot_is_isolated_from_source() -> Result<()> {
        let src = varmap_with(&[1.0, 2.0, 3.0])?;
        let snapshot = ParamSnapshot::snapshot(&src)?;

        // later updates of the source do not leak into the snapshot
        let t = Tensor::from_slice(&[7f32, 8.0, 9.0], (3,), &Device::Cpu)?;
        src.data().lock().unwrap().get("w").unwrap().set(&t)?;
        assert_eq!(snapshot.get("w").unwrap().to_vec1::<f32>()?, vec![1.0, 2.0, 3.0]);

        let dest = varmap_with(&[4.0, 5.0, 6.0])?;
        snapshot.restore_into(&dest)?;
        assert_eq!(values(&dest), vec![1.0, 2.0, 3.0]);
        assert_eq!(values(&src), vec![7.0, 8.0, 9.0]);
        assert_eq!(snapshot.len(), 1);
        Ok(())
    }

    #[test]
    fn test_restore_rejects_mismatched_store() -> Result<()> {
        let src = varmap_with(&[1.0])?;
        let snapshot = ParamSnapshot::snapshot(&src)?;
        let dest = VarMap::new();
        assert!(snapshot.restore_into(&dest).is_err());
        Ok(())
    }
}
