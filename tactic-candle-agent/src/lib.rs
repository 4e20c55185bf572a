//! PPO agent with recurrent policies, implemented with
//! [candle](https://crates.io/crates/candle-core).
//!
//! * [`ppo::Ppo`] is the agent: it samples composite actions, keeps the
//!   recurrent state in sync with episode boundaries, stores transitions in a
//!   [`TrajectoryBuffer`](tactic_core::trajectory_buffer::TrajectoryBuffer)
//!   and runs clipped PPO updates against a frozen target network.
//! * [`model::RecurrentPolicy`] is the interface of networks, with
//!   [`recurrent_mlp::RecurrentMlp`] as the provided implementation.
//! * [`param_store::ParamSnapshot`] copies and restores named parameters.
pub mod model;
pub mod opt;
pub mod param_store;
pub mod ppo;
pub mod recurrent_mlp;
use candle_core::DeviceLocation;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// A CUDA device.
    Cuda(usize),

    /// A Metal device.
    Metal(usize),
}

impl From<&candle_core::Device> for Device {
    fn from(device: &candle_core::Device) -> Self {
        match device.location() {
            DeviceLocation::Cpu => Self::Cpu,
            DeviceLocation::Cuda { gpu_id } => Self::Cuda(gpu_id),
            DeviceLocation::Metal { gpu_id } => Self::Metal(gpu_id),
        }
    }
}

impl TryFrom<Device> for candle_core::Device {
    type Error = candle_core::Error;

    fn try_from(device: Device) -> Result<Self, Self::Error> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => candle_core::Device::new_cuda(n),
            Device::Metal(n) => candle_core::Device::new_metal(n),
        }
    }
}
