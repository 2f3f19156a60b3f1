// crates/bt_physics/src/sediment/mod.rs

//! 沉积层动态管理
//!
//! - [`deposition`]: 沉积质量 → 层填充与新建
//! - [`properties`]: 孔隙率、临界剪切应力、侵蚀率推导

pub mod deposition;
pub mod properties;

pub use deposition::{DepositPlan, Deposition, DepositionReport};
pub use properties::SedimentProperties;
