// crates/bt_physics/src/lib.rs

//! BoxTracer 箱式分层示踪剂输运引擎
//!
//! 在由多边形箱体组成的空间域内，对溶解态和颗粒态示踪剂执行输运与转化。
//! 每个箱体有一个水柱和一个沉积层柱，沉积层在运行中动态新建和填充。
//!
//! # 模块概览
//!
//! - [`domain`]: 箱体、水柱、沉积层柱、示踪剂、浓度双快照
//! - [`spatial`]: 点 → 箱体、深度 → 层 的定位
//! - [`transport`]: 衰减、垂向扩散、气体交换、生物扰动
//! - [`sediment`]: 沉积分层与沉积层属性推导
//! - [`engine`]: 固定顺序的步进引擎
//! - [`diagnostics`]: 质量收支
//!
//! # 层级架构
//!
//! ```text
//! engine ─> transport / sediment ─> domain ─> bt_geo
//!                                      └──> bt_config
//! ```
//!
//! # 错误处理
//!
//! 内核从不终止进程，所有失败以 [`TransportError`] 返回，
//! 由驱动层决定是否中止运行。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diagnostics;
pub mod domain;
pub mod engine;
pub mod error;
pub mod numerics;
pub mod sediment;
pub mod spatial;
pub mod transport;

// 重导出核心类型
pub use diagnostics::{MassBudget, TracerBudget};
pub use domain::{
    BoxConcentrations, BoxGeometry, BoxId, BoxType, ConcentrationField, DeepReservoir, Domain,
    LayerMatrix, ModelBox, ReservoirField, SedimentColumn, TracerDescriptor, TracerRegistry,
    TracerSnapshots, WaterColumn,
};
pub use engine::{StepReport, TransportEngine};
pub use error::{TransportError, TransportResult};
pub use sediment::{DepositPlan, Deposition, DepositionReport, SedimentProperties};
pub use spatial::BoxLocator;
pub use transport::{
    Bioturbation, BoxOperator, Decay, DecayKernel, DeepMixPlan, GasExchange, StepContext,
    VerticalDiffusion,
};

/// 预导入模块
pub mod prelude {
    pub use crate::domain::{
        BoxGeometry, BoxId, BoxType, ConcentrationField, ModelBox, TracerDescriptor,
        TracerRegistry,
    };
    pub use crate::engine::TransportEngine;
    pub use crate::error::{TransportError, TransportResult};
    pub use crate::spatial::BoxLocator;
    pub use crate::transport::BoxOperator;
    pub use bt_config::TransportConfig;
}
