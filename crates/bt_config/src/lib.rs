// crates/bt_config/src/lib.rs

//! BoxTracer Config Layer
//!
//! 运行配置层，集中描述一次模拟运行的全局参数。
//! 所有数值使用 f64，可通过 JSON 序列化/反序列化。
//!
//! # 模块概览
//!
//! - [`transport_config`]: TransportConfig 及各算子配置段
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! bt_cli      ─> 读取 JSON，构建引擎
//! bt_physics  ─> 消费 TransportConfig
//! bt_config   ─> 本层（无物理依赖）
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod transport_config;

// 重导出核心类型
pub use error::ConfigError;
pub use transport_config::{
    BioturbationConfig, DecayConfig, DecayKernelKind, DeepMixNames, DeepMixingConfig,
    DepthProfile, DiffusionConfig, GasConfig, GasExchangeConfig, ParallelConfig,
    ParallelStrategy, SedimentConfig, TransportConfig,
};
