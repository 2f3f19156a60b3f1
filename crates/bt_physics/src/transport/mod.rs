// crates/bt_physics/src/transport/mod.rs

//! 输运算子
//!
//! 每个算子都是逐箱体、逐示踪剂的原位修改过程，读写 `new` 快照。
//! 箱体之间互不读写，可以并行；箱体内部的层处理顺序固定，必须串行。
//!
//! - [`decay`]: 一阶衰减（可选衰减核）
//! - [`diffusion`]: 水柱垂向隐式扩散 + 深层混合
//! - [`gas`]: 表层气体交换
//! - [`bioturbation`]: 沉积层生物扰动

pub mod bioturbation;
pub mod decay;
pub mod diffusion;
pub mod gas;

pub use bioturbation::Bioturbation;
pub use decay::{Decay, DecayKernel};
pub use diffusion::{DeepMixPlan, VerticalDiffusion};
pub use gas::GasExchange;

use rayon::prelude::*;

use crate::domain::{BoxConcentrations, ConcentrationField, ModelBox, TracerRegistry};
use crate::error::{TransportError, TransportResult};

/// 单步上下文
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// 示踪剂注册表
    pub tracers: &'a TracerRegistry,
    /// 时间步长 [s]
    pub dt: f64,
    /// 步末模型时间 [s]
    pub time: f64,
}

/// 逐箱体算子
pub trait BoxOperator: Send + Sync {
    /// 算子名称（日志用）
    fn name(&self) -> &'static str;

    /// 运行前准备（解析示踪剂名称等），每步调用，需自行保证幂等
    fn prepare(&mut self, _tracers: &TracerRegistry) -> TransportResult<()> {
        Ok(())
    }

    /// 处理单个箱体
    fn apply_box(
        &self,
        ctx: &StepContext<'_>,
        model_box: &mut ModelBox,
        conc: &mut BoxConcentrations,
    ) -> TransportResult<()>;

    /// 处理全部箱体
    fn apply(
        &self,
        ctx: &StepContext<'_>,
        boxes: &mut [ModelBox],
        field: &mut ConcentrationField,
        parallel: bool,
    ) -> TransportResult<()> {
        log::trace!("算子 {} 开始: {} 个箱体", self.name(), boxes.len());
        for_each_box(boxes, field, parallel, |b, c| self.apply_box(ctx, b, c))
    }
}

/// 按箱体分发，任一箱体出错即中止整个过程
pub fn for_each_box<F>(
    boxes: &mut [ModelBox],
    field: &mut ConcentrationField,
    parallel: bool,
    f: F,
) -> TransportResult<()>
where
    F: Fn(&mut ModelBox, &mut BoxConcentrations) -> TransportResult<()> + Sync + Send,
{
    TransportError::check_len("浓度场箱体", boxes.len(), field.n_boxes())?;
    let concs = field.boxes_mut();

    if parallel {
        boxes
            .par_iter_mut()
            .zip(concs.par_iter_mut())
            .try_for_each(|(b, c)| f(b, c))
    } else {
        boxes
            .iter_mut()
            .zip(concs.iter_mut())
            .try_for_each(|(b, c)| f(b, c))
    }
}
