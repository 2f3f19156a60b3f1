// crates/bt_physics/src/transport/decay.rs

//! 一阶衰减
//!
//! dC/dt = -k C。衰减核是配置时选定的策略：
//!
//! | 核 | 因子 |
//! |----|------|
//! | Exact | exp(-kΔt) |
//! | ExplicitEuler | max(0, 1 - kΔt) |
//! | ImplicitEuler | 1 / (1 + kΔt) |
//!
//! 同一个因子也被气体交换用于向饱和值弛豫。

use bt_config::{DecayConfig, DecayKernelKind};

use super::{BoxOperator, StepContext};
use crate::domain::{BoxConcentrations, ModelBox};
use crate::error::TransportResult;

/// 衰减核
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecayKernel {
    /// 精确指数
    #[default]
    Exact,
    /// 显式欧拉
    ExplicitEuler,
    /// 隐式欧拉
    ImplicitEuler,
}

impl DecayKernel {
    /// 一步后的剩余比例
    #[inline]
    pub fn factor(self, rate: f64, dt: f64) -> f64 {
        let x = rate * dt;
        match self {
            Self::Exact => (-x).exp(),
            Self::ExplicitEuler => (1.0 - x).max(0.0),
            Self::ImplicitEuler => 1.0 / (1.0 + x),
        }
    }

    /// 对单个值衰减
    #[inline]
    pub fn apply(self, value: f64, rate: f64, dt: f64) -> f64 {
        value * self.factor(rate, dt)
    }

    /// 向目标值弛豫: target + (value - target)·factor
    #[inline]
    pub fn relax(self, value: f64, target: f64, rate: f64, dt: f64) -> f64 {
        target + (value - target) * self.factor(rate, dt)
    }
}

impl From<DecayKernelKind> for DecayKernel {
    fn from(kind: DecayKernelKind) -> Self {
        match kind {
            DecayKernelKind::Exact => Self::Exact,
            DecayKernelKind::ExplicitEuler => Self::ExplicitEuler,
            DecayKernelKind::ImplicitEuler => Self::ImplicitEuler,
        }
    }
}

/// 衰减算子
#[derive(Debug, Clone)]
pub struct Decay {
    kernel: DecayKernel,
    water_enabled: bool,
    sediment_enabled: bool,
    sediment_scale: f64,
}

impl Decay {
    /// 从配置创建
    pub fn new(config: &DecayConfig) -> Self {
        Self {
            kernel: config.kernel.into(),
            water_enabled: config.water_enabled,
            sediment_enabled: config.sediment_enabled,
            sediment_scale: config.sediment_scale,
        }
    }
}

impl BoxOperator for Decay {
    fn name(&self) -> &'static str {
        "decay"
    }

    fn apply_box(
        &self,
        ctx: &StepContext<'_>,
        model_box: &mut ModelBox,
        conc: &mut BoxConcentrations,
    ) -> TransportResult<()> {
        if !model_box.is_normal() {
            return Ok(());
        }

        for (t, tracer) in ctx.tracers.iter() {
            if tracer.decay_rate <= 0.0 {
                continue;
            }

            if tracer.in_water && self.water_enabled {
                let factor = self.kernel.factor(tracer.decay_rate, ctx.dt);
                for k in 0..model_box.water().nz() {
                    conc.water[(k, t)] *= factor;
                }
            }

            if tracer.in_sediment && self.sediment_enabled {
                let rate = tracer.decay_rate * self.sediment_scale;
                let factor = self.kernel.factor(rate, ctx.dt);
                for k in model_box.sediment().active_layers() {
                    conc.sediment[(k, t)] *= factor;
                }
            }
        }
        Ok(())
    }
}
