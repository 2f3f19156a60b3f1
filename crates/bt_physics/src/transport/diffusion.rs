// crates/bt_physics/src/transport/diffusion.rs

//! 水柱垂向扩散
//!
//! 对每个普通箱体、每个水柱示踪剂（水示踪剂除外）做一步后向欧拉：
//!
//! ```text
//! dz_k (c'_k - c_k) / Δt = F_{k+1} - F_k
//! F_f = η K_f (c'_f - c'_{f-1}) / dzf_f,   dzf_f = (dz_{f-1} + dz_f) / 2
//! ```
//!
//! 底面 (f = 0) 和水面 (f = nz) 通量为零，因此 Σ c·dz 严格守恒。
//! 格式无条件稳定；层厚非正属于几何设置缺陷，在构建箱体时拒绝。
//!
//! # 深层混合
//!
//! 启用后，底深超过阈值的箱体在求解前用箱体深层参考值覆盖
//! 底层的若干营养盐浓度，模拟与域外深水的强制交换。
//! 示踪剂名称在创建算子时一次解析为 [`DeepMixPlan`]。

use bt_config::{DeepMixingConfig, DiffusionConfig};

use super::{BoxOperator, StepContext};
use crate::domain::{BoxConcentrations, ModelBox, ReservoirField, TracerRegistry};
use crate::error::TransportResult;
use crate::numerics::TridiagonalWorkspace;

// ============================================================
// 深层混合计划
// ============================================================

/// 深层混合计划：示踪剂索引 → 参考字段
#[derive(Debug, Clone, Default)]
pub struct DeepMixPlan {
    depth_threshold: f64,
    by_tracer: Vec<Option<ReservoirField>>,
}

impl DeepMixPlan {
    /// 解析示踪剂名称
    ///
    /// 未启用时返回空计划。启用后任何必需名称未注册都是配置错误：
    /// 氨、硝酸盐、硅酸盐、微量营养元素始终必需；溶解氧取决于
    /// `include_oxygen`；磷、碳取决于 `elemental_tracking`。
    pub fn resolve(config: &DeepMixingConfig, tracers: &TracerRegistry) -> TransportResult<Self> {
        let mut by_tracer = vec![None; tracers.len()];
        if !config.enabled {
            return Ok(Self {
                depth_threshold: config.depth_threshold,
                by_tracer,
            });
        }

        let names = &config.names;
        let mut required = vec![
            (names.ammonia.as_str(), ReservoirField::Ammonia),
            (names.nitrate.as_str(), ReservoirField::Nitrate),
            (names.silica.as_str(), ReservoirField::Silica),
            (names.micronutrient.as_str(), ReservoirField::Micronutrient),
        ];
        if config.include_oxygen {
            required.push((names.oxygen.as_str(), ReservoirField::Oxygen));
        }
        if config.elemental_tracking {
            required.push((names.phosphorus.as_str(), ReservoirField::Phosphorus));
            required.push((names.carbon.as_str(), ReservoirField::Carbon));
        }

        for (name, field) in required {
            let index = tracers.require(name)?;
            by_tracer[index] = Some(field);
        }
        log::debug!(
            "深层混合已解析 {} 个示踪剂, 阈值 {} m",
            by_tracer.iter().flatten().count(),
            config.depth_threshold
        );

        Ok(Self {
            depth_threshold: config.depth_threshold,
            by_tracer,
        })
    }

    /// 是否有任何示踪剂参与
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_tracer.iter().all(Option::is_none)
    }

    /// 箱体是否触发深层混合
    #[inline]
    pub fn applies_to(&self, model_box: &ModelBox) -> bool {
        !self.is_empty() && model_box.water().bottom_depth() > self.depth_threshold
    }

    /// 某示踪剂的参考字段
    #[inline]
    pub fn field_for(&self, tracer: usize) -> Option<ReservoirField> {
        self.by_tracer.get(tracer).copied().flatten()
    }
}

// ============================================================
// 算子
// ============================================================

/// 垂向扩散算子
#[derive(Debug, Clone)]
pub struct VerticalDiffusion {
    mixing_efficiency: f64,
    water_tracer: Option<usize>,
    deep_mix: DeepMixPlan,
}

impl VerticalDiffusion {
    /// 从配置创建并解析示踪剂名称
    pub fn new(config: &DiffusionConfig, tracers: &TracerRegistry) -> TransportResult<Self> {
        let water_tracer = config
            .water_tracer
            .as_deref()
            .and_then(|name| tracers.index_of(name));
        let deep_mix = DeepMixPlan::resolve(&config.deep_mixing, tracers)?;
        Ok(Self {
            mixing_efficiency: config.mixing_efficiency,
            water_tracer,
            deep_mix,
        })
    }

    /// 深层混合计划
    #[inline]
    pub fn deep_mix(&self) -> &DeepMixPlan {
        &self.deep_mix
    }

    /// 组装系数矩阵（与示踪剂无关）
    fn assemble(&self, model_box: &ModelBox, dt: f64, ws: &mut TridiagonalWorkspace) {
        let water = model_box.water();
        let dz = water.dz();
        let kz = water.kz();
        let nz = water.nz();

        // 界面 f 处的 η K Δt / dzf，首尾界面为零通量
        let coeff = |f: usize| -> f64 {
            if f == 0 || f == nz {
                0.0
            } else {
                let dzf = 0.5 * (dz[f - 1] + dz[f]);
                self.mixing_efficiency * kz[f] * dt / dzf
            }
        };

        for k in 0..nz {
            let lower = coeff(k);
            let upper = coeff(k + 1);
            ws.a[k] = -lower;
            ws.b[k] = dz[k] + lower + upper;
            ws.c[k] = -upper;
        }
    }
}

impl BoxOperator for VerticalDiffusion {
    fn name(&self) -> &'static str {
        "vertical_diffusion"
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

        let nz = model_box.water().nz();
        let deep_mix = self.deep_mix.applies_to(model_box);
        let mut ws = TridiagonalWorkspace::new(nz);
        self.assemble(model_box, ctx.dt, &mut ws);
        let dz = model_box.water().dz();

        for (t, tracer) in ctx.tracers.iter() {
            if !tracer.in_water || Some(t) == self.water_tracer {
                continue;
            }

            if deep_mix {
                if let Some(field) = self.deep_mix.field_for(t) {
                    conc.water[(0, t)] = model_box.reservoir.value(field);
                }
            }
            if nz < 2 {
                continue;
            }

            for k in 0..nz {
                ws.d[k] = dz[k] * conc.water[(k, t)];
            }
            ws.solve().map_err(|e| {
                log::debug!("箱体 {} 示踪剂 {} 扩散求解失败", model_box.id(), tracer.name);
                e
            })?;
            conc.water.write_column(t, &ws.d);
        }
        Ok(())
    }
}
