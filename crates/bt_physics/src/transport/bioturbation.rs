// crates/bt_physics/src/transport/bioturbation.rs

//! 沉积层生物扰动
//!
//! 每个箱体依次执行三遍：
//!
//! 1. 扩散混合：每个已填充层与上下相邻层双向交换
//! 2. 排出：每个次表层单向向最表层（topk）输送
//! 3. 表层交换：每个次表层与最表层双向交换
//!
//! 每遍都要求至少两个已填充层。只有颗粒态、存在于沉积层、
//! 粒径小于阈值且可搬运的示踪剂参与。
//!
//! 第 k 层的可搬运厚度：
//!
//! ```text
//! h_k = rate · I_k · w(d_k) · Δt
//! I_k = enhancement · activity · min(1, ρ_ref / ρ_bulk,k)
//! ρ_bulk,k = (1 - φ_k) · ρ_grain
//! ```
//!
//! w 为深度权重剖面，d_k 为层中心在界面以下的深度。
//! 交换体积 V = h_k · area，不超过供体层体积。层体积不变，
//! 只按交换体积比例调整浓度，因此每次交换都严格守恒。

use bt_config::{BioturbationConfig, DepthProfile};

use super::{BoxOperator, StepContext};
use crate::domain::{BoxConcentrations, LayerMatrix, ModelBox, TracerDescriptor};
use crate::error::TransportResult;

/// 生物扰动算子
#[derive(Debug, Clone)]
pub struct Bioturbation {
    config: BioturbationConfig,
}

impl Bioturbation {
    /// 从配置创建
    pub fn new(config: &BioturbationConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 示踪剂是否可被搬运
    #[inline]
    pub fn is_mobile(&self, tracer: &TracerDescriptor) -> bool {
        tracer.particulate
            && tracer.in_sediment
            && tracer.movable
            && tracer.particle_size < self.config.size_threshold
    }

    /// 深度权重
    #[inline]
    pub fn depth_weight(&self, depth: f64) -> f64 {
        match self.config.profile {
            DepthProfile::Exponential { e_fold } => (-depth / e_fold).exp(),
            DepthProfile::Linear { max_depth } => (1.0 - depth / max_depth).max(0.0),
        }
    }

    /// 第 k 层的扰动强度
    fn intensity(&self, model_box: &ModelBox, k: usize) -> f64 {
        let porosity = model_box.sediment().porosity()[k];
        let bulk = (1.0 - porosity) * self.config.grain_density;
        let density_scale = if bulk > 0.0 {
            (self.config.reference_bulk_density / bulk).min(1.0)
        } else {
            1.0
        };
        self.config.enhancement * model_box.bioturbation_activity * density_scale
    }

    /// 按速率常数计算各已填充层的交换体积，写入 `volumes`
    fn transfer_volumes(&self, model_box: &ModelBox, rate: f64, dt: f64, volumes: &mut [f64]) {
        volumes.fill(0.0);
        let sediment = model_box.sediment();
        let area = model_box.area();
        for k in sediment.active_layers() {
            let h = rate
                * self.intensity(model_box, k)
                * self.depth_weight(sediment.layer_depth(k))
                * dt;
            volumes[k] = h.max(0.0) * area;
        }
    }
}

/// 双向交换：两层各以体积 V 互换
#[inline]
fn exchange(conc: &mut LayerMatrix, layer_volume: &[f64], a: usize, b: usize, v: f64, t: usize) {
    let v = v.min(layer_volume[a]).min(layer_volume[b]);
    if v <= 0.0 {
        return;
    }
    let ca = conc[(a, t)];
    let cb = conc[(b, t)];
    conc[(a, t)] = ca + v * (cb - ca) / layer_volume[a];
    conc[(b, t)] = cb + v * (ca - cb) / layer_volume[b];
}

/// 单向输送：供体以体积 V 的物质移入受体
#[inline]
fn expel(
    conc: &mut LayerMatrix,
    layer_volume: &[f64],
    donor: usize,
    receiver: usize,
    v: f64,
    t: usize,
) {
    let v = v.min(layer_volume[donor]);
    if v <= 0.0 || layer_volume[receiver] <= 0.0 {
        return;
    }
    let moved = conc[(donor, t)] * v;
    conc[(donor, t)] -= moved / layer_volume[donor];
    conc[(receiver, t)] += moved / layer_volume[receiver];
}

impl BoxOperator for Bioturbation {
    fn name(&self) -> &'static str {
        "bioturbation"
    }

    fn apply_box(
        &self,
        ctx: &StepContext<'_>,
        model_box: &mut ModelBox,
        conc: &mut BoxConcentrations,
    ) -> TransportResult<()> {
        if !self.config.enabled || !model_box.is_normal() {
            return Ok(());
        }
        let sediment = model_box.sediment();
        if sediment.n_active() < 2 {
            return Ok(());
        }

        let mobile: Vec<usize> = ctx
            .tracers
            .iter()
            .filter(|(_, tracer)| self.is_mobile(tracer))
            .map(|(t, _)| t)
            .collect();
        if mobile.is_empty() {
            return Ok(());
        }

        let topk = sediment.topk();
        let nz = sediment.nz();
        let layer_volume = sediment.volume();
        let mut volumes = vec![0.0; nz];

        // 1. 扩散混合
        self.transfer_volumes(model_box, self.config.mixing_rate, ctx.dt, &mut volumes);
        for &t in &mobile {
            for k in topk..nz {
                if k > topk {
                    exchange(&mut conc.sediment, layer_volume, k, k - 1, volumes[k], t);
                }
                if k + 1 < nz {
                    exchange(&mut conc.sediment, layer_volume, k, k + 1, volumes[k], t);
                }
            }
        }

        // 2. 排出到表层
        self.transfer_volumes(model_box, self.config.expulsion_rate, ctx.dt, &mut volumes);
        for &t in &mobile {
            for k in topk + 1..nz {
                expel(&mut conc.sediment, layer_volume, k, topk, volumes[k], t);
            }
        }

        // 3. 与表层双向交换
        self.transfer_volumes(model_box, self.config.exchange_rate, ctx.dt, &mut volumes);
        for &t in &mobile {
            for k in topk + 1..nz {
                exchange(&mut conc.sediment, layer_volume, k, topk, volumes[k], t);
            }
        }

        log::trace!(
            "箱体 {} 生物扰动完成: {} 个示踪剂, {} 个已填充层",
            model_box.id(),
            mobile.len(),
            nz - topk
        );
        Ok(())
    }
}
