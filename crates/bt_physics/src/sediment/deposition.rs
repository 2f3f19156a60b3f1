// crates/bt_physics/src/sediment/deposition.rs

//! 沉积与动态分层
//!
//! 输入为单个箱体本步各示踪剂的沉积质量 m_i。
//!
//! 1. 沉积体积 V = Σ m_i / c0_i，固体体积 S = Σ m_i / ρ_i（仅 m_i > 0）；V ≤ 0 时跳过。
//!    不在沉积层中的示踪剂有正沉积质量时为配置错误
//! 2. 厚度 H = V / area，孔隙率 p = 1 - S / V，p ∉ [0, 1] 为配置错误
//! 3. 自 topk 起逐层填充：可填量受 max_dz 余量限制；若当前层已是第 0 层，
//!    或填充后剩余厚度小于 min_dz，则把剩余厚度全部放入当前层
//! 4. 按体积加权混合浓度：层内原有质量 + 本次份额的沉积质量
//!    + 同时存在于水柱的示踪剂从底层水体带入的质量（∝ p）；
//!    溶解态按孔隙水体积加权
//! 5. 更新层厚、体积、填充时间、孔隙率（新水体积 / 新总体积）
//! 6. 仍有剩余时在 topk 上方新建一层，无法新建时为物理不变量错误
//! 7. 重算沉积层界面高程
//! 8. 从底层水体移除被带入沉积物的水（V·p），只在水柱中的示踪剂
//!    按体积比浓缩；底层体积非正时为物理不变量错误
//!
//! 步骤 1-2 与底层水体余量检查在 [`Deposition::plan`] 中只读完成，
//! 其余步骤由 [`Deposition::apply`] 执行。
//!
//! topk 只会减小，本模块没有侵蚀或合并操作。

use bt_config::SedimentConfig;

use crate::domain::{BoxConcentrations, ModelBox, TracerRegistry};
use crate::error::{TransportError, TransportResult};

/// 单次沉积结果
#[derive(Debug, Clone, PartialEq)]
pub struct DepositionReport {
    /// 沉积体积 [m³]
    pub deposit_volume: f64,
    /// 固体体积 [m³]
    pub solid_volume: f64,
    /// 沉积厚度 [m]
    pub thickness: f64,
    /// 沉积物孔隙率
    pub porosity: f64,
    /// 各被填充层增加的体积 (层索引, 体积)
    pub added_volumes: Vec<(usize, f64)>,
    /// 新建层数
    pub layers_created: usize,
    /// 从底层水体移除的水体积 [m³]
    pub entrained_water: f64,
}

impl DepositionReport {
    /// 各层增加体积之和
    pub fn total_added(&self) -> f64 {
        self.added_volumes.iter().map(|(_, v)| v).sum()
    }
}

/// 沉积预检结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositPlan {
    /// 沉积体积 [m³]
    pub deposit_volume: f64,
    /// 固体体积 [m³]
    pub solid_volume: f64,
    /// 沉积厚度 [m]
    pub thickness: f64,
    /// 沉积物孔隙率
    pub porosity: f64,
    /// 需从底层水体移除的水体积 [m³]
    pub entrained_water: f64,
}

/// 沉积算子
#[derive(Debug, Clone)]
pub struct Deposition {
    min_dz: f64,
    max_dz: f64,
}

impl Deposition {
    /// 从配置创建
    pub fn new(config: &SedimentConfig) -> Self {
        Self {
            min_dz: config.min_dz,
            max_dz: config.max_dz,
        }
    }

    /// 只读预检并计算沉积量
    ///
    /// 检查质量向量长度、示踪剂参数、孔隙率和底层水体余量，
    /// 不修改任何状态。沉积量为零时返回 `Ok(None)`。
    pub fn plan(
        &self,
        model_box: &ModelBox,
        tracers: &TracerRegistry,
        masses: &[f64],
    ) -> TransportResult<Option<DepositPlan>> {
        TransportError::check_len("沉积质量", tracers.len(), masses.len())?;

        // 1. 体积
        let mut deposit_volume = 0.0;
        let mut solid_volume = 0.0;
        for (t, tracer) in tracers.iter() {
            let m = masses[t];
            if m.is_nan() || m <= 0.0 {
                continue;
            }
            if !tracer.in_sediment {
                return Err(TransportError::configuration(format!(
                    "示踪剂 {} 有沉积质量 {m} 但不存在于沉积层",
                    tracer.name
                )));
            }
            if tracer.initial_deposit_conc <= 0.0 || tracer.bulk_density <= 0.0 {
                return Err(TransportError::configuration(format!(
                    "示踪剂 {} 有沉积质量但初始浓度 {} 或密度 {} 非正",
                    tracer.name, tracer.initial_deposit_conc, tracer.bulk_density
                )));
            }
            deposit_volume += m / tracer.initial_deposit_conc;
            solid_volume += m / tracer.bulk_density;
        }
        if deposit_volume <= 0.0 {
            return Ok(None);
        }

        // 2. 厚度与孔隙率
        let thickness = deposit_volume / model_box.area();
        let porosity = 1.0 - solid_volume / deposit_volume;
        if !(0.0..=1.0).contains(&porosity) {
            return Err(TransportError::configuration(format!(
                "箱体 {} 沉积孔隙率 {porosity:.4} 不在 [0, 1] 内",
                model_box.id()
            )));
        }

        // 底层水体必须能提供被带入的水
        let entrained_water = deposit_volume * porosity;
        let bottom_volume = model_box.water().volume()[0];
        if bottom_volume - entrained_water <= 0.0 {
            return Err(TransportError::physical(format!(
                "箱体 {} 底层水体耗尽: 体积 {bottom_volume:.4e} m³, 需移除 {entrained_water:.4e} m³",
                model_box.id()
            )));
        }

        Ok(Some(DepositPlan {
            deposit_volume,
            solid_volume,
            thickness,
            porosity,
            entrained_water,
        }))
    }

    /// 按预检结果修改箱体与浓度
    ///
    /// `plan` 必须由同一箱体、同一质量向量经 [`Deposition::plan`] 得到。
    pub fn apply(
        &self,
        plan: &DepositPlan,
        model_box: &mut ModelBox,
        conc: &mut BoxConcentrations,
        tracers: &TracerRegistry,
        masses: &[f64],
        time: f64,
    ) -> TransportResult<DepositionReport> {
        let DepositPlan {
            deposit_volume,
            solid_volume,
            thickness,
            porosity,
            entrained_water,
        } = *plan;
        let area = model_box.area();

        // 3-6. 逐层填充
        let mut remaining = thickness;
        let mut added_volumes = Vec::new();
        let mut layers_created = 0;
        let mut k = model_box.sediment().topk();
        loop {
            let current = model_box.sediment().dz()[k];
            let mut fill = remaining.min((self.max_dz - current).max(0.0));
            if k == 0 || remaining - fill < self.min_dz {
                fill = remaining;
            }

            if fill > 0.0 {
                let added = self.fill_layer(
                    model_box,
                    conc,
                    tracers,
                    masses,
                    k,
                    fill,
                    fill / thickness,
                    porosity,
                    time,
                );
                added_volumes.push((k, added));
            }
            remaining -= fill;

            if remaining <= 0.0 {
                break;
            }
            k = model_box.sediment.open_layer_above()?;
            layers_created += 1;
            log::debug!("箱体 {} 新建沉积层 {}", model_box.id(), k);
        }

        // 7. 界面高程
        model_box.sediment.recompute_depths();

        // 8. 底层水体
        let old_volume = model_box.water.shrink_bottom(entrained_water, area)?;
        let concentrate = old_volume / (old_volume - entrained_water);
        for (t, tracer) in tracers.iter() {
            if tracer.in_water && !tracer.in_sediment {
                conc.water[(0, t)] *= concentrate;
            }
        }

        Ok(DepositionReport {
            deposit_volume,
            solid_volume,
            thickness,
            porosity,
            added_volumes,
            layers_created,
            entrained_water,
        })
    }

    /// 对单个箱体沉积：[`Deposition::plan`] 后接 [`Deposition::apply`]
    ///
    /// 沉积量为零或预检失败时不修改任何状态。
    pub fn deposit(
        &self,
        model_box: &mut ModelBox,
        conc: &mut BoxConcentrations,
        tracers: &TracerRegistry,
        masses: &[f64],
        time: f64,
    ) -> TransportResult<Option<DepositionReport>> {
        match self.plan(model_box, tracers, masses)? {
            Some(plan) => self
                .apply(&plan, model_box, conc, tracers, masses, time)
                .map(Some),
            None => Ok(None),
        }
    }

    /// 把厚度 `fill` 放入第 k 层，返回增加的体积
    #[allow(clippy::too_many_arguments)]
    fn fill_layer(
        &self,
        model_box: &mut ModelBox,
        conc: &mut BoxConcentrations,
        tracers: &TracerRegistry,
        masses: &[f64],
        k: usize,
        fill: f64,
        share: f64,
        porosity: f64,
        time: f64,
    ) -> f64 {
        let area = model_box.area();
        let dv = fill * area;
        let old_volume = model_box.sediment.volume[k];
        let old_water = model_box.sediment.porosity[k] * old_volume;
        let new_volume = old_volume + dv;
        let new_water = old_water + porosity * dv;

        for (t, tracer) in tracers.iter() {
            if !tracer.in_sediment {
                continue;
            }
            let deposited = masses[t].max(0.0) * share;
            let entrained = if tracer.in_water {
                conc.water[(0, t)] * porosity * dv
            } else {
                0.0
            };

            let c = &mut conc.sediment[(k, t)];
            if tracer.dissolved {
                if new_water > 0.0 {
                    *c = (*c * old_water + deposited + entrained) / new_water;
                }
            } else {
                *c = (*c * old_volume + deposited + entrained) / new_volume;
            }
        }

        let sediment = &mut model_box.sediment;
        sediment.dz[k] += fill;
        sediment.volume[k] = new_volume;
        sediment.porosity[k] = new_water / new_volume;
        sediment.fill_time[k] = time;
        dv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoxGeometry, BoxId, TracerDescriptor};
    use bt_geo::Polygon;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn config() -> SedimentConfig {
        SedimentConfig {
            min_dz: 0.001,
            max_dz: 0.05,
            ..SedimentConfig::default()
        }
    }

    /// 面积 1 m²，底层水体 5 m³
    fn unit_box(dz: Vec<f64>, topk: usize) -> ModelBox {
        let geometry = BoxGeometry::new(
            Polygon::rectangle(0.0, 0.0, 1.0, 1.0).unwrap(),
            vec![-10.0, -5.0, 0.0],
            dz,
            topk,
        )
        .with_sediment_porosity(0.6);
        ModelBox::from_geometry(BoxId(0), geometry).unwrap()
    }

    fn tracers() -> TracerRegistry {
        TracerRegistry::new(vec![
            TracerDescriptor::particulate("Mud", 1e-5, 2500.0, 1000.0),
            TracerDescriptor::dissolved("NH3").with_in_sediment(true),
            TracerDescriptor::dissolved("Salt"),
        ])
        .unwrap()
    }

    #[test]
    fn test_zero_deposit_is_noop() {
        let tracers = tracers();
        let mut b = unit_box(vec![0.0, 0.02, 0.02], 1);
        let mut conc = BoxConcentrations::for_box(&b, tracers.len());
        conc.water.fill(3.0);
        conc.sediment.fill(2.0);
        let (box_before, conc_before) = (b.clone(), conc.clone());

        let dep = Deposition::new(&config());
        let report = dep.deposit(&mut b, &mut conc, &tracers, &[0.0, 0.0, 0.0], 10.0).unwrap();
        assert!(report.is_none());
        assert_eq!(conc, conc_before);
        assert_eq!(b.sediment(), box_before.sediment());
        assert_eq!(b.water(), box_before.water());
    }

    #[test]
    fn test_single_layer_fill() {
        let tracers = tracers();
        let mut b = unit_box(vec![0.0, 0.02, 0.02], 1);
        let mut conc = BoxConcentrations::for_box(&b, tracers.len());
        conc.water.write_column(2, &[4.0, 4.0]);
        conc.water.write_column(1, &[1.0, 1.0]);

        // 10 kg 泥: V = 0.01 m³, S = 0.004 m³, p = 0.6
        let dep = Deposition::new(&config());
        let report = dep
            .deposit(&mut b, &mut conc, &tracers, &[10.0, 0.0, 0.0], 100.0)
            .unwrap()
            .unwrap();

        assert!(approx_eq(report.deposit_volume, 0.01, 1e-15));
        assert!(approx_eq(report.porosity, 0.6, 1e-12));
        assert_eq!(report.layers_created, 0);
        assert_eq!(report.added_volumes.len(), 1);
        assert!(approx_eq(report.total_added(), 0.01, 1e-15));

        let sed = b.sediment();
        assert_eq!(sed.topk(), 1);
        assert!(approx_eq(sed.dz()[1], 0.03, 1e-12));
        assert!(approx_eq(sed.volume()[1], 0.03, 1e-12));
        assert!(approx_eq(sed.porosity()[1], 0.6, 1e-12));
        assert_eq!(sed.fill_time()[1], 100.0);
        assert!(approx_eq(sed.gridz()[3], -0.05, 1e-12));
        // 颗粒态：10 kg 进入 0.03 m³
        assert!(approx_eq(conc.sediment[(1, 0)], 10.0 / 0.03, 1e-9));
        // 溶解态：底层水体浓度 1 随孔隙水带入
        assert!(approx_eq(conc.sediment[(1, 1)], 0.006 / 0.018, 1e-12));

        // 底层水体损失 0.006 m³，只在水柱中的示踪剂被浓缩
        assert!(approx_eq(report.entrained_water, 0.006, 1e-15));
        assert!(approx_eq(b.water().volume()[0], 4.994, 1e-12));
        assert!(approx_eq(b.water().gridz()[0], -9.994, 1e-12));
        assert!(approx_eq(conc.water[(0, 2)], 4.0 * 5.0 / 4.994, 1e-12));
        assert_eq!(conc.water[(1, 2)], 4.0);
        assert_eq!(conc.water[(0, 1)], 1.0);
    }

    #[test]
    fn test_fill_then_spill_into_new_layer() {
        // 三层柱 topk=1，第 1 层余量 0.01 m，沉积 0.03 m
        let tracers = tracers();
        let mut b = unit_box(vec![0.0, 0.04, 0.05], 1);
        let mut conc = BoxConcentrations::for_box(&b, tracers.len());

        let dep = Deposition::new(&config());
        let report = dep
            .deposit(&mut b, &mut conc, &tracers, &[30.0, 0.0, 0.0], 0.0)
            .unwrap()
            .unwrap();

        assert_eq!(report.layers_created, 1);
        assert_eq!(report.added_volumes.len(), 2);
        assert_eq!(report.added_volumes[0].0, 1);
        assert_eq!(report.added_volumes[1].0, 0);
        assert!(approx_eq(report.added_volumes[0].1, 0.01, 1e-12));
        assert!(approx_eq(report.added_volumes[1].1, 0.02, 1e-12));

        let sed = b.sediment();
        assert_eq!(sed.topk(), 0);
        assert!(approx_eq(sed.dz()[1], 0.05, 1e-12));
        assert!(approx_eq(sed.dz()[0], 0.02, 1e-12));
        assert!(approx_eq(sed.gridz()[1], -0.02, 1e-12));
        assert!(approx_eq(conc.sediment[(0, 0)], 20.0 / 0.02, 1e-9));
    }

    #[test]
    fn test_small_remainder_stays_in_layer() {
        // 余量 0.01 m，沉积 0.0105 m：剩余 0.0005 < min_dz，全部留在当前层
        let tracers = tracers();
        let mut b = unit_box(vec![0.0, 0.04, 0.05], 1);
        let mut conc = BoxConcentrations::for_box(&b, tracers.len());
        let dep = Deposition::new(&config());
        let report = dep
            .deposit(&mut b, &mut conc, &tracers, &[10.5, 0.0, 0.0], 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(report.layers_created, 0);
        assert_eq!(b.sediment().topk(), 1);
        assert!(approx_eq(b.sediment().dz()[1], 0.0505, 1e-12));
    }

    #[test]
    fn test_top_layer_absorbs_everything() {
        let tracers = tracers();
        let mut b = unit_box(vec![0.04, 0.05], 0);
        let mut conc = BoxConcentrations::for_box(&b, tracers.len());
        let dep = Deposition::new(&config());
        let report = dep
            .deposit(&mut b, &mut conc, &tracers, &[100.0, 0.0, 0.0], 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(report.layers_created, 0);
        assert!(approx_eq(b.sediment().dz()[0], 0.14, 1e-12));
    }

    #[test]
    fn test_invalid_porosity_is_rejected() {
        // 初始浓度大于颗粒密度 => 孔隙率为负
        let tracers = TracerRegistry::new(vec![TracerDescriptor::particulate(
            "Bad", 1e-5, 1000.0, 2000.0,
        )])
        .unwrap();
        let mut b = unit_box(vec![0.0, 0.02], 1);
        let mut conc = BoxConcentrations::for_box(&b, 1);
        let before = b.sediment().clone();
        let result = Deposition::new(&config()).deposit(&mut b, &mut conc, &tracers, &[1.0], 0.0);
        assert!(matches!(result, Err(TransportError::Configuration(_))));
        assert_eq!(b.sediment(), &before);
    }

    #[test]
    fn test_bottom_water_exhaustion() {
        let tracers = TracerRegistry::new(vec![TracerDescriptor::particulate(
            "Floc", 1e-5, 2500.0, 10.0,
        )])
        .unwrap();
        let mut b = unit_box(vec![0.0, 0.02], 1);
        let mut conc = BoxConcentrations::for_box(&b, 1);
        // V = 100 m³, p ≈ 1，底层只有 5 m³
        let result = Deposition::new(&config()).deposit(&mut b, &mut conc, &tracers, &[1000.0], 0.0);
        assert!(matches!(result, Err(TransportError::PhysicalInvariant(_))));
    }

    #[test]
    fn test_mass_length_checked() {
        let tracers = tracers();
        let mut b = unit_box(vec![0.0, 0.02], 1);
        let mut conc = BoxConcentrations::for_box(&b, tracers.len());
        let result = Deposition::new(&config()).deposit(&mut b, &mut conc, &tracers, &[1.0], 0.0);
        assert!(matches!(result, Err(TransportError::SizeMismatch { .. })));
    }

    #[test]
    fn test_mass_on_water_only_tracer_is_rejected() {
        let tracers = TracerRegistry::new(vec![
            TracerDescriptor::particulate("Mud", 1e-5, 2500.0, 1000.0),
            TracerDescriptor::particulate("Plankton", 1e-5, 1100.0, 500.0).with_in_sediment(false),
        ])
        .unwrap();
        let mut b = unit_box(vec![0.0, 0.02], 1);
        let mut conc = BoxConcentrations::for_box(&b, tracers.len());
        let before_sed = b.sediment().clone();
        let before_water = b.water().clone();
        let result =
            Deposition::new(&config()).deposit(&mut b, &mut conc, &tracers, &[10.0, 5.0], 0.0);
        assert!(matches!(result, Err(TransportError::Configuration(_))));
        assert_eq!(b.sediment(), &before_sed);
        assert_eq!(b.water(), &before_water);
    }

    #[test]
    fn test_plan_does_not_mutate() {
        let tracers = tracers();
        let b = unit_box(vec![0.0, 0.02], 1);
        let deposition = Deposition::new(&config());
        let plan = deposition
            .plan(&b, &tracers, &[10.0, 0.0, 0.0])
            .unwrap()
            .unwrap();
        // V = 10 / 1000 = 0.01 m³, S = 10 / 2500 = 0.004 m³
        assert!(approx_eq(plan.deposit_volume, 0.01, 1e-12));
        assert!(approx_eq(plan.porosity, 0.6, 1e-12));
        assert!(approx_eq(plan.entrained_water, 0.006, 1e-12));

        let mut applied = b.clone();
        let mut conc = BoxConcentrations::for_box(&applied, tracers.len());
        let report = deposition
            .apply(&plan, &mut applied, &mut conc, &tracers, &[10.0, 0.0, 0.0], 0.0)
            .unwrap();
        assert!(approx_eq(report.total_added(), 0.01, 1e-12));
        assert!(approx_eq(
            applied.water().volume()[0],
            b.water().volume()[0] - 0.006,
            1e-12
        ));
    }
}
