// crates/bt_physics/src/engine.rs

//! 输运步进引擎
//!
//! 每一步按固定顺序对全部箱体执行各算子，一个算子处理完所有箱体后
//! 才进入下一个：
//!
//! ```text
//! begin_step → 衰减 → 垂向扩散 → 气体交换 → 生物扰动
//!            → 沉积（可选）→ 沉积层属性 → commit
//! ```
//!
//! 箱体之间相互独立，按 [`ParallelStrategy`] 在 rayon 线程池上分发。
//! 任一箱体出错即中止本步并返回错误，`current` 快照保持步初状态。
//!
//! 只有沉积与沉积层属性会修改箱体几何。沉积质量在任何箱体被修改前
//! 统一预检，预检失败时箱体与浓度都保持步初状态；若错误发生在几何
//! 修改开始之后，引擎标记为失效，此后的 [`TransportEngine::step`]
//! 一律返回错误。

use bt_config::{ParallelStrategy, TransportConfig};
use rayon::prelude::*;

use crate::diagnostics::MassBudget;
use crate::domain::{
    BoxConcentrations, BoxGeometry, ConcentrationField, Domain, ModelBox, TracerDescriptor, TracerRegistry,
    TracerSnapshots,
};
use crate::error::{TransportError, TransportResult};
use crate::sediment::{DepositPlan, Deposition, DepositionReport, SedimentProperties};
use crate::spatial::BoxLocator;
use crate::transport::{
    Bioturbation, BoxOperator, Decay, GasExchange, StepContext, VerticalDiffusion,
};

/// 单步统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// 步末模型时间 [s]
    pub time: f64,
    /// 本步沉积体积 [m³]
    pub deposited_volume: f64,
    /// 发生沉积的箱体数
    pub boxes_with_deposit: usize,
    /// 新建沉积层数
    pub layers_created: usize,
}

/// 输运引擎
pub struct TransportEngine {
    config: TransportConfig,
    domain: Domain,
    snapshots: TracerSnapshots,
    locator: BoxLocator,
    decay: Decay,
    diffusion: VerticalDiffusion,
    gas: GasExchange,
    bioturbation: Bioturbation,
    deposition: Deposition,
    properties: SedimentProperties,
    time: f64,
    step_count: u64,
    failed: bool,
}

impl TransportEngine {
    /// 从配置、外部几何和示踪剂表构建
    pub fn new(
        config: TransportConfig,
        geometries: Vec<BoxGeometry>,
        tracers: Vec<TracerDescriptor>,
    ) -> TransportResult<Self> {
        let domain = Domain::build(geometries, tracers)?;
        Self::with_domain(config, domain)
    }

    /// 从已构建的领域模型创建
    pub fn with_domain(config: TransportConfig, domain: Domain) -> TransportResult<Self> {
        config.validate()?;
        let decay = Decay::new(&config.decay);
        let diffusion = VerticalDiffusion::new(&config.diffusion, &domain.tracers)?;
        let gas = GasExchange::new(&config.gas_exchange);
        let bioturbation = Bioturbation::new(&config.bioturbation);
        let deposition = Deposition::new(&config.sediment);
        let properties = SedimentProperties::new(&config.sediment);
        let locator = BoxLocator::new(&domain.boxes);
        let snapshots = TracerSnapshots::new(domain.zero_field());

        log::debug!(
            "输运引擎初始化: {} 个箱体, {} 个示踪剂, Δt = {} s",
            domain.n_boxes(),
            domain.tracers.len(),
            config.timestep
        );

        Ok(Self {
            config,
            domain,
            snapshots,
            locator,
            decay,
            diffusion,
            gas,
            bioturbation,
            deposition,
            properties,
            time: 0.0,
            step_count: 0,
            failed: false,
        })
    }

    // ========================================================
    // 访问器
    // ========================================================

    /// 配置
    #[inline]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// 箱体
    #[inline]
    pub fn boxes(&self) -> &[ModelBox] {
        &self.domain.boxes
    }

    /// 箱体（可变，用于外部更新扩散系数、活性等）
    #[inline]
    pub fn boxes_mut(&mut self) -> &mut [ModelBox] {
        &mut self.domain.boxes
    }

    /// 示踪剂注册表
    #[inline]
    pub fn tracers(&self) -> &TracerRegistry {
        &self.domain.tracers
    }

    /// 空间定位器
    #[inline]
    pub fn locator(&self) -> &BoxLocator {
        &self.locator
    }

    /// 当前浓度场
    #[inline]
    pub fn concentrations(&self) -> &ConcentrationField {
        self.snapshots.current()
    }

    /// 当前浓度场（可变，用于初始化和外部耦合）
    #[inline]
    pub fn concentrations_mut(&mut self) -> &mut ConcentrationField {
        self.snapshots.current_mut()
    }

    /// 模型时间 [s]
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// 已完成步数
    #[inline]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// 是否因几何修改中途出错而失效
    #[inline]
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// 本步是否并行
    fn use_parallel(&self) -> bool {
        let parallel = &self.config.parallel;
        let decision = parallel.use_parallel(self.domain.n_boxes());
        if parallel.strategy == ParallelStrategy::Auto {
            log::trace!("并行策略自动选择: {}", if decision { "并行" } else { "串行" });
        }
        decision
    }

    /// 当前质量收支
    pub fn mass_budget(&self) -> MassBudget {
        MassBudget::compute(
            &self.domain.boxes,
            &self.domain.tracers,
            self.snapshots.current(),
        )
    }

    // ========================================================
    // 步进
    // ========================================================

    /// 推进一步
    ///
    /// `deposits` 为逐箱体的沉积质量向量（长度等于示踪剂数），
    /// 为 `None` 时跳过沉积。
    pub fn step(&mut self, deposits: Option<&[Vec<f64>]>) -> TransportResult<StepReport> {
        if self.failed {
            return Err(TransportError::physical(
                "先前的步进在修改箱体几何后失败，引擎状态不一致",
            ));
        }
        let parallel = self.use_parallel();
        let dt = self.config.timestep;
        let time = self.time + dt;

        self.gas.prepare(&self.domain.tracers)?;
        let plans = match deposits {
            Some(deposits) => Some(plan_all(
                &self.deposition,
                &self.domain,
                deposits,
                parallel,
            )?),
            None => None,
        };
        self.snapshots.begin_step();

        let Domain { boxes, tracers } = &mut self.domain;
        let ctx = StepContext {
            tracers: &*tracers,
            dt,
            time,
        };
        let field = self.snapshots.new_field_mut();

        let operators: [&dyn BoxOperator; 4] =
            [&self.decay, &self.diffusion, &self.gas, &self.bioturbation];
        for op in operators {
            op.apply(&ctx, boxes, field, parallel)?;
        }

        let mut report = StepReport {
            time,
            ..StepReport::default()
        };
        // 此后箱体几何开始被修改
        let modified = match (deposits, &plans) {
            (Some(deposits), Some(plans)) => {
                deposit_all(&self.deposition, &ctx, boxes, field, deposits, plans, parallel)
            }
            _ => Ok(Vec::new()),
        }
        .and_then(|reports| {
            self.properties.apply(&ctx, boxes, field, parallel)?;
            Ok(reports)
        });
        let reports = match modified {
            Ok(reports) => reports,
            Err(e) => {
                self.failed = true;
                log::error!("箱体几何修改中途失败，引擎已失效: {e}");
                return Err(e);
            }
        };
        for r in reports.iter().flatten() {
            report.deposited_volume += r.deposit_volume;
            report.boxes_with_deposit += 1;
            report.layers_created += r.layers_created;
        }

        self.snapshots.commit();
        self.time = time;
        self.step_count += 1;

        log::debug!(
            "第 {} 步完成: t = {} s, 沉积体积 {:.4e} m³, 新建 {} 层",
            self.step_count,
            time,
            report.deposited_volume,
            report.layers_created
        );
        Ok(report)
    }

    /// 连续推进多步，沉积质量每步相同
    pub fn run(
        &mut self,
        n_steps: usize,
        deposits: Option<&[Vec<f64>]>,
    ) -> TransportResult<Vec<StepReport>> {
        (0..n_steps).map(|_| self.step(deposits)).collect()
    }
}

/// 预检所有箱体的沉积，不修改任何状态
fn plan_all(
    deposition: &Deposition,
    domain: &Domain,
    deposits: &[Vec<f64>],
    parallel: bool,
) -> TransportResult<Vec<Option<DepositPlan>>> {
    TransportError::check_len("沉积箱体", domain.boxes.len(), deposits.len())?;
    let tracers = &domain.tracers;

    if parallel {
        domain
            .boxes
            .par_iter()
            .zip(deposits.par_iter())
            .map(|(b, m)| deposition.plan(b, tracers, m))
            .collect()
    } else {
        domain
            .boxes
            .iter()
            .zip(deposits.iter())
            .map(|(b, m)| deposition.plan(b, tracers, m))
            .collect()
    }
}

/// 按预检结果对所有箱体执行沉积
fn deposit_all(
    deposition: &Deposition,
    ctx: &StepContext<'_>,
    boxes: &mut [ModelBox],
    field: &mut ConcentrationField,
    deposits: &[Vec<f64>],
    plans: &[Option<DepositPlan>],
    parallel: bool,
) -> TransportResult<Vec<Option<DepositionReport>>> {
    TransportError::check_len("浓度场箱体", boxes.len(), field.n_boxes())?;
    let concs = field.boxes_mut();
    let apply = |b: &mut ModelBox,
                 c: &mut BoxConcentrations,
                 m: &Vec<f64>,
                 plan: &Option<DepositPlan>|
     -> TransportResult<Option<DepositionReport>> {
        match plan {
            Some(plan) => deposition
                .apply(plan, b, c, ctx.tracers, m, ctx.time)
                .map(Some),
            None => Ok(None),
        }
    };

    if parallel {
        boxes
            .par_iter_mut()
            .zip(concs.par_iter_mut())
            .zip(deposits.par_iter().zip(plans.par_iter()))
            .map(|((b, c), (m, plan))| apply(b, c, m, plan))
            .collect()
    } else {
        boxes
            .iter_mut()
            .zip(concs.iter_mut())
            .zip(deposits.iter().zip(plans.iter()))
            .map(|((b, c), (m, plan))| apply(b, c, m, plan))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BoxId;
    use bt_geo::Polygon;

    fn geometries(n: usize) -> Vec<BoxGeometry> {
        (0..n)
            .map(|i| {
                let x = 10.0 * i as f64;
                BoxGeometry::new(
                    Polygon::rectangle(x, 0.0, x + 10.0, 10.0).unwrap(),
                    vec![-40.0, -20.0, -5.0, 0.0],
                    vec![0.0, 0.0, 0.02, 0.03],
                    2,
                )
                .with_kz(vec![0.0, 1e-3, 1e-3, 0.0])
            })
            .collect()
    }

    fn tracers() -> Vec<TracerDescriptor> {
        vec![
            TracerDescriptor::dissolved("Water"),
            TracerDescriptor::dissolved("Oxygen"),
            TracerDescriptor::particulate("Mud", 1e-5, 2500.0, 1000.0),
        ]
    }

    #[test]
    fn test_step_advances_time_and_commits() {
        let mut engine =
            TransportEngine::new(TransportConfig::default(), geometries(2), tracers()).unwrap();
        engine
            .concentrations_mut()
            .set_water(BoxId(0), 2, 1, 100.0)
            .unwrap();

        let report = engine.step(None).unwrap();
        assert_eq!(report.time, 3600.0);
        assert_eq!(engine.step_count(), 1);
        assert_eq!(engine.time(), 3600.0);
        // 气体交换把表层氧推向饱和值
        let surface = engine.concentrations().water(BoxId(0), 2, 1).unwrap();
        assert!(surface > 100.0);
        // 沉积层属性已写入
        assert_eq!(engine.boxes()[0].sediment().critical_shear()[2], 0.1);
    }

    #[test]
    fn test_step_with_deposit() {
        let mut engine =
            TransportEngine::new(TransportConfig::default(), geometries(3), tracers()).unwrap();
        let deposits = vec![vec![0.0, 0.0, 50.0]; 3];
        let reports = engine.run(2, Some(deposits.as_slice())).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].boxes_with_deposit, 3);
        // 每箱体 V = 0.05 m³
        assert!((reports[0].deposited_volume - 0.15).abs() < 1e-12);
        let mud = engine.mass_budget().get("Mud").unwrap().sediment;
        assert!((mud - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_deposit_length_mismatch_aborts_step() {
        let mut engine =
            TransportEngine::new(TransportConfig::default(), geometries(2), tracers()).unwrap();
        let deposits = vec![vec![0.0, 0.0, 1.0]];
        assert!(matches!(
            engine.step(Some(deposits.as_slice())),
            Err(TransportError::SizeMismatch { .. })
        ));
        assert_eq!(engine.step_count(), 0);
        assert_eq!(engine.time(), 0.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = TransportConfig::default();
        config.timestep = -1.0;
        assert!(matches!(
            TransportEngine::new(config, geometries(1), tracers()),
            Err(TransportError::Config(_))
        ));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let run = |strategy| {
            let mut config = TransportConfig::default();
            config.parallel.strategy = strategy;
            let mut engine = TransportEngine::new(config, geometries(4), tracers()).unwrap();
            for i in 0..4 {
                engine
                    .concentrations_mut()
                    .set_water(BoxId(i), 0, 1, 10.0 * i as f64)
                    .unwrap();
            }
            let deposits = vec![vec![0.0, 0.0, 20.0]; 4];
            engine.run(3, Some(deposits.as_slice())).unwrap();
            engine.concentrations().clone()
        };
        assert_eq!(
            run(ParallelStrategy::Sequential),
            run(ParallelStrategy::Parallel)
        );
    }

    #[test]
    fn test_bad_deposit_in_later_box_leaves_all_boxes_untouched() {
        let mut engine =
            TransportEngine::new(TransportConfig::default(), geometries(2), tracers()).unwrap();
        let boxes_before = engine.boxes().to_vec();
        let conc_before = engine.concentrations().clone();

        // 第一个箱体合法，第二个箱体质量向量长度错误
        let deposits = vec![vec![0.0, 0.0, 40.0], vec![1.0, 2.0]];
        assert!(matches!(
            engine.step(Some(deposits.as_slice())),
            Err(TransportError::SizeMismatch { .. })
        ));
        for (before, after) in boxes_before.iter().zip(engine.boxes()) {
            assert_eq!(before.sediment(), after.sediment());
            assert_eq!(before.water(), after.water());
        }
        assert_eq!(engine.concentrations(), &conc_before);
        assert_eq!(engine.step_count(), 0);
        assert!(!engine.is_failed());

        // 引擎仍可继续使用
        let deposits = vec![vec![0.0, 0.0, 40.0]; 2];
        let report = engine.step(Some(deposits.as_slice())).unwrap();
        assert_eq!(report.boxes_with_deposit, 2);
    }

    #[test]
    fn test_failed_engine_refuses_to_step() {
        let mut engine =
            TransportEngine::new(TransportConfig::default(), geometries(1), tracers()).unwrap();
        engine.failed = true;
        assert!(matches!(
            engine.step(None),
            Err(TransportError::PhysicalInvariant(_))
        ));
        assert_eq!(engine.step_count(), 0);
        assert_eq!(engine.time(), 0.0);
    }

    #[test]
    fn test_gas_exchange_is_exact_under_explicit_decay() {
        let mut config = TransportConfig::default();
        config.decay.kernel = bt_config::DecayKernelKind::ExplicitEuler;
        config.timestep = 1.0e6;
        let geometry = BoxGeometry::new(
            Polygon::rectangle(0.0, 0.0, 10.0, 10.0).unwrap(),
            vec![-10.0, 0.0],
            vec![0.0, 0.01],
            1,
        );
        let mut engine = TransportEngine::new(
            config,
            vec![geometry],
            vec![TracerDescriptor::dissolved("Oxygen")],
        )
        .unwrap();
        engine
            .concentrations_mut()
            .set_water(BoxId(0), 0, 0, 100.0)
            .unwrap();

        engine.step(None).unwrap();

        // rate = 2.1e-9 / (4e-5 · 10) = 5.25e-6, rate·Δt = 5.25
        let expected = 8000.0 + (100.0 - 8000.0) * (-5.25f64).exp();
        let surface = engine.concentrations().water(BoxId(0), 0, 0).unwrap();
        assert!((surface - expected).abs() < 1e-9);
        assert!(surface > 100.0 && surface < 8000.0);
    }
}
