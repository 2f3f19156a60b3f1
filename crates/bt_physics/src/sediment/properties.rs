// crates/bt_physics/src/sediment/properties.rs

//! 沉积层属性推导
//!
//! 根据当前示踪剂状态计算各层孔隙率、临界剪切应力和侵蚀率，
//! 供外部侵蚀与生物模块使用。
//!
//! - topk 以上的空层: φ = 1, τc = 0, E = 0
//! - 已填充层: φ = (V - Σ c·V/ρ) / V，V ≤ 0 或固体体积为 0 时取 1
//! - τc 暂为配置常数；E = erosion_scalar · τc / deposit_density

use bt_config::SedimentConfig;

use crate::domain::{BoxConcentrations, ModelBox};
use crate::error::TransportResult;
use crate::transport::{BoxOperator, StepContext};

/// 沉积层属性算子
#[derive(Debug, Clone)]
pub struct SedimentProperties {
    critical_shear_stress: f64,
    erosion_rate: f64,
}

impl SedimentProperties {
    /// 从配置创建
    pub fn new(config: &SedimentConfig) -> Self {
        let critical_shear_stress = config.critical_shear_stress;
        Self {
            critical_shear_stress,
            erosion_rate: config.erosion_scalar * critical_shear_stress / config.deposit_density,
        }
    }

    /// 已填充层的侵蚀率常数
    #[inline]
    pub fn erosion_rate(&self) -> f64 {
        self.erosion_rate
    }
}

impl BoxOperator for SedimentProperties {
    fn name(&self) -> &'static str {
        "sediment_properties"
    }

    fn apply_box(
        &self,
        ctx: &StepContext<'_>,
        model_box: &mut ModelBox,
        conc: &mut BoxConcentrations,
    ) -> TransportResult<()> {
        let id = model_box.id();
        let sediment = &mut model_box.sediment;
        let topk = sediment.topk;

        for k in 0..topk {
            sediment.porosity[k] = 1.0;
            sediment.critical_shear[k] = 0.0;
            sediment.erosion_rate[k] = 0.0;
        }

        for k in topk..sediment.dz.len() {
            let volume = sediment.volume[k];
            let mut solid = 0.0;
            for (t, tracer) in ctx.tracers.iter() {
                if !tracer.contributes_solid() {
                    continue;
                }
                let c = conc.sediment[(k, t)];
                if c.is_nan() {
                    continue;
                }
                solid += c * volume / tracer.bulk_density;
            }

            sediment.porosity[k] = if volume <= 0.0 || solid == 0.0 {
                1.0
            } else {
                let porosity = (volume - solid) / volume;
                if !(0.0..=1.0).contains(&porosity) {
                    log::debug!(
                        "箱体 {} 沉积层 {} 孔隙率 {:.4} 越界, 截断到 [0, 1]",
                        id,
                        k,
                        porosity
                    );
                }
                porosity.clamp(0.0, 1.0)
            };
            sediment.critical_shear[k] = self.critical_shear_stress;
            sediment.erosion_rate[k] = self.erosion_rate;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoxGeometry, BoxId, TracerDescriptor, TracerRegistry};
    use bt_geo::Polygon;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn setup() -> (ModelBox, BoxConcentrations, TracerRegistry) {
        let geometry = BoxGeometry::new(
            Polygon::rectangle(0.0, 0.0, 2.0, 2.0).unwrap(),
            vec![-5.0, 0.0],
            vec![0.0, 0.01, 0.02],
            1,
        );
        let b = ModelBox::from_geometry(BoxId(0), geometry).unwrap();
        let tracers = TracerRegistry::new(vec![
            TracerDescriptor::particulate("Mud", 1e-5, 2500.0, 1000.0),
            TracerDescriptor::particulate("Sand", 2e-4, 2650.0, 1500.0),
            TracerDescriptor::dissolved("NH3").with_in_sediment(true),
        ])
        .unwrap();
        let conc = BoxConcentrations::for_box(&b, tracers.len());
        (b, conc, tracers)
    }

    #[test]
    fn test_porosity_from_solids() {
        let (mut b, mut conc, tracers) = setup();
        conc.sediment[(1, 0)] = 500.0;
        conc.sediment[(1, 1)] = 530.0;
        conc.sediment[(1, 2)] = 1e6;
        conc.sediment[(2, 1)] = f64::NAN;

        let op = SedimentProperties::new(&SedimentConfig::default());
        let ctx = StepContext { tracers: &tracers, dt: 1.0, time: 1.0 };
        op.apply_box(&ctx, &mut b, &mut conc).unwrap();

        let sed = b.sediment();
        // 固体体积分数 500/2500 + 530/2650 = 0.4
        assert!(approx_eq(sed.porosity()[1], 0.6));
        // NaN 被跳过，固体为 0
        assert_eq!(sed.porosity()[2], 1.0);
        assert_eq!(sed.porosity()[0], 1.0);
        assert_eq!(sed.critical_shear()[0], 0.0);
        assert_eq!(sed.critical_shear()[1], 0.1);
        assert!(approx_eq(sed.erosion_rate()[1], 2e-3 * 0.1 / 1800.0));
        assert_eq!(sed.erosion_rate()[0], 0.0);
    }

    #[test]
    fn test_overfull_layer_is_clamped() {
        let (mut b, mut conc, tracers) = setup();
        conc.sediment[(1, 0)] = 5000.0;
        let op = SedimentProperties::new(&SedimentConfig::default());
        let ctx = StepContext { tracers: &tracers, dt: 1.0, time: 1.0 };
        op.apply_box(&ctx, &mut b, &mut conc).unwrap();
        assert_eq!(b.sediment().porosity()[1], 0.0);
    }
}
