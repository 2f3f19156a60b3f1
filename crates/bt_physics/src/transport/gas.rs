// crates/bt_physics/src/transport/gas.rs

//! 表层气体交换
//!
//! 表层浓度以指数形式向饱和值弛豫：
//!
//! ```text
//! c ← c_sat + (c - c_sat)·exp(-rate·Δt),   rate = D / (δ · dz_surface)
//! ```
//!
//! 弛豫固定使用精确指数核，与衰减算子所选的核无关。
//!
//! D 为分子扩散系数，δ 为滞流膜厚度。所有常数为全局常数，
//! 不随空间和温度变化。
//!
//! 首次调用时按名称解析气体示踪剂并缓存；未注册的气体只发出警告，
//! 本次运行中跳过。

use bt_config::GasExchangeConfig;

use super::decay::DecayKernel;
use super::{BoxOperator, StepContext};
use crate::domain::{BoxConcentrations, ModelBox, TracerRegistry};
use crate::error::TransportResult;

/// 已解析的气体
#[derive(Debug, Clone, Copy, PartialEq)]
struct ResolvedGas {
    tracer: usize,
    diffusion_coefficient: f64,
    saturation: f64,
}

/// 气体交换算子
#[derive(Debug, Clone)]
pub struct GasExchange {
    config: GasExchangeConfig,
    resolved: Option<Vec<ResolvedGas>>,
}

impl GasExchange {
    /// 从配置创建
    pub fn new(config: &GasExchangeConfig) -> Self {
        Self {
            config: config.clone(),
            resolved: None,
        }
    }

    /// 已解析的气体示踪剂索引（尚未解析时为空）
    pub fn resolved_tracers(&self) -> Vec<usize> {
        self.resolved
            .as_ref()
            .map(|gases| gases.iter().map(|g| g.tracer).collect())
            .unwrap_or_default()
    }
}

impl BoxOperator for GasExchange {
    fn name(&self) -> &'static str {
        "gas_exchange"
    }

    fn prepare(&mut self, tracers: &TracerRegistry) -> TransportResult<()> {
        if self.resolved.is_some() {
            return Ok(());
        }

        let mut gases = Vec::with_capacity(self.config.gases.len());
        for gas in &self.config.gases {
            match tracers.index_of(&gas.name) {
                Some(index) if tracers.get(index).is_some_and(|t| t.in_water) => {
                    gases.push(ResolvedGas {
                        tracer: index,
                        diffusion_coefficient: gas.diffusion_coefficient,
                        saturation: gas.saturation,
                    });
                }
                Some(_) => {
                    log::warn!("气体示踪剂 {} 不在水柱中, 跳过气体交换", gas.name);
                }
                None => {
                    log::warn!("气体示踪剂 {} 未注册, 本次运行跳过气体交换", gas.name);
                }
            }
        }
        self.resolved = Some(gases);
        Ok(())
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
        let Some(gases) = self.resolved.as_ref() else {
            return Ok(());
        };

        let water = model_box.water();
        let top = water.surface();
        let dz_top = water.dz()[top];

        for gas in gases {
            let rate = gas.diffusion_coefficient / (self.config.film_thickness * dz_top);
            let cell = &mut conc.water[(top, gas.tracer)];
            *cell = DecayKernel::Exact.relax(*cell, gas.saturation, rate, ctx.dt);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoxGeometry, BoxId, TracerDescriptor};
    use bt_config::GasConfig;
    use bt_geo::Polygon;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn surface_box() -> ModelBox {
        let geometry = BoxGeometry::new(
            Polygon::rectangle(0.0, 0.0, 1.0, 1.0).unwrap(),
            vec![-20.0, -2.0, 0.0],
            vec![0.01],
            0,
        );
        ModelBox::from_geometry(BoxId(0), geometry).unwrap()
    }

    fn config() -> GasExchangeConfig {
        GasExchangeConfig {
            enabled: true,
            film_thickness: 1e-4,
            gases: vec![
                GasConfig {
                    name: "Oxygen".to_string(),
                    diffusion_coefficient: 2e-9,
                    saturation: 300.0,
                },
                GasConfig {
                    name: "CO2".to_string(),
                    diffusion_coefficient: 2e-9,
                    saturation: 10.0,
                },
            ],
        }
    }

    #[test]
    fn test_relaxes_surface_toward_saturation() {
        let tracers = TracerRegistry::new(vec![TracerDescriptor::dissolved("Oxygen")]).unwrap();
        let mut b = surface_box();
        let mut conc = BoxConcentrations::for_box(&b, 1);
        conc.water.write_column(0, &[100.0, 100.0]);

        let mut gas = GasExchange::new(&config());
        gas.prepare(&tracers).unwrap();
        assert_eq!(gas.resolved_tracers(), vec![0]);

        let dt = 3600.0;
        let ctx = StepContext { tracers: &tracers, dt, time: dt };
        gas.apply_box(&ctx, &mut b, &mut conc).unwrap();

        // rate = 2e-9 / (1e-4 * 2) = 1e-5
        let expected = 300.0 + (100.0 - 300.0) * (-1e-5 * dt).exp();
        assert!(approx_eq(conc.water[(1, 0)], expected));
        // 非表层不变
        assert_eq!(conc.water[(0, 0)], 100.0);
    }

    #[test]
    fn test_unresolved_gas_is_skipped() {
        let tracers = TracerRegistry::new(vec![TracerDescriptor::dissolved("NH3")]).unwrap();
        let mut b = surface_box();
        let mut conc = BoxConcentrations::for_box(&b, 1);
        conc.water.fill(5.0);

        let mut gas = GasExchange::new(&config());
        gas.prepare(&tracers).unwrap();
        assert!(gas.resolved_tracers().is_empty());

        let ctx = StepContext { tracers: &tracers, dt: 3600.0, time: 3600.0 };
        gas.apply_box(&ctx, &mut b, &mut conc).unwrap();
        assert_eq!(conc.water[(1, 0)], 5.0);
    }

    #[test]
    fn test_resolution_is_cached() {
        let first = TracerRegistry::new(vec![TracerDescriptor::dissolved("CO2")]).unwrap();
        let second = TracerRegistry::new(vec![
            TracerDescriptor::dissolved("Oxygen"),
            TracerDescriptor::dissolved("CO2"),
        ])
        .unwrap();
        let mut gas = GasExchange::new(&config());
        gas.prepare(&first).unwrap();
        gas.prepare(&second).unwrap();
        assert_eq!(gas.resolved_tracers(), vec![0]);
    }
}
