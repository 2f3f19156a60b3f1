// crates/bt_physics/src/diagnostics.rs

//! 质量收支诊断
//!
//! 统计普通箱体内每个示踪剂的总质量：
//!
//! - 水柱: Σ c·V
//! - 沉积层: 颗粒态 Σ c·V，溶解态 Σ c·φ·V（浓度按孔隙水计）

use serde::Serialize;

use crate::domain::{ConcentrationField, ModelBox, TracerRegistry};

/// 单个示踪剂的质量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracerBudget {
    /// 示踪剂名称
    pub name: String,
    /// 水柱质量
    pub water: f64,
    /// 沉积层质量
    pub sediment: f64,
}

impl TracerBudget {
    /// 总质量
    #[inline]
    pub fn total(&self) -> f64 {
        self.water + self.sediment
    }
}

/// 质量收支
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MassBudget {
    /// 按示踪剂索引排列
    pub tracers: Vec<TracerBudget>,
}

impl MassBudget {
    /// 统计当前场
    pub fn compute(boxes: &[ModelBox], tracers: &TracerRegistry, field: &ConcentrationField) -> Self {
        let mut budgets: Vec<TracerBudget> = tracers
            .iter()
            .map(|(_, t)| TracerBudget {
                name: t.name.clone(),
                water: 0.0,
                sediment: 0.0,
            })
            .collect();

        for (model_box, conc) in boxes.iter().zip(field.boxes()) {
            if !model_box.is_normal() {
                continue;
            }
            let water = model_box.water();
            let sediment = model_box.sediment();

            for (t, tracer) in tracers.iter() {
                let budget = &mut budgets[t];
                if tracer.in_water {
                    budget.water += (0..water.nz())
                        .map(|k| conc.water[(k, t)] * water.volume()[k])
                        .sum::<f64>();
                }
                if tracer.in_sediment {
                    budget.sediment += sediment
                        .active_layers()
                        .map(|k| {
                            let v = sediment.volume()[k];
                            let c = conc.sediment[(k, t)];
                            if tracer.dissolved {
                                c * sediment.porosity()[k] * v
                            } else {
                                c * v
                            }
                        })
                        .sum::<f64>();
                }
            }
        }

        Self { tracers: budgets }
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Option<&TracerBudget> {
        self.tracers.iter().find(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoxGeometry, BoxId, BoxType, TracerDescriptor};
    use bt_geo::Polygon;

    #[test]
    fn test_budget_counts_normal_boxes_only() {
        let make = |i: usize, box_type| {
            let x = i as f64;
            let geometry = BoxGeometry::new(
                Polygon::rectangle(x, 0.0, x + 1.0, 1.0).unwrap(),
                vec![-4.0, -1.0, 0.0],
                vec![0.0, 0.02],
                1,
            )
            .with_type(box_type)
            .with_sediment_porosity(0.5);
            ModelBox::from_geometry(BoxId(i), geometry).unwrap()
        };
        let boxes = vec![make(0, BoxType::Normal), make(1, BoxType::Boundary)];
        let tracers = TracerRegistry::new(vec![
            TracerDescriptor::particulate("Mud", 1e-5, 2500.0, 1000.0),
            TracerDescriptor::dissolved("NH3").with_in_sediment(true),
        ])
        .unwrap();
        let mut field = ConcentrationField::for_boxes(&boxes, 2);
        for conc in field.boxes_mut() {
            conc.water.fill(2.0);
            conc.sediment.fill(10.0);
        }

        let budget = MassBudget::compute(&boxes, &tracers, &field);
        let mud = budget.get("Mud").unwrap();
        assert!((mud.water - 8.0).abs() < 1e-12);
        assert!((mud.sediment - 0.2).abs() < 1e-12);
        let nh3 = budget.get("NH3").unwrap();
        assert!((nh3.sediment - 0.1).abs() < 1e-12);
        assert!((nh3.total() - 8.1).abs() < 1e-12);
        assert!(budget.get("Oxygen").is_none());
    }
}
