// crates/bt_physics/src/domain/tracer.rs

//! 示踪剂描述与注册表
//!
//! 示踪剂描述在整个运行期间静态不变，被所有箱体共享。
//! 注册表在初始化时建立 名称→索引 映射，算子在准备阶段解析一次，
//! 逐步计算中不再做字符串比较。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{TransportError, TransportResult};

// ============================================================
// 示踪剂描述
// ============================================================

/// 示踪剂描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracerDescriptor {
    /// 名称（唯一）
    pub name: String,

    /// 颗粒态
    #[serde(default)]
    pub particulate: bool,

    /// 溶解态（沉积层中按孔隙水体积计浓度）
    #[serde(default)]
    pub dissolved: bool,

    /// 存在于水柱
    #[serde(default = "default_true")]
    pub in_water: bool,

    /// 存在于沉积层
    #[serde(default)]
    pub in_sediment: bool,

    /// 可被生物扰动搬运
    #[serde(default)]
    pub movable: bool,

    /// 粒径 [m]
    #[serde(default)]
    pub particle_size: f64,

    /// 一阶衰减率 [1/s]
    #[serde(default)]
    pub decay_rate: f64,

    /// 颗粒密度 [kg/m³]
    #[serde(default)]
    pub bulk_density: f64,

    /// 新沉积物中的初始浓度 [kg/m³]
    #[serde(default)]
    pub initial_deposit_conc: f64,
}

fn default_true() -> bool {
    true
}

impl TracerDescriptor {
    /// 仅存在于水柱的溶解态示踪剂
    pub fn dissolved(name: &str) -> Self {
        Self {
            name: name.to_string(),
            particulate: false,
            dissolved: true,
            in_water: true,
            in_sediment: false,
            movable: false,
            particle_size: 0.0,
            decay_rate: 0.0,
            bulk_density: 0.0,
            initial_deposit_conc: 0.0,
        }
    }

    /// 颗粒态示踪剂，水柱与沉积层均存在，默认可搬运
    pub fn particulate(
        name: &str,
        particle_size: f64,
        bulk_density: f64,
        initial_deposit_conc: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            particulate: true,
            dissolved: false,
            in_water: true,
            in_sediment: true,
            movable: true,
            particle_size,
            decay_rate: 0.0,
            bulk_density,
            initial_deposit_conc,
        }
    }

    /// 设置衰减率
    pub fn with_decay_rate(mut self, rate: f64) -> Self {
        self.decay_rate = rate;
        self
    }

    /// 设置是否存在于沉积层
    pub fn with_in_sediment(mut self, in_sediment: bool) -> Self {
        self.in_sediment = in_sediment;
        self
    }

    /// 设置是否存在于水柱
    pub fn with_in_water(mut self, in_water: bool) -> Self {
        self.in_water = in_water;
        self
    }

    /// 设置是否可被搬运
    pub fn with_movable(mut self, movable: bool) -> Self {
        self.movable = movable;
        self
    }

    /// 是否参与沉积层固体体积统计
    #[inline]
    pub fn contributes_solid(&self) -> bool {
        self.particulate && self.in_sediment && self.bulk_density > 0.0
    }
}

// ============================================================
// 注册表
// ============================================================

/// 示踪剂注册表
#[derive(Debug, Clone, Default)]
pub struct TracerRegistry {
    descriptors: Vec<TracerDescriptor>,
    index: HashMap<String, usize>,
}

impl TracerRegistry {
    /// 从描述列表创建，名称重复或为空时报错
    pub fn new(descriptors: Vec<TracerDescriptor>) -> TransportResult<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (i, desc) in descriptors.iter().enumerate() {
            if desc.name.trim().is_empty() {
                return Err(TransportError::configuration(format!(
                    "第 {i} 个示踪剂名称为空"
                )));
            }
            if index.insert(desc.name.clone(), i).is_some() {
                return Err(TransportError::configuration(format!(
                    "示踪剂名称重复: {}",
                    desc.name
                )));
            }
        }
        Ok(Self { descriptors, index })
    }

    /// 示踪剂数量
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// 按索引获取
    #[inline]
    pub fn get(&self, index: usize) -> Option<&TracerDescriptor> {
        self.descriptors.get(index)
    }

    /// 按名称查找索引
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// 按名称查找索引，未找到时为配置错误
    pub fn require(&self, name: &str) -> TransportResult<usize> {
        self.index_of(name)
            .ok_or_else(|| TransportError::configuration(format!("必需的示踪剂未注册: {name}")))
    }

    /// 遍历 (索引, 描述)
    pub fn iter(&self) -> impl Iterator<Item = (usize, &TracerDescriptor)> {
        self.descriptors.iter().enumerate()
    }

    /// 描述切片
    #[inline]
    pub fn descriptors(&self) -> &[TracerDescriptor] {
        &self.descriptors
    }
}
