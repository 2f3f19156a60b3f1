// crates/bt_physics/src/domain/model_box.rs

//! 箱体
//!
//! 箱体是水平计算单元：多边形足迹 + 水柱 + 沉积层柱。
//! 初始化时由外部几何（[`BoxGeometry`]）构建一次，之后每步被算子修改，
//! 直到运行结束才释放。

use bt_geo::Polygon;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::sediment::SedimentColumn;
use super::water::WaterColumn;
use crate::error::{TransportError, TransportResult};

// ============================================================
// 标识与类型
// ============================================================

/// 箱体编号（即注册顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoxId(pub usize);

impl BoxId {
    /// 转为数组索引
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 箱体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoxType {
    /// 普通计算箱体
    #[default]
    Normal,
    /// 开边界箱体（不参与输运算子）
    Boundary,
    /// 陆地箱体（不参与输运算子）
    Land,
}

// ============================================================
// 深层参考值
// ============================================================

/// 深层混合参考字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservoirField {
    /// 氨
    Ammonia,
    /// 硝酸盐
    Nitrate,
    /// 溶解氧
    Oxygen,
    /// 硅酸盐
    Silica,
    /// 微量营养元素
    Micronutrient,
    /// 溶解无机磷
    Phosphorus,
    /// 溶解无机碳
    Carbon,
}

/// 箱体外部深水的参考浓度
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepReservoir {
    /// 氨
    pub ammonia: f64,
    /// 硝酸盐
    pub nitrate: f64,
    /// 溶解氧
    pub oxygen: f64,
    /// 硅酸盐
    pub silica: f64,
    /// 微量营养元素
    pub micronutrient: f64,
    /// 溶解无机磷
    pub phosphorus: f64,
    /// 溶解无机碳
    pub carbon: f64,
}

impl DeepReservoir {
    /// 取参考值
    #[inline]
    pub fn value(&self, field: ReservoirField) -> f64 {
        match field {
            ReservoirField::Ammonia => self.ammonia,
            ReservoirField::Nitrate => self.nitrate,
            ReservoirField::Oxygen => self.oxygen,
            ReservoirField::Silica => self.silica,
            ReservoirField::Micronutrient => self.micronutrient,
            ReservoirField::Phosphorus => self.phosphorus,
            ReservoirField::Carbon => self.carbon,
        }
    }
}

// ============================================================
// 外部几何
// ============================================================

/// 外部提供的箱体几何与水深数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxGeometry {
    /// 箱体类型
    #[serde(default)]
    pub box_type: BoxType,

    /// 水平足迹
    pub footprint: Polygon,

    /// 水平面积 [m²]，缺省时取足迹面积
    #[serde(default)]
    pub area: Option<f64>,

    /// 水柱层界面高程（递增，底在前）
    pub water_gridz: Vec<f64>,

    /// 水柱界面扩散系数 [m²/s]，缺省为 0
    #[serde(default)]
    pub water_kz: Option<Vec<f64>>,

    /// 沉积层厚度（0 为最浅）
    pub sediment_dz: Vec<f64>,

    /// 最浅已填充沉积层
    pub sediment_topk: usize,

    /// 沉积层初始孔隙率
    #[serde(default = "default_sediment_porosity")]
    pub sediment_porosity: f64,

    /// 深层参考值
    #[serde(default)]
    pub reservoir: DeepReservoir,

    /// 生物扰动活性系数
    #[serde(default = "default_activity")]
    pub bioturbation_activity: f64,
}

fn default_sediment_porosity() -> f64 {
    0.5
}

fn default_activity() -> f64 {
    1.0
}

impl BoxGeometry {
    /// 以默认参数创建几何
    pub fn new(
        footprint: Polygon,
        water_gridz: Vec<f64>,
        sediment_dz: Vec<f64>,
        sediment_topk: usize,
    ) -> Self {
        Self {
            box_type: BoxType::Normal,
            footprint,
            area: None,
            water_gridz,
            water_kz: None,
            sediment_dz,
            sediment_topk,
            sediment_porosity: default_sediment_porosity(),
            reservoir: DeepReservoir::default(),
            bioturbation_activity: default_activity(),
        }
    }

    /// 设置箱体类型
    pub fn with_type(mut self, box_type: BoxType) -> Self {
        self.box_type = box_type;
        self
    }

    /// 设置界面扩散系数
    pub fn with_kz(mut self, kz: Vec<f64>) -> Self {
        self.water_kz = Some(kz);
        self
    }

    /// 设置深层参考值
    pub fn with_reservoir(mut self, reservoir: DeepReservoir) -> Self {
        self.reservoir = reservoir;
        self
    }

    /// 设置沉积层初始孔隙率
    pub fn with_sediment_porosity(mut self, porosity: f64) -> Self {
        self.sediment_porosity = porosity;
        self
    }
}

// ============================================================
// 箱体
// ============================================================

/// 箱体
#[derive(Debug, Clone)]
pub struct ModelBox {
    id: BoxId,
    box_type: BoxType,
    footprint: Polygon,
    area: f64,
    pub(crate) water: WaterColumn,
    pub(crate) sediment: SedimentColumn,
    /// 深层参考值
    pub reservoir: DeepReservoir,
    /// 生物扰动活性（由外部生物模块更新）
    pub bioturbation_activity: f64,
}

impl ModelBox {
    /// 从外部几何构建
    pub fn from_geometry(id: BoxId, geometry: BoxGeometry) -> TransportResult<Self> {
        let area = geometry.area.unwrap_or_else(|| geometry.footprint.area());
        if area.is_nan() || area <= 0.0 {
            return Err(TransportError::configuration(format!(
                "箱体 {id} 面积非正: {area}"
            )));
        }

        let n_faces = geometry.water_gridz.len();
        let kz = geometry.water_kz.unwrap_or_else(|| vec![0.0; n_faces]);
        let water = WaterColumn::new(geometry.water_gridz, kz, area)?;
        let sediment = SedimentColumn::new(
            geometry.sediment_dz,
            geometry.sediment_topk,
            geometry.sediment_porosity,
            area,
        )?;

        Ok(Self {
            id,
            box_type: geometry.box_type,
            footprint: geometry.footprint,
            area,
            water,
            sediment,
            reservoir: geometry.reservoir,
            bioturbation_activity: geometry.bioturbation_activity,
        })
    }

    /// 编号
    #[inline]
    pub fn id(&self) -> BoxId {
        self.id
    }

    /// 类型
    #[inline]
    pub fn box_type(&self) -> BoxType {
        self.box_type
    }

    /// 是否为参与输运的普通箱体
    #[inline]
    pub fn is_normal(&self) -> bool {
        self.box_type == BoxType::Normal
    }

    /// 足迹
    #[inline]
    pub fn footprint(&self) -> &Polygon {
        &self.footprint
    }

    /// 水平面积 [m²]
    #[inline]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// 水柱
    #[inline]
    pub fn water(&self) -> &WaterColumn {
        &self.water
    }

    /// 水柱（可变，用于更新扩散系数）
    #[inline]
    pub fn water_mut(&mut self) -> &mut WaterColumn {
        &mut self.water
    }

    /// 沉积层柱
    #[inline]
    pub fn sediment(&self) -> &SedimentColumn {
        &self.sediment
    }
}
