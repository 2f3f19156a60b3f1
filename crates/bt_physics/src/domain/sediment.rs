// crates/bt_physics/src/domain/sediment.rs

//! 沉积层柱
//!
//! 层索引 0 为最浅，nz-1 为最深。`topk` 是当前最浅的已填充层，
//! 其上方的层为空（厚度、体积为 0）。沉积只会使 `topk` 减小。
//!
//! # 垂向坐标
//!
//! `gridz[k]` 为第 k 层顶面相对于沉积物-水界面的高程：
//! `gridz[topk] = 0`，向下递减，`gridz[k+1] = gridz[k] - dz[k]`。
//! 空层的界面高程均为 0。这与水柱的递增高程方向相反。

use std::ops::Range;

use crate::error::{TransportError, TransportResult};

/// 单个箱体的沉积层柱
#[derive(Debug, Clone, PartialEq)]
pub struct SedimentColumn {
    pub(crate) topk: usize,
    pub(crate) gridz: Vec<f64>,
    pub(crate) dz: Vec<f64>,
    pub(crate) volume: Vec<f64>,
    pub(crate) porosity: Vec<f64>,
    pub(crate) critical_shear: Vec<f64>,
    pub(crate) erosion_rate: Vec<f64>,
    pub(crate) fill_time: Vec<f64>,
}

impl SedimentColumn {
    /// 由各层厚度构建
    ///
    /// `dz[k]` 在 `k < topk` 时必须为 0，其余必须为正；
    /// 已填充层使用统一的初始孔隙率。
    pub fn new(dz: Vec<f64>, topk: usize, porosity: f64, area: f64) -> TransportResult<Self> {
        let nz = dz.len();
        if nz == 0 {
            return Err(TransportError::configuration("沉积层柱至少需要一层"));
        }
        if topk >= nz {
            return Err(TransportError::configuration(format!(
                "沉积层 topk={topk} 超出层数 {nz}"
            )));
        }
        if !(0.0..=1.0).contains(&porosity) {
            return Err(TransportError::configuration(format!(
                "初始孔隙率 {porosity} 不在 [0, 1] 内"
            )));
        }
        for (k, &h) in dz.iter().enumerate() {
            let ok = if k < topk { h == 0.0 } else { h > 0.0 };
            if !ok {
                return Err(TransportError::configuration(format!(
                    "沉积层第 {k} 层厚度 {h:.4e} 与 topk={topk} 不一致"
                )));
            }
        }

        let volume = dz.iter().map(|h| h * area).collect();
        let porosity = (0..nz)
            .map(|k| if k < topk { 1.0 } else { porosity })
            .collect();

        let mut column = Self {
            topk,
            gridz: vec![0.0; nz + 1],
            dz,
            volume,
            porosity,
            critical_shear: vec![0.0; nz],
            erosion_rate: vec![0.0; nz],
            fill_time: vec![0.0; nz],
        };
        column.recompute_depths();
        Ok(column)
    }

    /// 层数
    #[inline]
    pub fn nz(&self) -> usize {
        self.dz.len()
    }

    /// 最浅已填充层
    #[inline]
    pub fn topk(&self) -> usize {
        self.topk
    }

    /// 已填充层索引范围
    #[inline]
    pub fn active_layers(&self) -> Range<usize> {
        self.topk..self.nz()
    }

    /// 已填充层数
    #[inline]
    pub fn n_active(&self) -> usize {
        self.nz() - self.topk
    }

    /// 层界面高程
    #[inline]
    pub fn gridz(&self) -> &[f64] {
        &self.gridz
    }

    /// 层厚
    #[inline]
    pub fn dz(&self) -> &[f64] {
        &self.dz
    }

    /// 层体积
    #[inline]
    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    /// 孔隙率
    #[inline]
    pub fn porosity(&self) -> &[f64] {
        &self.porosity
    }

    /// 临界剪切应力 [Pa]
    #[inline]
    pub fn critical_shear(&self) -> &[f64] {
        &self.critical_shear
    }

    /// 侵蚀率常数
    #[inline]
    pub fn erosion_rate(&self) -> &[f64] {
        &self.erosion_rate
    }

    /// 最近一次填充时间 [s]
    #[inline]
    pub fn fill_time(&self) -> &[f64] {
        &self.fill_time
    }

    /// 第 k 层中心在界面以下的深度（正值）
    #[inline]
    pub fn layer_depth(&self, k: usize) -> f64 {
        -0.5 * (self.gridz[k] + self.gridz[k + 1])
    }

    /// 沉积柱总厚度
    pub fn total_thickness(&self) -> f64 {
        self.active_layers().map(|k| self.dz[k]).sum()
    }

    /// 按当前层厚重算界面高程
    pub fn recompute_depths(&mut self) {
        let topk = self.topk;
        for z in &mut self.gridz[..=topk] {
            *z = 0.0;
        }
        for k in topk..self.nz() {
            self.gridz[k + 1] = self.gridz[k] - self.dz[k];
        }
    }

    /// 在 topk 上方开辟新的空层，返回新的 topk
    ///
    /// 已到达第 0 层时无法继续，需要合并深层（本引擎不处理）。
    pub(crate) fn open_layer_above(&mut self) -> TransportResult<usize> {
        if self.topk == 0 {
            return Err(TransportError::physical(
                "沉积层已满: 无法在第 0 层之上新建层，需要合并深层",
            ));
        }
        self.topk -= 1;
        let k = self.topk;
        self.dz[k] = 0.0;
        self.volume[k] = 0.0;
        self.porosity[k] = 1.0;
        Ok(k)
    }
}
