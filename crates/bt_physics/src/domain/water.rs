// crates/bt_physics/src/domain/water.rs

//! 水柱分层
//!
//! 垂向坐标为高程（向上为正，水面为 0 附近）。
//! `gridz` 严格递增，长度 nz+1；第 0 层为底层，第 nz-1 层为表层。
//! `kz[f]` 为第 f 个界面的扩散系数，界面 0 为底面，界面 nz 为水面。

use crate::error::{TransportError, TransportResult};

/// 单个箱体的水柱
#[derive(Debug, Clone, PartialEq)]
pub struct WaterColumn {
    gridz: Vec<f64>,
    dz: Vec<f64>,
    volume: Vec<f64>,
    kz: Vec<f64>,
}

impl WaterColumn {
    /// 由层界面高程与界面扩散系数构建
    ///
    /// # 错误
    ///
    /// - 少于一层、`kz` 长度与界面数不一致
    /// - 层厚非正（几何设置缺陷）
    pub fn new(gridz: Vec<f64>, kz: Vec<f64>, area: f64) -> TransportResult<Self> {
        if gridz.len() < 2 {
            return Err(TransportError::configuration("水柱至少需要一层"));
        }
        TransportError::check_len("水柱 kz", gridz.len(), kz.len())?;

        let dz: Vec<f64> = gridz.windows(2).map(|w| w[1] - w[0]).collect();
        if let Some(k) = dz.iter().position(|&h| h.is_nan() || h <= 0.0) {
            return Err(TransportError::configuration(format!(
                "水柱第 {k} 层厚度非正: {:.4e}",
                dz[k]
            )));
        }
        if kz.iter().any(|&k| k.is_nan() || k < 0.0) {
            return Err(TransportError::configuration("水柱扩散系数不能为负"));
        }

        let volume = dz.iter().map(|h| h * area).collect();
        Ok(Self {
            gridz,
            dz,
            volume,
            kz,
        })
    }

    /// 层数
    #[inline]
    pub fn nz(&self) -> usize {
        self.dz.len()
    }

    /// 表层索引
    #[inline]
    pub fn surface(&self) -> usize {
        self.nz() - 1
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

    /// 界面扩散系数
    #[inline]
    pub fn kz(&self) -> &[f64] {
        &self.kz
    }

    /// 替换界面扩散系数（由外部水动力提供）
    pub fn set_kz(&mut self, kz: Vec<f64>) -> TransportResult<()> {
        TransportError::check_len("水柱 kz", self.gridz.len(), kz.len())?;
        self.kz = kz;
        Ok(())
    }

    /// 底深（正值）
    #[inline]
    pub fn bottom_depth(&self) -> f64 {
        -self.gridz[0]
    }

    /// 从底层移除水体积，底面相应抬升
    ///
    /// 返回移除前的底层体积。剩余体积非正时返回错误且不修改状态。
    pub(crate) fn shrink_bottom(&mut self, removed: f64, area: f64) -> TransportResult<f64> {
        let old = self.volume[0];
        let remaining = old - removed;
        if remaining.is_nan() || remaining <= 0.0 {
            return Err(TransportError::physical(format!(
                "底层水体耗尽: 体积 {old:.4e} m³, 需移除 {removed:.4e} m³"
            )));
        }
        let lift = removed / area;
        self.volume[0] = remaining;
        self.dz[0] -= lift;
        self.gridz[0] += lift;
        Ok(old)
    }
}
