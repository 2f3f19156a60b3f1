// crates/bt_physics/src/domain/concentration.rs

//! 浓度场
//!
//! 浓度按 (箱体, 层, 示踪剂) 索引，每个箱体持有一个水柱矩阵和一个沉积层矩阵。
//! 一次时间步内同时存在两个快照：
//!
//! - `current`: 步初状态，只读
//! - `new`: 算子写入的目标
//!
//! 两者是独立持有的缓冲区，从不别名。

use std::ops::{Index, IndexMut};

use super::model_box::{BoxId, ModelBox};
use crate::error::{TransportError, TransportResult};

// ============================================================
// 层 × 示踪剂矩阵
// ============================================================

/// 行优先的 层 × 示踪剂 矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMatrix {
    n_layers: usize,
    n_tracers: usize,
    data: Vec<f64>,
}

impl LayerMatrix {
    /// 创建全零矩阵
    pub fn zeros(n_layers: usize, n_tracers: usize) -> Self {
        Self {
            n_layers,
            n_tracers,
            data: vec![0.0; n_layers * n_tracers],
        }
    }

    /// 层数
    #[inline]
    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    /// 示踪剂数
    #[inline]
    pub fn n_tracers(&self) -> usize {
        self.n_tracers
    }

    #[inline]
    fn offset(&self, layer: usize, tracer: usize) -> Option<usize> {
        (layer < self.n_layers && tracer < self.n_tracers).then_some(layer * self.n_tracers + tracer)
    }

    /// 带边界检查的读取
    #[inline]
    pub fn get(&self, layer: usize, tracer: usize) -> Option<f64> {
        self.offset(layer, tracer).map(|i| self.data[i])
    }

    /// 带边界检查的写入
    #[inline]
    pub fn get_mut(&mut self, layer: usize, tracer: usize) -> Option<&mut f64> {
        self.offset(layer, tracer).map(move |i| &mut self.data[i])
    }

    /// 某一层所有示踪剂
    #[inline]
    pub fn layer(&self, layer: usize) -> &[f64] {
        let start = layer * self.n_tracers;
        &self.data[start..start + self.n_tracers]
    }

    /// 将某示踪剂的整列复制到 `out`
    pub fn read_column(&self, tracer: usize, out: &mut [f64]) {
        for (k, v) in out.iter_mut().enumerate().take(self.n_layers) {
            *v = self[(k, tracer)];
        }
    }

    /// 用 `values` 覆盖某示踪剂的整列
    pub fn write_column(&mut self, tracer: usize, values: &[f64]) {
        for (k, &v) in values.iter().enumerate().take(self.n_layers) {
            self[(k, tracer)] = v;
        }
    }

    /// 填充常数
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }
}

impl Index<(usize, usize)> for LayerMatrix {
    type Output = f64;

    #[inline]
    fn index(&self, (layer, tracer): (usize, usize)) -> &f64 {
        assert!(
            layer < self.n_layers && tracer < self.n_tracers,
            "浓度索引越界: ({layer}, {tracer}) / ({}, {})",
            self.n_layers,
            self.n_tracers
        );
        &self.data[layer * self.n_tracers + tracer]
    }
}

impl IndexMut<(usize, usize)> for LayerMatrix {
    #[inline]
    fn index_mut(&mut self, (layer, tracer): (usize, usize)) -> &mut f64 {
        assert!(
            layer < self.n_layers && tracer < self.n_tracers,
            "浓度索引越界: ({layer}, {tracer}) / ({}, {})",
            self.n_layers,
            self.n_tracers
        );
        &mut self.data[layer * self.n_tracers + tracer]
    }
}

// ============================================================
// 单箱体浓度
// ============================================================

/// 单个箱体的浓度
#[derive(Debug, Clone, PartialEq)]
pub struct BoxConcentrations {
    /// 水柱浓度（层 0 为底层）
    pub water: LayerMatrix,
    /// 沉积层浓度（层 0 为最浅）；溶解态按孔隙水体积计
    pub sediment: LayerMatrix,
}

impl BoxConcentrations {
    /// 按箱体分层创建全零浓度
    pub fn for_box(model_box: &ModelBox, n_tracers: usize) -> Self {
        Self {
            water: LayerMatrix::zeros(model_box.water().nz(), n_tracers),
            sediment: LayerMatrix::zeros(model_box.sediment().nz(), n_tracers),
        }
    }
}

// ============================================================
// 全场
// ============================================================

/// 全部箱体的浓度场
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConcentrationField {
    boxes: Vec<BoxConcentrations>,
}

impl ConcentrationField {
    /// 按箱体集合创建全零浓度场
    pub fn for_boxes(boxes: &[ModelBox], n_tracers: usize) -> Self {
        Self {
            boxes: boxes
                .iter()
                .map(|b| BoxConcentrations::for_box(b, n_tracers))
                .collect(),
        }
    }

    /// 箱体数
    #[inline]
    pub fn n_boxes(&self) -> usize {
        self.boxes.len()
    }

    /// 单箱体浓度
    pub fn get_box(&self, id: BoxId) -> TransportResult<&BoxConcentrations> {
        self.boxes
            .get(id.index())
            .ok_or(TransportError::UnknownBox(id.index()))
    }

    /// 单箱体浓度（可变）
    pub fn get_box_mut(&mut self, id: BoxId) -> TransportResult<&mut BoxConcentrations> {
        self.boxes
            .get_mut(id.index())
            .ok_or(TransportError::UnknownBox(id.index()))
    }

    /// 全部箱体
    #[inline]
    pub fn boxes(&self) -> &[BoxConcentrations] {
        &self.boxes
    }

    /// 全部箱体（可变）
    #[inline]
    pub fn boxes_mut(&mut self) -> &mut [BoxConcentrations] {
        &mut self.boxes
    }

    /// 读取水柱浓度
    pub fn water(&self, id: BoxId, layer: usize, tracer: usize) -> Option<f64> {
        self.boxes.get(id.index())?.water.get(layer, tracer)
    }

    /// 读取沉积层浓度
    pub fn sediment(&self, id: BoxId, layer: usize, tracer: usize) -> Option<f64> {
        self.boxes.get(id.index())?.sediment.get(layer, tracer)
    }

    /// 写入水柱浓度
    pub fn set_water(
        &mut self,
        id: BoxId,
        layer: usize,
        tracer: usize,
        value: f64,
    ) -> TransportResult<()> {
        let conc = self.get_box_mut(id)?;
        let n_layers = conc.water.n_layers();
        let cell = conc.water.get_mut(layer, tracer).ok_or(TransportError::SizeMismatch {
            what: "水柱浓度索引",
            expected: n_layers,
            actual: layer,
        })?;
        *cell = value;
        Ok(())
    }

    /// 写入沉积层浓度
    pub fn set_sediment(
        &mut self,
        id: BoxId,
        layer: usize,
        tracer: usize,
        value: f64,
    ) -> TransportResult<()> {
        let conc = self.get_box_mut(id)?;
        let n_layers = conc.sediment.n_layers();
        let cell = conc.sediment.get_mut(layer, tracer).ok_or(TransportError::SizeMismatch {
            what: "沉积层浓度索引",
            expected: n_layers,
            actual: layer,
        })?;
        *cell = value;
        Ok(())
    }
}

// ============================================================
// 双快照
// ============================================================

/// `current` / `new` 双快照
#[derive(Debug, Clone)]
pub struct TracerSnapshots {
    current: ConcentrationField,
    new: ConcentrationField,
}

impl TracerSnapshots {
    /// 以初始场创建
    pub fn new(initial: ConcentrationField) -> Self {
        Self {
            new: initial.clone(),
            current: initial,
        }
    }

    /// 步初状态
    #[inline]
    pub fn current(&self) -> &ConcentrationField {
        &self.current
    }

    /// 步初状态（可变，仅用于初始化和外部耦合）
    #[inline]
    pub fn current_mut(&mut self) -> &mut ConcentrationField {
        &mut self.current
    }

    /// 写入目标
    #[inline]
    pub fn new_field(&self) -> &ConcentrationField {
        &self.new
    }

    /// 写入目标（可变）
    #[inline]
    pub fn new_field_mut(&mut self) -> &mut ConcentrationField {
        &mut self.new
    }

    /// 开始一步：以 current 覆盖 new
    pub fn begin_step(&mut self) {
        self.new.clone_from(&self.current);
    }

    /// 提交一步：new 成为 current
    pub fn commit(&mut self) {
        std::mem::swap(&mut self.current, &mut self.new);
    }
}
