// crates/bt_config/src/transport_config.rs

//! TransportConfig - 输运引擎运行配置
//!
//! 描述各输运算子的全局参数。除箱体几何和示踪剂表以外，
//! 引擎运行所需的所有常量都在这里。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// 输运引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// 时间步长 [s]
    #[serde(default = "default_timestep")]
    pub timestep: f64,

    /// 衰减
    #[serde(default)]
    pub decay: DecayConfig,

    /// 垂向扩散
    #[serde(default)]
    pub diffusion: DiffusionConfig,

    /// 气体交换
    #[serde(default)]
    pub gas_exchange: GasExchangeConfig,

    /// 生物扰动
    #[serde(default)]
    pub bioturbation: BioturbationConfig,

    /// 沉积层
    #[serde(default)]
    pub sediment: SedimentConfig,

    /// 并行策略
    #[serde(default)]
    pub parallel: ParallelConfig,
}

fn default_timestep() -> f64 { 3600.0 }

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timestep: default_timestep(),
            decay: DecayConfig::default(),
            diffusion: DiffusionConfig::default(),
            gas_exchange: GasExchangeConfig::default(),
            bioturbation: BioturbationConfig::default(),
            sediment: SedimentConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

// ============================================================
// 衰减
// ============================================================

/// 衰减核类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecayKernelKind {
    /// 精确指数衰减 c·exp(-kΔt)
    #[default]
    Exact,
    /// 显式欧拉 c·(1-kΔt)
    ExplicitEuler,
    /// 隐式欧拉 c/(1+kΔt)
    ImplicitEuler,
}

/// 衰减配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayConfig {
    /// 衰减核
    #[serde(default)]
    pub kernel: DecayKernelKind,

    /// 水柱衰减开关
    #[serde(default = "default_true")]
    pub water_enabled: bool,

    /// 沉积层衰减开关
    #[serde(default = "default_true")]
    pub sediment_enabled: bool,

    /// 沉积层衰减率倍数
    #[serde(default = "default_sediment_scale")]
    pub sediment_scale: f64,
}

fn default_true() -> bool { true }
fn default_sediment_scale() -> f64 { 1.0 }

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            kernel: DecayKernelKind::default(),
            water_enabled: true,
            sediment_enabled: true,
            sediment_scale: default_sediment_scale(),
        }
    }
}

// ============================================================
// 垂向扩散
// ============================================================

/// 垂向扩散配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffusionConfig {
    /// 混合效率（乘在界面扩散系数上）
    #[serde(default = "default_mixing_efficiency")]
    pub mixing_efficiency: f64,

    /// 水示踪剂名称（不参与扩散）
    #[serde(default = "default_water_tracer")]
    pub water_tracer: Option<String>,

    /// 深层混合
    #[serde(default)]
    pub deep_mixing: DeepMixingConfig,
}

fn default_mixing_efficiency() -> f64 { 1.0 }
fn default_water_tracer() -> Option<String> { Some("Water".to_string()) }

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            mixing_efficiency: default_mixing_efficiency(),
            water_tracer: default_water_tracer(),
            deep_mixing: DeepMixingConfig::default(),
        }
    }
}

/// 深层混合配置
///
/// 对底深超过阈值的箱体，在扩散前用箱体的深层参考值
/// 覆盖最底层若干营养盐的浓度。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepMixingConfig {
    /// 是否启用
    #[serde(default)]
    pub enabled: bool,

    /// 底深阈值 [m]（正值）
    #[serde(default = "default_depth_threshold")]
    pub depth_threshold: f64,

    /// 是否补充溶解氧
    #[serde(default = "default_true")]
    pub include_oxygen: bool,

    /// 元素追踪（补充磷、碳）
    #[serde(default)]
    pub elemental_tracking: bool,

    /// 示踪剂名称
    #[serde(default)]
    pub names: DeepMixNames,
}

fn default_depth_threshold() -> f64 { 200.0 }

impl Default for DeepMixingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            depth_threshold: default_depth_threshold(),
            include_oxygen: true,
            elemental_tracking: false,
            names: DeepMixNames::default(),
        }
    }
}

/// 深层混合示踪剂名称
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepMixNames {
    /// 氨
    pub ammonia: String,
    /// 硝酸盐
    pub nitrate: String,
    /// 溶解氧
    pub oxygen: String,
    /// 硅酸盐
    pub silica: String,
    /// 微量营养元素
    pub micronutrient: String,
    /// 溶解无机磷
    pub phosphorus: String,
    /// 溶解无机碳
    pub carbon: String,
}

impl Default for DeepMixNames {
    fn default() -> Self {
        Self {
            ammonia: "NH3".to_string(),
            nitrate: "NO3".to_string(),
            oxygen: "Oxygen".to_string(),
            silica: "Si".to_string(),
            micronutrient: "MicroNut".to_string(),
            phosphorus: "DIP".to_string(),
            carbon: "DIC".to_string(),
        }
    }
}

// ============================================================
// 气体交换
// ============================================================

/// 单一气体参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasConfig {
    /// 示踪剂名称
    pub name: String,
    /// 分子扩散系数 [m²/s]
    pub diffusion_coefficient: f64,
    /// 饱和浓度
    pub saturation: f64,
}

/// 气体交换配置
///
/// 所有常数为全局常数，不随空间和温度变化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasExchangeConfig {
    /// 是否启用
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 滞流膜厚度 [m]
    #[serde(default = "default_film_thickness")]
    pub film_thickness: f64,

    /// 气体列表
    #[serde(default = "default_gases")]
    pub gases: Vec<GasConfig>,
}

fn default_film_thickness() -> f64 { 4.0e-5 }

fn default_gases() -> Vec<GasConfig> {
    vec![
        GasConfig {
            name: "Oxygen".to_string(),
            diffusion_coefficient: 2.1e-9,
            saturation: 8000.0,
        },
        GasConfig {
            name: "CO2".to_string(),
            diffusion_coefficient: 1.9e-9,
            saturation: 24000.0,
        },
    ]
}

impl Default for GasExchangeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            film_thickness: default_film_thickness(),
            gases: default_gases(),
        }
    }
}

// ============================================================
// 生物扰动
// ============================================================

/// 生物扰动深度权重剖面
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DepthProfile {
    /// w(d) = exp(-d / e_fold)
    Exponential {
        /// e 折深度 [m]
        e_fold: f64,
    },
    /// w(d) = max(0, 1 - d / max_depth)
    Linear {
        /// 最大扰动深度 [m]
        max_depth: f64,
    },
}

impl Default for DepthProfile {
    fn default() -> Self {
        Self::Exponential { e_fold: 0.05 }
    }
}

/// 生物扰动配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioturbationConfig {
    /// 是否启用
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 粒径阈值 [m]，小于该值的颗粒才会被搬运
    #[serde(default = "default_size_threshold")]
    pub size_threshold: f64,

    /// 增强系数
    #[serde(default = "default_enhancement")]
    pub enhancement: f64,

    /// 扩散混合速率 [m/s]
    #[serde(default = "default_mixing_rate")]
    pub mixing_rate: f64,

    /// 排出速率 [m/s]
    #[serde(default = "default_expulsion_rate")]
    pub expulsion_rate: f64,

    /// 表层交换速率 [m/s]
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: f64,

    /// 参考容重 [kg/m³]
    #[serde(default = "default_reference_bulk_density")]
    pub reference_bulk_density: f64,

    /// 颗粒密度 [kg/m³]
    #[serde(default = "default_grain_density")]
    pub grain_density: f64,

    /// 深度权重剖面
    #[serde(default)]
    pub profile: DepthProfile,
}

fn default_size_threshold() -> f64 { 1.0e-3 }
fn default_enhancement() -> f64 { 1.0 }
fn default_mixing_rate() -> f64 { 1.0e-9 }
fn default_expulsion_rate() -> f64 { 1.0e-10 }
fn default_exchange_rate() -> f64 { 5.0e-10 }
fn default_reference_bulk_density() -> f64 { 1000.0 }
fn default_grain_density() -> f64 { 2650.0 }

impl Default for BioturbationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size_threshold: default_size_threshold(),
            enhancement: default_enhancement(),
            mixing_rate: default_mixing_rate(),
            expulsion_rate: default_expulsion_rate(),
            exchange_rate: default_exchange_rate(),
            reference_bulk_density: default_reference_bulk_density(),
            grain_density: default_grain_density(),
            profile: DepthProfile::default(),
        }
    }
}

// ============================================================
// 沉积层
// ============================================================

/// 沉积层配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SedimentConfig {
    /// 最小层厚 [m]
    #[serde(default = "default_min_dz")]
    pub min_dz: f64,

    /// 最大层厚 [m]
    #[serde(default = "default_max_dz")]
    pub max_dz: f64,

    /// 临界剪切应力 [Pa]（暂为常数）
    #[serde(default = "default_critical_shear_stress")]
    pub critical_shear_stress: f64,

    /// 侵蚀经验系数 [kg/m²/s/Pa]
    #[serde(default = "default_erosion_scalar")]
    pub erosion_scalar: f64,

    /// 新沉积物密度 [kg/m³]
    #[serde(default = "default_deposit_density")]
    pub deposit_density: f64,
}

fn default_min_dz() -> f64 { 1.0e-3 }
fn default_max_dz() -> f64 { 0.05 }
fn default_critical_shear_stress() -> f64 { 0.1 }
fn default_erosion_scalar() -> f64 { 2.0e-3 }
fn default_deposit_density() -> f64 { 1800.0 }

impl Default for SedimentConfig {
    fn default() -> Self {
        Self {
            min_dz: default_min_dz(),
            max_dz: default_max_dz(),
            critical_shear_stress: default_critical_shear_stress(),
            erosion_scalar: default_erosion_scalar(),
            deposit_density: default_deposit_density(),
        }
    }
}

// ============================================================
// 并行
// ============================================================

/// 并行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParallelStrategy {
    /// 串行逐箱处理
    Sequential,
    /// 箱体级并行
    Parallel,
    /// 根据箱体数量自动选择
    #[default]
    Auto,
}

/// 并行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// 策略
    #[serde(default)]
    pub strategy: ParallelStrategy,

    /// Auto 模式下启用并行的最小箱体数
    #[serde(default = "default_min_parallel_boxes")]
    pub min_parallel_boxes: usize,
}

fn default_min_parallel_boxes() -> usize { 64 }

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            strategy: ParallelStrategy::default(),
            min_parallel_boxes: default_min_parallel_boxes(),
        }
    }
}

impl ParallelConfig {
    /// 给定箱体数量时是否并行
    pub fn use_parallel(&self, n_boxes: usize) -> bool {
        match self.strategy {
            ParallelStrategy::Sequential => false,
            ParallelStrategy::Parallel => true,
            ParallelStrategy::Auto => n_boxes >= self.min_parallel_boxes,
        }
    }
}

// ============================================================
// 加载与验证
// ============================================================

impl TransportConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// 从 JSON 字符串解析并验证
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: TransportConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("timestep", self.timestep)?;

        non_negative("decay.sediment_scale", self.decay.sediment_scale)?;

        non_negative("diffusion.mixing_efficiency", self.diffusion.mixing_efficiency)?;
        non_negative(
            "diffusion.deep_mixing.depth_threshold",
            self.diffusion.deep_mixing.depth_threshold,
        )?;

        positive("gas_exchange.film_thickness", self.gas_exchange.film_thickness)?;
        for (i, gas) in self.gas_exchange.gases.iter().enumerate() {
            if gas.name.trim().is_empty() {
                return Err(ConfigError::Missing(format!("gas_exchange.gases[{i}].name")));
            }
            non_negative("gas_exchange.gases.diffusion_coefficient", gas.diffusion_coefficient)?;
            non_negative("gas_exchange.gases.saturation", gas.saturation)?;
        }

        let bt = &self.bioturbation;
        positive("bioturbation.size_threshold", bt.size_threshold)?;
        non_negative("bioturbation.enhancement", bt.enhancement)?;
        non_negative("bioturbation.mixing_rate", bt.mixing_rate)?;
        non_negative("bioturbation.expulsion_rate", bt.expulsion_rate)?;
        non_negative("bioturbation.exchange_rate", bt.exchange_rate)?;
        positive("bioturbation.reference_bulk_density", bt.reference_bulk_density)?;
        positive("bioturbation.grain_density", bt.grain_density)?;
        match bt.profile {
            DepthProfile::Exponential { e_fold } => positive("bioturbation.profile.e_fold", e_fold)?,
            DepthProfile::Linear { max_depth } => {
                positive("bioturbation.profile.max_depth", max_depth)?
            }
        }

        let sed = &self.sediment;
        positive("sediment.min_dz", sed.min_dz)?;
        if sed.max_dz <= sed.min_dz {
            return Err(ConfigError::invalid(
                "sediment.max_dz",
                sed.max_dz,
                "必须大于 sediment.min_dz",
            ));
        }
        non_negative("sediment.critical_shear_stress", sed.critical_shear_stress)?;
        non_negative("sediment.erosion_scalar", sed.erosion_scalar)?;
        positive("sediment.deposit_density", sed.deposit_density)?;

        Ok(())
    }
}

fn positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, value, "必须为正数"))
    }
}

fn non_negative(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, value, "不能为负"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.decay.kernel, DecayKernelKind::Exact);
        assert_eq!(config.gas_exchange.gases.len(), 2);
    }

    #[test]
    fn test_invalid_timestep() {
        let mut config = TransportConfig::default();
        config.timestep = 0.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "timestep"));
    }

    #[test]
    fn test_invalid_layer_bounds() {
        let mut config = TransportConfig::default();
        config.sediment.max_dz = config.sediment.min_dz;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_gas_name() {
        let mut config = TransportConfig::default();
        config.gas_exchange.gases[0].name = " ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "timestep": 600.0,
            "decay": { "kernel": "implicit_euler" },
            "bioturbation": { "profile": { "type": "linear", "max_depth": 0.1 } }
        }"#;
        let config = TransportConfig::from_json_str(json).unwrap();
        assert_eq!(config.timestep, 600.0);
        assert_eq!(config.decay.kernel, DecayKernelKind::ImplicitEuler);
        assert!(config.decay.water_enabled);
        assert_eq!(
            config.bioturbation.profile,
            DepthProfile::Linear { max_depth: 0.1 }
        );
        assert_eq!(config.diffusion.deep_mixing.names.ammonia, "NH3");
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            TransportConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = TransportConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TransportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sediment.max_dz, config.sediment.max_dz);
        assert_eq!(parsed.parallel.strategy, ParallelStrategy::Auto);
    }

    #[test]
    fn test_parallel_decision() {
        let mut parallel = ParallelConfig::default();
        assert!(!parallel.use_parallel(10));
        assert!(parallel.use_parallel(64));
        parallel.strategy = ParallelStrategy::Sequential;
        assert!(!parallel.use_parallel(10_000));
        parallel.strategy = ParallelStrategy::Parallel;
        assert!(parallel.use_parallel(1));
    }
}
