// apps/bt_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 解析并校验输运配置文件，可选地校验箱体几何文件。

use anyhow::{Context, Result};
use bt_config::TransportConfig;
use bt_physics::{BoxGeometry, BoxId, ModelBox};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,

    /// 箱体几何文件路径（JSON 数组）
    #[arg(short, long)]
    pub geometry: Option<PathBuf>,
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== BoxTracer 配置验证 ===");

    let config = TransportConfig::from_file(&args.config)
        .with_context(|| format!("配置文件无效: {}", args.config.display()))?;

    info!("配置文件: {}", args.config.display());
    info!("  时间步长: {} s", config.timestep);
    info!("  衰减核: {:?}", config.decay.kernel);
    info!(
        "  深层混合: {}",
        if config.diffusion.deep_mixing.enabled { "启用" } else { "关闭" }
    );
    info!(
        "  气体交换: {} 种气体{}",
        config.gas_exchange.gases.len(),
        if config.gas_exchange.enabled { "" } else { "（关闭）" }
    );
    info!(
        "  沉积层厚度: [{}, {}] m",
        config.sediment.min_dz, config.sediment.max_dz
    );
    info!("  并行策略: {:?}", config.parallel.strategy);

    if let Some(path) = &args.geometry {
        validate_geometry(path)?;
    }

    info!("✓ 验证通过");
    Ok(())
}

fn validate_geometry(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取几何文件: {}", path.display()))?;
    let geometries: Vec<BoxGeometry> =
        serde_json::from_str(&content).context("几何文件 JSON 解析失败")?;

    if geometries.is_empty() {
        warn!("几何文件不含任何箱体");
    }
    for (i, geometry) in geometries.into_iter().enumerate() {
        ModelBox::from_geometry(BoxId(i), geometry)
            .with_context(|| format!("箱体 #{i} 几何无效"))?;
    }
    info!("几何文件: {}", path.display());
    Ok(())
}
