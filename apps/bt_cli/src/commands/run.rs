// apps/bt_cli/src/commands/run.rs

//! 运行模拟命令
//!
//! 构建箱体域（合成的一排方形箱体，或从 JSON 几何文件读入），
//! 以恒定颗粒物沉积通量推进输运引擎，最后输出质量收支。

use anyhow::{Context, Result};
use bt_config::TransportConfig;
use bt_geo::Polygon;
use bt_physics::prelude::*;
use bt_physics::MassBudget;
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// 运行模拟参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 箱体几何文件路径（JSON 数组），缺省时生成合成域
    #[arg(short, long)]
    pub geometry: Option<PathBuf>,

    /// 合成域的普通箱体数量
    #[arg(long, default_value = "8")]
    pub boxes: usize,

    /// 时间步数
    #[arg(short = 'n', long, default_value = "24")]
    pub steps: usize,

    /// 每个箱体每步的泥沉积质量 [kg]
    #[arg(long, default_value = "500.0")]
    pub deposit: f64,

    /// 以 JSON 输出质量收支
    #[arg(long)]
    pub json: bool,
}

/// 合成域箱体边长 [m]
const BOX_SIZE: f64 = 1000.0;

/// 演示用示踪剂表
fn tracer_table() -> Vec<TracerDescriptor> {
    vec![
        TracerDescriptor::dissolved("Water"),
        TracerDescriptor::dissolved("Oxygen"),
        TracerDescriptor::dissolved("CO2"),
        TracerDescriptor::dissolved("NH3").with_in_sediment(true),
        TracerDescriptor::particulate("Mud", 1e-5, 2500.0, 1000.0),
        TracerDescriptor::particulate("Detritus", 5e-5, 1400.0, 600.0).with_decay_rate(1e-6),
    ]
}

/// 一排方形箱体，水深向外海递增，末端为开边界箱体
fn synthetic_geometry(n_boxes: usize) -> Result<Vec<BoxGeometry>> {
    let mut geometries = Vec::with_capacity(n_boxes + 1);
    for i in 0..=n_boxes {
        let x0 = i as f64 * BOX_SIZE;
        let depth = 15.0 + 10.0 * i as f64;
        let footprint = Polygon::rectangle(x0, 0.0, x0 + BOX_SIZE, BOX_SIZE)
            .with_context(|| format!("箱体 #{i} 足迹无效"))?;
        let geometry = BoxGeometry::new(
            footprint,
            vec![-depth, -0.5 * depth, -0.2 * depth, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.02, 0.05],
            4,
        )
        .with_kz(vec![0.0, 5e-4, 2e-3, 0.0]);
        let geometry = if i == n_boxes {
            geometry.with_type(BoxType::Boundary)
        } else {
            geometry
        };
        geometries.push(geometry);
    }
    Ok(geometries)
}

fn load_geometry(path: &Path) -> Result<Vec<BoxGeometry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取几何文件: {}", path.display()))?;
    serde_json::from_str(&content).context("几何文件 JSON 解析失败")
}

/// 初始场：均匀溶解物浓度，外加一个碎屑点源
fn initialize(engine: &mut TransportEngine) -> Result<()> {
    let tracers = engine.tracers().clone();
    let oxygen = tracers.require("Oxygen")?;
    let co2 = tracers.require("CO2")?;
    let nh3 = tracers.require("NH3")?;
    let detritus = tracers.require("Detritus")?;

    for conc in engine.concentrations_mut().boxes_mut() {
        for k in 0..conc.water.n_layers() {
            conc.water[(k, oxygen)] = 6500.0;
            conc.water[(k, co2)] = 22000.0;
            conc.water[(k, nh3)] = 1.2;
        }
    }

    // 点源放在第二个箱体足迹中心、水下 3 m
    let Some(center) = engine.boxes().get(1).map(|b| b.footprint().vertex_mean()) else {
        warn!("箱体不足两个，跳过点源");
        return Ok(());
    };
    let z = -3.0;
    match engine.locator().point_to_box(center.x, center.y) {
        Some(id) => {
            let model_box = &engine.boxes()[id.index()];
            let k = engine.locator().depth_to_water_layer(z, model_box);
            engine
                .concentrations_mut()
                .set_water(id, k, detritus, 50.0)?;
            info!("点源 ({}, {}, {z}) → 箱体 {id} 第 {k} 层", center.x, center.y);
        }
        None => warn!("点源 ({}, {}) 不在任何箱体内，已忽略", center.x, center.y),
    }
    Ok(())
}

fn report_budget(budget: &MassBudget) {
    for tracer in &budget.tracers {
        info!(
            "  {:<10} 水柱 {:>14.6e}  沉积层 {:>14.6e}  合计 {:>14.6e}",
            tracer.name,
            tracer.water,
            tracer.sediment,
            tracer.total()
        );
    }
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== BoxTracer 模拟启动 ===");

    let config = match &args.config {
        Some(path) => TransportConfig::from_file(path)
            .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
        None => TransportConfig::default(),
    };
    info!("配置: Δt = {} s, 衰减核 {:?}", config.timestep, config.decay.kernel);

    let geometries = match &args.geometry {
        Some(path) => load_geometry(path)?,
        None => synthetic_geometry(args.boxes)?,
    };

    let mut engine =
        TransportEngine::new(config, geometries, tracer_table()).context("构建输运引擎失败")?;
    info!(
        "域: {} 个箱体, {} 个示踪剂",
        engine.boxes().len(),
        engine.tracers().len()
    );
    initialize(&mut engine)?;

    let initial = engine.mass_budget();
    info!("初始质量收支:");
    report_budget(&initial);

    // 普通箱体每步接收恒定沉积
    let mud = engine.tracers().require("Mud")?;
    let detritus = engine.tracers().require("Detritus")?;
    let deposits: Vec<Vec<f64>> = engine
        .boxes()
        .iter()
        .map(|b| {
            let mut masses = vec![0.0; engine.tracers().len()];
            if b.is_normal() {
                masses[mud] = args.deposit;
                masses[detritus] = 0.1 * args.deposit;
            }
            masses
        })
        .collect();

    let start = Instant::now();
    let mut layers_created = 0;
    for _ in 0..args.steps {
        let report = engine
            .step(Some(deposits.as_slice()))
            .with_context(|| format!("第 {} 步失败", engine.step_count() + 1))?;
        layers_created += report.layers_created;
    }
    let elapsed = start.elapsed();

    info!("=== 模拟完成 ===");
    info!("总步数: {}", engine.step_count());
    info!("模型时间: {} s", engine.time());
    info!("新建沉积层: {}", layers_created);
    info!("计算时间: {:.3} s", elapsed.as_secs_f64());

    let budget = engine.mass_budget();
    info!("最终质量收支:");
    report_budget(&budget);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&budget)?);
    }
    Ok(())
}
