/*
 * @Description  : DCGAN 训练入口：`train_dcgan --cfg <配置文件>`
 */

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use only_dcgan::{Config, run};

#[derive(Debug, Parser)]
#[command(name = "train_dcgan", about = "Train a DCGAN network", version)]
struct Args {
    /// 实验配置文件（YAML）
    #[arg(long)]
    cfg: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.cfg)
        .with_context(|| format!("无法加载配置 {}", args.cfg.display()))?;
    let summary = run(&config, &args.cfg).context("训练失败")?;
    info!(
        "最终指标: dACC {:.4} gCE {:.4} dCE {:.4}",
        summary.d_acc.value, summary.g_ce.value, summary.d_ce.value
    );
    Ok(())
}
