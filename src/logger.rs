/*
 * @Description  : 运行目录与日志。输出目录为 `<output_path>/<配置文件名>`，
 *                 日志同时写到终端和 `<配置文件名>_<YYYY-mm-dd-HH-MM>.log`。
 */

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// 一次训练运行的输出位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub final_output_path: PathBuf,
    pub log_file: PathBuf,
}

/// 计算并创建输出目录（不安装日志订阅器）
pub fn prepare_run_paths(output_path: &Path, cfg_path: &Path) -> std::io::Result<RunPaths> {
    let cfg_name = cfg_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    let final_output_path = output_path.join(&cfg_name);
    std::fs::create_dir_all(&final_output_path)?;
    let log_file = final_output_path.join(format!(
        "{}_{}.log",
        cfg_name,
        Local::now().format("%Y-%m-%d-%H-%M")
    ));
    Ok(RunPaths {
        final_output_path,
        log_file,
    })
}

/// 创建输出目录并安装全局日志：终端 + 日志文件。级别由 `RUST_LOG` 控制，默认 info。
/// 若全局订阅器已存在（如同一进程内多次运行），沿用已有的订阅器。
pub fn create_logger(output_path: &Path, cfg_path: &Path) -> std::io::Result<RunPaths> {
    let paths = prepare_run_paths(output_path, cfg_path)?;
    let file = File::create(&paths.log_file)?;
    let installed = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
    if installed.is_err() {
        tracing::debug!("日志订阅器已存在，{:?} 不会收到日志", paths.log_file);
    }
    Ok(paths)
}
