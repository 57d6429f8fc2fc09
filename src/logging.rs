//! 日志：写入 logs/ 下的时间戳文件，verbose 时同时输出到 stderr

use crate::error::Result;
use crate::ui::Ui;

use chrono::Local;
use log::LevelFilter;
use std::path::{Path, PathBuf};

const LOG_FILE_PREFIX: &str = "tr2-version-swapper.";
const LOG_FILE_SUFFIX: &str = ".log";

/// 接近上限时提前提示的余量
const LIMIT_HINT_MARGIN: usize = 3;

/// 只记录警告以上的第三方目标
const QUIET_TARGETS: [&str; 4] = ["hyper", "hyper_util", "reqwest", "rustls"];

fn log_file_name() -> String {
    format!(
        "{}{}{}",
        LOG_FILE_PREFIX,
        Local::now().format("%Y%m%d-%H%M%S"),
        LOG_FILE_SUFFIX
    )
}

/// 日志格式和级别过滤，尚未连接输出
fn base_dispatch() -> fern::Dispatch {
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                message
            ))
        })
        .level(LevelFilter::Debug);

    QUIET_TARGETS
        .iter()
        .fold(dispatch, |d, target| d.level_for(*target, LevelFilter::Warn))
}

/// 安装全局日志器，返回日志文件路径；无法创建文件时仍可继续运行（仅 verbose 输出）
pub fn init(logs_dir: &Path, verbose: bool) -> Option<PathBuf> {
    let path = logs_dir.join(log_file_name());
    let mut dispatch = base_dispatch();

    let path = match std::fs::create_dir_all(logs_dir).and_then(|_| fern::log_file(&path)) {
        Ok(file) => {
            dispatch = dispatch.chain(file);
            Some(path)
        }
        Err(e) => {
            eprintln!("Could not create log file {}: {}", path.display(), e);
            None
        }
    };

    if verbose {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(LevelFilter::Info)
                .chain(std::io::stderr()),
        );
    }

    if let Err(e) = dispatch.apply() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    path
}

pub fn is_log_file(name: &str) -> bool {
    name.starts_with(LOG_FILE_PREFIX) && name.ends_with(LOG_FILE_SUFFIX)
}

/// 日志清理计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruningPlan {
    pub total: usize,
    /// 需要删除的最旧文件（按名称排序）
    pub to_delete: Vec<String>,
    /// 是否接近上限
    pub approaching: bool,
}

/// `limit` 为 0 表示不限制
pub fn plan_log_pruning(mut names: Vec<String>, limit: u32) -> PruningPlan {
    names.sort();
    let total = names.len();
    let limit = limit as usize;

    if limit == 0 {
        return PruningPlan {
            total,
            to_delete: Vec::new(),
            approaching: false,
        };
    }

    let excess = total.saturating_sub(limit);
    PruningPlan {
        total,
        approaching: excess == 0 && total + LIMIT_HINT_MARGIN > limit,
        to_delete: names.into_iter().take(excess).collect(),
    }
}

/// 按设置的上限删除最旧的日志文件
pub fn prune_log_files(logs_dir: &Path, limit: u32, ui: &dyn Ui) -> Result<()> {
    let names = match std::fs::read_dir(logs_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| is_log_file(n))
            .collect(),
        Err(e) => {
            log::debug!("Could not read logs folder {}: {}", logs_dir.display(), e);
            return Ok(());
        }
    };

    let plan = plan_log_pruning(names, limit);

    if !plan.to_delete.is_empty() {
        log::warn!(
            "{} log files exceed the limit of {}; deleting the oldest {}.",
            plan.total,
            limit,
            plan.to_delete.len()
        );
        ui.logs_limit_exceeded(limit, plan.total)?;

        let mut failed = false;
        for name in &plan.to_delete {
            if let Err(e) = std::fs::remove_file(logs_dir.join(name)) {
                log::error!("Could not delete log file {}: {}", name, e);
                failed = true;
            }
        }
        if failed {
            ui.logs_delete_failed(limit)?;
        }
    } else if plan.approaching {
        ui.logs_limit_approaching(limit, plan.total)?;
    }

    Ok(())
}
