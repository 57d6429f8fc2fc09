use crate::config::{Context, GAME_PROCESS_NAME};
use crate::error::Result;
use crate::ui::Ui;

use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};

/// 在目标目录下运行的游戏进程（仅观察，不持有）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningConflict {
    pub pid: u32,
    pub name: String,
    pub executable_path: PathBuf,
    pub start_time: Option<DateTime<Local>>,
}

impl std::fmt::Display for RunningConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Name: {} | ID: {}", self.name, self.pid)?;
        if let Some(start) = self.start_time {
            write!(f, " | Start time: {}", start.format("%H:%M:%S"))?;
        }
        Ok(())
    }
}

/// 名称匹配的进程；无法读取可执行文件路径的只记录 PID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessListing {
    pub processes: Vec<RunningConflict>,
    pub unresolved: Vec<u32>,
}

/// 平台进程表
pub trait ProcessTable {
    fn find_by_name(&self, name: &str) -> io::Result<ProcessListing>;
    fn is_running(&self, process: &RunningConflict) -> bool;
    /// 请求结束进程；返回 Ok 不代表进程已退出
    fn terminate(&self, process: &RunningConflict) -> io::Result<()>;
}

/// 进程冲突未能解决的原因（仅提示，随后的复制仍会进行）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictUnresolved {
    /// 无法读取进程列表
    DetectionFailed(String),
    /// 用户在等待过程中放弃（输入已关闭）
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    NoConflict,
    Resolved,
    Unresolved(ConflictUnresolved),
}

/// 比较进程名，忽略大小写和 .exe 后缀
pub fn process_name_matches(candidate: &str, target: &str) -> bool {
    fn stem(s: &str) -> &str {
        match s.len().checked_sub(4).filter(|&i| i > 0) {
            Some(i) if s.get(i..).is_some_and(|ext| ext.eq_ignore_ascii_case(".exe")) => &s[..i],
            _ => s,
        }
    }
    stem(candidate).eq_ignore_ascii_case(stem(target))
}

fn normalize_dir(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// 可执行文件是否位于指定目录（直接位于，不含子目录）
pub fn runs_from_directory(executable: &Path, dir: &Path) -> bool {
    let Some(parent) = executable.parent() else {
        return false;
    };
    let (parent, dir) = (normalize_dir(parent), normalize_dir(dir));

    if cfg!(windows) {
        parent
            .to_string_lossy()
            .eq_ignore_ascii_case(&dir.to_string_lossy())
    } else {
        parent == dir
    }
}

pub struct ProcessGuard<'a> {
    ctx: &'a Context,
    table: &'a dyn ProcessTable,
    ui: &'a dyn Ui,
}

impl<'a> ProcessGuard<'a> {
    pub fn new(ctx: &'a Context, table: &'a dyn ProcessTable, ui: &'a dyn Ui) -> Self {
        Self { ctx, table, ui }
    }

    /// 查找从游戏目录运行的游戏进程
    ///
    /// 同名进程的位置无法确定时（例如以管理员身份运行）视为检测失败
    pub fn find_conflicting_process(&self, game_path: &Path) -> io::Result<Option<RunningConflict>> {
        log::debug!("Checking for a {} process running in the target folder...", GAME_PROCESS_NAME);
        let listing = self.table.find_by_name(GAME_PROCESS_NAME)?;
        let found = listing
            .processes
            .into_iter()
            .filter(|p| process_name_matches(&p.name, GAME_PROCESS_NAME))
            .find(|p| runs_from_directory(&p.executable_path, game_path));

        if found.is_none() && !listing.unresolved.is_empty() {
            let pids: Vec<String> = listing.unresolved.iter().map(u32::to_string).collect();
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "could not tell where {} (PID {}) is running from, it may be running as administrator",
                    GAME_PROCESS_NAME,
                    pids.join(", ")
                ),
            ));
        }
        Ok(found)
    }

    /// 交互式处理冲突进程，直到其退出或用户放弃
    ///
    /// Ctrl+C 和提示框错误会作为 `Err` 返回，调用方不得继续写入
    pub fn resolve_conflict(&self, conflict: &RunningConflict) -> Result<GuardOutcome> {
        log::debug!("Found a game process running from target folder. {}", conflict);
        self.ui.guard_display_conflict(conflict)?;

        if self.ui.guard_ask_terminate()? {
            log::debug!("User is allowing the program to kill the running task.");
            match self.table.terminate(conflict) {
                Ok(()) if !self.table.is_running(conflict) => {
                    log::info!("Terminated process {}.", conflict.pid);
                    self.settle();
                    return Ok(GuardOutcome::Resolved);
                }
                Ok(()) => {
                    log::warn!("Process {} is still running after termination request.", conflict.pid);
                    self.ui.guard_terminate_failed("the process did not exit")?;
                }
                Err(e) => {
                    log::error!("An unexpected error occurred while trying to kill the process: {}", e);
                    self.ui.guard_terminate_failed(&e.to_string())?;
                }
            }
        } else {
            log::debug!("User is opting to close the running task on their own.");
        }

        if !self.table.is_running(conflict) {
            log::debug!("Process ended before the user prompt loop started.");
            self.ui.guard_exited_externally()?;
            self.settle();
            return Ok(GuardOutcome::Resolved);
        }

        loop {
            log::debug!("Waiting for user to close the running task.");
            if !self.ui.guard_wait_for_continue()? {
                log::debug!("Input closed while waiting for the process to exit.");
                return Ok(GuardOutcome::Unresolved(ConflictUnresolved::Cancelled));
            }

            if !self.table.is_running(conflict) {
                log::debug!("User continued the program after the process had exited.");
                self.settle();
                return Ok(GuardOutcome::Resolved);
            }

            log::debug!("User tried to continue but the process is still running, looping.");
            self.ui.guard_still_running()?;
        }
    }

    fn settle(&self) {
        if !self.ctx.settle_delay.is_zero() {
            std::thread::sleep(self.ctx.settle_delay);
        }
    }

    /// 检测并处理冲突进程
    pub fn ensure_clear(&self) -> Result<GuardOutcome> {
        let conflict = match self.find_conflicting_process(&self.ctx.dirs.game) {
            Ok(c) => c,
            Err(e) => {
                log::error!("An unexpected error occurred while trying to find running processes: {}", e);
                self.ui.guard_detection_failed(&e.to_string())?;
                return Ok(GuardOutcome::Unresolved(ConflictUnresolved::DetectionFailed(
                    e.to_string(),
                )));
            }
        };

        match conflict {
            None => {
                log::info!("No game processes running from the target folder.");
                Ok(GuardOutcome::NoConflict)
            }
            Some(c) => {
                let outcome = self.resolve_conflict(&c)?;
                if outcome == GuardOutcome::Resolved {
                    log::info!("Handled running game process of concern.");
                }
                Ok(outcome)
            }
        }
    }

    /// 写入游戏目录前调用；冲突未解决只作提示，中断则向上返回
    pub fn clear_for_writing(&self) -> Result<()> {
        match self.ensure_clear()? {
            GuardOutcome::NoConflict | GuardOutcome::Resolved => {}
            GuardOutcome::Unresolved(ConflictUnresolved::DetectionFailed(e)) => {
                log::warn!("Proceeding without a process check: {}", e);
            }
            GuardOutcome::Unresolved(ConflictUnresolved::Cancelled) => {
                log::warn!("Proceeding while a game process may still hold files open.");
            }
        }
        Ok(())
    }
}
