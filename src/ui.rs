use crate::compat_patch::CompatibilityPatchRecord;
use crate::error::Result;
use crate::manifest::{MusicCodec, Variant};
use crate::music_fix::{MusicFileKind, NormalizeReport};
use crate::process_guard::RunningConflict;
use crate::version_check::ReleaseStatus;

use std::path::Path;

/// UI 抽象接口
pub trait Ui: Send + Sync {
    // 通用
    fn display_welcome(&self) -> Result<()>;
    fn display_release_status(&self, status: &ReleaseStatus) -> Result<()>;
    fn display_release_check_failed(&self, err: &str) -> Result<()>;
    fn blank_line(&self) -> Result<()>;
    fn message(&self, text: &str) -> Result<()>;
    fn warn(&self, text: &str) -> Result<()>;
    fn error(&self, text: &str) -> Result<()>;
    /// 带边框的标题，用于报告步骤结果
    fn header(&self, title: &str, subtitle: Option<&str>) -> Result<()>;
    fn wait_for_key(&self) -> Result<()>;

    // 设置与日志
    fn settings_created(&self, path: &Path) -> Result<()>;
    fn logs_limit_exceeded(&self, limit: u32, total: usize) -> Result<()>;
    fn logs_limit_approaching(&self, limit: u32, total: usize) -> Result<()>;
    fn logs_delete_failed(&self, limit: u32) -> Result<()>;

    // 安装校验
    fn validate_start(&self, total: usize) -> Result<()>;
    fn validate_progress(&self, relative_path: &str) -> Result<()>;
    fn validate_finish(&self) -> Result<()>;

    // 游戏进程
    fn guard_display_conflict(&self, conflict: &RunningConflict) -> Result<()>;
    fn guard_ask_terminate(&self) -> Result<bool>;
    fn guard_terminate_failed(&self, err: &str) -> Result<()>;
    fn guard_exited_externally(&self) -> Result<()>;
    /// 等待用户确认已关闭游戏；返回 false 表示用户取消
    fn guard_wait_for_continue(&self) -> Result<bool>;
    fn guard_still_running(&self) -> Result<()>;
    fn guard_detection_failed(&self, err: &str) -> Result<()>;

    // 版本切换
    fn swap_display_versions(&self, versions: &[Variant]) -> Result<()>;
    /// 读取一行原始输入，由调用方解析
    fn swap_read_selection(&self, default: Variant) -> Result<String>;
    fn swap_invalid_selection(&self, input: &str) -> Result<()>;
    fn swap_version_installed(&self, variant: Variant) -> Result<()>;
    fn swap_ask_install_patch(&self) -> Result<bool>;
    fn swap_patch_installed(&self) -> Result<()>;
    fn swap_patch_skipped(&self) -> Result<()>;

    // 音乐修复
    fn music_undeterminable(&self, kind: &MusicFileKind) -> Result<()>;
    fn music_already_installed(&self, codec: MusicCodec) -> Result<()>;
    fn music_ask_install(&self, codec: MusicCodec) -> Result<bool>;
    fn music_installed(&self, codec: MusicCodec) -> Result<()>;
    fn music_partially_installed(&self, codec: MusicCodec) -> Result<()>;
    fn music_declined(&self) -> Result<()>;
    fn music_normalize_report(&self, report: &NormalizeReport) -> Result<()>;

    // 第三方兼容补丁
    fn patch_detected(&self, record: &CompatibilityPatchRecord) -> Result<()>;
    fn patch_ask_uninstall(&self) -> Result<bool>;
    fn patch_declined(&self, record: &CompatibilityPatchRecord) -> Result<()>;
    fn patch_removed(&self) -> Result<()>;
    fn patch_uninstall_failed(&self, record: &CompatibilityPatchRecord) -> Result<()>;
    fn patch_check_skipped(&self, err: &str) -> Result<()>;
}
