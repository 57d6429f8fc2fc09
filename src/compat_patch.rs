//! 第三方兼容补丁（全屏边框修复）检测与卸载

use std::io;

/// 已安装程序记录中的一项（仅作查找键）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityPatchRecord {
    pub registry_key_path: String,
    pub display_name: String,
    pub uninstall_command: String,
}

pub trait CompatibilityPatchProvider {
    fn find_known_conflicting_patch(&self) -> io::Result<Option<CompatibilityPatchRecord>>;
    /// 运行记录中的卸载命令并等待其退出
    fn uninstall(&self, record: &CompatibilityPatchRecord) -> io::Result<()>;
}

/// 非 Windows 平台没有可查询的已安装程序列表
pub struct NoopPatchProvider;

impl CompatibilityPatchProvider for NoopPatchProvider {
    fn find_known_conflicting_patch(&self) -> io::Result<Option<CompatibilityPatchRecord>> {
        Ok(None)
    }

    fn uninstall(&self, _record: &CompatibilityPatchRecord) -> io::Result<()> {
        Ok(())
    }
}

/// 解析 `reg query <key> /s` 的输出，返回显示名完全匹配的第一条记录
pub fn parse_reg_query_output(output: &str, display_name: &str) -> Option<CompatibilityPatchRecord> {
    let mut current_key: Option<&str> = None;
    let mut name: Option<&str> = None;
    let mut command: Option<&str> = None;

    let matched = |key: Option<&str>, name: Option<&str>, command: Option<&str>| {
        match (key, name, command) {
            (Some(key), Some(name), Some(command)) if name == display_name => {
                Some(CompatibilityPatchRecord {
                    registry_key_path: key.to_string(),
                    display_name: name.to_string(),
                    uninstall_command: command.to_string(),
                })
            }
            _ => None,
        }
    };

    for line in output.lines() {
        if line.starts_with("HKEY_") {
            if let Some(record) = matched(current_key, name, command) {
                return Some(record);
            }
            current_key = Some(line.trim_end());
            name = None;
            command = None;
            continue;
        }

        let mut parts = line.trim().splitn(3, "    ");
        let (Some(value_name), Some(_kind)) = (parts.next(), parts.next()) else {
            continue;
        };
        let value = parts.next().unwrap_or("").trim();

        match value_name {
            "DisplayName" => name = Some(value),
            "UninstallString" => command = Some(value),
            _ => {}
        }
    }

    matched(current_key, name, command)
}

/// `cmd` 的参数：`/S` 下 cmd 只去掉最外层的一对引号，命令原样执行
pub fn cmd_arguments(command: &str) -> String {
    format!("/S /C \"{}\"", command)
}

#[cfg(windows)]
mod registry {
    use super::*;
    use crate::config::KNOWN_CONFLICTING_PATCH_NAME;

    use std::os::windows::process::CommandExt;
    use std::process::Command;

    const CREATE_NO_WINDOW: u32 = 0x08000000;

    const UNINSTALL_ROOTS: [&str; 3] = [
        r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
        r"HKLM\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
        r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
    ];

    /// 通过 `reg query` 读取“程序和功能”中的记录
    pub struct RegistryPatchProvider;

    impl CompatibilityPatchProvider for RegistryPatchProvider {
        fn find_known_conflicting_patch(&self) -> io::Result<Option<CompatibilityPatchRecord>> {
            for root in UNINSTALL_ROOTS {
                let out = Command::new("reg")
                    .args(["query", root, "/s"])
                    .creation_flags(CREATE_NO_WINDOW)
                    .output()?;

                // 键不存在时 reg 以 1 退出
                if !out.status.success() {
                    log::debug!("Registry key {} unavailable ({})", root, out.status);
                    continue;
                }

                let text = String::from_utf8_lossy(&out.stdout);
                if let Some(record) = parse_reg_query_output(&text, KNOWN_CONFLICTING_PATCH_NAME) {
                    return Ok(Some(record));
                }
            }

            Ok(None)
        }

        fn uninstall(&self, record: &CompatibilityPatchRecord) -> io::Result<()> {
            log::info!("Running uninstaller: {}", record.uninstall_command);
            let status = Command::new("cmd")
                .raw_arg(cmd_arguments(&record.uninstall_command))
                .creation_flags(CREATE_NO_WINDOW)
                .status()?;
            log::debug!("Uninstaller exited with {}", status);
            Ok(())
        }
    }
}

#[cfg(windows)]
pub use registry::RegistryPatchProvider;

/// 当前平台的补丁检测实现
pub fn system_provider() -> Box<dyn CompatibilityPatchProvider> {
    #[cfg(windows)]
    {
        Box::new(RegistryPatchProvider)
    }

    #[cfg(not(windows))]
    {
        Box::new(NoopPatchProvider)
    }
}
