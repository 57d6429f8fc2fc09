//! 系统进程表：Windows 使用 ToolHelp 快照，其他平台使用 sysinfo

use crate::process_guard::{ProcessListing, ProcessTable, RunningConflict, process_name_matches};

use std::io;

pub use imp::SystemProcessTable;

#[cfg(windows)]
mod imp {
    use super::*;

    use chrono::{DateTime, Local};
    use std::path::PathBuf;
    use windows::Win32::Foundation::{CloseHandle, FILETIME, HANDLE, WAIT_TIMEOUT};
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::System::Threading::{
        GetProcessTimes, OpenProcess, PROCESS_ACCESS_RIGHTS, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_SYNCHRONIZE, PROCESS_TERMINATE,
        QueryFullProcessImageNameW, TerminateProcess, WaitForSingleObject,
    };
    use windows::core::PWSTR;

    /// TerminateProcess 后等待进程退出的上限
    const TERMINATE_WAIT_MS: u32 = 5_000;

    /// FILETIME 起点（1601-01-01）到 Unix 纪元的秒数
    const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

    struct OwnedHandle(HANDLE);

    impl OwnedHandle {
        fn open(pid: u32, access: PROCESS_ACCESS_RIGHTS) -> Option<Self> {
            unsafe { OpenProcess(access, false, pid).ok().map(OwnedHandle) }
        }

        fn as_raw(&self) -> HANDLE {
            self.0
        }
    }

    impl Drop for OwnedHandle {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }

    fn image_path(handle: &OwnedHandle) -> Option<PathBuf> {
        let mut buf = [0u16; 1024];
        let mut len = buf.len() as u32;
        unsafe {
            QueryFullProcessImageNameW(
                handle.as_raw(),
                PROCESS_NAME_WIN32,
                PWSTR(buf.as_mut_ptr()),
                &mut len,
            )
            .ok()?;
        }
        Some(PathBuf::from(String::from_utf16_lossy(&buf[..len as usize])))
    }

    fn start_time(handle: &OwnedHandle) -> Option<DateTime<Local>> {
        let mut creation = FILETIME::default();
        let mut exit = FILETIME::default();
        let mut kernel = FILETIME::default();
        let mut user = FILETIME::default();
        unsafe {
            GetProcessTimes(
                handle.as_raw(),
                &mut creation,
                &mut exit,
                &mut kernel,
                &mut user,
            )
            .ok()?;
        }

        // 100 纳秒为单位
        let ticks = ((creation.dwHighDateTime as u64) << 32) | creation.dwLowDateTime as u64;
        let secs = (ticks / 10_000_000) as i64 - FILETIME_UNIX_OFFSET_SECS;
        let nanos = ((ticks % 10_000_000) * 100) as u32;
        DateTime::from_timestamp(secs, nanos).map(|t| t.with_timezone(&Local))
    }

    fn still_active(handle: &OwnedHandle) -> bool {
        unsafe { WaitForSingleObject(handle.as_raw(), 0) == WAIT_TIMEOUT }
    }

    pub struct SystemProcessTable;

    impl SystemProcessTable {
        pub fn new() -> Self {
            Self
        }
    }

    impl ProcessTable for SystemProcessTable {
        fn find_by_name(&self, name: &str) -> io::Result<ProcessListing> {
            let mut found = ProcessListing::default();

            unsafe {
                let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
                    .map_err(|e| io::Error::other(format!("Could not get process list: {}", e)))?;
                let snapshot = OwnedHandle(snapshot);

                let mut entry = PROCESSENTRY32W {
                    dwSize: size_of::<PROCESSENTRY32W>() as u32,
                    ..Default::default()
                };

                Process32FirstW(snapshot.as_raw(), &mut entry)
                    .map_err(|e| io::Error::other(format!("Could not read process list: {}", e)))?;

                loop {
                    let process_name = String::from_utf16_lossy(
                        &entry.szExeFile[..entry
                            .szExeFile
                            .iter()
                            .position(|&c| c == 0)
                            .unwrap_or(entry.szExeFile.len())],
                    );

                    if process_name_matches(&process_name, name) {
                        let pid = entry.th32ProcessID;
                        if let Some(handle) =
                            OwnedHandle::open(pid, PROCESS_QUERY_LIMITED_INFORMATION)
                            && let Some(executable_path) = image_path(&handle)
                        {
                            found.processes.push(RunningConflict {
                                pid,
                                name: process_name,
                                executable_path,
                                start_time: start_time(&handle),
                            });
                        } else {
                            // 例如以管理员身份运行的游戏
                            log::warn!("Could not read the image path of process {} ({})", pid, process_name);
                            found.unresolved.push(pid);
                        }
                    }

                    if Process32NextW(snapshot.as_raw(), &mut entry).is_err() {
                        break;
                    }
                }
            }

            Ok(found)
        }

        fn is_running(&self, process: &RunningConflict) -> bool {
            let Some(handle) = OwnedHandle::open(
                process.pid,
                PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_SYNCHRONIZE,
            ) else {
                return false;
            };

            // PID 可能已被新进程复用
            if process.start_time.is_some() && start_time(&handle) != process.start_time {
                return false;
            }

            still_active(&handle)
        }

        fn terminate(&self, process: &RunningConflict) -> io::Result<()> {
            let handle = OwnedHandle::open(process.pid, PROCESS_TERMINATE | PROCESS_SYNCHRONIZE)
                .ok_or_else(|| io::Error::other(format!("Could not open process {}", process.pid)))?;

            unsafe {
                TerminateProcess(handle.as_raw(), 1)
                    .map_err(|e| io::Error::other(e.to_string()))?;
                let _ = WaitForSingleObject(handle.as_raw(), TERMINATE_WAIT_MS);
            }

            Ok(())
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use super::*;

    use chrono::{DateTime, Local};
    use std::time::Duration;
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

    /// 发送结束信号后等待进程消失的检查次数与间隔
    const TERMINATE_CHECKS: u32 = 20;
    const TERMINATE_CHECK_INTERVAL: Duration = Duration::from_millis(100);

    fn to_local(secs: u64) -> Option<DateTime<Local>> {
        DateTime::from_timestamp(secs as i64, 0).map(|t| t.with_timezone(&Local))
    }

    pub struct SystemProcessTable;

    impl SystemProcessTable {
        pub fn new() -> Self {
            Self
        }

        fn lookup(&self, process: &RunningConflict) -> Option<u64> {
            let pid = Pid::from_u32(process.pid);
            let mut sys = System::new();
            sys.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::nothing(),
            );
            sys.process(pid).map(|p| p.start_time())
        }
    }

    impl ProcessTable for SystemProcessTable {
        fn find_by_name(&self, name: &str) -> io::Result<ProcessListing> {
            let mut sys = System::new();
            sys.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
            );

            let mut found = ProcessListing::default();
            for p in sys.processes().values() {
                if !process_name_matches(&p.name().to_string_lossy(), name) {
                    continue;
                }
                let pid = p.pid().as_u32();
                match p.exe() {
                    Some(exe) => found.processes.push(RunningConflict {
                        pid,
                        name: p.name().to_string_lossy().into_owned(),
                        executable_path: exe.to_path_buf(),
                        start_time: to_local(p.start_time()),
                    }),
                    None => {
                        log::warn!("Could not read the executable path of process {}", pid);
                        found.unresolved.push(pid);
                    }
                }
            }

            Ok(found)
        }

        fn is_running(&self, process: &RunningConflict) -> bool {
            match self.lookup(process) {
                Some(started) => process.start_time.is_none() || to_local(started) == process.start_time,
                None => false,
            }
        }

        fn terminate(&self, process: &RunningConflict) -> io::Result<()> {
            let pid = Pid::from_u32(process.pid);
            let mut sys = System::new();
            sys.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::nothing(),
            );

            let Some(target) = sys.process(pid) else {
                return Ok(());
            };
            if !target.kill() {
                return Err(io::Error::other(format!(
                    "Could not send a kill signal to process {}",
                    process.pid
                )));
            }

            for _ in 0..TERMINATE_CHECKS {
                if !self.is_running(process) {
                    break;
                }
                std::thread::sleep(TERMINATE_CHECK_INTERVAL);
            }

            Ok(())
        }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
