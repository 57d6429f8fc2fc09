#![allow(dead_code)]

use tr2_version_swapper::compat_patch::{CompatibilityPatchProvider, CompatibilityPatchRecord};
use tr2_version_swapper::config::{Context, InstallDirs, Settings};
use tr2_version_swapper::error::{Result, SwapperError};
use tr2_version_swapper::hash::compute_md5;
use tr2_version_swapper::manifest::{
    Category, CategoryEntries, Manifest, ManifestEntry, MusicCodec, Variant,
};
use tr2_version_swapper::music_fix::{MusicFileKind, NormalizeReport};
use tr2_version_swapper::process_guard::{ProcessListing, ProcessTable, RunningConflict};
use tr2_version_swapper::ui::Ui;
use tr2_version_swapper::version_check::ReleaseStatus;

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const BASE_FILES: [&str; 4] = [
    "tomb2.exe",
    "data/floating.tr2",
    "data/title.pcx",
    "data/tombpc.dat",
];

pub fn write_file(path: &Path, content: impl AsRef<[u8]>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn variant_exe(variant: Variant) -> String {
    format!("{} tomb2.exe", variant.dir_name())
}

pub fn shim_content(codec: MusicCodec) -> String {
    format!("winmm built for {}", codec.extension())
}

pub const PATCHED_EXE: &str = "patch 1 tomb2.exe";

/// 临时目录中的游戏目录 + 发布包，清单由实际文件内容计算
pub struct Fixture {
    _tmp: TempDir,
    pub ctx: Context,
}

impl Fixture {
    pub fn new(music_files: &[&str]) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let game = tmp.path().join("TR2");
        let package = game.join("tr2-version-swapper");
        let dirs = InstallDirs::new(game.clone(), package);

        for f in BASE_FILES {
            write_file(&game.join(f), format!("original {}", f));
        }
        std::fs::create_dir_all(game.join("music")).unwrap();
        for f in music_files {
            write_file(&game.join("music").join(f), b"audio");
        }

        let mut bundled = Vec::new();

        for variant in Variant::ALL {
            let category = Category::Variant(variant);
            let root = dirs.category_root(category);
            write_file(&root.join("tomb2.exe"), variant_exe(variant));
            write_file(
                &root.join("data/title.pcx"),
                format!("{} title", variant.dir_name()),
            );
            bundled.push(entries_for(category, &root, &["tomb2.exe", "data/title.pcx"]));
        }

        for codec in MusicCodec::ALL {
            let category = Category::MusicFix(codec);
            let root = dirs.category_root(category);
            write_file(&root.join("fmodex.dll"), "fmodex");
            write_file(&root.join("winmm.dll"), shim_content(codec));
            bundled.push(entries_for(category, &root, &["fmodex.dll", "winmm.dll"]));
        }

        let root = dirs.category_root(Category::Patch);
        write_file(&root.join("tomb2.exe"), PATCHED_EXE);
        write_file(&root.join("tr2p1readme.rtf"), "readme");
        bundled.push(entries_for(
            Category::Patch,
            &root,
            &["tr2p1readme.rtf", "tomb2.exe"],
        ));

        let manifest = Manifest {
            game_files: BASE_FILES.iter().map(|s| s.to_string()).collect(),
            bundled,
        };

        let ctx = Context {
            dirs,
            settings: Settings::default(),
            manifest,
            settle_delay: Duration::ZERO,
        };

        Self { _tmp: tmp, ctx }
    }

    pub fn game(&self) -> &Path {
        &self.ctx.dirs.game
    }

    pub fn game_file(&self, relative: &str) -> PathBuf {
        self.ctx.dirs.game.join(relative)
    }

    pub fn read_game_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.game_file(relative)).unwrap()
    }

    /// 游戏目录下所有文件（不含发布包）的相对路径和内容
    pub fn game_snapshot(&self) -> Vec<(String, Vec<u8>)> {
        fn walk(root: &Path, dir: &Path, skip: &Path, out: &mut Vec<(String, Vec<u8>)>) {
            let mut entries: Vec<_> = std::fs::read_dir(dir)
                .unwrap()
                .map(|e| e.unwrap().path())
                .collect();
            entries.sort();
            for path in entries {
                if path == skip {
                    continue;
                }
                if path.is_dir() {
                    walk(root, &path, skip, out);
                } else {
                    let rel = path.strip_prefix(root).unwrap().display().to_string();
                    out.push((rel, std::fs::read(&path).unwrap()));
                }
            }
        }

        let mut out = Vec::new();
        walk(self.game(), self.game(), &self.ctx.dirs.package, &mut out);
        out
    }

    pub fn conflict(&self) -> RunningConflict {
        RunningConflict {
            pid: 4242,
            name: "tomb2.exe".to_string(),
            executable_path: self.game_file("tomb2.exe"),
            start_time: None,
        }
    }
}

fn entries_for(category: Category, root: &Path, files: &[&str]) -> CategoryEntries {
    CategoryEntries {
        category,
        entries: files
            .iter()
            .map(|f| ManifestEntry::new(*f, compute_md5(&root.join(f)).unwrap()))
            .collect(),
    }
}

// ==================== 脚本化 UI ====================

/// 按预设答案回答所有提问，并记录每次调用
#[derive(Default)]
pub struct ScriptedUi {
    answers: Mutex<VecDeque<bool>>,
    selections: Mutex<VecDeque<String>>,
    /// 每次“按回车继续”时：Some(true) 让进程退出后继续，Some(false) 直接继续，用完则取消
    continues: Mutex<VecDeque<bool>>,
    process_alive: Option<Arc<AtomicBool>>,
    /// 在该提问处模拟 Ctrl+C
    interrupt_at: Option<String>,
    events: Mutex<Vec<String>>,
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answers(self, answers: &[bool]) -> Self {
        *self.answers.lock().unwrap() = answers.iter().copied().collect();
        self
    }

    pub fn selections(self, inputs: &[&str]) -> Self {
        *self.selections.lock().unwrap() = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn continues(self, process: &Arc<AtomicBool>, exits: &[bool]) -> Self {
        *self.continues.lock().unwrap() = exits.iter().copied().collect();
        Self {
            process_alive: Some(process.clone()),
            ..self
        }
    }

    pub fn interrupted_at(self, event: &str) -> Self {
        Self {
            interrupt_at: Some(event.to_string()),
            ..self
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    pub fn saw(&self, event: &str) -> bool {
        self.count(event) > 0
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn unused_answers(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn check_interrupt(&self, event: &str) -> Result<()> {
        if self.interrupt_at.as_deref() == Some(event) {
            return Err(SwapperError::Interrupted);
        }
        Ok(())
    }

    fn answer(&self, event: &str) -> Result<bool> {
        self.record(event);
        self.check_interrupt(event)?;
        let answer = self.answers.lock().unwrap().pop_front();
        Ok(answer.unwrap_or_else(|| panic!("no scripted answer left for {}", event)))
    }
}

impl Ui for ScriptedUi {
    fn display_welcome(&self) -> Result<()> {
        self.record("display_welcome");
        Ok(())
    }

    fn display_release_status(&self, _status: &ReleaseStatus) -> Result<()> {
        self.record("display_release_status");
        Ok(())
    }

    fn display_release_check_failed(&self, _err: &str) -> Result<()> {
        self.record("display_release_check_failed");
        Ok(())
    }

    fn blank_line(&self) -> Result<()> {
        Ok(())
    }

    fn message(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn warn(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn error(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn header(&self, _title: &str, _subtitle: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn wait_for_key(&self) -> Result<()> {
        Ok(())
    }

    fn settings_created(&self, _path: &Path) -> Result<()> {
        self.record("settings_created");
        Ok(())
    }

    fn logs_limit_exceeded(&self, _limit: u32, _total: usize) -> Result<()> {
        self.record("logs_limit_exceeded");
        Ok(())
    }

    fn logs_limit_approaching(&self, _limit: u32, _total: usize) -> Result<()> {
        self.record("logs_limit_approaching");
        Ok(())
    }

    fn logs_delete_failed(&self, _limit: u32) -> Result<()> {
        self.record("logs_delete_failed");
        Ok(())
    }

    fn validate_start(&self, total: usize) -> Result<()> {
        self.record(format!("validate_start:{}", total));
        Ok(())
    }

    fn validate_progress(&self, relative_path: &str) -> Result<()> {
        self.record(format!("validate_progress:{}", relative_path));
        Ok(())
    }

    fn validate_finish(&self) -> Result<()> {
        self.record("validate_finish");
        Ok(())
    }

    fn guard_display_conflict(&self, _conflict: &RunningConflict) -> Result<()> {
        self.record("guard_display_conflict");
        Ok(())
    }

    fn guard_ask_terminate(&self) -> Result<bool> {
        self.answer("guard_ask_terminate")
    }

    fn guard_terminate_failed(&self, _err: &str) -> Result<()> {
        self.record("guard_terminate_failed");
        Ok(())
    }

    fn guard_exited_externally(&self) -> Result<()> {
        self.record("guard_exited_externally");
        Ok(())
    }

    fn guard_wait_for_continue(&self) -> Result<bool> {
        self.record("guard_wait_for_continue");
        self.check_interrupt("guard_wait_for_continue")?;
        let step = self.continues.lock().unwrap().pop_front();
        match step {
            Some(exits) => {
                if exits && let Some(alive) = &self.process_alive {
                    alive.store(false, Ordering::SeqCst);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn guard_still_running(&self) -> Result<()> {
        self.record("guard_still_running");
        Ok(())
    }

    fn guard_detection_failed(&self, _err: &str) -> Result<()> {
        self.record("guard_detection_failed");
        Ok(())
    }

    fn swap_display_versions(&self, versions: &[Variant]) -> Result<()> {
        self.record(format!("swap_display_versions:{}", versions.len()));
        Ok(())
    }

    fn swap_read_selection(&self, _default: Variant) -> Result<String> {
        self.record("swap_read_selection");
        let input = self.selections.lock().unwrap().pop_front();
        Ok(input.unwrap_or_else(|| panic!("no scripted version selection left")))
    }

    fn swap_invalid_selection(&self, _input: &str) -> Result<()> {
        self.record("swap_invalid_selection");
        Ok(())
    }

    fn swap_version_installed(&self, variant: Variant) -> Result<()> {
        self.record(format!("swap_version_installed:{}", variant));
        Ok(())
    }

    fn swap_ask_install_patch(&self) -> Result<bool> {
        self.answer("swap_ask_install_patch")
    }

    fn swap_patch_installed(&self) -> Result<()> {
        self.record("swap_patch_installed");
        Ok(())
    }

    fn swap_patch_skipped(&self) -> Result<()> {
        self.record("swap_patch_skipped");
        Ok(())
    }

    fn music_undeterminable(&self, _kind: &MusicFileKind) -> Result<()> {
        self.record("music_undeterminable");
        Ok(())
    }

    fn music_already_installed(&self, codec: MusicCodec) -> Result<()> {
        self.record(format!("music_already_installed:{}", codec));
        Ok(())
    }

    fn music_ask_install(&self, _codec: MusicCodec) -> Result<bool> {
        self.answer("music_ask_install")
    }

    fn music_installed(&self, codec: MusicCodec) -> Result<()> {
        self.record(format!("music_installed:{}", codec));
        Ok(())
    }

    fn music_partially_installed(&self, codec: MusicCodec) -> Result<()> {
        self.record(format!("music_partially_installed:{}", codec));
        Ok(())
    }

    fn music_declined(&self) -> Result<()> {
        self.record("music_declined");
        Ok(())
    }

    fn music_normalize_report(&self, _report: &NormalizeReport) -> Result<()> {
        self.record("music_normalize_report");
        Ok(())
    }

    fn patch_detected(&self, _record: &CompatibilityPatchRecord) -> Result<()> {
        self.record("patch_detected");
        Ok(())
    }

    fn patch_ask_uninstall(&self) -> Result<bool> {
        self.answer("patch_ask_uninstall")
    }

    fn patch_declined(&self, _record: &CompatibilityPatchRecord) -> Result<()> {
        self.record("patch_declined");
        Ok(())
    }

    fn patch_removed(&self) -> Result<()> {
        self.record("patch_removed");
        Ok(())
    }

    fn patch_uninstall_failed(&self, _record: &CompatibilityPatchRecord) -> Result<()> {
        self.record("patch_uninstall_failed");
        Ok(())
    }

    fn patch_check_skipped(&self, _err: &str) -> Result<()> {
        self.record("patch_check_skipped");
        Ok(())
    }
}

// ==================== 进程表 ====================

/// 可控的进程表：进程是否存活由共享标志决定
pub struct FakeProcessTable {
    processes: Vec<RunningConflict>,
    /// 路径无法读取的同名进程
    unreadable: Vec<u32>,
    pub alive: Arc<AtomicBool>,
    terminate_works: bool,
    lookup_fails: bool,
    pub terminate_calls: AtomicUsize,
}

impl FakeProcessTable {
    pub fn empty() -> Self {
        Self::running(Vec::new())
    }

    pub fn running(processes: Vec<RunningConflict>) -> Self {
        Self {
            processes,
            unreadable: Vec::new(),
            alive: Arc::new(AtomicBool::new(true)),
            terminate_works: true,
            lookup_fails: false,
            terminate_calls: AtomicUsize::new(0),
        }
    }

    pub fn unkillable(self) -> Self {
        Self {
            terminate_works: false,
            ..self
        }
    }

    pub fn broken() -> Self {
        Self {
            lookup_fails: true,
            ..Self::empty()
        }
    }

    pub fn with_unreadable(self, pid: u32) -> Self {
        let mut unreadable = self.unreadable.clone();
        unreadable.push(pid);
        Self { unreadable, ..self }
    }
}

impl ProcessTable for FakeProcessTable {
    fn find_by_name(&self, _name: &str) -> io::Result<ProcessListing> {
        if self.lookup_fails {
            return Err(io::Error::other("access denied"));
        }
        if !self.alive.load(Ordering::SeqCst) {
            return Ok(ProcessListing::default());
        }
        Ok(ProcessListing {
            processes: self.processes.clone(),
            unresolved: self.unreadable.clone(),
        })
    }

    fn is_running(&self, _process: &RunningConflict) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn terminate(&self, _process: &RunningConflict) -> io::Result<()> {
        self.terminate_calls.fetch_add(1, Ordering::SeqCst);
        if self.terminate_works {
            self.alive.store(false, Ordering::SeqCst);
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"))
        }
    }
}

// ==================== 兼容补丁 ====================

pub struct FakePatchProvider {
    installed: Mutex<Option<CompatibilityPatchRecord>>,
    uninstall_works: bool,
    lookup_fails: bool,
    pub uninstall_calls: AtomicUsize,
}

impl FakePatchProvider {
    pub fn none() -> Self {
        Self {
            installed: Mutex::new(None),
            uninstall_works: true,
            lookup_fails: false,
            uninstall_calls: AtomicUsize::new(0),
        }
    }

    pub fn installed(uninstall_works: bool) -> Self {
        Self {
            installed: Mutex::new(Some(border_fix_record())),
            uninstall_works,
            ..Self::none()
        }
    }

    pub fn broken() -> Self {
        Self {
            lookup_fails: true,
            ..Self::none()
        }
    }
}

pub fn border_fix_record() -> CompatibilityPatchRecord {
    CompatibilityPatchRecord {
        registry_key_path: r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\{B1A2}".to_string(),
        display_name: "TR2 Fullscreen Border Fix".to_string(),
        uninstall_command: "MsiExec.exe /X{B1A2}".to_string(),
    }
}

impl CompatibilityPatchProvider for FakePatchProvider {
    fn find_known_conflicting_patch(&self) -> io::Result<Option<CompatibilityPatchRecord>> {
        if self.lookup_fails {
            return Err(io::Error::other("registry unavailable"));
        }
        Ok(self.installed.lock().unwrap().clone())
    }

    fn uninstall(&self, _record: &CompatibilityPatchRecord) -> io::Result<()> {
        self.uninstall_calls.fetch_add(1, Ordering::SeqCst);
        if self.uninstall_works {
            *self.installed.lock().unwrap() = None;
        }
        Ok(())
    }
}
