//! 音乐修复：识别音频编码，安装对应的 shim，修正文件名，处理冲突补丁

use crate::compat_patch::{CompatibilityPatchProvider, CompatibilityPatchRecord};
use crate::config::Context;
use crate::error::{CopyError, Result};
use crate::file_ops::copy_file_overwrite;
use crate::hash::{HashOutcome, verify};
use crate::manifest::{CODEC_SHIM_FILE, Category, Manifest, MusicCodec, SHIM_FILES};
use crate::process_guard::ProcessGuard;
use crate::ui::Ui;

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, ErrorKind};
use std::path::Path;

/// music/ 目录中音频文件的类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicFileKind {
    Mp3,
    Ogg,
    /// 只有一种无法识别的扩展名
    Unknown(String),
    /// 多种扩展名混杂
    Ambiguous(Vec<String>),
    /// 没有任何文件
    Absent,
}

impl MusicFileKind {
    pub fn codec(&self) -> Option<MusicCodec> {
        match self {
            MusicFileKind::Mp3 => Some(MusicCodec::Mp3),
            MusicFileKind::Ogg => Some(MusicCodec::Ogg),
            _ => None,
        }
    }
}

impl fmt::Display for MusicFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MusicFileKind::Mp3 => f.write_str("MP3"),
            MusicFileKind::Ogg => f.write_str("OGG"),
            MusicFileKind::Unknown(ext) => write!(f, "unrecognized (.{})", ext),
            MusicFileKind::Ambiguous(exts) => write!(f, "mixed (.{})", exts.join(", .")),
            MusicFileKind::Absent => f.write_str("no music files"),
        }
    }
}

/// 按 music/ 中普通文件的扩展名（忽略大小写）判断类型；没有扩展名的文件不计入
pub fn detect_music_kind(music_dir: &Path) -> io::Result<MusicFileKind> {
    let entries = match std::fs::read_dir(music_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MusicFileKind::Absent),
        Err(e) => return Err(e),
    };

    let mut extensions = BTreeSet::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension() {
            extensions.insert(ext.to_string_lossy().to_ascii_lowercase());
        }
    }

    let kind = match extensions.len() {
        0 => MusicFileKind::Absent,
        1 => {
            let ext = extensions.into_iter().next().unwrap_or_default();
            match MusicCodec::from_extension(&ext) {
                Some(MusicCodec::Mp3) => MusicFileKind::Mp3,
                Some(MusicCodec::Ogg) => MusicFileKind::Ogg,
                None => MusicFileKind::Unknown(ext),
            }
        }
        _ => MusicFileKind::Ambiguous(extensions.into_iter().collect()),
    };

    log::debug!("Music files in {} detected as {}", music_dir.display(), kind);
    Ok(kind)
}

/// 两个 shim 文件都在游戏目录中，且编码相关的 shim 与该编码的清单条目一致
pub fn is_shim_installed(game_dir: &Path, manifest: &Manifest, codec: MusicCodec) -> io::Result<bool> {
    if !SHIM_FILES.iter().all(|f| game_dir.join(f).is_file()) {
        return Ok(false);
    }

    let Some(expected) = manifest.codec_shim_hash(codec) else {
        return Ok(false);
    };

    match verify(&game_dir.join(CODEC_SHIM_FILE), expected)? {
        HashOutcome::Match => Ok(true),
        HashOutcome::Mismatch(actual) => {
            log::debug!("Installed {} does not match the {} build ({})", CODEC_SHIM_FILE, codec, actual);
            Ok(false)
        }
        HashOutcome::Missing => Ok(false),
    }
}

/// 文件名修正结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// (原文件名, 新文件名)
    pub renamed: Vec<(String, String)>,
    /// 形状不是 `<数字>.<扩展名>`，保持原样
    pub skipped: Vec<String>,
    /// (文件名, 错误信息)
    pub failed: Vec<(String, String)>,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// 将一位数字的文件名补零为两位，例如 `2.mp3` → `02.mp3`
///
/// 两位及以上的数字文件名不动；其他形状的文件名不动并记入 skipped；
/// 目标文件已存在时不覆盖，记为失败。单个文件失败不影响其他文件。
pub fn normalize_filenames(music_dir: &Path) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    let mut names = match std::fs::read_dir(music_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>(),
        Err(e) => {
            report
                .failed
                .push((music_dir.display().to_string(), e.to_string()));
            return report;
        }
    };
    names.sort();

    for name in names {
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (name.as_str(), None),
        };

        if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
            log::debug!("Leaving non-numeric music file {} untouched", name);
            report.skipped.push(name.clone());
            continue;
        }
        if stem.len() >= 2 {
            continue;
        }

        let target = match ext {
            Some(ext) => format!("0{}.{}", stem, ext),
            None => format!("0{}", stem),
        };
        let (from, to) = (music_dir.join(&name), music_dir.join(&target));

        if to.exists() {
            report
                .failed
                .push((name.clone(), format!("{} already exists", target)));
            continue;
        }

        match std::fs::rename(&from, &to) {
            Ok(()) => {
                log::debug!("Renamed music file {} -> {}", name, target);
                report.renamed.push((name.clone(), target));
            }
            Err(e) => {
                log::warn!("Could not rename music file {}: {}", name, e);
                report.failed.push((name.clone(), e.to_string()));
            }
        }
    }

    report
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicFixOutcome {
    /// 无法确定编码，未做任何修改
    Undeterminable(MusicFileKind),
    AlreadyInstalled(MusicCodec),
    Installed(MusicCodec),
    /// shim 已复制，但文件名修正未全部完成
    PartiallyInstalled(MusicCodec, NormalizeReport),
    Declined(MusicCodec),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    NotFound,
    /// 查询失败，跳过检查
    Skipped(String),
    Declined,
    Removed,
    UninstallFailed(CompatibilityPatchRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicFixReport {
    pub outcome: MusicFixOutcome,
    /// 仅在 shim 确认已安装后才会检查
    pub patch: Option<PatchOutcome>,
}

pub struct MusicFixResolver<'a> {
    ctx: &'a Context,
    ui: &'a dyn Ui,
    guard: &'a ProcessGuard<'a>,
    patches: &'a dyn CompatibilityPatchProvider,
}

impl<'a> MusicFixResolver<'a> {
    pub fn new(
        ctx: &'a Context,
        ui: &'a dyn Ui,
        guard: &'a ProcessGuard<'a>,
        patches: &'a dyn CompatibilityPatchProvider,
    ) -> Self {
        Self {
            ctx,
            ui,
            guard,
            patches,
        }
    }

    /// 每次调用都重新检查当前状态，可重复执行
    pub fn handle(&self) -> Result<MusicFixReport> {
        let dirs = &self.ctx.dirs;
        let kind = detect_music_kind(&dirs.music())?;

        let Some(codec) = kind.codec() else {
            log::warn!("Music files are {}; the music fix cannot be matched.", kind);
            self.ui.music_undeterminable(&kind)?;
            return Ok(MusicFixReport {
                outcome: MusicFixOutcome::Undeterminable(kind),
                patch: None,
            });
        };

        let outcome = if is_shim_installed(&dirs.game, &self.ctx.manifest, codec)? {
            log::info!("The {} music fix is already installed.", codec);
            self.ui.music_already_installed(codec)?;
            self.normalize_pending(codec, MusicFixOutcome::AlreadyInstalled(codec))?
        } else if self.ui.music_ask_install(codec)? {
            self.install(codec)?
        } else {
            log::info!("User declined the {} music fix.", codec);
            self.ui.music_declined()?;
            MusicFixOutcome::Declined(codec)
        };

        let patch = match outcome {
            MusicFixOutcome::Undeterminable(_) | MusicFixOutcome::Declined(_) => None,
            _ => Some(self.check_compatibility_patch()?),
        };

        Ok(MusicFixReport { outcome, patch })
    }

    fn install(&self, codec: MusicCodec) -> Result<MusicFixOutcome> {
        self.guard.clear_for_writing()?;

        let dirs = &self.ctx.dirs;
        let bundled = dirs.category_root(Category::MusicFix(codec));
        for file in SHIM_FILES {
            let target = dirs.game.join(file);
            copy_file_overwrite(&bundled.join(file), &target).map_err(|source| CopyError {
                path: target.clone(),
                source,
            })?;
            log::debug!("Copied {} music fix file {}", codec, file);
        }
        log::info!("Installed the {} music fix.", codec);

        let outcome = self.normalize_pending(codec, MusicFixOutcome::Installed(codec))?;
        if outcome == MusicFixOutcome::Installed(codec) {
            self.ui.music_installed(codec)?;
        }
        Ok(outcome)
    }

    /// MP3 版本要求两位数字文件名
    fn normalize_pending(&self, codec: MusicCodec, done: MusicFixOutcome) -> Result<MusicFixOutcome> {
        if codec != MusicCodec::Mp3 {
            return Ok(done);
        }

        let report = normalize_filenames(&self.ctx.dirs.music());
        if report.renamed.is_empty() && report.is_clean() {
            return Ok(done);
        }

        self.ui.music_normalize_report(&report)?;
        if report.is_clean() {
            return Ok(done);
        }

        log::warn!(
            "Music file names were not fully normalized: {} skipped, {} failed.",
            report.skipped.len(),
            report.failed.len()
        );
        self.ui.music_partially_installed(codec)?;
        Ok(MusicFixOutcome::PartiallyInstalled(codec, report))
    }

    fn check_compatibility_patch(&self) -> Result<PatchOutcome> {
        let record = match self.patches.find_known_conflicting_patch() {
            Ok(None) => {
                log::debug!("No conflicting compatibility patch installed.");
                return Ok(PatchOutcome::NotFound);
            }
            Ok(Some(record)) => record,
            Err(e) => {
                log::warn!("Skipping the compatibility patch check: {}", e);
                self.ui.patch_check_skipped(&e.to_string())?;
                return Ok(PatchOutcome::Skipped(e.to_string()));
            }
        };

        log::info!("Found conflicting patch at {}", record.registry_key_path);
        self.ui.patch_detected(&record)?;

        if !self.ui.patch_ask_uninstall()? {
            log::info!("User kept {} installed.", record.display_name);
            self.ui.patch_declined(&record)?;
            return Ok(PatchOutcome::Declined);
        }

        if let Err(e) = self.patches.uninstall(&record) {
            log::error!("Could not run the uninstaller for {}: {}", record.display_name, e);
        }

        match self.patches.find_known_conflicting_patch() {
            Ok(None) => {
                log::info!("Removed {}.", record.display_name);
                self.ui.patch_removed()?;
                Ok(PatchOutcome::Removed)
            }
            Ok(Some(_)) | Err(_) => {
                log::warn!("{} is still installed after uninstalling.", record.display_name);
                self.ui.patch_uninstall_failed(&record)?;
                Ok(PatchOutcome::UninstallFailed(record))
            }
        }
    }
}
