use crate::config::{Context, InstallDirs};
use crate::error::{IntegrityError, LocationError, Result};
use crate::hash::{HashOutcome, verify};
use crate::manifest::{MUSIC_DIR, Manifest};
use crate::ui::Ui;

use std::path::Path;

/// 检查游戏目录：基础文件存在（不校验内容），且包含 music/ 目录
pub fn validate_game_directory(
    game: &Path,
    manifest: &Manifest,
) -> std::result::Result<(), LocationError> {
    for file in &manifest.game_files {
        if !game.join(file).is_file() {
            log::error!("Game file {} not found in {}", file, game.display());
            return Err(LocationError::MissingFile(file.clone()));
        }
    }

    if !game.join(MUSIC_DIR).is_dir() {
        log::error!("No {} folder in {}", MUSIC_DIR, game.display());
        return Err(LocationError::MissingMusicDirectory);
    }

    Ok(())
}

/// 按清单顺序校验发布包，遇到第一个问题立即返回
pub fn check_package_files(
    dirs: &InstallDirs,
    manifest: &Manifest,
    mut on_file: impl FnMut(&str),
) -> std::result::Result<(), IntegrityError> {
    for category in &manifest.bundled {
        let root = dirs.category_root(category.category);
        for entry in &category.entries {
            let path = root.join(&entry.relative_path);
            let display = format!("{}/{}", category.category, entry.relative_path);
            on_file(&display);

            match verify(&path, &entry.expected_hash) {
                Ok(HashOutcome::Match) => {}
                Ok(HashOutcome::Missing) => {
                    return Err(IntegrityError::Missing { path: display });
                }
                Ok(HashOutcome::Mismatch(actual)) => {
                    return Err(IntegrityError::Mismatch {
                        path: display,
                        actual,
                        expected: entry.expected_hash.clone(),
                    });
                }
                Err(source) => {
                    return Err(IntegrityError::Unreadable {
                        path: display,
                        source,
                    });
                }
            }
        }
    }

    Ok(())
}

pub struct InstallationValidator<'a> {
    ctx: &'a Context,
    ui: &'a dyn Ui,
}

impl<'a> InstallationValidator<'a> {
    pub fn new(ctx: &'a Context, ui: &'a dyn Ui) -> Self {
        Self { ctx, ui }
    }

    pub fn validate_package(&self) -> Result<()> {
        let total = self
            .ctx
            .manifest
            .bundled
            .iter()
            .map(|c| c.entries.len())
            .sum();
        self.ui.validate_start(total)?;

        let result = check_package_files(&self.ctx.dirs, &self.ctx.manifest, |path| {
            let _ = self.ui.validate_progress(path);
        });
        self.ui.validate_finish()?;

        match result {
            Ok(()) => {
                log::info!("Packaged files are unmodified.");
                Ok(())
            }
            Err(e) => {
                log::error!("{}", e);
                Err(e.into())
            }
        }
    }

    pub fn validate_game_directory(&self) -> Result<()> {
        validate_game_directory(&self.ctx.dirs.game, &self.ctx.manifest)?;
        log::info!("Parent folder looks like a {} installation.", crate::config::GAME_ABBREVIATION);
        Ok(())
    }

    /// 发布包先于游戏目录校验，两者都在任何修改之前完成
    pub fn validate_installation(&self) -> Result<()> {
        self.validate_package()?;
        self.validate_game_directory()
    }
}
