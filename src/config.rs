use crate::error::{Result, SwapperError};
use crate::manifest::{Category, Manifest};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const GAME_ABBREVIATION: &str = "TR2";
pub const GAME_EXECUTABLE: &str = "tomb2.exe";
pub const GAME_PROCESS_NAME: &str = "tomb2";

pub const REPO_LINK: &str = "https://github.com/TombRunners/tr2-version-swapper/";
pub const RELEASE_LINK: &str = "https://github.com/TombRunners/tr2-version-swapper/releases/latest";
pub const LATEST_RELEASE_API: &str =
    "https://api.github.com/repos/TombRunners/tr2-version-swapper/releases/latest";

pub const USER_AGENT: &str = concat!(
    "tr2-version-swapper/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/TombRunners/tr2-version-swapper)"
);

/// 已知会阻止 winmm.dll 加载的第三方补丁在“程序和功能”中的显示名
pub const KNOWN_CONFLICTING_PATCH_NAME: &str = "TR2 Fullscreen Border Fix";

/// 结束游戏进程后等待其释放文件句柄
pub const PROCESS_SETTLE_DELAY: Duration = Duration::from_secs(1);

pub const SETTINGS_FILE_NAME: &str = "appsettings.json";
pub const LOGS_DIR_NAME: &str = "logs";
pub const DEFAULT_LOG_FILE_LIMIT: u32 = 15;

/// 工作目录与目标目录
#[derive(Debug, Clone)]
pub struct InstallDirs {
    /// 游戏目录（被修改的目标）
    pub game: PathBuf,
    /// 本程序所在目录（发布包根目录）
    pub package: PathBuf,
    pub versions: PathBuf,
    pub music_fix: PathBuf,
    pub patch: PathBuf,
}

impl InstallDirs {
    /// 以发布包根目录构建，游戏目录为其上级目录
    pub fn from_package_root(package: &Path) -> Result<Self> {
        let package = std::path::absolute(package)?;
        let game = package
            .parent()
            .ok_or_else(|| {
                SwapperError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} has no parent folder", package.display()),
                ))
            })?
            .to_path_buf();

        Ok(Self::new(game, package))
    }

    pub fn new(game: PathBuf, package: PathBuf) -> Self {
        Self {
            versions: package.join("versions"),
            music_fix: package.join("utilities").join("music_fix"),
            patch: package.join("utilities").join("patch"),
            game,
            package,
        }
    }

    /// 发布包中某个分类的根目录
    pub fn category_root(&self, category: Category) -> PathBuf {
        match category {
            Category::Base => self.game.clone(),
            Category::Variant(v) => self.versions.join(v.dir_name()),
            Category::MusicFix(c) => self.music_fix.join(c.extension()),
            Category::Patch => self.patch.clone(),
        }
    }

    pub fn music(&self) -> PathBuf {
        self.game.join(crate::manifest::MUSIC_DIR)
    }

    pub fn logs(&self) -> PathBuf {
        self.package.join(LOGS_DIR_NAME)
    }
}

/// 用户可修改的设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// 日志文件数量上限，0 表示不限制
    #[serde(rename = "LogFileLimit", default = "default_log_file_limit")]
    pub log_file_limit: u32,
}

fn default_log_file_limit() -> u32 {
    DEFAULT_LOG_FILE_LIMIT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_file_limit: DEFAULT_LOG_FILE_LIMIT,
        }
    }
}

impl Settings {
    /// 读取设置文件；不存在时写入默认设置，返回 (设置, 是否新建)
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        if !path.exists() {
            let settings = Settings::default();
            let text = serde_json::to_string_pretty(&settings)
                .map_err(|e| SwapperError::Settings(e.to_string()))?;
            std::fs::write(path, text)?;
            log::debug!("Created a default user settings file at {}", path.display());
            return Ok((settings, true));
        }

        let text = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&text).map_err(|e| {
            SwapperError::Settings(format!("{} could not be parsed: {}", path.display(), e))
        })?;
        Ok((settings, false))
    }
}

/// 启动时构建一次，之后以引用传给各组件
#[derive(Debug, Clone)]
pub struct Context {
    pub dirs: InstallDirs,
    pub settings: Settings,
    pub manifest: Manifest,
    pub settle_delay: Duration,
}

impl Context {
    pub fn new(dirs: InstallDirs, settings: Settings) -> Self {
        Self {
            dirs,
            settings,
            manifest: Manifest::builtin(),
            settle_delay: PROCESS_SETTLE_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{MusicCodec, Variant};
    use tempfile::tempdir;

    #[cfg(unix)]
    #[test]
    fn game_dir_is_parent_of_package() {
        let dirs = InstallDirs::from_package_root(Path::new("/games/TR2/swapper")).unwrap();
        assert_eq!(dirs.game, PathBuf::from("/games/TR2"));
        assert_eq!(
            dirs.category_root(Category::Variant(Variant::EidosUkBox)),
            PathBuf::from("/games/TR2/swapper/versions/Eidos UK Box")
        );
        assert_eq!(
            dirs.category_root(Category::MusicFix(MusicCodec::Mp3)),
            PathBuf::from("/games/TR2/swapper/utilities/music_fix/mp3")
        );
    }

    #[test]
    fn settings_file_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);

        let (settings, created) = Settings::load_or_create(&path).unwrap();
        assert!(created);
        assert_eq!(settings.log_file_limit, DEFAULT_LOG_FILE_LIMIT);

        let (again, created) = Settings::load_or_create(&path).unwrap();
        assert!(!created);
        assert_eq!(again, settings);
    }

    #[test]
    fn settings_file_read_and_rejected_when_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);

        std::fs::write(&path, r#"{ "LogFileLimit": 3 }"#).unwrap();
        assert_eq!(Settings::load_or_create(&path).unwrap().0.log_file_limit, 3);

        std::fs::write(&path, "{ LogFileLimit: ").unwrap();
        assert!(matches!(
            Settings::load_or_create(&path),
            Err(SwapperError::Settings(_))
        ));
    }
}
