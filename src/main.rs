use tr2_version_swapper::cli::Cli;
use tr2_version_swapper::compat_patch::system_provider;
use tr2_version_swapper::config::{Context, InstallDirs, RELEASE_LINK, SETTINGS_FILE_NAME, Settings};
use tr2_version_swapper::console_ui::ConsoleUI;
use tr2_version_swapper::error::{Result, SwapperError};
use tr2_version_swapper::file_ops::is_file_in_use;
use tr2_version_swapper::logging;
use tr2_version_swapper::music_fix::MusicFixResolver;
use tr2_version_swapper::process_guard::ProcessGuard;
use tr2_version_swapper::process_table::SystemProcessTable;
use tr2_version_swapper::shutdown::{INTERRUPT_WARNING, INTERRUPTED_EXIT_CODE, install_interrupt_hook};
use tr2_version_swapper::ui::Ui;
use tr2_version_swapper::validator::InstallationValidator;
use tr2_version_swapper::version_check::{ReleaseStatus, check_latest_release};
use tr2_version_swapper::version_swap::VersionSwapper;

use clap::Parser;
use std::process::ExitCode;

/// 安装校验失败（发布包损坏或目录不对）
const VALIDATION_EXIT_CODE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let console_ui = ConsoleUI::new();

    let code = match run(&cli, &console_ui) {
        Ok(()) => ExitCode::SUCCESS,
        Err(SwapperError::Interrupted) => {
            let _ = console_ui.blank_line();
            let _ = console_ui.warn(INTERRUPT_WARNING);
            log::warn!("{}", INTERRUPT_WARNING);
            log::logger().flush();
            return ExitCode::from(INTERRUPTED_EXIT_CODE as u8);
        }
        Err(e) => report_failure(&console_ui, &e),
    };

    log::logger().flush();
    console_ui.wait_for_key().ok();
    code
}

fn report_failure(ui: &dyn Ui, err: &SwapperError) -> ExitCode {
    log::error!("{}", err);
    let _ = ui.error(&err.to_string());

    if err.is_validation_failure() {
        let _ = ui.message("Your installation of this program looks broken or misplaced.");
        let _ = ui.message("It must sit in a folder inside your game folder.");
        let _ = ui.message("You are advised to re-install the latest release to fix the issue:");
        let _ = ui.message(RELEASE_LINK);
        return ExitCode::from(VALIDATION_EXIT_CODE);
    }

    if let SwapperError::Copy(copy) = err {
        let _ = ui.warn("The copy stopped partway, so your game may now have a mix of versions.");
        if is_file_in_use(&copy.source) {
            let _ = ui.warn("The file is in use. Close the game and anything else using it, then run me again.");
        } else {
            let _ = ui.warn("Run me again to finish switching versions.");
        }
    }

    let _ = ui.message("I've put some additional information in this session's log file.");
    ExitCode::from(1)
}

fn run(cli: &Cli, ui: &dyn Ui) -> Result<()> {
    let dirs = InstallDirs::from_package_root(&std::env::current_dir()?)?;

    // 1. 日志与中断处理
    let log_path = logging::init(&dirs.logs(), cli.verbose);
    log::info!("Started v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = log_path {
        log::debug!("Logging to {}", path.display());
    }
    log::debug!("Game folder: {}", dirs.game.display());
    install_interrupt_hook();

    ui.display_welcome()?;

    // 2. 用户设置与日志清理
    let settings_path = dirs.package.join(SETTINGS_FILE_NAME);
    let (settings, created) = Settings::load_or_create(&settings_path)?;
    if created {
        ui.settings_created(&settings_path)?;
    }
    logging::prune_log_files(&dirs.logs(), settings.log_file_limit, ui)?;

    // 3. 版本检查
    if cli.skip_version_check {
        log::debug!("Skipping the release check.");
    } else {
        match check_latest_release() {
            Ok(ReleaseStatus::UpToDate) => log::debug!("Running the latest release."),
            Ok(status) => {
                log::info!("Release check: {:?}", status);
                ui.display_release_status(&status)?;
            }
            Err(e) => {
                log::warn!("Release check failed: {}", e);
                ui.display_release_check_failed(&e.to_string())?;
            }
        }
    }

    // 4. 校验发布包和游戏目录，之后才允许修改
    let ctx = Context::new(dirs, settings);
    InstallationValidator::new(&ctx, ui).validate_installation()?;

    // 5. 版本切换、补丁、音乐修复
    let table = SystemProcessTable::new();
    let guard = ProcessGuard::new(&ctx, &table, ui);

    let swapper = VersionSwapper::new(&ctx, ui, &guard);
    swapper.handle_versions()?;
    swapper.handle_patch()?;

    let patches = system_provider();
    let report = MusicFixResolver::new(&ctx, ui, &guard, patches.as_ref()).handle()?;
    log::info!("Music fix result: {:?}", report);

    ui.message("All done. Have fun!")?;
    Ok(())
}
