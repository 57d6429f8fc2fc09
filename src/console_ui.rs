use crate::compat_patch::CompatibilityPatchRecord;
use crate::config::{GAME_ABBREVIATION, RELEASE_LINK, REPO_LINK};
use crate::error::Result;
use crate::manifest::{MusicCodec, Variant};
use crate::music_fix::{MusicFileKind, NormalizeReport};
use crate::process_guard::RunningConflict;
use crate::ui::Ui;
use crate::version_check::ReleaseStatus;

use console::{Term, style};
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;

const PRINT_WIDTH: usize = 80;

/// 控制台 UI 实现
pub struct ConsoleUI {
    validation_bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleUI {
    pub fn new() -> Self {
        Self {
            validation_bar: Mutex::new(None),
        }
    }
}

impl Default for ConsoleUI {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui for ConsoleUI {
    fn display_welcome(&self) -> Result<()> {
        display_welcome()
    }

    fn display_release_status(&self, status: &ReleaseStatus) -> Result<()> {
        display_release_status(status)
    }

    fn display_release_check_failed(&self, err: &str) -> Result<()> {
        display_release_check_failed(err)
    }

    fn blank_line(&self) -> Result<()> {
        println!();
        Ok(())
    }

    fn message(&self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }

    fn warn(&self, text: &str) -> Result<()> {
        println!("{}", style(text).yellow());
        Ok(())
    }

    fn error(&self, text: &str) -> Result<()> {
        println!();
        println!("{}", style(text).red());
        Ok(())
    }

    fn header(&self, title: &str, subtitle: Option<&str>) -> Result<()> {
        header(title, subtitle)
    }

    fn wait_for_key(&self) -> Result<()> {
        wait_for_key()
    }

    fn settings_created(&self, path: &Path) -> Result<()> {
        settings_created(path)
    }

    fn logs_limit_exceeded(&self, limit: u32, total: usize) -> Result<()> {
        logs_limit_exceeded(limit, total)
    }

    fn logs_limit_approaching(&self, limit: u32, total: usize) -> Result<()> {
        logs_limit_approaching(limit, total)
    }

    fn logs_delete_failed(&self, limit: u32) -> Result<()> {
        logs_delete_failed(limit)
    }

    fn validate_start(&self, total: usize) -> Result<()> {
        let pb = ProgressBar::new(total as u64);
        let style = match ProgressStyle::default_bar()
            .template("{msg}\n[{bar:40.cyan/blue}] {pos}/{len}")
        {
            Ok(s) => s.progress_chars("#>-"),
            Err(_) => ProgressStyle::default_bar(),
        };
        pb.set_style(style);
        pb.set_message("Checking packaged files...");

        let mut guard = match self.validation_bar.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        *guard = Some(pb);

        Ok(())
    }

    fn validate_progress(&self, relative_path: &str) -> Result<()> {
        let guard = match self.validation_bar.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };

        if let Some(pb) = guard.as_ref() {
            pb.set_message(format!("Checking {}", relative_path));
            pb.inc(1);
        }

        Ok(())
    }

    fn validate_finish(&self) -> Result<()> {
        let mut guard = match self.validation_bar.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };

        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }

        Ok(())
    }

    fn guard_display_conflict(&self, conflict: &RunningConflict) -> Result<()> {
        guard_display_conflict(conflict)
    }

    fn guard_ask_terminate(&self) -> Result<bool> {
        guard_ask_terminate()
    }

    fn guard_terminate_failed(&self, err: &str) -> Result<()> {
        guard_terminate_failed(err)
    }

    fn guard_exited_externally(&self) -> Result<()> {
        println!("The game was closed in the meantime. Continuing.");
        println!();
        Ok(())
    }

    fn guard_wait_for_continue(&self) -> Result<bool> {
        guard_wait_for_continue()
    }

    fn guard_still_running(&self) -> Result<()> {
        println!("{}", style("The game is still running, checking again.").yellow());
        println!();
        Ok(())
    }

    fn guard_detection_failed(&self, err: &str) -> Result<()> {
        guard_detection_failed(err)
    }

    fn swap_display_versions(&self, versions: &[Variant]) -> Result<()> {
        swap_display_versions(versions)
    }

    fn swap_read_selection(&self, default: Variant) -> Result<String> {
        swap_read_selection(default)
    }

    fn swap_invalid_selection(&self, input: &str) -> Result<()> {
        println!(
            "{}",
            style(format!(
                "\"{}\" is not a listed version number, try again.",
                input.trim()
            ))
            .yellow()
        );
        Ok(())
    }

    fn swap_version_installed(&self, variant: Variant) -> Result<()> {
        header(&format!("{} installed!", variant), None)
    }

    fn swap_ask_install_patch(&self) -> Result<bool> {
        swap_ask_install_patch()
    }

    fn swap_patch_installed(&self) -> Result<()> {
        header("Patch 1 installed!", None)
    }

    fn swap_patch_skipped(&self) -> Result<()> {
        println!("Skipping the patch.");
        println!();
        Ok(())
    }

    fn music_undeterminable(&self, kind: &MusicFileKind) -> Result<()> {
        music_undeterminable(kind)
    }

    fn music_already_installed(&self, codec: MusicCodec) -> Result<()> {
        println!("The {} music fix is already installed.", codec);
        println!();
        Ok(())
    }

    fn music_ask_install(&self, codec: MusicCodec) -> Result<bool> {
        music_ask_install(codec)
    }

    fn music_installed(&self, codec: MusicCodec) -> Result<()> {
        header(&format!("{} music fix installed!", codec), None)
    }

    fn music_partially_installed(&self, codec: MusicCodec) -> Result<()> {
        music_partially_installed(codec)
    }

    fn music_declined(&self) -> Result<()> {
        println!("Skipping the music fix. I will offer it again next time.");
        println!();
        Ok(())
    }

    fn music_normalize_report(&self, report: &NormalizeReport) -> Result<()> {
        music_normalize_report(report)
    }

    fn patch_detected(&self, record: &CompatibilityPatchRecord) -> Result<()> {
        patch_detected(record)
    }

    fn patch_ask_uninstall(&self) -> Result<bool> {
        patch_ask_uninstall()
    }

    fn patch_declined(&self, record: &CompatibilityPatchRecord) -> Result<()> {
        patch_declined(record)
    }

    fn patch_removed(&self) -> Result<()> {
        header("Conflicting patch removed!", None)
    }

    fn patch_uninstall_failed(&self, record: &CompatibilityPatchRecord) -> Result<()> {
        patch_uninstall_failed(record)
    }

    fn patch_check_skipped(&self, err: &str) -> Result<()> {
        println!(
            "{}",
            style(format!(
                "Could not check installed programs for conflicting patches: {}",
                err
            ))
            .yellow()
        );
        println!();
        Ok(())
    }
}

// ==================== 通用 UI ====================

/// 文本居中，两侧为 edge；放不下时两侧各留一个空格
fn centered(text: &str, edge: &str) -> String {
    let inner = PRINT_WIDTH.saturating_sub(2 * edge.chars().count());
    let len = text.chars().count();
    if len >= inner {
        return format!("{} {} {}", edge, text, edge);
    }
    let left = (inner - len) / 2;
    let right = inner - len - left;
    format!("{}{}{}{}{}", edge, " ".repeat(left), text, " ".repeat(right), edge)
}

fn header(title: &str, subtitle: Option<&str>) -> Result<()> {
    let border = "═".repeat(PRINT_WIDTH - 2);

    println!("{}", style(format!("╔{}╗", border)).cyan());
    println!("{}", style(centered(title, "║")).cyan());
    if let Some(sub) = subtitle.filter(|s| !s.is_empty()) {
        println!("{}", style(centered(sub, "║")).cyan());
    }
    println!("{}", style(format!("╚{}╝", border)).cyan());
    println!();

    Ok(())
}

fn display_welcome() -> Result<()> {
    let term = Term::stdout();
    let title = format!("{} Version Swapper", GAME_ABBREVIATION);
    term.set_title(format!("{} v{}", title, env!("CARGO_PKG_VERSION")));

    header(
        &title,
        Some(&format!("v{} by TombRunners", env!("CARGO_PKG_VERSION"))),
    )?;
    println!("{}", style(REPO_LINK).dim());
    println!();

    Ok(())
}

fn display_release_status(status: &ReleaseStatus) -> Result<()> {
    match status {
        ReleaseStatus::UpToDate => {}
        ReleaseStatus::Outdated { current, latest } => {
            println!(
                "{}",
                style(format!(
                    "You are running v{}, but v{} is available.",
                    current, latest
                ))
                .yellow()
            );
            println!("You are strongly advised to update to ensure leaderboard compatibility:");
            println!("{}", RELEASE_LINK);
            println!();
        }
        ReleaseStatus::PreRelease { current, latest } => {
            println!(
                "You seem to be running a pre-release version (v{}, latest release v{}).",
                current, latest
            );
            println!("Let us know how testing goes!");
            println!();
        }
    }

    Ok(())
}

fn display_release_check_failed(err: &str) -> Result<()> {
    println!(
        "{}",
        style(format!("Could not check for the latest release: {}", err)).yellow()
    );
    println!("You can check for updates manually here:");
    println!("{}", RELEASE_LINK);
    println!();
    Ok(())
}

fn wait_for_key() -> Result<()> {
    println!("{}", style("Press Enter to exit...").dim());

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    Ok(())
}

fn confirm(prompt: &str, default: bool) -> Result<bool> {
    let choice = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact_on_opt(&Term::stdout())?;
    Ok(choice.unwrap_or(default))
}

// ==================== 设置与日志 ====================

fn settings_created(path: &Path) -> Result<()> {
    println!("I created a default user settings file at");
    println!("{}", path.display());
    println!("You can edit the settings in this file to your liking.");
    println!();
    Ok(())
}

fn logs_limit_exceeded(limit: u32, total: usize) -> Result<()> {
    println!(
        "{}",
        style(format!(
            "There are {} log files, more than your limit of {}.",
            total, limit
        ))
        .yellow()
    );
    println!("The oldest log files will be deleted accordingly.");
    println!();
    Ok(())
}

fn logs_limit_approaching(limit: u32, total: usize) -> Result<()> {
    println!(
        "You have {} log files and your limit is {}; older logs will be deleted soon.",
        total, limit
    );
    println!("Edit appsettings.json to adjust the limit to your tastes (0 means no limit).");
    println!();
    Ok(())
}

fn logs_delete_failed(limit: u32) -> Result<()> {
    println!(
        "{}",
        style(format!(
            "Some old log files could not be deleted to keep the limit of {}.",
            limit
        ))
        .yellow()
    );
    println!("Please delete old files from the logs folder yourself.");
    println!("I've put some additional information in this session's log file.");
    println!();
    Ok(())
}

// ==================== 游戏进程 ====================

fn guard_display_conflict(conflict: &RunningConflict) -> Result<()> {
    println!(
        "{}",
        style(format!(
            "A {} game or background task is running from the target folder:",
            GAME_ABBREVIATION
        ))
        .yellow()
    );
    println!("  {}", conflict);
    println!("It could prevent files from being overwritten.");
    println!();
    Ok(())
}

fn guard_ask_terminate() -> Result<bool> {
    confirm(" Would you like me to end the task for you?", false)
}

fn guard_terminate_failed(err: &str) -> Result<()> {
    println!(
        "{}",
        style(format!("I could not end the task: {}", err)).red()
    );
    println!();
    Ok(())
}

fn guard_wait_for_continue() -> Result<bool> {
    println!(
        "Be sure that all {} game windows are closed. If this message keeps coming back,",
        GAME_ABBREVIATION
    );
    println!("check Task Manager for any phantom processes.");
    println!(
        "{}",
        style("Press Enter to continue, or press CTRL + C to exit this program.").dim()
    );

    let mut line = String::new();
    let read = std::io::stdin().read_line(&mut line)?;

    // 输入已关闭
    Ok(read > 0)
}

fn guard_detection_failed(err: &str) -> Result<()> {
    println!(
        "{}",
        style(format!("I could not check the running tasks: {}", err)).yellow()
    );
    println!(
        "A {} game or background task running from the target folder could prevent",
        GAME_ABBREVIATION
    );
    println!("files from being overwritten. Make sure none is running.");
    println!();
    Ok(())
}

// ==================== 版本切换 ====================

fn swap_display_versions(versions: &[Variant]) -> Result<()> {
    println!("{}", style("Version list:").cyan().bold());
    for v in versions {
        println!("  {} {}", style(format!("[{}]", v.ordinal())).green(), v);
    }
    println!();
    Ok(())
}

fn swap_read_selection(default: Variant) -> Result<String> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            " Enter the number of your desired version (default {})",
            default.ordinal()
        ))
        .allow_empty(true)
        .interact_text()?;
    Ok(input)
}

fn swap_ask_install_patch() -> Result<bool> {
    println!("Would you like me to install CORE's Patch 1 on top of your selected version?");
    println!("This optional patch is not required.");
    confirm(" Install CORE's Patch 1?", false)
}

// ==================== 音乐修复 ====================

fn music_undeterminable(kind: &MusicFileKind) -> Result<()> {
    println!(
        "{}",
        style(format!(
            "I could not tell which music fix to install: the music folder has {}.",
            kind
        ))
        .yellow()
    );
    println!("Verify or reinstall your game files, then run this program again.");
    println!();
    Ok(())
}

fn music_ask_install(codec: MusicCodec) -> Result<bool> {
    println!(
        "Your music files are {}. Without the matching music fix, in-game music might not",
        codec
    );
    println!("play and the game might freeze or lag when it tries to load music.");
    println!("The fix applies to every version, so it only needs to be installed once.");
    confirm(" Install the music fix?", true)
}

fn music_partially_installed(codec: MusicCodec) -> Result<()> {
    println!(
        "{}",
        style(format!(
            "The {} music fix was installed, but some music files could not be renamed.",
            codec
        ))
        .yellow()
    );
    println!("Music files must be named with two digits (for example 02.mp3).");
    println!("Rename the files listed above yourself or run this program again.");
    println!();
    Ok(())
}

fn music_normalize_report(report: &NormalizeReport) -> Result<()> {
    for (from, to) in &report.renamed {
        println!("  Renamed {} to {}", from, to);
    }
    for name in &report.skipped {
        println!(
            "  {}",
            style(format!("Left {} as is: not a numbered music file", name)).yellow()
        );
    }
    for (name, err) in &report.failed {
        println!(
            "  {}",
            style(format!("Could not rename {}: {}", name, err)).red()
        );
    }
    println!();
    Ok(())
}

// ==================== 第三方兼容补丁 ====================

fn patch_detected(record: &CompatibilityPatchRecord) -> Result<()> {
    println!(
        "{}",
        style(format!("\"{}\" is installed on this computer.", record.display_name)).yellow()
    );
    println!("It is known to stop the music fix from loading.");
    Ok(())
}

fn patch_ask_uninstall() -> Result<bool> {
    confirm(" Would you like me to run its uninstaller?", true)
}

fn patch_declined(record: &CompatibilityPatchRecord) -> Result<()> {
    println!(
        "Keeping \"{}\". The music fix may not work until it is removed.",
        record.display_name
    );
    println!();
    Ok(())
}

fn patch_uninstall_failed(record: &CompatibilityPatchRecord) -> Result<()> {
    println!(
        "{}",
        style(format!(
            "\"{}\" is still installed after running its uninstaller.",
            record.display_name
        ))
        .red()
    );
    println!("Remove it manually from Settings > Apps (or Control Panel > Programs and Features).");
    println!();
    Ok(())
}
