use console::style;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

/// Ctrl+C 退出时的退出码
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

pub const INTERRUPT_WARNING: &str =
    "Received SIGINT. It's up to you to know the current state of your game!";

static SET_HANDLER: Once = Once::new();
static SHUTDOWN_STARTED: AtomicBool = AtomicBool::new(false);

/// 安装 Ctrl+C 处理：提示用户安装状态需自行确认，记录日志后退出，不做回滚
pub fn install_interrupt_hook() {
    SET_HANDLER.call_once(|| {
        let result = ctrlc::set_handler(|| {
            if SHUTDOWN_STARTED.swap(true, Ordering::SeqCst) {
                return;
            }

            eprintln!();
            eprintln!("{}", style(INTERRUPT_WARNING).yellow());
            log::warn!("{}", INTERRUPT_WARNING);
            log::logger().flush();

            std::process::exit(INTERRUPTED_EXIT_CODE);
        });

        if let Err(e) = result {
            log::debug!("Could not install the Ctrl+C handler: {}", e);
        }
    });
}
