pub mod cli;
pub mod compat_patch;
pub mod config;
pub mod console_ui;
pub mod error;
pub mod file_ops;
pub mod hash;
pub mod logging;
pub mod manifest;
pub mod music_fix;
pub mod process_guard;
pub mod process_table;
pub mod shutdown;
pub mod ui;
pub mod validator;
pub mod version_check;
pub mod version_swap;
