use crate::error::CopyError;

use std::io::{self, ErrorKind};
use std::path::Path;

#[allow(clippy::permissions_set_readonly_false)]
fn ensure_owner_writable(metadata: &std::fs::Metadata) -> std::fs::Permissions {
    let mut perms = metadata.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = perms.mode() | 0o200;
        perms.set_mode(mode);
    }

    #[cfg(not(unix))]
    {
        perms.set_readonly(false);
    }

    perms
}

const ERROR_SHARING_VIOLATION: i32 = 32;
const ERROR_LOCK_VIOLATION: i32 = 33;

/// 是否为“文件被其他进程占用”类错误（仅 Windows 会出现）
pub fn is_file_in_use(err: &io::Error) -> bool {
    cfg!(target_os = "windows")
        && matches!(
            err.raw_os_error(),
            Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION)
        )
}

/// 复制单个文件，目标存在时覆盖；目标只读时清除只读属性后重试一次
pub fn copy_file_overwrite(src: &Path, dst: &Path) -> io::Result<()> {
    match std::fs::copy(src, dst) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            let Ok(metadata) = std::fs::metadata(dst) else {
                return Err(e);
            };
            if !metadata.permissions().readonly() {
                return Err(e);
            }
            std::fs::set_permissions(dst, ensure_owner_writable(&metadata))?;
            std::fs::copy(src, dst).map(|_| ())
        }
        Err(e) => Err(e),
    }
}

/// 递归复制目录，覆盖已有文件，返回复制的文件数
///
/// 非事务性：中途失败时已复制的文件不会回滚，错误中记录失败的具体路径。
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<usize, CopyError> {
    let fail = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| CopyError { path, source }
    };

    std::fs::create_dir_all(dst).map_err(fail(dst))?;

    let mut entries = std::fs::read_dir(src)
        .map_err(fail(src))?
        .collect::<io::Result<Vec<_>>>()
        .map_err(fail(src))?;
    entries.sort_by_key(|e| e.file_name());

    let mut copied = 0;
    for entry in entries {
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(fail(&from))?;

        if file_type.is_dir() {
            copied += copy_dir_recursive(&from, &to)?;
        } else {
            copy_file_overwrite(&from, &to).map_err(fail(&to))?;
            log::debug!("Copied {} -> {}", from.display(), to.display());
            copied += 1;
        }
    }

    Ok(copied)
}
