use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

/// 单个文件的校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashOutcome {
    Match,
    Mismatch(String),
    Missing,
}

/// 流式计算文件的 MD5（小写十六进制）
pub fn compute_md5(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut context = md5::Context::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }

    Ok(format!("{:x}", context.finalize()))
}

fn is_missing(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// 校验文件内容；文件或其上级目录不存在时返回 Missing，其他 IO 错误向上传播
pub fn verify(path: &Path, expected: &str) -> io::Result<HashOutcome> {
    match compute_md5(path) {
        Ok(actual) if actual.eq_ignore_ascii_case(expected) => Ok(HashOutcome::Match),
        Ok(actual) => Ok(HashOutcome::Mismatch(actual)),
        Err(e) if is_missing(&e) => Ok(HashOutcome::Missing),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // md5("hello world")
    const HELLO: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

    #[test]
    fn unmodified_file_matches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, "hello world").unwrap();

        assert_eq!(verify(&path, HELLO).unwrap(), HashOutcome::Match);
        assert_eq!(verify(&path, &HELLO.to_uppercase()).unwrap(), HashOutcome::Match);
    }

    #[test]
    fn byte_flipped_file_mismatches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, "hello worle").unwrap();

        match verify(&path, HELLO).unwrap() {
            HashOutcome::Mismatch(actual) => assert_ne!(actual, HELLO),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn deleted_file_is_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, "hello world").unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(verify(&path, HELLO).unwrap(), HashOutcome::Missing);
    }

    #[test]
    fn missing_parent_directory_is_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("a.bin");

        assert_eq!(verify(&path, HELLO).unwrap(), HashOutcome::Missing);
    }
}
