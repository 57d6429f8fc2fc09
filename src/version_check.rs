//! GitHub 最新发布版本检查

use crate::config::{LATEST_RELEASE_API, USER_AGENT};
use crate::error::{Result, SwapperError};

use reqwest::blocking::ClientBuilder;
use semver::Version;
use serde::Deserialize;
use std::cmp::Ordering;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStatus {
    UpToDate,
    Outdated { current: Version, latest: Version },
    /// 当前版本比最新发布还新（开发版或预发布）
    PreRelease { current: Version, latest: Version },
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// 宽松解析版本号：去掉前缀 v，缺少的部分补 0（"2.1" → 2.1.0）
pub fn parse_version(tag: &str) -> Option<Version> {
    let tag = tag.trim();
    let tag = tag
        .strip_prefix('v')
        .or_else(|| tag.strip_prefix('V'))
        .unwrap_or(tag);

    if let Ok(v) = Version::parse(tag) {
        return Some(v);
    }

    let parts: Vec<u64> = tag
        .split('.')
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [major] => Some(Version::new(*major, 0, 0)),
        [major, minor] => Some(Version::new(*major, *minor, 0)),
        [major, minor, patch, ..] => Some(Version::new(*major, *minor, *patch)),
        [] => None,
    }
}

/// 只比较主、次、修订三部分
pub fn compare_versions(current: &Version, latest: &Version) -> ReleaseStatus {
    let key = |v: &Version| (v.major, v.minor, v.patch);
    match key(current).cmp(&key(latest)) {
        Ordering::Equal => ReleaseStatus::UpToDate,
        Ordering::Less => ReleaseStatus::Outdated {
            current: current.clone(),
            latest: latest.clone(),
        },
        Ordering::Greater => ReleaseStatus::PreRelease {
            current: current.clone(),
            latest: latest.clone(),
        },
    }
}

pub fn fetch_latest_version() -> Result<Version> {
    let client = ClientBuilder::new()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SwapperError::NetworkError(format!("Could not create HTTP client: {}", e)))?;

    let resp = client
        .get(LATEST_RELEASE_API)
        .header("Accept", "application/vnd.github+json")
        .send()
        .map_err(|e| SwapperError::NetworkError(format!("Request failed: {}", e)))?;

    if !resp.status().is_success() {
        return Err(SwapperError::NetworkError(format!(
            "GitHub returned HTTP {}",
            resp.status()
        )));
    }

    let text = resp
        .text()
        .map_err(|e| SwapperError::NetworkError(format!("Could not read response: {}", e)))?;
    let release: LatestRelease = serde_json::from_str(&text)
        .map_err(|e| SwapperError::NetworkError(format!("Could not parse response: {}", e)))?;

    parse_version(&release.tag_name).ok_or_else(|| {
        SwapperError::NetworkError(format!("Unrecognized release tag {}", release.tag_name))
    })
}

pub fn check_latest_release() -> Result<ReleaseStatus> {
    let current = parse_version(env!("CARGO_PKG_VERSION")).ok_or_else(|| {
        SwapperError::NetworkError("Could not parse the program version".to_string())
    })?;
    let latest = fetch_latest_version()?;
    log::debug!("Current version {}, latest release {}", current, latest);
    Ok(compare_versions(&current, &latest))
}
