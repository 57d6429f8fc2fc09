//! 发布包内置的文件清单：相对路径 → MD5

use crate::config::GAME_EXECUTABLE;

use std::fmt;

/// 可切换的游戏版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Multipatch,
    EidosPremierCollection,
    EidosUkBox,
}

impl Variant {
    pub const ALL: [Variant; 3] = [
        Variant::Multipatch,
        Variant::EidosPremierCollection,
        Variant::EidosUkBox,
    ];

    pub const DEFAULT: Variant = Variant::Multipatch;

    /// 版本列表中的序号（从 1 开始）
    pub fn ordinal(self) -> usize {
        match self {
            Variant::Multipatch => 1,
            Variant::EidosPremierCollection => 2,
            Variant::EidosUkBox => 3,
        }
    }

    pub fn from_ordinal(n: usize) -> Option<Variant> {
        Variant::ALL.into_iter().find(|v| v.ordinal() == n)
    }

    /// versions/ 下对应的文件夹名
    pub fn dir_name(self) -> &'static str {
        match self {
            Variant::Multipatch => "Multipatch",
            Variant::EidosPremierCollection => "Eidos Premier Collection",
            Variant::EidosUkBox => "Eidos UK Box",
        }
    }

    fn files(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Variant::Multipatch => MULTIPATCH_FILES,
            Variant::EidosPremierCollection => EPC_FILES,
            Variant::EidosUkBox => UKB_FILES,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// 音乐修复所适配的音频编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MusicCodec {
    Mp3,
    Ogg,
}

impl MusicCodec {
    pub const ALL: [MusicCodec; 2] = [MusicCodec::Mp3, MusicCodec::Ogg];

    /// 文件扩展名，同时也是 utilities/music_fix/ 下的子目录名
    pub fn extension(self) -> &'static str {
        match self {
            MusicCodec::Mp3 => "mp3",
            MusicCodec::Ogg => "ogg",
        }
    }

    pub fn from_extension(ext: &str) -> Option<MusicCodec> {
        MusicCodec::ALL
            .into_iter()
            .find(|c| c.extension().eq_ignore_ascii_case(ext))
    }

    fn files(self) -> &'static [(&'static str, &'static str)] {
        match self {
            MusicCodec::Mp3 => MUSIC_FIX_MP3_FILES,
            MusicCodec::Ogg => MUSIC_FIX_OGG_FILES,
        }
    }
}

impl fmt::Display for MusicCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MusicCodec::Mp3 => "MP3",
            MusicCodec::Ogg => "OGG",
        })
    }
}

/// 清单分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Base,
    Variant(Variant),
    MusicFix(MusicCodec),
    Patch,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Base => f.write_str("base"),
            Category::Variant(v) => write!(f, "variant:{}", v.dir_name()),
            Category::MusicFix(c) => write!(f, "musicfix:{}", c.extension()),
            Category::Patch => f.write_str("patch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub relative_path: String,
    /// 小写十六进制 MD5
    pub expected_hash: String,
}

impl ManifestEntry {
    pub fn new(relative_path: impl Into<String>, expected_hash: impl AsRef<str>) -> Self {
        Self {
            relative_path: relative_path.into(),
            expected_hash: expected_hash.as_ref().to_ascii_lowercase(),
        }
    }
}

/// 一个分类及其条目，条目顺序即校验顺序
#[derive(Debug, Clone)]
pub struct CategoryEntries {
    pub category: Category,
    pub entries: Vec<ManifestEntry>,
}

/// 全部清单
#[derive(Debug, Clone)]
pub struct Manifest {
    /// 游戏目录中必须存在的文件（只检查存在性，不校验内容）
    pub game_files: Vec<String>,
    /// 发布包内需校验哈希的分类，按校验顺序排列
    pub bundled: Vec<CategoryEntries>,
}

/// 游戏目录下与编码相关的 shim 文件
pub const CODEC_SHIM_FILE: &str = "winmm.dll";

/// 音乐修复需要放到游戏目录的全部文件
pub const SHIM_FILES: [&str; 2] = ["fmodex.dll", CODEC_SHIM_FILE];

pub const MUSIC_DIR: &str = "music";

const GAME_FILES: &[&str] = &[
    GAME_EXECUTABLE,
    "data/floating.tr2",
    "data/title.pcx",
    "data/tombpc.dat",
];

const MULTIPATCH_FILES: &[(&str, &str)] = &[
    ("tomb2.exe", "964f0c4e08ff44a905e8fc9a78f605dc"),
    ("data/floating.tr2", "1e7d0d88ff9d569e22982af761bb006b"),
    ("data/title.pcx", "a5dad5ff5cb275825ff1895ca76fa908"),
    ("data/tombpc.dat", "d48757da01f8642f1a3d82fae0fc99e4"),
];

// tomb2.exe 均为 No-CD 版本
const EPC_FILES: &[(&str, &str)] = &[
    ("tomb2.exe", "793c67c79a50984d9bd17ad391f03c57"),
    ("data/floating.tr2", "1e7d0d88ff9d569e22982af761bb006b"),
    ("data/title.pcx", "cdf5c232f71fe1d45b184c45252b6fb0"),
    ("data/tombpc.dat", "d48757da01f8642f1a3d82fae0fc99e4"),
];

const UKB_FILES: &[(&str, &str)] = &[
    ("tomb2.exe", "12d56521ce038b55efba97463357a3d7"),
    ("data/floating.tr2", "b8fc5d8444b15527cec447bc0387c41a"),
    ("data/title.pcx", "cdf5c232f71fe1d45b184c45252b6fb0"),
    ("data/tombpc.dat", "d48757da01f8642f1a3d82fae0fc99e4"),
];

// fmodex.dll 两种编码通用，winmm.dll 按编码分别构建
const MUSIC_FIX_MP3_FILES: &[(&str, &str)] = &[
    ("fmodex.dll", "a5106cf9d7371f842f500976692dd29e"),
    // 发布打包时按 MP3 版 winmm.dll 的实际构建结果重新生成
    ("winmm.dll", "0d8c7a1d84e3c9b5e6f4a2b17c30e9f1"),
];

const MUSIC_FIX_OGG_FILES: &[(&str, &str)] = &[
    ("fmodex.dll", "a5106cf9d7371f842f500976692dd29e"),
    ("winmm.dll", "f683a8f1a309798ff75d11d65092315a"),
];

const PATCH_FILES: &[(&str, &str)] = &[
    ("tr2p1readme.rtf", "100439b46ecad0a318d757bb814ae890"),
    ("tomb2.exe", "39cab6b4ae3c761b67ae308a0ab22e44"),
];

fn entries(files: &[(&str, &str)]) -> Vec<ManifestEntry> {
    files
        .iter()
        .map(|&(path, hash)| ManifestEntry::new(path, hash))
        .collect()
}

impl Manifest {
    /// 随发布包一起构建的清单
    pub fn builtin() -> Self {
        let mut bundled = Vec::new();

        for variant in Variant::ALL {
            bundled.push(CategoryEntries {
                category: Category::Variant(variant),
                entries: entries(variant.files()),
            });
        }

        for codec in MusicCodec::ALL {
            bundled.push(CategoryEntries {
                category: Category::MusicFix(codec),
                entries: entries(codec.files()),
            });
        }

        bundled.push(CategoryEntries {
            category: Category::Patch,
            entries: entries(PATCH_FILES),
        });

        Self {
            game_files: GAME_FILES.iter().map(|s| s.to_string()).collect(),
            bundled,
        }
    }

    pub fn category(&self, category: Category) -> Option<&CategoryEntries> {
        self.bundled.iter().find(|c| c.category == category)
    }

    /// 指定编码的 shim 期望哈希
    pub fn codec_shim_hash(&self, codec: MusicCodec) -> Option<&str> {
        self.category(Category::MusicFix(codec))?
            .entries
            .iter()
            .find(|e| e.relative_path == CODEC_SHIM_FILE)
            .map(|e| e.expected_hash.as_str())
    }
}
