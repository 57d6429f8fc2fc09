use crate::config::Context;
use crate::error::Result;
use crate::file_ops::copy_dir_recursive;
use crate::manifest::{Category, Variant};
use crate::process_guard::ProcessGuard;
use crate::ui::Ui;

/// 解析版本序号输入；空输入选择默认版本，无效输入返回 None
pub fn parse_selection(input: &str, default: Variant) -> Option<Variant> {
    let input = input.trim();
    if input.is_empty() {
        return Some(default);
    }
    input.parse::<usize>().ok().and_then(Variant::from_ordinal)
}

pub struct VersionSwapper<'a> {
    ctx: &'a Context,
    ui: &'a dyn Ui,
    guard: &'a ProcessGuard<'a>,
}

impl<'a> VersionSwapper<'a> {
    pub fn new(ctx: &'a Context, ui: &'a dyn Ui, guard: &'a ProcessGuard<'a>) -> Self {
        Self { ctx, ui, guard }
    }

    /// 反复询问直到输入有效
    pub fn prompt_version(&self) -> Result<Variant> {
        self.ui.swap_display_versions(&Variant::ALL)?;
        loop {
            let input = self.ui.swap_read_selection(Variant::DEFAULT)?;
            match parse_selection(&input, Variant::DEFAULT) {
                Some(variant) => {
                    log::info!("User chose {}.", variant);
                    return Ok(variant);
                }
                None => {
                    log::debug!("Invalid version selection: {:?}", input);
                    self.ui.swap_invalid_selection(&input)?;
                }
            }
        }
    }

    /// 将选择的版本复制到游戏目录（非事务性，失败时指明具体文件）
    pub fn swap_to_version(&self, variant: Variant) -> Result<()> {
        self.guarded_copy(Category::Variant(variant))?;
        log::info!("Installed {} version files.", variant);
        self.ui.swap_version_installed(variant)
    }

    /// 询问并安装可选补丁
    pub fn handle_patch(&self) -> Result<bool> {
        if !self.ui.swap_ask_install_patch()? {
            log::info!("User declined the patch.");
            self.ui.swap_patch_skipped()?;
            return Ok(false);
        }

        self.guarded_copy(Category::Patch)?;
        log::info!("Installed the patch files.");
        self.ui.swap_patch_installed()?;
        Ok(true)
    }

    pub fn handle_versions(&self) -> Result<Variant> {
        let variant = self.prompt_version()?;
        self.swap_to_version(variant)?;
        Ok(variant)
    }

    fn guarded_copy(&self, category: Category) -> Result<()> {
        self.guard.clear_for_writing()?;

        let dirs = &self.ctx.dirs;
        let source = dirs.category_root(category);
        log::debug!(
            "Copying {} from {} to {}",
            category,
            source.display(),
            dirs.game.display()
        );
        let copied = copy_dir_recursive(&source, &dirs.game)?;
        log::debug!("Copied {} files for {}", copied, category);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_selects_default() {
        assert_eq!(parse_selection("", Variant::Multipatch), Some(Variant::Multipatch));
        assert_eq!(parse_selection("  \n", Variant::EidosUkBox), Some(Variant::EidosUkBox));
    }

    #[test]
    fn numbers_map_to_ordinals() {
        assert_eq!(parse_selection("1", Variant::DEFAULT), Some(Variant::Multipatch));
        assert_eq!(parse_selection(" 2 ", Variant::DEFAULT), Some(Variant::EidosPremierCollection));
        assert_eq!(parse_selection("3", Variant::DEFAULT), Some(Variant::EidosUkBox));
    }

    #[test]
    fn out_of_range_and_garbage_rejected() {
        for input in ["0", "4", "-1", "two", "1.0", "Multipatch"] {
            assert_eq!(parse_selection(input, Variant::DEFAULT), None, "{}", input);
        }
    }
}
