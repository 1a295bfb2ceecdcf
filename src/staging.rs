//! 暂存目录与提交
//!
//! 输出先写到目标旁边的隐藏目录 `.{name}{suffix}`，全部完成后再通过重命名
//! 替换目标。暂存目录在未提交时随 `Stage` 一起删除。

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ConvertError, IoContext, Result};

pub struct Stage {
    target: PathBuf,
    dir: PathBuf,
    committed: bool,
}

fn sibling(target: &Path, suffix: &str) -> Result<PathBuf> {
    let name = target.file_name().ok_or_else(|| {
        ConvertError::io(
            format!("staging {}", target.display()),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "output path has no file name"),
        )
    })?;
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok(parent.join(format!(".{}{}", name.to_string_lossy(), suffix)))
}

impl Stage {
    /// 在 `target` 旁边创建空的暂存目录（残留的同名目录先清掉）
    pub fn new(target: &Path, suffix: &str) -> Result<Self> {
        let dir = sibling(target, suffix)?;
        if dir.exists() {
            debug!("Removing leftover stage {}", dir.display());
            fs::remove_dir_all(&dir).io_context(|| format!("removing {}", dir.display()))?;
        }
        fs::create_dir_all(&dir).io_context(|| format!("creating {}", dir.display()))?;
        Ok(Self {
            target: target.to_path_buf(),
            dir,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// 用暂存内容替换目标；旧目标先移开，失败时放回
    pub fn commit(mut self) -> Result<()> {
        let backup = sibling(&self.target, ".mcconvert-old")?;
        if backup.exists() {
            fs::remove_dir_all(&backup).io_context(|| format!("removing {}", backup.display()))?;
        }
        let had_target = self.target.exists();
        if had_target {
            fs::rename(&self.target, &backup)
                .io_context(|| format!("moving {} aside", self.target.display()))?;
        }
        if let Err(e) = fs::rename(&self.dir, &self.target) {
            if had_target {
                if let Err(restore) = fs::rename(&backup, &self.target) {
                    warn!("Could not restore {}: {}", self.target.display(), restore);
                }
            }
            return Err(ConvertError::io(format!("promoting {}", self.target.display()), e));
        }
        self.committed = true;
        if had_target {
            if let Err(e) = fs::remove_dir_all(&backup) {
                warn!("Could not remove {}: {}", backup.display(), e);
            }
        }
        debug!("Promoted stage to {}", self.target.display());
        Ok(())
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        if !self.committed && self.dir.exists() {
            if let Err(e) = fs::remove_dir_all(&self.dir) {
                warn!("Could not remove stage {}: {}", self.dir.display(), e);
            }
        }
    }
}

/// 递归复制目录树；`skip` 接收相对路径，返回 true 的条目（含子树）不复制
pub fn copy_tree<F>(src: &Path, dst: &Path, skip: F) -> Result<u64>
where
    F: Fn(&Path) -> bool,
{
    let mut copied = 0;
    let walker = WalkDir::new(src).sort_by_file_name().into_iter().filter_entry(|e| {
        e.path()
            .strip_prefix(src)
            .map(|rel| rel.as_os_str().is_empty() || !skip(rel))
            .unwrap_or(true)
    });
    for entry in walker {
        let entry = entry.map_err(|e| {
            let context = format!("walking {}", src.display());
            match e.into_io_error() {
                Some(io) => ConvertError::io(context, io),
                None => ConvertError::io(context, std::io::Error::other("filesystem loop")),
            }
        })?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let out = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out).io_context(|| format!("creating {}", out.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &out).io_context(|| format!("copying {}", entry.path().display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncommitted_stage_is_removed() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("out");
        let staged;
        {
            let stage = Stage::new(&target, ".stage").unwrap();
            staged = stage.path().to_path_buf();
            fs::write(staged.join("level.dat"), b"x").unwrap();
            assert!(staged.exists());
        }
        assert!(!staged.exists());
        assert!(!target.exists());
    }

    #[test]
    fn commit_replaces_existing_target() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("out");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("old.txt"), b"old").unwrap();

        let stage = Stage::new(&target, ".stage").unwrap();
        fs::write(stage.path().join("new.txt"), b"new").unwrap();
        stage.commit().unwrap();

        assert!(!target.join("old.txt").exists());
        assert_eq!(fs::read(target.join("new.txt")).unwrap(), b"new");
        let leftovers: Vec<_> = fs::read_dir(root.path()).unwrap().filter_map(|e| e.ok()).collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn copy_tree_honours_skip() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("region")).unwrap();
        fs::create_dir_all(src.path().join("data")).unwrap();
        fs::write(src.path().join("region/r.0.0.mca"), b"r").unwrap();
        fs::write(src.path().join("data/raids.dat"), b"d").unwrap();

        let copied = copy_tree(src.path(), dst.path(), |rel| rel.starts_with("region")).unwrap();
        assert_eq!(copied, 1);
        assert!(dst.path().join("data/raids.dat").is_file());
        assert!(!dst.path().join("region").exists());
    }
}
