use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::TaskError;
use crate::task::Outcome;

/// Copy files verbatim, preserving their path structure relative to `base`.
/// Used for markup, fonts and video.
pub(crate) fn verbatim(
    files: &[Utf8PathBuf],
    base: &Utf8Path,
    out: &Utf8Path,
) -> Result<Outcome, TaskError> {
    let mut outcome = Outcome::default();

    for file in files {
        let rel = file.strip_prefix(base).unwrap_or(file);
        let dst = out.join(rel);

        if let Some(dir) = dst.parent() {
            fs::create_dir_all(dir)?;
        }

        fs::copy(file, &dst)?;
        outcome.written.push(dst);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_relative_structure() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap();

        let base = root.join("src");
        let out = root.join("dist");
        fs::create_dir_all(base.join("nested")).unwrap();
        fs::write(base.join("a.woff2"), b"aa").unwrap();
        fs::write(base.join("nested/b.woff2"), b"bb").unwrap();

        let files = vec![base.join("a.woff2"), base.join("nested/b.woff2")];
        let outcome = verbatim(&files, &base, &out).unwrap();

        assert_eq!(outcome.written.len(), 2);
        assert!(outcome.skipped.is_empty());
        assert_eq!(fs::read(out.join("a.woff2")).unwrap(), b"aa");
        assert_eq!(fs::read(out.join("nested/b.woff2")).unwrap(), b"bb");
    }

    #[test]
    fn empty_set_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap();

        let outcome = verbatim(&[], &root.join("src"), &root.join("dist")).unwrap();

        assert!(outcome.written.is_empty());
        assert!(!root.join("dist").exists());
    }
}
