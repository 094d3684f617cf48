//! Stylesheet compilation: SCSS through `grass`, then vendor prefixing and
//! formatting through `lightningcss`. Every sheet is written twice, as a
//! readable `name.css` and a minified `name.min.css` derived from the same
//! prefixed stylesheet, never from the raw source.

use std::fs;

use anyhow::anyhow;
use camino::{Utf8Path, Utf8PathBuf};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::error::TaskError;
use crate::report::{self, FileFailure};
use crate::task::Outcome;

struct Compiled {
    full: String,
    min: String,
}

pub(crate) fn process(
    files: &[Utf8PathBuf],
    base: &Utf8Path,
    out: &Utf8Path,
) -> Result<Outcome, TaskError> {
    let mut outcome = Outcome::default();

    for file in files {
        let compiled = match compile(file) {
            Ok(compiled) => compiled,
            Err(err) => {
                let failure = FileFailure::new("SCSS Error", file.clone(), err);
                report::file_failure(&failure);
                outcome.skipped.push(failure);
                continue;
            }
        };

        let rel = file.strip_prefix(base).unwrap_or(file);
        let dst = out.join(rel).with_extension("css");

        if let Some(dir) = dst.parent() {
            fs::create_dir_all(dir)?;
        }

        fs::write(&dst, &compiled.full)?;
        let dst_min = dst.with_extension("min.css");
        fs::write(&dst_min, &compiled.min)?;

        outcome.written.push(dst);
        outcome.written.push(dst_min);
    }

    Ok(outcome)
}

/// Compile a single sheet to its full and minified variants. Any failure
/// here is a per-file error; nothing has been written yet when it occurs.
fn compile(path: &Utf8Path) -> anyhow::Result<Compiled> {
    let opts = grass::Options::default().style(grass::OutputStyle::Expanded);
    let css = grass::from_path(path, &opts).map_err(|e| anyhow!("{e}"))?;

    let targets = browser_targets();
    let mut sheet =
        StyleSheet::parse(&css, ParserOptions::default()).map_err(|e| anyhow!("{e}"))?;
    sheet
        .minify(MinifyOptions {
            targets,
            ..Default::default()
        })
        .map_err(|e| anyhow!("{e}"))?;

    let full = sheet
        .to_css(PrinterOptions {
            targets,
            ..Default::default()
        })
        .map_err(|e| anyhow!("{e}"))?
        .code;

    let min = sheet
        .to_css(PrinterOptions {
            targets,
            minify: true,
            ..Default::default()
        })
        .map_err(|e| anyhow!("{e}"))?
        .code;

    Ok(Compiled { full, min })
}

/// Browsers we emit vendor prefixes for. Versions are encoded as
/// `major << 16 | minor << 8 | patch`.
fn browser_targets() -> Targets {
    Targets {
        browsers: Some(Browsers {
            chrome: Some(100 << 16),
            edge: Some(100 << 16),
            firefox: Some(100 << 16),
            safari: Some(14 << 16),
            ios_saf: Some(14 << 16),
            ..Browsers::default()
        }),
        ..Targets::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_both_variants() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap();

        let base = root.join("scss");
        fs::create_dir_all(&base).unwrap();
        fs::write(
            base.join("styles.scss"),
            "$accent: red;\nbody {\n  color: $accent;\n}\n",
        )
        .unwrap();

        let out = root.join("css");
        let files = vec![base.join("styles.scss")];
        let outcome = process(&files, &base, &out).unwrap();

        assert!(outcome.skipped.is_empty());
        let full = fs::read_to_string(out.join("styles.css")).unwrap();
        let min = fs::read_to_string(out.join("styles.min.css")).unwrap();

        assert!(full.contains("color: red"));
        assert!(min.contains("color:red"));
        assert!(min.len() <= full.len());
    }

    #[test]
    fn malformed_sheet_is_skipped_without_output() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap();

        let base = root.join("scss");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("bad.scss"), "body { color: ").unwrap();
        fs::write(base.join("good.scss"), "p { margin: 0; }").unwrap();

        let out = root.join("css");
        let files = vec![base.join("bad.scss"), base.join("good.scss")];
        let outcome = process(&files, &base, &out).unwrap();

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].title, "SCSS Error");
        assert!(!out.join("bad.css").exists());
        assert!(!out.join("bad.min.css").exists());
        assert!(out.join("good.css").exists());
        assert!(out.join("good.min.css").exists());
    }
}
