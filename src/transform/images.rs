//! Image optimization. Raster formats are re-encoded (PNG at maximum
//! compression, JPEG at bounded quality), SVG gets a structural whitespace
//! and comment strip, and everything else in the category is copied as-is.
//! The webp task additionally derives a lossless `.webp` sibling for every
//! raster input.
//!
//! Re-encoded bytes are cached by content hash, so a rebuild only pays for
//! images that actually changed.

use std::collections::HashSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::TaskError;
use crate::report::{self, FileFailure};
use crate::task::Outcome;

const JPEG_QUALITY: u8 = 80;

/// Per-file result: the written output path, or the reason it was skipped.
type PerFile = Result<Utf8PathBuf, FileFailure>;

/// 32 bytes blake3 content hash, used as the cache key for re-encoded
/// images.
#[derive(Clone, Copy)]
struct Hash32([u8; 32]);

impl Hash32 {
    fn hash_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        Ok(Hash32(
            blake3::Hasher::new()
                .update_mmap_rayon(path)?
                .finalize()
                .into(),
        ))
    }

    fn to_hex(self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut acc = vec![0u8; 64];

        for (i, &byte) in self.0.iter().enumerate() {
            acc[i * 2] = HEX[(byte >> 4) as usize];
            acc[i * 2 + 1] = HEX[(byte & 0xF) as usize];
        }

        String::from_utf8(acc).expect("hex output is always valid UTF-8")
    }
}

pub(crate) fn optimize(
    files: &[Utf8PathBuf],
    base: &Utf8Path,
    out: &Utf8Path,
    cache: &Utf8Path,
) -> Result<Outcome, TaskError> {
    let bar = progress_bar(files.len());

    let results: Vec<Result<PerFile, TaskError>> = files
        .par_iter()
        .map(|file| {
            let result = optimize_one(file, base, out, cache);
            bar.inc(1);
            result
        })
        .collect();

    bar.finish_and_clear();
    collect_outcome(results)
}

/// Produce a `.webp` copy for every raster input, written alongside the
/// optimized originals.
pub(crate) fn webp(
    files: &[Utf8PathBuf],
    base: &Utf8Path,
    out: &Utf8Path,
    cache: &Utf8Path,
) -> Result<Outcome, TaskError> {
    // `a.png` and `a.jpg` in one directory both map to `a.webp`; the first
    // source in sort order wins so the output does not depend on task
    // interleaving.
    let mut targets = HashSet::new();
    let mut rasters: Vec<&Utf8PathBuf> = Vec::new();
    for file in files.iter().filter(|file| is_raster(file)) {
        let rel = file.strip_prefix(base).unwrap_or(file).with_extension("webp");
        if targets.insert(rel.clone()) {
            rasters.push(file);
        } else {
            tracing::warn!(source = %file, target = %rel, "webp target collision, keeping the first source");
        }
    }

    let bar = progress_bar(rasters.len());

    let results: Vec<Result<PerFile, TaskError>> = rasters
        .par_iter()
        .map(|file| {
            let result = webp_one(file, base, out, cache);
            bar.inc(1);
            result
        })
        .collect();

    bar.finish_and_clear();
    collect_outcome(results)
}

fn collect_outcome(results: Vec<Result<PerFile, TaskError>>) -> Result<Outcome, TaskError> {
    let mut outcome = Outcome::default();

    for result in results {
        match result? {
            Ok(path) => outcome.written.push(path),
            Err(failure) => {
                report::file_failure(&failure);
                outcome.skipped.push(failure);
            }
        }
    }

    Ok(outcome)
}

fn progress_bar(len: usize) -> ProgressBar {
    ProgressBar::new(len as u64).with_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("invalid progress bar template")
            .progress_chars("#>-"),
    )
}

fn is_raster(path: &Utf8Path) -> bool {
    matches!(path.extension(), Some("png" | "jpg" | "jpeg"))
}

fn optimize_one(
    file: &Utf8Path,
    base: &Utf8Path,
    out: &Utf8Path,
    cache: &Utf8Path,
) -> Result<PerFile, TaskError> {
    let rel = file.strip_prefix(base).unwrap_or(file);
    let dst = out.join(rel);

    if let Some(dir) = dst.parent() {
        fs::create_dir_all(dir)?;
    }

    match file.extension() {
        Some("png" | "jpg" | "jpeg") => {
            let ext = file.extension().unwrap_or_default();
            match cached_recode(file, cache, ext, recode) {
                Ok(buffer) => fs::write(&dst, buffer)?,
                Err(err) => return Ok(Err(FileFailure::new("Image Error", file.to_owned(), err))),
            }
        }
        Some("svg") => match fs::read_to_string(file) {
            Ok(text) => fs::write(&dst, compact_svg(&text))?,
            Err(err) => return Ok(Err(FileFailure::new("SVG Error", file.to_owned(), err))),
        },
        // ico, webmanifest, webp and anything else the selector admits.
        _ => {
            fs::copy(file, &dst)?;
        }
    }

    Ok(Ok(dst))
}

fn webp_one(
    file: &Utf8Path,
    base: &Utf8Path,
    out: &Utf8Path,
    cache: &Utf8Path,
) -> Result<PerFile, TaskError> {
    let rel = file.strip_prefix(base).unwrap_or(file);
    let dst = out.join(rel).with_extension("webp");

    if let Some(dir) = dst.parent() {
        fs::create_dir_all(dir)?;
    }

    match cached_recode(file, cache, "webp", encode_webp) {
        Ok(buffer) => fs::write(&dst, buffer)?,
        Err(err) => return Ok(Err(FileFailure::new("Image Error", file.to_owned(), err))),
    }

    Ok(Ok(dst))
}

/// Run `encode` over the file, going through the content-hash cache. If the
/// input bytes were seen before, the cached result is returned without
/// decoding anything.
fn cached_recode(
    file: &Utf8Path,
    cache: &Utf8Path,
    ext: &str,
    encode: fn(&image::DynamicImage, &str) -> anyhow::Result<Vec<u8>>,
) -> anyhow::Result<Vec<u8>> {
    let hash = Hash32::hash_file(file)?;
    let cached = cache.join(hash.to_hex()).with_extension(ext);

    if cached.exists() {
        return Ok(fs::read(cached)?);
    }

    let buffer = fs::read(file)?;
    let img = image::load_from_memory(&buffer)?;
    let encoded = encode(&img, ext)?;

    fs::create_dir_all(cache)?;
    fs::write(&cached, &encoded)?;

    Ok(encoded)
}

fn recode(img: &image::DynamicImage, ext: &str) -> anyhow::Result<Vec<u8>> {
    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};

    let mut out = Vec::new();

    match ext {
        "png" => {
            let encoder =
                PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
            img.write_with_encoder(encoder)?;
        }
        _ => {
            let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            img.write_with_encoder(encoder)?;
        }
    }

    Ok(out)
}

fn encode_webp(img: &image::DynamicImage, _ext: &str) -> anyhow::Result<Vec<u8>> {
    use image::codecs::webp::WebPEncoder;

    let mut out = Vec::new();
    let encoder = WebPEncoder::new_lossless(&mut out);
    encoder.encode(
        &img.to_rgba8(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )?;

    Ok(out)
}

/// Drop XML comments and the whitespace runs between tags. Attribute quoting
/// is left untouched; this never changes the document structure.
fn compact_svg(text: &str) -> String {
    let mut without_comments = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<!--") {
        without_comments.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => {
                rest = "";
            }
        }
    }
    without_comments.push_str(rest);

    let mut output = String::with_capacity(without_comments.len());
    let mut whitespace = false;
    let mut after_tag = false;

    for c in without_comments.chars() {
        if c.is_whitespace() {
            whitespace = true;
            continue;
        }

        if whitespace {
            if !(after_tag && c == '<') && !output.is_empty() {
                output.push(' ');
            }
            whitespace = false;
        }

        output.push(c);
        after_tag = c == '>';
    }

    output
}
