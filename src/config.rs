//! The path table: one validated entry per asset category, mapping a source
//! selector and a watch selector to an output directory under the build root.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::error::ConfigError;

/// One class of static file with its own transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Markup,
    Styles,
    Scripts,
    Images,
    Fonts,
    Video,
}

impl AssetKind {
    /// Every category, in table order.
    pub const ALL: [AssetKind; 6] = [
        AssetKind::Markup,
        AssetKind::Styles,
        AssetKind::Scripts,
        AssetKind::Images,
        AssetKind::Fonts,
        AssetKind::Video,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AssetKind::Markup => "markup",
            AssetKind::Styles => "styles",
            AssetKind::Scripts => "scripts",
            AssetKind::Images => "images",
            AssetKind::Fonts => "fonts",
            AssetKind::Video => "video",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Selectors and output directory for a single asset category.
///
/// `select` and `watch` are glob patterns relative to `base`. `exts` is an
/// extension allowlist applied on top of the globs; an empty list admits any
/// extension.
#[derive(Debug, Clone)]
pub struct PathEntry {
    pub base: Utf8PathBuf,
    pub select: String,
    pub watch: String,
    pub exts: &'static [&'static str],
    pub out: Utf8PathBuf,
}

impl PathEntry {
    pub(crate) fn matches_ext(&self, path: &Utf8Path) -> bool {
        if self.exts.is_empty() {
            return true;
        }
        path.extension().is_some_and(|ext| self.exts.contains(&ext))
    }
}

/// Immutable path table, constructed and validated once at startup and passed
/// by reference to every component.
#[derive(Debug, Clone)]
pub struct Paths {
    root: Utf8PathBuf,
    cache: Utf8PathBuf,
    entries: [PathEntry; 6],
}

impl Paths {
    /// Build the default layout rooted at `src` and `dist`.
    pub fn new(src: impl AsRef<Utf8Path>, dist: impl AsRef<Utf8Path>) -> Result<Self, ConfigError> {
        let src = src.as_ref();
        let dist = dist.as_ref();
        Self::from_entries(dist.to_owned(), default_entries(src, dist))
    }

    /// Build a table from custom entries, given in [`AssetKind::ALL`] order.
    pub fn from_entries(
        root: Utf8PathBuf,
        entries: [PathEntry; 6],
    ) -> Result<Self, ConfigError> {
        let root_norm = normalize_path(&root);

        for (kind, entry) in AssetKind::ALL.into_iter().zip(&entries) {
            if entry.select.is_empty() {
                return Err(ConfigError::EmptySelector(kind));
            }
            if entry.watch.is_empty() {
                return Err(ConfigError::EmptyWatchSelector(kind));
            }

            let out = normalize_path(&entry.out);
            if !out.starts_with(&root_norm) {
                return Err(ConfigError::OutputOutsideRoot {
                    kind,
                    out: entry.out.clone(),
                    root: root.clone(),
                });
            }
        }

        Ok(Self {
            root,
            cache: Utf8PathBuf::from(".cache/img"),
            entries,
        })
    }

    /// Override the image optimization cache directory.
    pub fn with_cache(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.cache = dir.as_ref().to_owned();
        self
    }

    /// The build root; `clean` removes exactly this tree.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(crate) fn cache(&self) -> &Utf8Path {
        &self.cache
    }

    /// Total lookup: every category has an entry.
    pub fn entry(&self, kind: AssetKind) -> &PathEntry {
        &self.entries[kind as usize]
    }
}

fn default_entries(src: &Utf8Path, dist: &Utf8Path) -> [PathEntry; 6] {
    let assets = src.join("assets");
    [
        PathEntry {
            base: src.to_owned(),
            select: "*.html".into(),
            watch: "**/*.html".into(),
            exts: &[],
            out: dist.to_owned(),
        },
        PathEntry {
            base: assets.join("scss"),
            // Underscore partials are reachable through @use, not compiled
            // directly.
            select: "[!_]*.scss".into(),
            watch: "**/*.scss".into(),
            exts: &[],
            out: dist.join("assets/css"),
        },
        PathEntry {
            base: assets.join("js"),
            select: "*.js".into(),
            watch: "**/*.js".into(),
            exts: &[],
            out: dist.join("assets/js"),
        },
        PathEntry {
            base: assets.join("images"),
            select: "**/*".into(),
            watch: "**/*".into(),
            exts: &["jpg", "jpeg", "png", "svg", "ico", "webmanifest", "webp"],
            out: dist.join("assets/images"),
        },
        PathEntry {
            base: assets.join("fonts"),
            select: "**/*".into(),
            watch: "**/*".into(),
            exts: &["woff", "woff2"],
            out: dist.join("assets/fonts"),
        },
        PathEntry {
            base: assets.join("video"),
            select: "*".into(),
            watch: "*".into(),
            exts: &["mp4", "webm"],
            out: dist.join("assets/video"),
        },
    ]
}

/// Normalize a path, removing things like `.` and `..`.
///
/// CAUTION: This does not resolve symlinks (unlike [`std::fs::canonicalize`]),
/// which is what we want here: the table is validated before anything exists
/// on disk.
pub(crate) fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut components = path.components().peekable();
    let mut ret = if let Some(c @ Utf8Component::Prefix(..)) = components.peek().cloned() {
        components.next();
        Utf8PathBuf::from(c.as_str())
    } else {
        Utf8PathBuf::new()
    };

    for component in components {
        match component {
            Utf8Component::Prefix(..) => unreachable!(),
            Utf8Component::RootDir => {
                ret.push(Utf8Component::RootDir);
            }
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if ret.ends_with(Utf8Component::ParentDir) {
                    ret.push(Utf8Component::ParentDir);
                } else {
                    let popped = ret.pop();
                    if !popped && !ret.has_root() {
                        ret.push(Utf8Component::ParentDir);
                    }
                }
            }
            Utf8Component::Normal(c) => {
                ret.push(c);
            }
        }
    }

    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_total() {
        let paths = Paths::new("src", "dist").expect("default layout is valid");
        for kind in AssetKind::ALL {
            let entry = paths.entry(kind);
            assert!(!entry.select.is_empty());
            assert!(!entry.watch.is_empty());
        }
    }

    #[test]
    fn rejects_empty_selector() {
        let mut entries = default_entries(Utf8Path::new("src"), Utf8Path::new("dist"));
        entries[2].select = String::new();

        let err = Paths::from_entries("dist".into(), entries).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySelector(AssetKind::Scripts)));
    }

    #[test]
    fn rejects_output_escaping_build_root() {
        let mut entries = default_entries(Utf8Path::new("src"), Utf8Path::new("dist"));
        entries[4].out = "dist/../elsewhere/fonts".into();

        let err = Paths::from_entries("dist".into(), entries).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutputOutsideRoot {
                kind: AssetKind::Fonts,
                ..
            }
        ));
    }

    #[test]
    fn rejects_output_above_the_working_directory() {
        let mut entries = default_entries(Utf8Path::new("src"), Utf8Path::new("dist"));
        entries[1].out = "../dist/evil".into();

        let err = Paths::from_entries("dist".into(), entries).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutputOutsideRoot {
                kind: AssetKind::Styles,
                ..
            }
        ));
    }

    #[test]
    fn extension_filter() {
        let paths = Paths::new("src", "dist").unwrap();
        let images = paths.entry(AssetKind::Images);

        assert!(images.matches_ext(Utf8Path::new("a/logo.png")));
        assert!(images.matches_ext(Utf8Path::new("site.webmanifest")));
        assert!(!images.matches_ext(Utf8Path::new("a/logo.png.tmp")));
        assert!(!images.matches_ext(Utf8Path::new("noext")));

        let markup = paths.entry(AssetKind::Markup);
        assert!(markup.matches_ext(Utf8Path::new("index.html")));
    }

    #[test]
    fn normalize_removes_dots() {
        assert_eq!(
            normalize_path(Utf8Path::new("dist/./assets/../assets/css")),
            Utf8Path::new("dist/assets/css")
        );
        assert_eq!(
            normalize_path(Utf8Path::new("dist/../elsewhere")),
            Utf8Path::new("elsewhere")
        );
    }

    #[test]
    fn normalize_keeps_leading_parent_dirs() {
        assert_eq!(
            normalize_path(Utf8Path::new("../dist/evil")),
            Utf8Path::new("../dist/evil")
        );
        assert_eq!(
            normalize_path(Utf8Path::new("../../a")),
            Utf8Path::new("../../a")
        );
    }
}
