//! Per-category transforms. Each function takes the matched source files and
//! writes its results under the category's output directory, collecting
//! per-file failures instead of aborting on them.

pub(crate) mod copy;
pub(crate) mod images;
pub(crate) mod scripts;
pub(crate) mod styles;
