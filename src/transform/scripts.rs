//! Script assembly: `//= path` directives are resolved by textual inclusion
//! relative to the including file, then each assembled script is written as
//! `name.js` plus a comment-stripped `name.min.js` derived from it.

use std::fs;

use anyhow::bail;
use camino::{Utf8Path, Utf8PathBuf};

use crate::error::TaskError;
use crate::report::{self, FileFailure};
use crate::task::Outcome;

pub(crate) fn process(
    files: &[Utf8PathBuf],
    base: &Utf8Path,
    out: &Utf8Path,
) -> Result<Outcome, TaskError> {
    let mut outcome = Outcome::default();

    for file in files {
        let mut stack = Vec::new();
        let assembled = match resolve_includes(file, &mut stack) {
            Ok(text) => text,
            Err(err) => {
                let failure = FileFailure::new("JS Error", file.clone(), err);
                report::file_failure(&failure);
                outcome.skipped.push(failure);
                continue;
            }
        };

        let rel = file.strip_prefix(base).unwrap_or(file);
        let dst = out.join(rel);

        if let Some(dir) = dst.parent() {
            fs::create_dir_all(dir)?;
        }

        fs::write(&dst, &assembled)?;
        let dst_min = dst.with_extension("min.js");
        fs::write(&dst_min, minify(&assembled))?;

        outcome.written.push(dst);
        outcome.written.push(dst_min);
    }

    Ok(outcome)
}

/// Splice `//= path` directives into the source, recursively. Included files
/// are resolved relative to the file containing the directive. A missing
/// include or a cycle fails the whole file.
fn resolve_includes(path: &Utf8Path, stack: &mut Vec<Utf8PathBuf>) -> anyhow::Result<String> {
    if stack.iter().any(|seen| seen == path) {
        bail!("include cycle through '{path}'");
    }
    stack.push(path.to_owned());

    let text = fs::read_to_string(path)?;
    let dir = path.parent().unwrap_or(Utf8Path::new(""));
    let mut output = String::with_capacity(text.len());

    for line in text.lines() {
        match line.trim_start().strip_prefix("//=") {
            Some(target) => {
                let target = target.trim();
                if target.is_empty() {
                    bail!("empty include directive in '{path}'");
                }

                let resolved = resolve_includes(&dir.join(target), stack)?;
                output.push_str(&resolved);
                if !resolved.ends_with('\n') {
                    output.push('\n');
                }
            }
            None => {
                output.push_str(line);
                output.push('\n');
            }
        }
    }

    stack.pop();
    Ok(output)
}

/// Conservative minification: comments go, indentation and blank lines go,
/// statement line breaks stay so semicolon insertion is never disturbed.
pub(crate) fn minify(source: &str) -> String {
    let stripped = strip_comments(source);

    stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove `//` and `/* */` comments while leaving string and template
/// literals intact. Regex literals are not tracked, so a `//` inside one
/// would be taken for a comment.
fn strip_comments(source: &str) -> String {
    let mut output = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            output.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    output.push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => {
                quote = Some(c);
                output.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for next in chars.by_ref() {
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                }
                _ => output.push(c),
            },
            _ => output.push(c),
        }
    }

    output
}
