// src/paths/globs.rs

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{escape, GlobBuilder, GlobMatcher as CompiledGlob};
use serde::Deserialize;

use crate::errors::{BuildError, Result};
use crate::paths::normalize::{absolutize, normalize_lexically, to_slash_string};

/// Leading marker that turns a pattern into an exclusion.
pub const NEGATION_MARKER: char = '!';

/// Glob patterns as declared by the user: a single pattern or an ordered list.
///
/// ```toml
/// glob = "**/*.js"
/// glob = ["**/*.js", "!**/*.spec.js"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GlobSpec {
    One(String),
    Many(Vec<String>),
}

impl GlobSpec {
    pub fn patterns(&self) -> &[String] {
        match self {
            GlobSpec::One(p) => std::slice::from_ref(p),
            GlobSpec::Many(list) => list,
        }
    }
}

impl From<&str> for GlobSpec {
    fn from(pattern: &str) -> Self {
        GlobSpec::One(pattern.to_string())
    }
}

impl From<String> for GlobSpec {
    fn from(pattern: String) -> Self {
        GlobSpec::One(pattern)
    }
}

impl From<Vec<String>> for GlobSpec {
    fn from(patterns: Vec<String>) -> Self {
        GlobSpec::Many(patterns)
    }
}

impl From<&[&str]> for GlobSpec {
    fn from(patterns: &[&str]) -> Self {
        GlobSpec::Many(patterns.iter().map(|p| p.to_string()).collect())
    }
}

/// A single pattern after it has been rooted at the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPattern {
    pub negated: bool,
    /// Rooted pattern without the negation marker, with forward slashes.
    pub pattern: String,
    /// What gets compiled: `pattern` with the input root's own components
    /// escaped.
    glob: String,
}

impl fmt::Display for ResolvedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "{NEGATION_MARKER}{}", self.pattern)
        } else {
            f.write_str(&self.pattern)
        }
    }
}

/// Ordered list of rooted patterns. Order is significant: a negation only
/// excludes what the patterns before it included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGlobs {
    patterns: Vec<ResolvedPattern>,
}

impl ResolvedGlobs {
    pub fn patterns(&self) -> &[ResolvedPattern] {
        &self.patterns
    }

    /// Patterns rendered back to strings, negations keeping their marker.
    pub fn to_strings(&self) -> Vec<String> {
        self.patterns.iter().map(ToString::to_string).collect()
    }
}

/// Root every pattern of `spec` at `input_root`, keeping order and negation.
///
/// Patterns that are already absolute are kept as they are.
pub fn resolve_globs(spec: &GlobSpec, input_root: &Path) -> Result<ResolvedGlobs> {
    let declared = spec.patterns();
    if declared.is_empty() {
        return Err(BuildError::config("glob list must contain at least one pattern"));
    }

    let mut patterns = Vec::with_capacity(declared.len());
    for raw in declared {
        let (negated, body) = match raw.strip_prefix(NEGATION_MARKER) {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };

        if body.trim().is_empty() {
            return Err(BuildError::config(format!(
                "glob pattern {raw:?} has nothing to match"
            )));
        }

        let (rooted, glob) = rooted_glob(input_root, body);
        patterns.push(ResolvedPattern {
            negated,
            pattern: to_slash_string(&rooted),
            glob,
        });
    }

    Ok(ResolvedGlobs { patterns })
}

/// Make a single pattern absolute against `base`, keeping a leading `!`.
///
/// Used for command-line patterns, which are relative to the working
/// directory rather than to the input root.
pub fn anchor_pattern(raw: &str, base: &Path) -> String {
    let (marker, body) = match raw.strip_prefix(NEGATION_MARKER) {
        Some(rest) => ("!", rest),
        None => ("", raw),
    };
    if Path::new(body).is_absolute() {
        return format!("{marker}{}", to_slash_string(&absolutize(Path::new(body), base)));
    }
    let (_, glob) = rooted_glob(base, body);
    format!("{marker}{glob}")
}

/// Join `body` onto `root` and render the glob to compile for it.
///
/// The leading components that come from `root` are escaped, so a directory
/// named `[id]` or `{a,b}` matches literally. Absolute bodies are user globs
/// and stay untouched.
fn rooted_glob(root: &Path, body: &str) -> (PathBuf, String) {
    let rooted = normalize_lexically(&root.join(body));
    if Path::new(body).is_absolute() {
        let text = to_slash_string(&rooted);
        return (rooted, text);
    }

    let root = normalize_lexically(root);
    let shared = root
        .components()
        .zip(rooted.components())
        .take_while(|(a, b)| a == b)
        .count();
    let literal: PathBuf = rooted.components().take(shared).collect();
    let rest: PathBuf = rooted.components().skip(shared).collect();

    let mut text = escape(&to_slash_string(&literal));
    if !rest.as_os_str().is_empty() {
        if !text.is_empty() && !text.ends_with('/') {
            text.push('/');
        }
        text.push_str(&to_slash_string(&rest));
    }
    (rooted, text)
}

/// Compiled form of [`ResolvedGlobs`] that answers "is this file in the set?".
#[derive(Clone)]
pub struct GlobMatcher {
    rules: Vec<(bool, CompiledGlob)>,
    source: ResolvedGlobs,
}

impl fmt::Debug for GlobMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobMatcher")
            .field("patterns", &self.source.to_strings())
            .finish_non_exhaustive()
    }
}

impl GlobMatcher {
    pub fn new(globs: &ResolvedGlobs) -> Result<Self> {
        let mut rules = Vec::with_capacity(globs.patterns.len());
        for pat in &globs.patterns {
            let glob = GlobBuilder::new(&pat.glob)
                .literal_separator(true)
                .build()
                .map_err(|e| BuildError::config(format!("invalid glob pattern {pat}: {e}")))?;
            rules.push((pat.negated, glob.compile_matcher()));
        }
        Ok(Self {
            rules,
            source: globs.clone(),
        })
    }

    pub fn globs(&self) -> &ResolvedGlobs {
        &self.source
    }

    /// Apply the patterns in declaration order to an absolute path.
    pub fn matches(&self, path: &Path) -> bool {
        let candidate = to_slash_string(&normalize_lexically(path));
        let mut included = false;
        for (negated, glob) in &self.rules {
            if glob.is_match(&candidate) {
                included = !negated;
            }
        }
        included
    }
}
