use crate::error::{Result, StitchError};
use crate::fs_utils::{include_base_dir, read_file_contents, resolve_include_path};
use crate::pattern::{Directive, DirectivePattern};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Default cap on the inclusion chain length
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default cap on substitutions performed within a single text
pub const DEFAULT_MAX_REPLACEMENTS: usize = 100_000;

/// Configuration for include expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandConfig {
    /// Re-indent multi-line includes with the text preceding the directive
    pub indent: bool,
    /// Maximum nesting of includes below the root text (`None` for unbounded)
    ///
    /// The root itself is level 0, whether it came from a file or not.
    pub max_depth: Option<usize>,
    /// Maximum substitutions within one text before giving up (`None` for unbounded)
    pub max_replacements: Option<usize>,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            indent: true,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            max_replacements: Some(DEFAULT_MAX_REPLACEMENTS),
        }
    }
}

/// A directive that pointed back into its own inclusion chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircularInclusion {
    /// The file that was already being expanded
    pub path: PathBuf,
    /// The file containing the offending directive
    pub parent: PathBuf,
}

/// Result of a full expansion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Text with every reachable directive replaced
    pub text: String,
    /// Files read during expansion, in the order they were opened
    pub includes: Vec<PathBuf>,
    /// Cycles that were broken by substituting empty content
    pub cycles: Vec<CircularInclusion>,
}

/// Recursive include expander
#[derive(Debug, Clone, Copy)]
pub struct Expander<'a> {
    pattern: &'a DirectivePattern,
    config: &'a ExpandConfig,
}

impl<'a> Expander<'a> {
    #[must_use]
    pub fn new(pattern: &'a DirectivePattern, config: &'a ExpandConfig) -> Self {
        Self { pattern, config }
    }

    /// Expands every directive in `text` until none remain
    ///
    /// Paths in `text` resolve against `base_dir`. `chain` holds the canonical
    /// paths of the files currently being expanded, root first; it is empty
    /// when `text` doesn't come from a file. `text` is nesting level 0 either
    /// way, so the depth limit doesn't depend on `chain`.
    ///
    /// # Errors
    ///
    /// - `StitchError::FileNotFound` or `StitchError::ReadFile` for an include
    ///   that can't be read. Nothing partial is returned.
    /// - `StitchError::DepthExceeded` or `StitchError::ReplacementLimit` when a
    ///   configured limit is hit.
    pub fn expand(&self, text: &str, base_dir: &Path, chain: &[PathBuf]) -> Result<Expansion> {
        let mut report = Expansion::default();
        let text = self.expand_text(text.to_string(), base_dir, chain, 0, &mut report)?;
        Ok(Expansion { text, ..report })
    }

    /// Replaces directives one at a time until a scan finds none
    fn expand_text(
        &self,
        mut text: String,
        base_dir: &Path,
        chain: &[PathBuf],
        level: usize,
        report: &mut Expansion,
    ) -> Result<String> {
        let mut replacements = 0usize;
        while let Some(next) = self.expand_one(&text, base_dir, chain, level, report)? {
            replacements += 1;
            if let Some(limit) = self.config.max_replacements
                && replacements > limit
            {
                return Err(StitchError::ReplacementLimit { limit });
            }
            text = next;
        }
        Ok(text)
    }

    /// Replaces the leftmost directive in `text`, or returns `None` if there is none
    fn expand_one(
        &self,
        text: &str,
        base_dir: &Path,
        chain: &[PathBuf],
        level: usize,
        report: &mut Expansion,
    ) -> Result<Option<String>> {
        let Some(directive) = self.pattern.find(text) else {
            return Ok(None);
        };
        trace!(path = %directive.path, start = directive.span.start, "found directive");

        let content = self.include(text, &directive, base_dir, chain, level, report)?;

        let mut expanded = String::with_capacity(text.len() - directive.span.len() + content.len());
        expanded.push_str(&text[..directive.span.start]);
        expanded.push_str(&content);
        expanded.push_str(&text[directive.span.end..]);
        Ok(Some(expanded))
    }

    /// Produces the fully expanded replacement for one directive
    fn include(
        &self,
        text: &str,
        directive: &Directive,
        base_dir: &Path,
        chain: &[PathBuf],
        level: usize,
        report: &mut Expansion,
    ) -> Result<String> {
        let file_path = resolve_include_path(&directive.path, base_dir)?;

        match chain.last() {
            Some(parent) if chain.contains(&file_path) => {
                warn!(
                    "circular inclusion of {} from {}; substituting empty content",
                    file_path.display(),
                    parent.display()
                );
                report.cycles.push(CircularInclusion {
                    path: file_path,
                    parent: parent.clone(),
                });
                Ok(String::new())
            }
            _ => {
                if let Some(depth) = self.config.max_depth
                    && level >= depth
                {
                    return Err(StitchError::DepthExceeded {
                        path: file_path,
                        depth,
                    });
                }

                debug!(path = %file_path.display(), depth = level + 1, "including file");
                let raw = read_file_contents(&file_path)?;
                report.includes.push(file_path.clone());

                let raw = if self.config.indent {
                    indent_lines(&raw, indentation_prefix(text, directive.span.start))
                } else {
                    raw
                };

                let next_base = include_base_dir(&file_path);
                let mut next_chain = chain.to_vec();
                next_chain.push(file_path);
                self.expand_text(raw, &next_base, &next_chain, level + 1, report)
            }
        }
    }
}

/// Text between the start of the line and `offset`
#[must_use]
pub fn indentation_prefix(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    &text[line_start..offset]
}

/// Prefixes every line after the first with `prefix`
///
/// The first line continues at the directive's column. A newline that ends the
/// content doesn't open a new prefixed line.
#[must_use]
pub fn indent_lines(content: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len() + prefix.len() * content.lines().count());
    for (i, line) in content.split_inclusive('\n').enumerate() {
        if i > 0 {
            out.push_str(prefix);
        }
        out.push_str(line);
    }
    out
}

/// Expands a root file, resolving its includes against its own directory
///
/// The root is placed at the head of the inclusion chain, so a file that
/// includes the root back is reported as a cycle at that file.
///
/// # Errors
///
/// `StitchError::FileNotFound` if the root is missing, plus anything
/// [`Expander::expand`] returns.
pub fn expand_file(
    path: &Path,
    pattern: &DirectivePattern,
    config: &ExpandConfig,
) -> Result<Expansion> {
    let root = path
        .canonicalize()
        .map_err(|_| StitchError::FileNotFound {
            path: path.to_path_buf(),
        })?;
    let text = read_file_contents(&root)?;
    let base_dir = include_base_dir(&root);
    Expander::new(pattern, config).expand(&text, &base_dir, &[root])
}

/// Expands text that has no backing file, such as stdin
///
/// # Errors
///
/// Anything [`Expander::expand`] returns.
pub fn expand_str(
    text: &str,
    pattern: &DirectivePattern,
    base_dir: &Path,
    config: &ExpandConfig,
) -> Result<Expansion> {
    Expander::new(pattern, config).expand(text, base_dir, &[])
}
