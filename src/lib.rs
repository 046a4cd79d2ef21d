//! # stitch
//!
//! A syntax-agnostic file includer. Directives are described at runtime by an
//! opening and a closing regex fragment around a file path, so the same tool
//! works for C-style `#include(...)`, HTML comments, or anything else.
//!
//! ## Features
//!
//! - Recursive expansion until no directive remains
//! - Paths resolve relative to the file that contains the directive
//! - Circular inclusions are cut with a warning instead of failing the run
//! - Multi-line includes are re-indented to the directive's column
//! - Depth and replacement limits guard against runaway expansion
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use std::path::Path;
//! use stitch::{DirectivePattern, ExpandConfig, expand_file};
//!
//! let pattern = DirectivePattern::new(r"#include\( *", r" *\)")?;
//! let expansion = expand_file(Path::new("index.txt"), &pattern, &ExpandConfig::default())?;
//! print!("{}", expansion.text);
//! # Ok::<(), stitch::StitchError>(())
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Expand to stdout
//! stitch index.txt '#include\( *' ' *\)'
//!
//! # HTML comment directives, written to a file
//! stitch page.html '<!-- *include\(' '\) *-->' -o out.html
//! ```

pub mod error;
pub mod expand;
pub mod fs_utils;
pub mod pattern;

// Re-export main types and functions for convenience
pub use error::{Result, StitchError};
pub use expand::{
    CircularInclusion, ExpandConfig, Expander, Expansion, expand_file, expand_str,
};
pub use pattern::{Directive, DirectivePattern};

/// Lists every directive in `text` without reading any file
#[must_use]
pub fn list_directives(text: &str, pattern: &DirectivePattern) -> Vec<Directive> {
    pattern.find_all(text)
}
