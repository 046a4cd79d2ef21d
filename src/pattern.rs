use crate::error::Result;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;

/// Characters allowed in a captured include path.
///
/// Whitespace and newlines are excluded so a directive never spans lines and
/// the text before it on its line stays measurable as indentation.
pub const PATH_CHARS: &str = r"[\w.,/]+";

const PATH_GROUP: &str = "path";

/// Compiled include directive matcher: `open`, a captured path, `close`
#[derive(Debug, Clone)]
pub struct DirectivePattern {
    regex: Regex,
}

/// A directive located in a block of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    /// Byte range of the whole directive, delimiters included
    pub span: Range<usize>,
    /// The captured include path, as written
    pub path: String,
    /// Byte range of the captured path
    pub path_span: Range<usize>,
}

impl DirectivePattern {
    /// Builds a matcher from opening and closing regex fragments
    ///
    /// Each fragment is wrapped in its own non-capturing group, so an
    /// alternation like `#include |@include ` stays local to that fragment.
    /// The path is captured in a named group, so groups inside `open` or
    /// `close` don't affect which text is taken as the path.
    ///
    /// # Errors
    ///
    /// Returns `StitchError::Regex` if the fragments don't form a valid regex,
    /// including when either fragment already defines a group named `path`.
    pub fn new(open: &str, close: &str) -> Result<Self> {
        let regex = Regex::new(&format!(
            "(?:{open})(?P<{PATH_GROUP}>{PATH_CHARS})(?:{close})"
        ))?;
        Ok(Self { regex })
    }

    /// Leftmost directive starting at or after byte `offset`
    ///
    /// Matches that don't take part in the path group (a fragment that closes
    /// its own wrapper, like `a)|(b`) are skipped rather than ending the search.
    #[must_use]
    pub fn find_at(&self, text: &str, mut offset: usize) -> Option<Directive> {
        while offset <= text.len() {
            let captures = self.regex.captures_at(text, offset)?;
            let full = captures.get(0)?;
            if let Some(path) = captures.name(PATH_GROUP) {
                return Some(Directive {
                    span: full.range(),
                    path: path.as_str().to_string(),
                    path_span: path.range(),
                });
            }
            offset = if full.end() > full.start() {
                full.end()
            } else {
                next_char_boundary(text, full.start())
            };
        }
        None
    }

    /// Leftmost directive in `text`
    #[must_use]
    pub fn find(&self, text: &str) -> Option<Directive> {
        self.find_at(text, 0)
    }

    /// All non-overlapping directives in `text`, in order
    #[must_use]
    pub fn find_all(&self, text: &str) -> Vec<Directive> {
        let mut directives = Vec::new();
        let mut offset = 0;
        while offset <= text.len() {
            let Some(directive) = self.find_at(text, offset) else {
                break;
            };
            // The path class is non-empty, so every match advances
            offset = directive.span.end;
            directives.push(directive);
        }
        directives
    }

    /// Source of the combined regex, for diagnostics
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

fn next_char_boundary(text: &str, index: usize) -> usize {
    text[index..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| index + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StitchError;

    fn hash_include() -> DirectivePattern {
        DirectivePattern::new(r"#include\( *", r" *\)").unwrap()
    }

    #[test]
    fn test_find_basic() {
        let pattern = hash_include();
        let text = "A #include(B.txt) C";
        let directive = pattern.find(text).unwrap();
        assert_eq!(directive.path, "B.txt");
        assert_eq!(directive.span, 2..17);
        assert_eq!(&text[directive.span.clone()], "#include(B.txt)");
        assert_eq!(&text[directive.path_span.clone()], "B.txt");
    }

    #[test]
    fn test_find_leftmost() {
        let pattern = hash_include();
        let text = "#include( second.txt ) and #include(third.txt)";
        let directive = pattern.find(text).unwrap();
        assert_eq!(directive.path, "second.txt");
        assert_eq!(directive.span.start, 0);
    }

    #[test]
    fn test_find_at_offset() {
        let pattern = hash_include();
        let text = "#include(a.txt)#include(b.txt)";
        let directive = pattern.find_at(text, 1).unwrap();
        assert_eq!(directive.path, "b.txt");
        assert_eq!(directive.span.start, 15);
    }

    #[test]
    fn test_path_characters() {
        let pattern = hash_include();
        let directive = pattern.find("#include(dir/sub_1/a,b.v2.txt)").unwrap();
        assert_eq!(directive.path, "dir/sub_1/a,b.v2.txt");

        // Whitespace inside the path breaks the directive
        assert!(pattern.find("#include(my file.txt)").is_none());
        assert!(pattern.find("#include(a\nb.txt)").is_none());
    }

    #[test]
    fn test_empty_path_is_not_a_directive() {
        let pattern = hash_include();
        assert!(pattern.find("#include()").is_none());
    }

    #[test]
    fn test_html_comment_delimiters() {
        let pattern = DirectivePattern::new(r"<!-- *include\(", r"\) *-->").unwrap();
        let text = "<body>\n  <!-- include(parts/nav.html) -->\n</body>";
        let directive = pattern.find(text).unwrap();
        assert_eq!(directive.path, "parts/nav.html");
        assert_eq!(&text[directive.span], "<!-- include(parts/nav.html) -->");
    }

    #[test]
    fn test_groups_in_delimiters_do_not_shift_capture() {
        let pattern = DirectivePattern::new(r"(#|//)\s*(include|import)\s+", r";?").unwrap();
        let directive = pattern.find("// import lib/util.js;").unwrap();
        assert_eq!(directive.path, "lib/util.js");
    }

    #[test]
    fn test_alternation_in_delimiters() {
        let pattern = DirectivePattern::new(r"#include |@include ", r";").unwrap();
        let text = "@include a.txt; then #include b.txt;";
        let directives = pattern.find_all(text);
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].span, 0..15);
        assert_eq!(directives[0].path, "a.txt");
        assert_eq!(&text[directives[1].span.clone()], "#include b.txt;");
        assert_eq!(directives[1].path, "b.txt");

        // Alternation in the closing fragment binds to that fragment only
        let pattern = DirectivePattern::new(r"<<", r">>|\]\]").unwrap();
        let directive = pattern.find("x <<a.txt]] y").unwrap();
        assert_eq!(directive.path, "a.txt");
        assert!(pattern.find("a.txt]]").is_none());
    }

    #[test]
    fn test_matches_without_path_are_skipped() {
        // `a)|(b` escapes its wrapper, so a bare `a` matches with no path
        let pattern = DirectivePattern::new(r"a)|(b:", r";").unwrap();
        let text = "a a b:x.txt;";
        let directive = pattern.find(text).unwrap();
        assert_eq!(directive.path, "x.txt");
        assert_eq!(&text[directive.span], "b:x.txt;");

        assert!(pattern.find("a a a").is_none());
        assert_eq!(pattern.find_all("a b:one; a b:two;").len(), 2);
    }

    #[test]
    fn test_find_all() {
        let pattern = hash_include();
        let text = "#include(a.txt)\nx #include(b.txt)\n#include(a.txt)";
        let paths: Vec<_> = pattern
            .find_all(text)
            .into_iter()
            .map(|d| d.path)
            .collect();
        assert_eq!(paths, vec!["a.txt", "b.txt", "a.txt"]);

        assert!(pattern.find_all("no directives").is_empty());
        assert!(pattern.find_all("").is_empty());
    }

    #[test]
    fn test_invalid_fragments() {
        let result = DirectivePattern::new("*include", "");
        assert!(matches!(result, Err(StitchError::Regex(_))));

        let result = DirectivePattern::new("(?P<path>x)", "y");
        assert!(matches!(result, Err(StitchError::Regex(_))));
    }
}
