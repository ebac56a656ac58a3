//! SVG extraction from free-form LLM completions.
//!
//! A completion that is supposed to contain SVG markup either yields the SVG
//! substring or fails loudly; non-SVG text is never passed through as if it
//! were valid output.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use canvaschat_types::safe_truncate;

const PREVIEW_CHARS: usize = 200;

/// The completion succeeded but contained no parseable SVG.
#[derive(Debug, Error)]
#[error("No valid SVG code found in response")]
pub struct SvgExtractionError {
    pub content_length: usize,
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?si)```(?:svg|xml)?\s*\n?(.*?)```").expect("fence pattern is valid")
    })
}

fn find_ascii_ci(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

fn rfind_ascii_ci(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window.eq_ignore_ascii_case(needle))
}

/// Extract SVG markup from a raw completion.
///
/// Priority order: a fenced code block (with or without an `svg`/`xml`
/// language tag) wins; otherwise the span from the first `<svg` to the
/// *last* `</svg>` is taken, so sibling root elements are captured together.
/// A self-closing or unclosed `<svg` with no matching `</svg>` fails.
pub fn extract_svg(content: &str) -> Result<String, SvgExtractionError> {
    if let Some(captures) = fence_pattern().captures(content) {
        if let Some(block) = captures.get(1) {
            let block = block.as_str().trim();
            // An empty fence falls through to the tag scan
            if !block.is_empty() {
                return Ok(block.to_string());
            }
        }
    }

    let bytes = content.as_bytes();
    if let Some(start) = find_ascii_ci(bytes, b"<svg") {
        if let Some(end) = rfind_ascii_ci(bytes, b"</svg>") {
            if end > start {
                return Ok(content[start..end + "</svg>".len()].trim().to_string());
            }
        }
    }

    let content_length = content.chars().count();
    log::warn!(
        "no SVG found in completion ({} chars): {}",
        content_length,
        safe_truncate(content, PREVIEW_CHARS)
    );
    Err(SvgExtractionError { content_length })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fenced_block_with_language_tag() {
        let content = "```svg\n<svg><circle/></svg>\n```";
        assert_eq!(extract_svg(content).unwrap(), "<svg><circle/></svg>");
    }

    #[test]
    fn fenced_block_without_language_tag() {
        let content = "Here you go:\n```\n<svg viewBox=\"0 0 10 10\"></svg>\n```\nEnjoy!";
        assert_eq!(
            extract_svg(content).unwrap(),
            "<svg viewBox=\"0 0 10 10\"></svg>"
        );
    }

    #[test]
    fn fenced_block_with_xml_tag() {
        let content = "```xml\n<svg><rect/></svg>\n```";
        assert_eq!(extract_svg(content).unwrap(), "<svg><rect/></svg>");
    }

    #[test]
    fn bare_svg_span_is_extracted() {
        let content = "Sure, here is the drawing: <svg><circle r=\"4\"/></svg> hope it helps";
        assert_eq!(extract_svg(content).unwrap(), "<svg><circle r=\"4\"/></svg>");
    }

    #[test]
    fn sibling_svg_roots_are_captured_together() {
        let content = "<svg><rect/></svg>\n<svg><circle/></svg>";
        assert_eq!(
            extract_svg(content).unwrap(),
            "<svg><rect/></svg>\n<svg><circle/></svg>"
        );
    }

    #[test]
    fn case_insensitive_tags() {
        let content = "<SVG><circle/></SVG>";
        assert_eq!(extract_svg(content).unwrap(), "<SVG><circle/></SVG>");
    }

    #[test]
    fn self_closing_root_without_closing_tag_fails() {
        let error = extract_svg("<svg width=\"1\"/>").unwrap_err();
        assert_eq!(error.content_length, "<svg width=\"1\"/>".chars().count());
    }

    #[test]
    fn plain_prose_fails() {
        let error = extract_svg("no markup here").unwrap_err();
        assert_eq!(error.content_length, 14);
        assert_eq!(error.to_string(), "No valid SVG code found in response");
    }

    #[test]
    fn closing_tag_before_opening_tag_fails() {
        assert!(extract_svg("</svg> then later <svg").is_err());
    }
}
