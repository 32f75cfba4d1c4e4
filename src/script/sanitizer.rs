//! Strip narrative and code-fence decoration from oracle replies

const FENCE: &str = "```";

/// Info strings models put after an opening fence
const LANGUAGE_TAGS: &[&str] = &[
    "python", "py", "python3", "javascript", "js", "typescript", "ts", "json", "text", "txt",
    "plain", "plaintext", "code", "bash", "sh", "shell",
];

/// Extract the executable snippet from raw oracle text.
///
/// When the text contains fenced blocks, their bodies are joined in order and
/// everything outside them is dropped; the language tag line after an opening
/// fence is removed. An opening fence with no closing fence takes the rest of
/// the text. Without fences the trimmed text is returned as-is.
///
/// Idempotent: cleaned output contains no fences, so a second pass only trims.
pub fn sanitize_code(raw: &str) -> String {
    if !raw.contains(FENCE) {
        return raw.trim().to_string();
    }

    let mut blocks: Vec<&str> = Vec::new();
    let mut rest = raw;

    while let Some(start) = rest.find(FENCE) {
        let after = &rest[start + FENCE.len()..];
        let (block, remainder) = match after.find(FENCE) {
            Some(end) => (&after[..end], Some(&after[end + FENCE.len()..])),
            None => (after, None),
        };

        let body = strip_info_line(block).trim();
        if !body.is_empty() {
            blocks.push(body);
        }

        match remainder {
            Some(r) => rest = r,
            None => break,
        }
    }

    blocks.join("\n")
}

/// Drop the first line of a fenced block if it is empty or a known language tag.
///
/// Any other first line is code: a snippet may start with a bare name.
fn strip_info_line(block: &str) -> &str {
    let Some(newline) = block.find('\n') else {
        return block;
    };
    let info = block[..newline].trim();
    let is_tag = info.is_empty()
        || LANGUAGE_TAGS
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(info));
    if is_tag { &block[newline + 1..] } else { block }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_code_is_trimmed_only() {
        assert_eq!(sanitize_code("  navigate(\"https://a.com\")\n"), "navigate(\"https://a.com\")");
    }

    #[test]
    fn narrative_around_a_fence_is_dropped() {
        let raw = "Sure! Here is the code:\n```python\nx = 1\nclick(x)\n```\nThis clicks.";
        assert_eq!(sanitize_code(raw), "x = 1\nclick(x)");
    }

    #[test]
    fn multiple_blocks_are_joined_in_order() {
        let raw = "First:\n```js\na = 1\n```\nthen\n```\nb = 2\n```";
        assert_eq!(sanitize_code(raw), "a = 1\nb = 2");
    }

    #[test]
    fn unterminated_fence_takes_the_rest() {
        assert_eq!(sanitize_code("```python\ndone({})\n"), "done({})");
    }

    #[test]
    fn first_line_with_code_is_kept() {
        assert_eq!(sanitize_code("```x = 1\ny = 2\n```"), "x = 1\ny = 2");
        assert_eq!(sanitize_code("```done(1)```"), "done(1)");
    }

    #[test]
    fn bare_name_on_the_fence_line_is_code() {
        assert_eq!(sanitize_code("```products\nx = 1```"), "products\nx = 1");
        assert_eq!(sanitize_code("```Python\nx = 1\n```"), "x = 1");
        assert_eq!(sanitize_code("```\nx = 1\n```"), "x = 1");
    }

    #[test]
    fn sanitizing_is_idempotent() {
        for raw in [
            "```python\nx = 1\n```",
            "Text only, no code",
            "```\n\n```",
            "a\n```js\nevaluate('document.title')\n```\nb ```c```",
        ] {
            let once = sanitize_code(raw);
            assert_eq!(sanitize_code(&once), once, "{raw:?}");
        }
    }
}
