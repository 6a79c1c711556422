//! README post-processing

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// An inline code span, or a link/image head followed by its target
static LINK_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<code>`[^`\n]*`)|(?P<head>!?\[[^\]]*\]\()(?P<target>[^)\s]+)")
        .expect("markdown link pattern is a valid regex")
});

fn is_absolute(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://") || target.starts_with('#')
}

/// Opening or closing line of a fenced code block
fn is_fence(line: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let rest = line.trim_start_matches(' ');
    indent <= 3 && (rest.starts_with("```") || rest.starts_with("~~~"))
}

fn rewrite_line(line: &str, tooth: &str) -> String {
    LINK_TARGET
        .replace_all(line, |caps: &Captures<'_>| {
            if let Some(code) = caps.name("code") {
                return code.as_str().to_string();
            }
            let head = &caps["head"];
            let target = &caps["target"];
            if is_absolute(target) {
                format!("{head}{target}")
            } else {
                let relative = target.trim_start_matches("./").trim_start_matches('/');
                format!("{head}https://{tooth}/blob/HEAD/{relative}")
            }
        })
        .into_owned()
}

/// Point relative Markdown link and image targets at the repository
///
/// `docs/usage.md` in the README of `github.com/a/b` becomes
/// `https://github.com/a/b/blob/HEAD/docs/usage.md`. `http(s)://` URLs
/// and `#anchors` are left alone, as is anything inside code.
pub fn rewrite_relative_links(readme: &str, tooth: &str) -> String {
    let mut in_fence = false;

    readme
        .split_inclusive('\n')
        .map(|line| {
            if is_fence(line) {
                in_fence = !in_fence;
                line.to_string()
            } else if in_fence {
                line.to_string()
            } else {
                rewrite_line(line, tooth)
            }
        })
        .collect()
}
