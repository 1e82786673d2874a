/*!
 * Markdown handling shared by the Marp and Slidev backends: front matter,
 * slide separators, and HTML comments carrying notes or directives.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::DeckFormat;

// @const: HTML comment, non-greedy across lines
static COMMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--(.*?)-->").expect("valid regex"));

// @const: `video: path` directive inside a comment
static VIDEO_DIRECTIVE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*video\s*:\s*(\S.*?)\s*$").expect("valid regex"));

// @const: Marp local and global directives
static MARP_DIRECTIVE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^_?(theme|paginate|header|footer|class|backgroundColor|backgroundImage|backgroundPosition|backgroundRepeat|backgroundSize|color|size|style|headingDivider|math|title|description|author|image|keywords|url|marp|lang)\s*:",
    )
    .expect("valid regex")
});

// @const: Top-level YAML key
static YAML_KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][\w-]*)\s*:(.*)$").expect("valid regex"));

/// Keys that mark a Slidev headmatter
const SLIDEV_KEYS: &[&str] = &[
    "theme",
    "layout",
    "transition",
    "highlighter",
    "drawings",
    "mdc",
    "colorSchema",
    "routerMode",
    "aspectRatio",
    "canvasWidth",
];

/// A document split into optional front matter and the remaining content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDocument {
    /// YAML between the leading `---` fences, without the fences
    pub front_matter: Option<String>,
    /// Everything after the front matter
    pub content: String,
}

/// Separate a leading `---` fenced YAML block from the rest of the text
pub fn split_front_matter(text: &str) -> SplitDocument {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text.lines().collect();

    if lines.first().map(|l| l.trim_end()) == Some("---") {
        if let Some(end) = lines.iter().skip(1).position(|l| l.trim_end() == "---") {
            let end = end + 1;
            return SplitDocument {
                front_matter: Some(lines[1..end].join("\n")),
                content: lines[end + 1..].join("\n"),
            };
        }
    }

    SplitDocument {
        front_matter: None,
        content: text.to_string(),
    }
}

/// Top-level `key: value` pairs of a YAML block, values trimmed
pub fn yaml_pairs(yaml: &str) -> Vec<(String, String)> {
    yaml.lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .filter_map(|line| YAML_KEY_REGEX.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
        .collect()
}

/// Whether every non-blank line of `chunk` is a top-level YAML pair
pub fn is_yaml_block(chunk: &str) -> bool {
    let mut lines = chunk.lines().filter(|l| !l.trim().is_empty()).peekable();
    lines.peek().is_some()
        && lines.all(|l| l.starts_with(char::is_whitespace) || YAML_KEY_REGEX.is_match(l))
}

/// Split content into slide chunks on `---` lines outside fenced code
pub fn split_slides(content: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        if !in_fence && line.trim_end() == "---" {
            chunks.push(current.join("\n"));
            current.clear();
        } else {
            current.push(line);
        }
    }
    chunks.push(current.join("\n"));
    chunks
}

/// What an HTML comment means to the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comment {
    /// `<!-- video: path -->`
    Video(String),
    /// Renderer directive, not narration
    Directive,
    /// Speaker notes
    Note(String),
}

/// Classify the inner text of one comment
pub fn classify_comment(inner: &str) -> Comment {
    if let Some(caps) = VIDEO_DIRECTIVE_REGEX.captures(inner) {
        return Comment::Video(caps[1].to_string());
    }

    let trimmed = inner.trim();
    let all_directives = trimmed
        .lines()
        .filter(|l| !l.trim().is_empty())
        .all(|l| MARP_DIRECTIVE_REGEX.is_match(l.trim()));
    if trimmed.is_empty() || all_directives {
        return Comment::Directive;
    }

    Comment::Note(trimmed.to_string())
}

/// All comments of a chunk, in order
pub fn comments(chunk: &str) -> Vec<Comment> {
    COMMENT_REGEX
        .captures_iter(chunk)
        .map(|caps| classify_comment(&caps[1]))
        .collect()
}

/// First video directive in a chunk
pub fn video_reference(comments: &[Comment]) -> Option<String> {
    comments.iter().find_map(|c| match c {
        Comment::Video(path) => Some(path.clone()),
        _ => None,
    })
}

/// Chunk with comments removed and surrounding whitespace trimmed
pub fn strip_comments(chunk: &str) -> String {
    COMMENT_REGEX.replace_all(chunk, "").trim().to_string()
}

/// Guess the deck format from front matter keys
pub fn detect_format(text: &str) -> DeckFormat {
    let Some(front_matter) = split_front_matter(text).front_matter else {
        return DeckFormat::Marp;
    };

    let pairs = yaml_pairs(&front_matter);
    if pairs.iter().any(|(k, v)| k == "marp" && v == "true") {
        return DeckFormat::Marp;
    }
    if pairs.iter().any(|(k, _)| SLIDEV_KEYS.contains(&k.as_str())) {
        return DeckFormat::Slidev;
    }
    DeckFormat::Marp
}
