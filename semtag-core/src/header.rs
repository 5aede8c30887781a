//! Embedded version header line format
//!
//! A header is one comment line near the top of a component file:
//!
//! ```text
//! # semtag: version=1.2.0 component=extraction-prompt id=3f9a01bc
//! ```
//!
//! The comment syntax follows the file type. This module only deals with
//! text; reading and writing files lives in the engine.

use crate::{ComponentId, ComponentType, FileHeader, SemVer};
use once_cell::sync::Lazy;
use regex::Regex;

/// Marker that starts the header body inside the comment.
pub const HEADER_MARKER: &str = "semtag:";

/// Default number of leading lines searched for a header.
pub const DEFAULT_SCAN_LINES: usize = 10;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"semtag:\s*version=(\S+)\s+component=(\S+?)(?:\s+id=([A-Za-z0-9_-]+))?(?:\s|$)")
        .expect("header regex is valid")
});

/// Comment syntax used to embed a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `# ...`
    Hash,
    /// `// ...`
    DoubleSlash,
    /// `-- ...`
    DoubleDash,
    /// `<!-- ... -->`
    Html,
    /// `{# ... #}`
    Jinja,
    /// `/* ... */`
    Block,
}

impl CommentStyle {
    /// Style for a path, by extension. None for formats without comments.
    pub fn for_path(path: &str) -> Option<Self> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let ext = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return None,
        };
        match ext.as_str() {
            "py" | "sh" | "bash" | "zsh" | "yaml" | "yml" | "toml" | "rb" | "r" | "pl" | "txt"
            | "prompt" | "ini" | "cfg" | "conf" | "env" => Some(CommentStyle::Hash),
            "js" | "mjs" | "ts" | "jsx" | "tsx" | "rs" | "go" | "java" | "kt" | "swift" | "c"
            | "h" | "cpp" | "hpp" | "cs" | "jsonc" | "proto" => Some(CommentStyle::DoubleSlash),
            "sql" | "lua" | "hs" => Some(CommentStyle::DoubleDash),
            "md" | "markdown" | "html" | "htm" | "xml" | "svg" => Some(CommentStyle::Html),
            "j2" | "jinja" | "jinja2" => Some(CommentStyle::Jinja),
            "css" | "scss" => Some(CommentStyle::Block),
            _ => None,
        }
    }

    /// Style for a path, falling back to the component type when the
    /// extension is unknown or missing.
    pub fn for_path_or_type(path: &str, type_hint: Option<ComponentType>) -> Option<Self> {
        if let Some(style) = Self::for_path(path) {
            return Some(style);
        }
        if is_commentless(path) {
            return None;
        }
        match type_hint? {
            ComponentType::Query => Some(CommentStyle::DoubleDash),
            ComponentType::Template => Some(CommentStyle::Jinja),
            ComponentType::Schema => None,
            _ => Some(CommentStyle::Hash),
        }
    }

    pub fn wrap(&self, body: &str) -> String {
        match self {
            CommentStyle::Hash => format!("# {}", body),
            CommentStyle::DoubleSlash => format!("// {}", body),
            CommentStyle::DoubleDash => format!("-- {}", body),
            CommentStyle::Html => format!("<!-- {} -->", body),
            CommentStyle::Jinja => format!("{{# {} #}}", body),
            CommentStyle::Block => format!("/* {} */", body),
        }
    }
}

/// True for formats that cannot carry a comment line (e.g. JSON). Headers
/// in such files are never read or written.
pub fn is_commentless(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    [".json", ".csv", ".png", ".jpg", ".jpeg", ".gif", ".pdf", ".bin"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// Header body without comment delimiters.
pub fn format_header_body(header: &FileHeader) -> String {
    match &header.component_id {
        Some(id) => format!(
            "{} version={} component={} id={}",
            HEADER_MARKER, header.version, header.component, id
        ),
        None => format!(
            "{} version={} component={}",
            HEADER_MARKER, header.version, header.component
        ),
    }
}

pub fn format_header_line(style: CommentStyle, header: &FileHeader) -> String {
    style.wrap(&format_header_body(header))
}

/// Parse a header out of one line, whatever comment syntax surrounds it.
pub fn parse_header_line(line: &str) -> Option<FileHeader> {
    let caps = HEADER_RE.captures(line)?;
    let version = SemVer::parse_lenient(caps.get(1)?.as_str());
    let component = caps
        .get(2)?
        .as_str()
        .trim_end_matches("-->")
        .trim_end_matches("#}")
        .trim_end_matches("*/")
        .to_string();
    let component_id = caps
        .get(3)
        .and_then(|m| ComponentId::parse(m.as_str()).ok());
    Some(FileHeader {
        version,
        component,
        component_id,
    })
}

/// Find the header in the first `scan_lines` lines.
/// Returns the zero-based line index and the parsed header.
pub fn find_header(content: &str, scan_lines: usize) -> Option<(usize, FileHeader)> {
    content
        .lines()
        .take(scan_lines)
        .enumerate()
        .find_map(|(idx, line)| parse_header_line(line).map(|h| (idx, h)))
}

/// Result of stamping a header into file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stamp {
    /// Content changed.
    Updated(String),
    /// A header was already present and `replace` was false, or the
    /// existing line already matches.
    Unchanged,
}

/// Insert or replace the header line in `content`.
///
/// New headers go after a shebang line or a leading `---` front-matter
/// block, otherwise on the first line.
pub fn stamp_header(
    content: &str,
    style: CommentStyle,
    header: &FileHeader,
    replace: bool,
    scan_lines: usize,
) -> Stamp {
    let new_line = format_header_line(style, header);
    let mut lines: Vec<&str> = content.split('\n').collect();

    if let Some((idx, _)) = find_header(content, scan_lines) {
        if !replace || lines[idx].trim_end_matches('\r') == new_line {
            return Stamp::Unchanged;
        }
        lines[idx] = &new_line;
        return Stamp::Updated(lines.join("\n"));
    }

    let insert_at = insertion_point(&lines);
    lines.insert(insert_at, &new_line);
    let mut out = lines.join("\n");
    if content.is_empty() {
        out.push('\n');
    }
    Stamp::Updated(out)
}

fn insertion_point(lines: &[&str]) -> usize {
    match lines.first() {
        Some(first) if first.starts_with("#!") => 1,
        Some(first) if first.trim_end() == "---" => lines
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, l)| {
                let t = l.trim_end();
                t == "---" || t == "..."
            })
            .map(|(idx, _)| idx + 1)
            .unwrap_or(0),
        _ => 0,
    }
}

// =============================================================================
// TESTS
// =============================================================================
