//! Caption text preparation for Telegram's MarkdownV2 parse mode.
//!
//! Every reserved character must be preceded by a backslash or Telegram rejects the whole
//! message. Code fences are removed first since a caption cannot carry a fenced block.

/// Characters MarkdownV2 treats as markup.
pub const RESERVED_CHARS: &str = r"_*[]()~`>#+-=|{}.!";

const FENCE: &str = "```";

pub fn is_reserved(ch: char) -> bool {
    RESERVED_CHARS.contains(ch)
}

/// Remove every literal triple-backtick sequence.
pub fn strip_fences(text: &str) -> String {
    text.replace(FENCE, "")
}

/// Prefix each reserved character with a backslash; everything else is copied unchanged.
/// Apply once: the output is not meant to be escaped again.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        if is_reserved(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Fence-strip then escape: the text sent as a photo caption.
pub fn caption_from_report(report: &str) -> String {
    escape_markdown_v2(&strip_fences(report))
}
