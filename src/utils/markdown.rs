//! A small markdown subset rendered to HTML for chat bubbles.
//!
//! Input is HTML-escaped once, then scanned into [`Token`]s, then rendered. Only
//! fenced code, headings, bold, inline code, http(s) links and line breaks are
//! recognised; nested or malformed constructs come out partially rendered.

/// Escapes `& < > " '`.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    LineBreak,
    Heading { level: u8, content: Vec<Token<'a>> },
    Bold(Vec<Token<'a>>),
    InlineCode(&'a str),
    Link { label: &'a str, url: &'a str },
    CodeFence { lang: Option<&'a str>, code: &'a str },
}

const FENCE: &str = "```";
const MAX_HEADING_LEVEL: usize = 6;
const MAX_LANG_TAG_LEN: usize = 30;

pub fn markdown_to_html(markdown: &str) -> String {
    let escaped = escape_html(markdown);
    render(&tokenize(&escaped))
}

/// Tokenizes already-escaped text.
///
/// Segments between triple backticks alternate text/code starting with text, so
/// an unterminated fence still yields a code segment.
pub fn tokenize(escaped: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for (idx, segment) in escaped.split(FENCE).enumerate() {
        if idx % 2 == 1 {
            tokens.push(code_fence(segment));
        } else {
            tokenize_text(segment, &mut tokens);
        }
    }
    tokens
}

fn code_fence(segment: &str) -> Token<'_> {
    if let Some(nl) = segment.find('\n') {
        let first_line = segment[..nl].trim();
        if is_lang_tag(first_line) {
            return Token::CodeFence {
                lang: Some(first_line),
                code: &segment[nl + 1..],
            };
        }
    }
    Token::CodeFence {
        lang: None,
        code: segment,
    }
}

fn is_lang_tag(s: &str) -> bool {
    (1..=MAX_LANG_TAG_LEN).contains(&s.len())
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn tokenize_text<'a>(segment: &'a str, out: &mut Vec<Token<'a>>) {
    for (i, line) in segment.split('\n').enumerate() {
        if i > 0 {
            out.push(Token::LineBreak);
        }
        match heading(line) {
            Some((level, content)) => {
                let mut inner = Vec::new();
                scan_inline(content, true, &mut inner);
                out.push(Token::Heading {
                    level,
                    content: inner,
                });
            }
            None => scan_inline(line, true, out),
        }
    }
}

/// `#`..`######`, at least one whitespace, then non-blank content.
fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let content = rest.trim_start();
    if content.is_empty() {
        return None;
    }
    Some((level as u8, content))
}

/// Leftmost-first scan for bold, inline code and links.
fn scan_inline<'a>(text: &'a str, allow_bold: bool, out: &mut Vec<Token<'a>>) {
    let mut plain_start = 0;
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let matched = if allow_bold && rest.starts_with("**") {
            bold(rest)
        } else if rest.starts_with('`') {
            inline_code(rest)
        } else if rest.starts_with('[') {
            link(rest)
        } else {
            None
        };

        match matched {
            Some((token, len)) => {
                if plain_start < i {
                    out.push(Token::Text(&text[plain_start..i]));
                }
                out.push(token);
                i += len;
                plain_start = i;
            }
            None => {
                i += rest.chars().next().map(char::len_utf8).unwrap_or(1);
            }
        }
    }
    if plain_start < text.len() {
        out.push(Token::Text(&text[plain_start..]));
    }
}

/// Lazy `**content**` with at least one character of content.
fn bold(rest: &str) -> Option<(Token<'_>, usize)> {
    let inner = &rest[2..];
    let first = inner.chars().next()?.len_utf8();
    let close = inner[first..].find("**")?;
    let content = &inner[..first + close];
    let mut tokens = Vec::new();
    scan_inline(content, false, &mut tokens);
    Some((Token::Bold(tokens), 2 + content.len() + 2))
}

fn inline_code(rest: &str) -> Option<(Token<'_>, usize)> {
    let close = rest[1..].find('`')?;
    if close == 0 {
        return None;
    }
    Some((Token::InlineCode(&rest[1..1 + close]), close + 2))
}

/// `[label](http(s)://url)`; the url stops at whitespace or `)`.
fn link(rest: &str) -> Option<(Token<'_>, usize)> {
    let label_end = 1 + rest[1..].find(']')?;
    if label_end == 1 {
        return None;
    }
    let label = &rest[1..label_end];

    let after = rest[label_end + 1..].strip_prefix('(')?;
    let scheme_len = if after.starts_with("https://") {
        "https://".len()
    } else if after.starts_with("http://") {
        "http://".len()
    } else {
        return None;
    };

    let url_len = after
        .find(|c: char| c.is_whitespace() || c == ')')
        .unwrap_or(after.len());
    if url_len <= scheme_len || !after[url_len..].starts_with(')') {
        return None;
    }
    let url = &after[..url_len];

    // '[' + label + ']' + '(' + url + ')'
    let len = label_end + 1 + 1 + url_len + 1;
    Some((Token::Link { label, url }, len))
}

pub fn render(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    render_into(tokens, &mut out);
    out
}

fn render_into(tokens: &[Token<'_>], out: &mut String) {
    for token in tokens {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::LineBreak => out.push_str("<br>"),
            Token::Heading { level, content } => {
                out.push_str(&format!("<div class=\"md-heading md-h{}\">", level));
                render_into(content, out);
                out.push_str("</div>");
            }
            Token::Bold(content) => {
                out.push_str("<strong>");
                render_into(content, out);
                out.push_str("</strong>");
            }
            Token::InlineCode(code) => {
                out.push_str("<code>");
                out.push_str(code);
                out.push_str("</code>");
            }
            Token::Link { label, url } => {
                out.push_str(&format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                    url, label
                ));
            }
            Token::CodeFence { code, .. } => {
                out.push_str("<pre><code>");
                out.push_str(code);
                out.push_str("</code></pre>");
            }
        }
    }
}
