//! Assistant message renderer
//!
//! Converts the markup subset assistants use into HTML:
//! - `# ` / `## ` headings
//! - `**bold**` and `` `code` `` inline spans
//! - `- ` / `* ` bullet lines, one `<ul>` per contiguous run
//!
//! Lines are tokenized into blocks first and inline spans are resolved per
//! block, so no rule can rewrite another rule's output. Every other markup
//! character is dropped and HTML-sensitive characters are escaped.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block<'a> {
    Heading(u8, &'a str),
    Bullet(&'a str),
    Text(&'a str),
    Blank,
}

fn tokenize_line(line: &str) -> Block<'_> {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Block::Blank;
    }
    if let Some(text) = trimmed.strip_prefix("## ") {
        return Block::Heading(2, text.trim_start());
    }
    if let Some(text) = trimmed.strip_prefix("# ") {
        return Block::Heading(1, text.trim_start());
    }
    if let Some(text) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        return Block::Bullet(text.trim_start());
    }

    // Deeper headings and quote markers are not part of the subset.
    Block::Text(trimmed.trim_start_matches(['#', '>']).trim_start())
}

/// Render assistant markup to HTML.
pub fn render(markdown: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut list: Vec<String> = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();

    for line in markdown.lines() {
        let block = tokenize_line(line);

        if !matches!(block, Block::Bullet(_)) && !list.is_empty() {
            blocks.push(format!("<ul>{}</ul>", list.concat()));
            list.clear();
        }
        if !matches!(block, Block::Text(_)) && !paragraph.is_empty() {
            blocks.push(format!("<p>{}</p>", paragraph.join("<br>")));
            paragraph.clear();
        }

        match block {
            Block::Heading(level, text) => {
                blocks.push(format!("<h{0}>{1}</h{0}>", level, render_inline(text)));
            }
            Block::Bullet(text) => list.push(format!("<li>{}</li>", render_inline(text))),
            Block::Text(text) => {
                let rendered = render_inline(text);
                if !rendered.is_empty() {
                    paragraph.push(rendered);
                }
            }
            Block::Blank => {}
        }
    }

    if !list.is_empty() {
        blocks.push(format!("<ul>{}</ul>", list.concat()));
    }
    if !paragraph.is_empty() {
        blocks.push(format!("<p>{}</p>", paragraph.join("<br>")));
    }

    blocks.join("\n")
}

/// Resolve bold and code spans, strip stray markup, escape the rest.
fn render_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    write_inline(text, &mut out);
    out
}

fn write_inline(text: &str, out: &mut String) {
    let mut i = 0;
    let mut prev: Option<char> = None;

    while i < text.len() {
        let rest = &text[i..];

        if let Some(after) = rest.strip_prefix("**") {
            match after.find("**") {
                Some(end) if end > 0 => {
                    out.push_str("<strong>");
                    write_inline(&after[..end], out);
                    out.push_str("</strong>");
                    i += 2 + end + 2;
                }
                _ => i += 2,
            }
            prev = Some('*');
            continue;
        }

        if let Some(after) = rest.strip_prefix('`') {
            match after.find('`') {
                Some(end) if end > 0 => {
                    out.push_str("<code>");
                    escape_into(&after[..end], out);
                    out.push_str("</code>");
                    i += 1 + end + 1;
                }
                Some(_) => i += 2,
                None => i += 1,
            }
            prev = Some('`');
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        let next = rest[ch.len_utf8()..].chars().next();

        match ch {
            '*' | '~' | '#' => {}
            '_' if is_word_char(prev) && is_word_char(next) => out.push('_'),
            '_' => {}
            _ => escape_char(ch, out),
        }

        prev = Some(ch);
        i += ch.len_utf8();
    }
}

fn is_word_char(ch: Option<char>) -> bool {
    ch.is_some_and(char::is_alphanumeric)
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        escape_char(ch, out);
    }
}

fn escape_char(ch: char, out: &mut String) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        _ => out.push(ch),
    }
}
