use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::settings::Theme;

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const STRIKE: &str = "\x1b[9m";
const RESET: &str = "\x1b[0m";

/// Render assistant markdown as terminal text. With `ansi` off the output is
/// plain text with the same layout.
pub fn render_markdown(input: &str, theme: Theme, ansi: bool) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let mut renderer = TerminalRenderer::new(theme, ansi);
    for event in Parser::new_ext(input, options) {
        renderer.handle_event(event);
    }
    renderer.finish()
}

#[derive(Default, Clone, Copy)]
struct InlineStyle {
    bold: bool,
    italic: bool,
    strikethrough: bool,
    heading: bool,
}

struct ListLevel {
    next_number: Option<u64>,
}

struct TerminalRenderer {
    theme: Theme,
    ansi: bool,
    out: String,
    line: String,
    style: InlineStyle,
    quote_depth: usize,
    lists: Vec<ListLevel>,
    pending_marker: Option<String>,
    link_url: Option<String>,
    code_block: Option<String>,
}

impl TerminalRenderer {
    fn new(theme: Theme, ansi: bool) -> Self {
        Self {
            theme,
            ansi,
            out: String::new(),
            line: String::new(),
            style: InlineStyle::default(),
            quote_depth: 0,
            lists: Vec::new(),
            pending_marker: None,
            link_url: None,
            code_block: None,
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some(code) = self.code_block.as_mut() {
                    code.push_str(&text);
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                let styled = self.paint(self.theme.accent(), &code);
                self.line.push_str(&styled);
            }
            Event::SoftBreak => self.line.push(' '),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                let rule = self.paint(self.theme.muted(), &"─".repeat(40));
                self.emit(&rule);
                self.blank_line();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_line();
                self.style.heading = true;
                if level == HeadingLevel::H1 || level == HeadingLevel::H2 {
                    self.style.bold = true;
                }
            }
            Tag::Strong => self.style.bold = true,
            Tag::Emphasis => self.style.italic = true,
            Tag::Strikethrough => self.style.strikethrough = true,
            Tag::Link { dest_url, .. } => self.link_url = Some(dest_url.to_string()),
            Tag::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush_line();
                if let CodeBlockKind::Fenced(lang) = kind {
                    let lang = lang.trim();
                    if !lang.is_empty() {
                        let label = self.paint(self.theme.muted(), lang);
                        self.emit(&label);
                    }
                }
                self.code_block = Some(String::new());
            }
            Tag::List(start) => {
                self.flush_line();
                self.lists.push(ListLevel { next_number: start });
            }
            Tag::Item => {
                self.flush_line();
                let marker = match self.lists.last_mut() {
                    Some(ListLevel {
                        next_number: Some(n),
                    }) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.pending_marker = Some(marker);
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_line();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush_line();
                self.style.heading = false;
                self.style.bold = false;
                self.blank_line();
            }
            TagEnd::Strong => self.style.bold = false,
            TagEnd::Emphasis => self.style.italic = false,
            TagEnd::Strikethrough => self.style.strikethrough = false,
            TagEnd::Link => {
                if let Some(url) = self.link_url.take() {
                    let suffix = self.paint(self.theme.muted(), &format!(" ({})", url));
                    self.line.push_str(&suffix);
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    self.blank_line();
                }
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code_block.take() {
                    for code_line in code.trim_end_matches('\n').lines() {
                        let painted = self.paint(self.theme.accent(), code_line);
                        self.emit(&format!("    {}", painted));
                    }
                }
                self.blank_line();
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        let mut codes = String::new();
        if self.style.bold {
            codes.push_str(BOLD);
        }
        if self.style.italic {
            codes.push_str(ITALIC);
        }
        if self.style.strikethrough {
            codes.push_str(STRIKE);
        }
        if self.style.heading {
            codes.push_str(UNDERLINE);
        }
        if self.link_url.is_some() {
            codes.push_str(self.theme.accent());
        }
        let styled = self.paint(&codes, text);
        self.line.push_str(&styled);
    }

    fn paint(&self, codes: &str, text: &str) -> String {
        if self.ansi && !codes.is_empty() {
            format!("{}{}{}", codes, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn prefix(&self) -> String {
        let mut prefix = "│ ".repeat(self.quote_depth);
        if !self.lists.is_empty() {
            prefix.push_str(&"  ".repeat(self.lists.len() - 1));
        }
        prefix
    }

    fn flush_line(&mut self) {
        if self.line.is_empty() && self.pending_marker.is_none() {
            return;
        }
        let line = std::mem::take(&mut self.line);
        self.emit(&line);
    }

    fn emit(&mut self, text: &str) {
        let mut full = self.prefix();
        if let Some(marker) = self.pending_marker.take() {
            full.push_str(&marker);
        } else if !self.lists.is_empty() {
            full.push_str("  ");
        }
        full.push_str(text);
        self.out.push_str(full.trim_end());
        self.out.push('\n');
    }

    fn blank_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn finish(mut self) -> String {
        self.flush_line();
        self.out.trim_end().to_string()
    }
}
