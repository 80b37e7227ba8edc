//! Light markdown rendering for model replies shown in a terminal.
//!
//! Only the structure a chat reply usually carries is styled: headings,
//! fenced code, emphasis, inline code, lists, quotes and rules. Everything
//! else passes through as text.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const STRIKE: &str = "\x1b[9m";
const HEADING: &str = "\x1b[1;35m";
const CODE: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Ansi,
    Plain,
}

pub fn render(input: &str, style: Style) -> String {
    let options = Options::ENABLE_STRIKETHROUGH;
    let mut renderer = Renderer::new(style);
    for event in Parser::new_ext(input, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Inline {
    bold: bool,
    italic: bool,
    strike: bool,
}

struct Renderer {
    style: Style,
    out: String,
    inline: Inline,
    in_heading: bool,
    in_code_block: bool,
    quote_depth: usize,
    // `Some(n)` for ordered lists, the next number to print.
    lists: Vec<Option<u64>>,
    at_line_start: bool,
}

impl Renderer {
    fn new(style: Style) -> Self {
        Self {
            style,
            out: String::new(),
            inline: Inline::default(),
            in_heading: false,
            in_code_block: false,
            quote_depth: 0,
            lists: Vec::new(),
            at_line_start: true,
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.line_prefix();
                self.styled(CODE, &code, "`");
            }
            Event::SoftBreak => self.push(" "),
            Event::HardBreak => self.newline(),
            Event::Rule => {
                self.block_gap();
                self.line_prefix();
                let rule = "─".repeat(40);
                self.styled(DIM, &rule, "");
                self.newline();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.block_gap();
                }
            }
            Tag::Heading { level, .. } => {
                self.block_gap();
                self.in_heading = true;
                self.line_prefix();
                let marks = "#".repeat(level as usize);
                self.escape(HEADING);
                self.out.push_str(&marks);
                self.out.push(' ');
            }
            Tag::CodeBlock(kind) => {
                self.block_gap();
                self.in_code_block = true;
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.trim().to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.line_prefix();
                self.styled(DIM, &format!("```{}", lang), "");
                self.newline();
            }
            Tag::BlockQuote(_) => {
                self.block_gap();
                self.quote_depth += 1;
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_gap();
                } else if !self.at_line_start {
                    self.newline();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                if !self.at_line_start {
                    self.newline();
                }
                self.line_prefix();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                self.out.push_str(&indent);
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let label = format!("{}. ", n);
                        *n += 1;
                        label
                    }
                    _ => "• ".to_string(),
                };
                self.out.push_str(&bullet);
            }
            Tag::Strong => {
                self.inline.bold = true;
                self.escape(BOLD);
            }
            Tag::Emphasis => {
                self.inline.italic = true;
                self.escape(ITALIC);
            }
            Tag::Strikethrough => {
                self.inline.strike = true;
                self.escape(STRIKE);
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.newline(),
            TagEnd::Heading(_) => {
                self.in_heading = false;
                self.escape(RESET);
                self.newline();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                if !self.at_line_start {
                    self.newline();
                }
                self.line_prefix();
                self.styled(DIM, "```", "");
                self.newline();
            }
            TagEnd::BlockQuote(_) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::Item => {
                if !self.at_line_start {
                    self.newline();
                }
            }
            TagEnd::Strong => {
                self.inline.bold = false;
                self.reset_inline();
            }
            TagEnd::Emphasis => {
                self.inline.italic = false;
                self.reset_inline();
            }
            TagEnd::Strikethrough => {
                self.inline.strike = false;
                self.reset_inline();
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            for line in text.split_inclusive('\n') {
                self.line_prefix();
                let (body, newline) = match line.strip_suffix('\n') {
                    Some(body) => (body, true),
                    None => (line, false),
                };
                self.out.push_str("    ");
                self.styled(CODE, body, "");
                if newline {
                    self.newline();
                }
            }
            return;
        }
        self.line_prefix();
        self.out.push_str(text);
    }

    fn push(&mut self, text: &str) {
        self.line_prefix();
        self.out.push_str(text);
    }

    /// Writes `text` in `color`, or wrapped in `plain_marker` without ANSI.
    fn styled(&mut self, color: &str, text: &str, plain_marker: &str) {
        match self.style {
            Style::Ansi => {
                self.out.push_str(color);
                self.out.push_str(text);
                self.out.push_str(RESET);
                self.restore_inline();
            }
            Style::Plain => {
                self.out.push_str(plain_marker);
                self.out.push_str(text);
                self.out.push_str(plain_marker);
            }
        }
    }

    fn escape(&mut self, code: &str) {
        if self.style == Style::Ansi {
            self.out.push_str(code);
        }
    }

    fn reset_inline(&mut self) {
        self.escape(RESET);
        self.restore_inline();
    }

    fn restore_inline(&mut self) {
        if self.style != Style::Ansi {
            return;
        }
        if self.in_heading {
            self.out.push_str(HEADING);
        }
        if self.inline.bold {
            self.out.push_str(BOLD);
        }
        if self.inline.italic {
            self.out.push_str(ITALIC);
        }
        if self.inline.strike {
            self.out.push_str(STRIKE);
        }
    }

    fn line_prefix(&mut self) {
        if !self.at_line_start {
            return;
        }
        self.at_line_start = false;
        if self.quote_depth > 0 {
            let bars = "│ ".repeat(self.quote_depth);
            match self.style {
                Style::Ansi => {
                    self.out.push_str(DIM);
                    self.out.push_str(&bars);
                    self.out.push_str(RESET);
                    self.restore_inline();
                }
                Style::Plain => self.out.push_str(&bars),
            }
        }
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    fn block_gap(&mut self) {
        if self.out.is_empty() {
            return;
        }
        if !self.at_line_start {
            self.newline();
        }
        if !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn finish(self) -> String {
        self.out.trim_end_matches('\n').to_string()
    }
}
