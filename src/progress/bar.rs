//! Line template and bar graphic for a single progress entry

use std::mem;

use console::{pad_str, Alignment};

/// Width every entry label is padded or truncated to
pub const LABEL_WIDTH: usize = 40;

/// Number of cells in the bar graphic, brackets excluded
pub const BAR_WIDTH: usize = 20;

/// Template used by the CLI for every job line
pub const DEFAULT_TEMPLATE: &str = ":name :bar (:current/:total) :status";

const FILLED: &str = "=";
const EMPTY: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Name,
    Bar,
    Current,
    Total,
    Status,
}

/// Parsed line template
///
/// Placeholders are `:name`, `:bar`, `:current`, `:total` and `:status`. Any
/// other `:word` is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<Token>,
    bar_width: usize,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(pos) = rest.find(':') {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let ident_len = after
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(after.len());

            let token = match &after[..ident_len] {
                "name" => Some(Token::Name),
                "bar" => Some(Token::Bar),
                "current" => Some(Token::Current),
                "total" => Some(Token::Total),
                "status" => Some(Token::Status),
                _ => None,
            };

            match token {
                Some(token) => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(mem::take(&mut literal)));
                    }
                    tokens.push(token);
                }
                None => literal.push_str(&rest[pos..pos + 1 + ident_len]),
            }
            rest = &after[ident_len..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Self {
            tokens,
            bar_width: BAR_WIDTH,
        }
    }

    /// Override the number of cells in the bar graphic
    #[cfg(test)]
    pub fn with_bar_width(mut self, bar_width: usize) -> Self {
        self.bar_width = bar_width;
        self
    }

    /// Render one line
    ///
    /// Control characters in `name` and `status` are replaced with spaces so
    /// that every entry occupies exactly one terminal row.
    pub fn render(&self, name: &str, current: u64, total: u64, status: &str) -> String {
        let mut line = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => line.push_str(text),
                Token::Name => push_single_line(&mut line, name),
                Token::Bar => line.push_str(&bar(current, total, self.bar_width)),
                Token::Current => line.push_str(&current.to_string()),
                Token::Total => line.push_str(&total.to_string()),
                Token::Status => push_single_line(&mut line, status),
            }
        }
        line
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE)
    }
}

/// Append `text` with line breaks and other control characters blanked
///
/// Escape is kept so styled text still renders.
fn push_single_line(line: &mut String, text: &str) {
    line.extend(
        text.chars()
            .map(|c| if c.is_control() && c != '\u{1b}' { ' ' } else { c }),
    );
}

/// Number of filled cells for `current` out of `total`
///
/// An unknown total (zero) renders as an empty bar.
pub fn filled_cells(current: u64, total: u64, width: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let ratio = (current as f64 / total as f64).clamp(0.0, 1.0);
    (width as f64 * ratio).round() as usize
}

/// Bar graphic such as `[=====-----]`
pub fn bar(current: u64, total: u64, width: usize) -> String {
    let filled = filled_cells(current, total, width);
    format!("[{}{}]", FILLED.repeat(filled), EMPTY.repeat(width - filled))
}

/// Pad or truncate a label to [`LABEL_WIDTH`] columns
pub fn fit_label(label: &str) -> String {
    pad_str(label, LABEL_WIDTH, Alignment::Left, Some("")).into_owned()
}
