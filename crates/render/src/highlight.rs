//! Bracket and quote highlighting
//!
//! Splits a wrapped line into colored runs. Text inside matched delimiters
//! is drawn in the highlight color, as are the delimiters themselves. The
//! stack of open delimiters is passed in and handed back so a span opened on
//! one line stays highlighted on the next.

use serde::Serialize;

use crate::color::{Color, Palette};
use crate::layout::WrappedLine;

/// Opening and closing delimiter pairs
const PAIRS: [(char, char); 9] = [
    ('[', ']'),
    ('【', '】'),
    ('〔', '〕'),
    ('（', '）'),
    ('‘', '’'),
    ('「', '」'),
    ('｢', '｣'),
    ('《', '》'),
    ('〈', '〉'),
];

/// Delimiters that both open and close
const QUOTES: [char; 3] = ['"', '\'', '`'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlyphRun {
    pub text: String,
    pub color: Color,
}

/// Delimiters still open at the end of a line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketState {
    stack: Vec<char>,
}

impl BracketState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inside at least one highlighted span
    pub fn is_open(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn open_delimiters(&self) -> &[char] {
        &self.stack
    }

    fn top(&self) -> Option<char> {
        self.stack.last().copied()
    }
}

enum Delimiter {
    Open,
    Close(char),
    Quote,
}

fn classify(ch: char) -> Option<Delimiter> {
    if QUOTES.contains(&ch) {
        return Some(Delimiter::Quote);
    }
    PAIRS.iter().find_map(|&(open, close)| {
        if ch == open {
            Some(Delimiter::Open)
        } else if ch == close {
            Some(Delimiter::Close(open))
        } else {
            None
        }
    })
}

struct RunBuilder<'p> {
    palette: &'p Palette,
    runs: Vec<GlyphRun>,
    buffer: String,
}

impl RunBuilder<'_> {
    fn flush(&mut self, highlighted: bool) {
        if !self.buffer.is_empty() {
            let text = std::mem::take(&mut self.buffer);
            self.push(text, highlighted);
        }
    }

    fn push(&mut self, text: String, highlighted: bool) {
        let color = if highlighted {
            self.palette.highlight
        } else {
            self.palette.text
        };
        self.runs.push(GlyphRun { text, color });
    }

    fn delimiter(&mut self, ch: char) {
        self.push(ch.to_string(), true);
    }
}

/// Split `line` into colored runs, continuing from `state`
///
/// Concatenating the returned runs reproduces `line` exactly. Adjacent runs
/// of the same color are not merged. An unmatched closer is highlighted but
/// leaves the stack untouched.
///
/// ```
/// use textbox_render::{parse_line, BracketState, Palette};
///
/// let palette = Palette::default();
/// let (_, state) = parse_line("[abc", BracketState::new(), &palette);
/// assert!(state.is_open());
///
/// let (runs, state) = parse_line("def]", state, &palette);
/// assert_eq!(runs[0].text, "def");
/// assert_eq!(runs[0].color, palette.highlight);
/// assert!(!state.is_open());
/// ```
pub fn parse_line(line: &str, mut state: BracketState, palette: &Palette) -> (Vec<GlyphRun>, BracketState) {
    let mut builder = RunBuilder {
        palette,
        runs: Vec::new(),
        buffer: String::new(),
    };

    for ch in line.chars() {
        match classify(ch) {
            Some(Delimiter::Quote) if state.top() == Some(ch) => {
                builder.flush(true);
                builder.delimiter(ch);
                state.stack.pop();
            }
            Some(Delimiter::Open) | Some(Delimiter::Quote) => {
                builder.flush(state.is_open());
                builder.delimiter(ch);
                state.stack.push(ch);
            }
            Some(Delimiter::Close(opener)) => {
                builder.flush(true);
                builder.delimiter(ch);
                if state.top() == Some(opener) {
                    state.stack.pop();
                }
            }
            None => builder.buffer.push(ch),
        }
    }
    builder.flush(state.is_open());

    (builder.runs, state)
}

/// Runs for one wrapped line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColoredLine {
    pub runs: Vec<GlyphRun>,
    pub pixel_width: u32,
}

/// Colorize a block of wrapped lines, carrying bracket state across them
pub fn colorize_lines(lines: &[WrappedLine], palette: &Palette) -> Vec<ColoredLine> {
    let mut state = BracketState::new();
    lines
        .iter()
        .map(|line| {
            let (runs, next) = parse_line(&line.text, std::mem::take(&mut state), palette);
            state = next;
            ColoredLine {
                runs,
                pixel_width: line.pixel_width,
            }
        })
        .collect()
}
