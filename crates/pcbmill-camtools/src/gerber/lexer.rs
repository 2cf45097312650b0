//! Block splitting for RS-274X
//!
//! Word commands end with `*`; extended commands are wrapped in `%...%` and
//! may hold several `*`-terminated words (aperture macros do). Line breaks
//! carry no meaning and are dropped; each block remembers the line it
//! started on.

use pcbmill_core::ParseError;

/// One command block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Plain word command such as `X100Y200D01`
    Word { line: usize, text: String },
    /// Extended command; `words` holds every `*`-terminated word inside `%...%`
    Extended { line: usize, words: Vec<String> },
}

impl Block {
    pub fn line(&self) -> usize {
        match self {
            Block::Word { line, .. } | Block::Extended { line, .. } => *line,
        }
    }
}

/// Split Gerber text into blocks
pub fn tokenize(text: &str) -> Result<Vec<Block>, ParseError> {
    let mut blocks = Vec::new();
    let mut line = 1usize;
    let mut buffer = String::new();
    let mut buffer_line = 1usize;
    let mut extended: Option<(usize, Vec<String>)> = None;

    for c in text.chars() {
        match c {
            '\n' => line += 1,
            '\r' => {}
            '%' => match extended.take() {
                None => {
                    if !buffer.trim().is_empty() {
                        return Err(ParseError::UnterminatedBlock { line: buffer_line });
                    }
                    buffer.clear();
                    extended = Some((line, Vec::new()));
                }
                Some((start, mut words)) => {
                    let word = buffer.trim();
                    if !word.is_empty() {
                        words.push(word.to_string());
                    }
                    buffer.clear();
                    if !words.is_empty() {
                        blocks.push(Block::Extended { line: start, words });
                    }
                }
            },
            '*' => {
                let word = buffer.trim().to_string();
                buffer.clear();
                if word.is_empty() {
                    continue;
                }
                match extended.as_mut() {
                    Some((_, words)) => words.push(word),
                    None => blocks.push(Block::Word {
                        line: buffer_line,
                        text: word,
                    }),
                }
            }
            _ => {
                if buffer.is_empty() {
                    if c.is_whitespace() {
                        continue;
                    }
                    buffer_line = line;
                }
                buffer.push(c);
            }
        }
    }

    if let Some((start, _)) = extended {
        return Err(ParseError::UnterminatedBlock { line: start });
    }
    if !buffer.trim().is_empty() {
        return Err(ParseError::UnterminatedBlock { line: buffer_line });
    }
    Ok(blocks)
}
