use crate::{Code, Position, Token};
use once_cell::unsync::OnceCell;

impl<'c> From<&'c [u8]> for Code<'c> {
    fn from(value: &'c [u8]) -> Self {
        Code::new(value)
    }
}
impl<'c> From<&'c str> for Code<'c> {
    fn from(value: &'c str) -> Self {
        Code::new(value.as_bytes())
    }
}

impl<'c> Code<'c> {
    pub fn new(value: &'c [u8]) -> Self {
        Self {
            value,
            line_starts: OnceCell::new(),
        }
    }

    /// Byte offsets at which each line begins, the first line included.
    fn line_starts(&self) -> &[usize] {
        self.line_starts.get_or_init(|| {
            let mut starts = vec![0];
            starts.extend(self.value.iter().enumerate().filter_map(|(index, byte)| {
                if *byte == b'\n' {
                    Some(index + 1)
                } else {
                    None
                }
            }));
            starts
        })
    }

    /// The line and column at a byte offset.
    pub fn position_at(&self, pointer: usize) -> Position {
        let starts = self.line_starts();
        // The table always opens with offset 0, so at least one line start
        // lies at or before any pointer.
        let line = starts.partition_point(|&start| start <= pointer);
        Position::new(line, pointer - starts[line - 1] + 1)
    }

    /// The position of a token's first byte.
    pub fn position_of(&self, token: &Token) -> Position {
        self.position_at(token.start)
    }

    /// The source line a token starts on, with the token's extent marked
    /// underneath. Tokens spanning several lines are marked on their first
    /// line only.
    pub fn annotate(&self, token: &Token) -> String {
        let starts = self.line_starts();
        let line = starts.partition_point(|&start| start <= token.start);
        let from = starts[line - 1];
        let to = starts.get(line).map_or(self.value.len(), |next| next - 1);

        let text = String::from_utf8_lossy(&self.value[from..to]);
        let indent = token.start - from;
        let width = token.end.min(to).saturating_sub(token.start).max(1);

        let mut marked = String::with_capacity(text.len() + indent + width + 1);
        marked.push_str(&text);
        marked.push('\n');
        for _ in 0..indent {
            marked.push(' ');
        }
        for _ in 0..width {
            marked.push('^');
        }
        marked
    }
}
