use std::cmp::{max, min};
use std::fmt::{Debug, Formatter};
use std::fs;
use std::io;
use std::ops::Add;
use std::path::Path;

pub struct Source {
    pub path: String,
    pub text: String,
    line_starts: Vec<usize>
}

#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Location<'a> {
    pub source: &'a Source,
    pub start: usize,
    pub len: usize
}

pub trait HasLoc<'a> {
    fn loc(&self) -> Location<'a>;
}

#[derive(Eq, PartialEq, Debug)]
pub struct RenderedLocation {
    pub line: String,
    pub line_no: usize,
    pub line_idx: usize,
    pub len: usize
}

impl Source {
    pub fn from_file(path: &Path) -> io::Result<Source> {
        let canonical = dunce::canonicalize(path)?;
        let text = fs::read_to_string(path)?;
        Ok(Source::from_text(&canonical.to_string_lossy(), &text))
    }

    pub fn from_text(name: &str, text: &str) -> Source {
        let mut line_starts = vec![0];
        for (i, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts.push(text.len() + 1);
        Source { path: name.to_owned(), text: text.to_owned(), line_starts }
    }

    fn line_containing(&self, idx: usize) -> (usize, usize, &str) {
        let line_no = match self.line_starts.binary_search(&idx) {
            Ok(n) => n,
            Err(n) => n - 1
        };
        let start = self.line_starts[line_no];
        let end = self.line_starts[line_no + 1];
        (line_no, start, &self.text[start..end - 1])
    }

    pub fn eof(&self) -> Location {
        Location { source: self, start: self.text.len(), len: 1 }
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.text == other.text
    }
}
impl Eq for Source { }

impl Location<'_> {
    pub fn render(&self) -> RenderedLocation {
        let (line_no, line_start, line) = self.source.line_containing(self.start);
        let line_idx = self.start - line_start;
        RenderedLocation {
            line: line.to_owned(),
            line_no,
            line_idx,
            len: self.len.min(line.len().saturating_sub(line_idx)).max(1)
        }
    }
}

impl<'s> Add for Location<'s> {
    type Output = Location<'s>;

    fn add(self, rhs: Self) -> Self::Output {
        if rhs.source != self.source { panic!("locations from different sources") }
        let start = min(self.start, rhs.start);
        let end = max(self.start + self.len, rhs.start + rhs.len);
        Location { source: self.source, start, len: end - start }
    }
}

impl Debug for Location<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Location({:?}, {}, {})", self.source.path, self.start, self.len)
    }
}

#[cfg(test)]
mod test {
    use crate::source::{Location, Source};

    #[test]
    fn test_line_starts() {
        let s = Source::from_text("test", "a\n\n be");
        assert_eq!(s.line_starts, vec![0, 2, 3, 7]);
    }

    #[test]
    fn test_line_starts_empty() {
        let s = Source::from_text("test", "");
        assert_eq!(s.line_starts, vec![0, 1]);
    }

    #[test]
    fn test_eof() {
        let s = Source::from_text("test", "ab\nc");
        assert_eq!(s.eof().start, 4);
        assert_eq!(s.eof().len, 1);
    }

    #[test]
    fn test_render_first_line() {
        let s = Source::from_text("test", "abad");
        let loc = Location { source: &s, start: 1, len: 3 };
        let r = loc.render();
        assert_eq!(r.line, "abad");
        assert_eq!(r.line_no, 0);
        assert_eq!(r.line_idx, 1);
        assert_eq!(r.len, 3);
    }

    #[test]
    fn test_render_second_line() {
        let s = Source::from_text("test", "\naba");
        let loc = Location { source: &s, start: 2, len: 2 };
        let r = loc.render();
        assert_eq!(r.line, "aba");
        assert_eq!(r.line_no, 1);
        assert_eq!(r.line_idx, 1);
        assert_eq!(r.len, 2);
    }

    #[test]
    fn test_render_clamps_to_line() {
        let s = Source::from_text("test", "asda\naba");
        let loc = Location { source: &s, start: 0, len: 6 };
        let r = loc.render();
        assert_eq!(r.line, "asda");
        assert_eq!(r.len, 4);
    }

    #[test]
    fn test_add() {
        let s = Source::from_text("test", "hello there");
        let a = Location { source: &s, start: 0, len: 5 };
        let b = Location { source: &s, start: 6, len: 5 };
        assert_eq!(a + b, Location { source: &s, start: 0, len: 11 });
    }
}
