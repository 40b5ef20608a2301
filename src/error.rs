use std::fmt;
use crate::source::Location;

pub trait Message {
    fn write_into<W: fmt::Write>(&self, to: &mut W) -> fmt::Result;

    fn render_to_string(&self) -> String {
        let mut text = String::new();
        self.write_into(&mut text).unwrap();
        text
    }

    fn render(&self) {
        eprint!("{}", self.render_to_string());
    }

    fn show_location<W: fmt::Write>(loc: &Location, to: &mut W) -> fmt::Result {
        let rendered = loc.render();
        writeln!(to, "In '{}':", loc.source.path)?;
        writeln!(to, "{: >4} | {}", rendered.line_no + 1, &rendered.line)?;
        writeln!(to, "       {}{}", " ".repeat(rendered.line_idx), "^".repeat(rendered.len))
    }

    fn show_note_location<W: fmt::Write>(loc: &Location, to: &mut W) -> fmt::Result {
        let rendered = loc.render();
        writeln!(to, " | In '{}':", loc.source.path)?;
        writeln!(to, " | {: >4} | {}", rendered.line_no + 1, &rendered.line)?;
        writeln!(to, " |        {}{}", " ".repeat(rendered.line_idx), "^".repeat(rendered.len))
    }
}
