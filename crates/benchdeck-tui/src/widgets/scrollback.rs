//! Line buffer for the terminal pane.
//!
//! The controller's shell writes a VT byte stream. The pane is not a full
//! terminal emulator: it keeps text lines, honours CR, LF, backspace and
//! tab, treats `ESC [ 2 J` as a clear, and drops every other escape
//! sequence (colors, cursor movement, OSC titles).

use std::collections::VecDeque;

/// Lines kept above the live line.
pub const DEFAULT_CAPACITY: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Parse {
    #[default]
    Ground,
    Escape,
    /// `ESC (` / `ESC )` charset designation: one more byte follows.
    Charset,
    Csi,
    Osc,
    /// ESC seen inside an OSC; `\` ends it.
    OscEscape,
}

#[derive(Debug)]
pub struct Scrollback {
    lines: VecDeque<String>,
    current: String,
    capacity: usize,
    parse: Parse,
    csi_params: String,
    /// A CR was seen; the next printable overwrites the line.
    pending_cr: bool,
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Scrollback {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            current: String::new(),
            capacity: capacity.max(1),
            parse: Parse::Ground,
            csi_params: String::new(),
            pending_cr: false,
        }
    }

    /// Feed raw terminal output.
    pub fn push(&mut self, text: &str) {
        for c in text.chars() {
            self.feed(c);
        }
    }

    fn feed(&mut self, c: char) {
        match self.parse {
            Parse::Ground => self.ground(c),
            Parse::Escape => {
                self.parse = match c {
                    '[' => {
                        self.csi_params.clear();
                        Parse::Csi
                    }
                    ']' => Parse::Osc,
                    '(' | ')' => Parse::Charset,
                    _ => Parse::Ground,
                };
            }
            Parse::Charset => self.parse = Parse::Ground,
            Parse::Csi => {
                if ('\u{40}'..='\u{7e}').contains(&c) {
                    self.parse = Parse::Ground;
                    if c == 'J' && matches!(self.csi_params.as_str(), "2" | "3") {
                        self.clear();
                    }
                } else {
                    self.csi_params.push(c);
                }
            }
            Parse::Osc => match c {
                '\u{07}' => self.parse = Parse::Ground,
                '\u{1b}' => self.parse = Parse::OscEscape,
                _ => {}
            },
            Parse::OscEscape => {
                self.parse = if c == '\\' { Parse::Ground } else { Parse::Osc };
            }
        }
    }

    fn ground(&mut self, c: char) {
        match c {
            '\u{1b}' => self.parse = Parse::Escape,
            '\n' => {
                self.pending_cr = false;
                self.newline();
            }
            '\r' => self.pending_cr = true,
            '\u{08}' => {
                self.current.pop();
            }
            '\t' => {
                self.overwrite_if_cr();
                let pad = 8 - self.current.chars().count() % 8;
                self.current.extend(std::iter::repeat_n(' ', pad));
            }
            c if c.is_control() => {}
            c => {
                self.overwrite_if_cr();
                self.current.push(c);
            }
        }
    }

    fn overwrite_if_cr(&mut self) {
        if self.pending_cr {
            self.current.clear();
            self.pending_cr = false;
        }
    }

    fn newline(&mut self) {
        let line = std::mem::take(&mut self.current);
        self.lines.push_back(line);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.current.clear();
        self.pending_cr = false;
    }

    /// Number of lines including the live one.
    pub fn len(&self) -> usize {
        self.lines.len() + 1
    }

    /// The `rows` lines ending `offset` lines above the bottom.
    pub fn window(&self, rows: usize, offset: usize) -> Vec<&str> {
        let all: Vec<&str> = self
            .lines
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.current.as_str()))
            .collect();
        let end = all.len().saturating_sub(offset);
        let start = end.saturating_sub(rows);
        all[start..end].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn strips_colors_and_keeps_text() {
        let mut sb = Scrollback::default();
        sb.push("\u{1b}[1;32mpi@bench\u{1b}[0m:~$ ls\r\nlog.txt\r\n");
        assert_eq!(sb.window(10, 0), vec!["pi@bench:~$ ls", "log.txt", ""]);
    }

    #[test]
    fn carriage_return_overwrites_and_backspace_erases() {
        let mut sb = Scrollback::default();
        sb.push("progress 10%\rprogress 99%");
        sb.push("\u{08}\u{08}\u{08}100%");
        assert_eq!(sb.window(1, 0), vec!["progress 100%"]);
    }

    #[test]
    fn osc_title_is_dropped() {
        let mut sb = Scrollback::default();
        sb.push("\u{1b}]0;pi@bench: ~\u{07}$ ");
        sb.push("\u{1b}]2;other\u{1b}\\x");
        assert_eq!(sb.window(1, 0), vec!["$ x"]);
    }

    #[test]
    fn clear_screen_empties_buffer() {
        let mut sb = Scrollback::default();
        sb.push("one\ntwo\n");
        sb.push("\u{1b}[H\u{1b}[2Jthree");
        assert_eq!(sb.window(5, 0), vec!["three"]);
    }

    #[test]
    fn capacity_and_window_offset() {
        let mut sb = Scrollback::new(3);
        sb.push("a\nb\nc\nd\ne");
        assert_eq!(sb.len(), 4);
        assert_eq!(sb.window(2, 0), vec!["d", "e"]);
        assert_eq!(sb.window(2, 1), vec!["c", "d"]);
        assert_eq!(sb.window(10, 10), Vec::<&str>::new());
    }
}
