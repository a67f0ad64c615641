//! # Response sets
//!
//! Responses are collected line by line until a [Completion] rule classifies a line as
//! terminal. The terminal line is part of the [Response].
use heapless::{String, Vec};

/// Max. length of a single response line. Longer lines get truncated.
pub const MAX_LINE_LENGTH: usize = 128;

/// Max. number of lines stored per response. Older lines get discarded first.
pub const MAX_RESPONSE_LINES: usize = 16;

/// Single response line without line delimiter
pub type Line = String<MAX_LINE_LENGTH>;

/// Terminal token of a response
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Terminal {
    /// Command succeeded
    Ok,
    /// Command was rejected by the modem
    Error,
    /// Command failed (e.g. joining an access point)
    Fail,
}

/// Completion rule, decides which lines terminate a response
#[derive(Copy, Clone)]
pub enum Completion {
    /// `OK` or `ERROR`
    Generic,

    /// `OK`, `ERROR` or `FAIL`. Asynchronous lines like `WIFI CONNECTED` are collected.
    Join,

    /// Any line ending with `OK` confirms the transmission, `SEND FAIL` and `ERROR` reject it.
    /// Suffix matching, as not every firmware responds with the exact literal `SEND OK`.
    Transmission,

    /// Custom classification
    Custom(fn(&str) -> Option<Terminal>),
}

impl core::fmt::Debug for Completion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Completion::Generic => f.write_str("Generic"),
            Completion::Join => f.write_str("Join"),
            Completion::Transmission => f.write_str("Transmission"),
            Completion::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl Completion {
    /// Returns the terminal token if the given (non-empty) line completes the response
    pub fn classify(&self, line: &str) -> Option<Terminal> {
        match self {
            Completion::Generic => match line {
                "OK" => Some(Terminal::Ok),
                "ERROR" => Some(Terminal::Error),
                _ => None,
            },
            Completion::Join => match line {
                "OK" => Some(Terminal::Ok),
                "ERROR" => Some(Terminal::Error),
                "FAIL" => Some(Terminal::Fail),
                _ => None,
            },
            Completion::Transmission => {
                if line.ends_with("OK") {
                    return Some(Terminal::Ok);
                }

                match line {
                    "SEND FAIL" => Some(Terminal::Fail),
                    "ERROR" => Some(Terminal::Error),
                    _ => None,
                }
            }
            Completion::Custom(classify) => classify(line),
        }
    }
}

/// Ordered response lines including the terminal line
#[derive(Clone, Debug, Default)]
pub struct Response {
    lines: Vec<Line, MAX_RESPONSE_LINES>,

    /// Terminal token, None while the response is still incomplete
    terminal: Option<Terminal>,

    /// Number of lines dropped due to capacity
    discarded: usize,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line. If full, the oldest line is dropped.
    pub(crate) fn push(&mut self, line: Line) {
        if self.lines.is_full() {
            self.lines.remove(0);
            self.discarded += 1;
        }

        // Capacity is ensured above
        let _ = self.lines.push(line);
    }

    pub(crate) fn terminate(&mut self, terminal: Terminal) {
        self.terminal = Some(terminal);
    }

    /// All stored lines, terminal line last
    pub fn lines(&self) -> &[Line] {
        self.lines.as_slice()
    }

    /// Iterator over all stored lines as string slices
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.as_str())
    }

    /// Number of stored lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The terminal line
    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(|line| line.as_str())
    }

    /// The line preceding the terminal line
    pub fn second_to_last(&self) -> Option<&str> {
        let length = self.lines.len();
        if length < 2 {
            return None;
        }

        Some(self.lines[length - 2].as_str())
    }

    /// Returns true if any stored line equals the given one
    pub fn contains(&self, line: &str) -> bool {
        self.iter().any(|candidate| candidate == line)
    }

    /// Returns the first line starting with the given prefix
    pub fn find_prefixed(&self, prefix: &str) -> Option<&str> {
        self.iter().find(|line| line.starts_with(prefix))
    }

    pub fn terminal(&self) -> Option<Terminal> {
        self.terminal
    }

    /// Number of lines discarded because the response exceeded [MAX_RESPONSE_LINES]
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// True if the terminal line equals `OK`
    pub fn is_ok(&self) -> bool {
        self.last() == Some("OK")
    }
}
