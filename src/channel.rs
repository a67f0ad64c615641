//! # AT command channel
//!
//! Low level command/response exchange with the modem. Commands are written as
//! `AT<command>\r\n`, responses are collected line by line until the [Completion] rule of the
//! command family matches. Empty lines never complete a response.
//!
//! Waiting for response bytes is bounded by a timeout (s. [Timeouts](crate::adapter::Timeouts))
//! and may be aborted by a [CancelSignal](crate::adapter::CancelSignal).
//!
//! ## Example
//!
//! ````
//! # use esp_at_telemetry::adapter::Adapter;
//! # use esp_at_telemetry::example::{ExampleTimer, ExampleTransport};
//! #
//! let mut adapter: Adapter<'_, _, _, 1_000_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! let response = adapter.send_at("+GMR").unwrap();
//! assert_eq!(Some("AT version:1.3.0.0(Jul 14 2016 18:54:01)"), response.iter().next());
//! assert_eq!(Some("OK"), response.last());
//!
//! assert!(adapter.expect_ok("+CWMODE=1").is_ok());
//! ````
use crate::adapter::{pause, Adapter, COMMAND_SETTLE_MS};
use crate::commands::{AtCommand, CommandBuffer, CommandErrorHandler, RawCommand};
use crate::responses::{Completion, Line, Response, Terminal, MAX_LINE_LENGTH};
use crate::transport::Transport;
use embedded_io::ErrorKind;
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use heapless::Vec;

/// Errors of a single command exchange
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Upstream transport error
    Transport(ErrorKind),

    /// Modem did not complete the response in time
    Timeout,

    /// Waiting was aborted by the cancel signal
    Cancelled,

    /// Upstream timer error
    TimerError,

    /// Modem explicitly rejected the command
    Rejected(Terminal),

    /// Encoded command exceeds the command buffer
    CommandTooLong,
}

impl CommandError {
    pub(crate) fn transport<E: embedded_io::Error>(error: E) -> Self {
        Self::Transport(error.kind())
    }
}

impl<'a, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<'a, T, Tm, TIMER_HZ> {
    /// Sends the given command (without `AT` prefix) and ignores the response completely
    pub fn push_at(&mut self, command: &str) -> Result<(), CommandError> {
        self.push(&RawCommand::new(command))
    }

    /// Sends the given command (without `AT` prefix) and collects all response lines until `OK`
    /// or `ERROR`. The terminal line is included, an `ERROR` response is not treated as error.
    pub fn send_at(&mut self, command: &str) -> Result<Response, CommandError> {
        self.send_command(&RawCommand::new(command))
    }

    /// Sends the given command (without `AT` prefix) and returns Ok if the last response line is `OK`
    pub fn expect_ok(&mut self, command: &str) -> Result<(), CommandError> {
        let response = self.send_at(command)?;
        Self::assert_ok(&response)
    }

    /// Collects response lines until the completion rule matches a line
    ///
    /// Timeout is selected based on the command family, s. [Timeouts](crate::adapter::Timeouts).
    pub fn receive_until(&mut self, completion: Completion) -> Result<Response, CommandError> {
        let timeout = self.timeouts.for_completion(completion);
        self.start_timer(timeout)?;

        let mut response = Response::new();
        let terminal = loop {
            let line = self.read_line()?;
            if line.is_empty() {
                continue;
            }

            let terminal = completion.classify(line.as_str());
            response.push(line);

            if let Some(terminal) = terminal {
                break terminal;
            }
        };
        response.terminate(terminal);

        for line in response.iter() {
            trace!("<<< {}", line);
        }

        if self.debug {
            self.log_array("---", response.iter());
        }

        Ok(response)
    }

    /// Encodes and writes the command, no response is awaited
    pub(crate) fn push<Cmd: AtCommand>(&mut self, command: &Cmd) -> Result<(), CommandError> {
        let mut buffer = CommandBuffer::new();
        buffer.push_str("AT").map_err(|_| CommandError::CommandTooLong)?;
        command
            .write_body(&mut buffer)
            .map_err(|_| CommandError::CommandTooLong)?;

        debug!("+++ {}", buffer.as_str());
        if self.debug {
            self.log("+++", buffer.as_str());
        }

        buffer.push_str("\r\n").map_err(|_| CommandError::CommandTooLong)?;
        self.transport
            .write_all(buffer.as_bytes())
            .map_err(CommandError::transport)?;
        self.transport.flush().map_err(CommandError::transport)
    }

    /// Sends the command after a short settle delay and collects the response until `OK` or `ERROR`
    pub(crate) fn send_command<Cmd: AtCommand>(&mut self, command: &Cmd) -> Result<Response, CommandError> {
        pause(&mut self.timer, COMMAND_SETTLE_MS)?;
        self.push(command)?;
        self.receive_until(Completion::Generic)
    }

    /// Sends a command which is required to succeed and maps the error if the command failed
    pub(crate) fn execute<Cmd: AtCommand + CommandErrorHandler>(&mut self, command: Cmd) -> Result<Response, Cmd::Error> {
        let response = self.send_command(&command).map_err(|error| command.command_error(error))?;
        Self::assert_ok(&response).map_err(|error| command.command_error(error))?;
        Ok(response)
    }

    /// Writes raw (non command) bytes
    pub(crate) fn write_raw(&mut self, data: &[u8]) -> Result<(), CommandError> {
        self.transport.write_all(data).map_err(CommandError::transport)?;
        self.transport.flush().map_err(CommandError::transport)
    }

    /// Discards bytes until the given byte was read
    pub(crate) fn read_until_byte(&mut self, needle: u8, timeout_ms: u32) -> Result<(), CommandError> {
        self.start_timer(timeout_ms)?;

        while self.read_byte()? != needle {}
        Ok(())
    }

    /// Discards all currently buffered bytes
    pub(crate) fn discard_input(&mut self) -> Result<usize, CommandError> {
        let mut buffer = [0x0; 32];
        let mut discarded = usize::from(self.lookahead.take().is_some());

        while self.transport.read_ready().map_err(CommandError::transport)? {
            let length = self.transport.read(&mut buffer).map_err(CommandError::transport)?;
            if length == 0 {
                break;
            }

            discarded += length;
        }

        Ok(discarded)
    }

    /// Returns an error if the response was not terminated by `OK`
    pub(crate) fn assert_ok(response: &Response) -> Result<(), CommandError> {
        if response.is_ok() {
            return Ok(());
        }

        Err(CommandError::Rejected(response.terminal().unwrap_or(Terminal::Error)))
    }

    /// Reads a line delimited by CR, LF or CRLF
    fn read_line(&mut self) -> Result<Line, CommandError> {
        let mut bytes: Vec<u8, MAX_LINE_LENGTH> = Vec::new();
        let mut truncated = false;

        loop {
            match self.read_byte()? {
                b'\r' => {
                    self.skip_line_feed()?;
                    break;
                }
                b'\n' => break,
                byte => {
                    if bytes.push(byte).is_err() {
                        truncated = true;
                    }
                }
            }
        }

        if truncated {
            warn!("Response line truncated to {} bytes", bytes.len());
        }

        Ok(decode_line(&bytes))
    }

    /// Consumes a LF directly following a CR. Any other byte is kept for the next read.
    fn skip_line_feed(&mut self) -> Result<(), CommandError> {
        if !self.transport.read_ready().map_err(CommandError::transport)? {
            return Ok(());
        }

        let mut buffer = [0x0; 1];
        let length = self.transport.read(&mut buffer).map_err(CommandError::transport)?;

        if length == 1 && buffer[0] != b'\n' {
            self.lookahead = Some(buffer[0]);
        }

        Ok(())
    }

    /// Polls a single byte until the running timer expires
    fn read_byte(&mut self) -> Result<u8, CommandError> {
        loop {
            if self.is_cancelled() {
                warn!("Waiting for modem response cancelled");
                return Err(CommandError::Cancelled);
            }

            if let Some(byte) = self.lookahead.take() {
                return Ok(byte);
            }

            if self.transport.read_ready().map_err(CommandError::transport)? {
                let mut buffer = [0x0; 1];
                let length = self.transport.read(&mut buffer).map_err(CommandError::transport)?;

                if length == 1 {
                    return Ok(buffer[0]);
                }
            }

            match self.timer.wait() {
                Ok(_) => {
                    warn!("Timeout while waiting for modem response");
                    return Err(CommandError::Timeout);
                }
                Err(error) => match error {
                    nb::Error::Other(_) => return Err(CommandError::TimerError),
                    nb::Error::WouldBlock => {}
                },
            }
        }
    }

    fn start_timer(&mut self, timeout_ms: u32) -> Result<(), CommandError> {
        self.timer
            .start(TimerDurationU32::millis(timeout_ms))
            .map_err(|_| CommandError::TimerError)
    }

    /// Consumes a pending cancel signal
    fn is_cancelled(&self) -> bool {
        match self.cancel {
            Some(signal) => signal.try_take().is_some(),
            None => false,
        }
    }
}

/// Decodes a line as UTF-8, each invalid sequence is replaced by `?`
fn decode_line(mut bytes: &[u8]) -> Line {
    let mut line = Line::new();

    loop {
        match core::str::from_utf8(bytes) {
            Ok(text) => {
                push_truncated(&mut line, text);
                return line;
            }
            Err(error) => {
                let (valid, invalid) = bytes.split_at(error.valid_up_to());
                if let Ok(text) = core::str::from_utf8(valid) {
                    push_truncated(&mut line, text);
                }
                push_truncated(&mut line, "?");

                let skipped = error.error_len().unwrap_or(invalid.len());
                bytes = &invalid[skipped..];
            }
        }
    }
}

fn push_truncated(line: &mut Line, text: &str) {
    for character in text.chars() {
        if line.push(character).is_err() {
            return;
        }
    }
}
