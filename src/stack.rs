//! # Single shot socket transmission
//!
//! Each [send()](Adapter::send) opens a TCP or UDP connection hosted by the modem firmware,
//! transmits the payload and closes the connection again. Once the connection was started, the
//! close command is always sent, independent of the transmission outcome.
//!
//! The transmission confirmation (`SEND OK`) is reported in [SendReport] but does not decide
//! about success. Success is determined by the mode, connect and close commands.
//!
//! ## Example
//!
//! ````
//! # use esp_at_telemetry::adapter::Adapter;
//! # use esp_at_telemetry::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_telemetry::stack::{PayloadStatus, SocketType};
//! #
//! let mut adapter: Adapter<'_, _, _, 1_000_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! let report = adapter.send(SocketType::Udp, "46.23.86.61", 9090, b"HELLO WE ARE CONNECTED!").unwrap();
//! assert_eq!(PayloadStatus::Confirmed, report.status);
//! assert!(adapter.send_ok());
//! ````
use crate::adapter::Adapter;
use crate::channel::CommandError;
use crate::commands::{CloseSocketCommand, ConnectCommand, TransmissionModeCommand, TransmissionPrepareCommand};
use crate::responses::{Completion, Terminal};
use crate::transport::Transport;
use core::fmt::Debug;
use fugit_timer::Timer;

/// Prompt sent by the modem when ready for receiving the payload
const SEND_PROMPT: u8 = b'>';

/// Connection type
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketType {
    Tcp,
    Udp,
}

impl SocketType {
    /// Connection type as used by `CIPSTART`
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketType::Tcp => "TCP",
            SocketType::Udp => "UDP",
        }
    }
}

/// Network related errors
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// Setting the transmission mode failed (CIPMODE command), no connection was started
    ModeError(CommandError),

    /// Connect command failed (CIPSTART command)
    ConnectError(CommandError),

    /// Closing the connection failed (CIPCLOSE command)
    CloseError(CommandError),
}

/// Outcome of the payload transmission
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadStatus {
    /// Modem confirmed the transmission
    Confirmed,

    /// Modem rejected the transmission (e.g. `SEND FAIL`)
    Rejected,

    /// No confirmation received, e.g. due to a timeout while waiting for prompt or confirmation
    Unconfirmed(CommandError),
}

/// Result of a successful send sequence
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SendReport {
    /// Payload length in bytes
    pub length: usize,

    /// Outcome of the payload transmission. Informational only.
    pub status: PayloadStatus,
}

/// Sends datagrams to a remote host
pub trait DatagramSender {
    type Error: Debug;

    /// Sends the payload as a single datagram
    fn send_datagram(&mut self, host: &str, port: u16, payload: &[u8]) -> Result<SendReport, Self::Error>;
}

impl<'a, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<'a, T, Tm, TIMER_HZ> {
    /// Opens a connection, sends the payload and closes the connection
    ///
    /// The failure is additionally stored and may be consumed by [send_ok()](Adapter::send_ok).
    pub fn send(
        &mut self,
        socket_type: SocketType,
        address: &str,
        port: u16,
        payload: &[u8],
    ) -> Result<SendReport, SendError> {
        self.last_send_failed = true;

        let report = self.transmit(socket_type, address, port, payload)?;

        self.last_send_failed = false;
        Ok(report)
    }

    /// Returns false if the last send failed. Failure is reset by this call.
    pub fn send_ok(&mut self) -> bool {
        let success = !self.last_send_failed;
        self.last_send_failed = false;
        success
    }

    fn transmit(
        &mut self,
        socket_type: SocketType,
        address: &str,
        port: u16,
        payload: &[u8],
    ) -> Result<SendReport, SendError> {
        self.execute(TransmissionModeCommand::normal())?;
        self.execute(ConnectCommand::new(socket_type, address, port))?;

        let status = self.send_payload(payload);
        match status {
            PayloadStatus::Confirmed => debug!("Transmission of {} bytes confirmed", payload.len()),
            PayloadStatus::Rejected => warn!("Transmission of {} bytes rejected", payload.len()),
            PayloadStatus::Unconfirmed(_) => warn!("Transmission of {} bytes unconfirmed", payload.len()),
        }

        // Connection is always closed once started
        self.execute(CloseSocketCommand)?;

        Ok(SendReport {
            length: payload.len(),
            status,
        })
    }

    /// Announces the payload length, waits for the prompt, writes the payload and awaits the confirmation
    fn send_payload(&mut self, payload: &[u8]) -> PayloadStatus {
        match self.try_send_payload(payload) {
            Ok(Terminal::Ok) => PayloadStatus::Confirmed,
            Ok(_) => PayloadStatus::Rejected,
            Err(error) => PayloadStatus::Unconfirmed(error),
        }
    }

    fn try_send_payload(&mut self, payload: &[u8]) -> Result<Terminal, CommandError> {
        self.push(&TransmissionPrepareCommand::new(payload.len()))?;
        self.read_until_byte(SEND_PROMPT, self.timeouts.send_ms)?;
        self.write_raw(payload)?;

        let response = self.receive_until(Completion::Transmission)?;
        Ok(response.terminal().unwrap_or(Terminal::Error))
    }
}

impl<'a, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> DatagramSender for Adapter<'a, T, Tm, TIMER_HZ> {
    type Error = SendError;

    fn send_datagram(&mut self, host: &str, port: u16, payload: &[u8]) -> Result<SendReport, SendError> {
        self.send(SocketType::Udp, host, port, payload)
    }
}
