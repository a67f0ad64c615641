//! # WIFI access point client
//!
//! Joining and leaving a network and querying the attachment state is supported.
//! The attachment state is never cached, each [is_attached()](WifiAdapter::is_attached) queries
//! the modem.
//!
//! ## Example
//!
//! ````
//! # use esp_at_telemetry::adapter::Adapter;
//! # use esp_at_telemetry::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_telemetry::wifi::WifiAdapter;
//! #
//! let mut adapter: Adapter<'_, _, _, 1_000_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//! adapter.init((), 115_200).unwrap();
//!
//! // Joining the target WIFI access point
//! let state = adapter.join("test_wifi", "secret").unwrap();
//! assert!(state.attached);
//! assert!(adapter.is_attached().unwrap());
//!
//! adapter.detach().unwrap();
//! ````
use crate::adapter::Adapter;
use crate::channel::CommandError;
use crate::commands::{AccessPointConnectCommand, DisconnectCommand, JoinStatusCommand, WifiModeCommand};
use crate::responses::{Completion, Response, Terminal};
use crate::transport::Transport;
use core::fmt::Debug;
use fugit_timer::Timer;

/// Wifi network adapter trait
pub trait WifiAdapter {
    /// Error when joining a WIFI network
    type JoinError: Debug;

    /// Error of status and disconnect commands
    type CommandError: Debug;

    /// Connects to an WIFI access point and returns the connection state
    fn join(&mut self, ssid: &str, key: &str) -> Result<JoinState, Self::JoinError>;

    /// Returns true if the modem is currently attached to an access point
    fn is_attached(&mut self) -> Result<bool, Self::CommandError>;

    /// Leaves the current access point
    fn detach(&mut self) -> Result<(), Self::CommandError>;
}

/// Possible errors when joining an access point
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JoinError {
    /// Error wile setting WIFI mode to station
    ModeError(CommandError),

    /// Error while sending the credentials or receiving the join result
    ConnectError(CommandError),

    /// Given SSD is longer then the max. size of 32 chars
    InvalidSSDLength,

    /// Given password is longer then the max. size of 63 chars
    InvalidPasswordLength,
}

/// Reason of a failed join, reported by the modem as `+CWJAP:<code>`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JoinFailure {
    /// Connection timeout
    Timeout,
    /// Wrong password
    WrongPassword,
    /// Target access point not found
    AccessPointNotFound,
    /// Connection failed
    ConnectionFailed,
    /// Unknown error code
    Unknown,
}

impl JoinFailure {
    /// Parses a `+CWJAP:<code>` line
    pub(crate) fn from_line(line: &str) -> Option<Self> {
        let code = line.strip_prefix("+CWJAP:")?;

        Some(match code.trim() {
            "1" => Self::Timeout,
            "2" => Self::WrongPassword,
            "3" => Self::AccessPointNotFound,
            "4" => Self::ConnectionFailed,
            _ => Self::Unknown,
        })
    }
}

/// Result of a join attempt
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JoinState {
    /// True if an IP was assigned, signaled by `WIFI GOT IP` as second-to-last line
    pub attached: bool,

    /// True if the modem reported `WIFI CONNECTED`
    pub connected: bool,

    /// Terminal token of the join response
    pub terminal: Terminal,

    /// Failure reason if reported by the modem
    pub failure: Option<JoinFailure>,
}

impl JoinState {
    pub(crate) fn from_response(response: &Response) -> Self {
        let failure = response.find_prefixed("+CWJAP:").and_then(JoinFailure::from_line);

        Self {
            attached: response.second_to_last() == Some("WIFI GOT IP"),
            connected: response.contains("WIFI CONNECTED"),
            terminal: response.terminal().unwrap_or(Terminal::Error),
            failure,
        }
    }
}

impl<'a, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> WifiAdapter for Adapter<'a, T, Tm, TIMER_HZ> {
    type JoinError = JoinError;
    type CommandError = CommandError;

    /// Switches to station mode and joins the given access point
    ///
    /// A `FAIL` or `ERROR` result is not returned as error but as not attached [JoinState].
    fn join(&mut self, ssid: &str, key: &str) -> Result<JoinState, JoinError> {
        if ssid.len() > 32 {
            return Err(JoinError::InvalidSSDLength);
        }

        if key.len() > 63 {
            return Err(JoinError::InvalidPasswordLength);
        }

        self.execute(WifiModeCommand::station_mode())?;

        let response = self.connect_access_point(ssid, key).map_err(JoinError::ConnectError)?;
        let state = JoinState::from_response(&response);
        debug!("Join result: attached={}, connected={}", state.attached, state.connected);

        Ok(state)
    }

    /// Queries the joined access point
    ///
    /// Less then two response lines or a `No AP` response are treated as not attached.
    fn is_attached(&mut self) -> Result<bool, CommandError> {
        let response = self.send_command(&JoinStatusCommand)?;

        Ok(response.len() >= 2 && response.second_to_last() != Some("No AP") && response.is_ok())
    }

    /// Leaves the current access point
    fn detach(&mut self) -> Result<(), CommandError> {
        let response = self.send_command(&DisconnectCommand)?;
        Self::assert_ok(&response)
    }
}

impl<'a, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<'a, T, Tm, TIMER_HZ> {
    /// Sends the WIFI credentials and collects all lines including asynchronous notifications
    fn connect_access_point(&mut self, ssid: &str, key: &str) -> Result<Response, CommandError> {
        self.push(&AccessPointConnectCommand::new(ssid, key))?;
        self.receive_until(Completion::Join)
    }
}
