use crate::channel::CommandError;
use crate::stack::{SendError, SocketType};
use crate::wifi::JoinError;
use core::fmt::Write;
use heapless::String;

/// Max. length of an encoded command including `AT` prefix and line delimiter
pub(crate) const MAX_COMMAND_LENGTH: usize = 192;

pub(crate) type CommandBuffer = String<MAX_COMMAND_LENGTH>;

/// AT command, encoded without the `AT` prefix and without line delimiter
pub(crate) trait AtCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result;
}

/// Trait for mapping command errors
pub(crate) trait CommandErrorHandler {
    type Error;

    /// Maps channel errors to the error type of the calling operation
    fn command_error(&self, error: CommandError) -> Self::Error;
}

/// Arbitrary command text
pub(crate) struct RawCommand<'a> {
    text: &'a str,
}

impl<'a> RawCommand<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

impl AtCommand for RawCommand<'_> {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        buffer.write_str(self.text)
    }
}

/// Reconfigures the UART of the modem, not stored in flash
pub(crate) struct UartConfigCommand;

impl AtCommand for UartConfigCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        // 115200 baud, 8 data bits, 1 stop bit, no parity, no flow control
        buffer.write_str("+UART=115200,8,1,0,0")
    }
}

/// Soft reset
pub(crate) struct RestartCommand;

impl AtCommand for RestartCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        buffer.write_str("+RST")
    }
}

/// Disables command echo
pub(crate) struct DisableEchoCommand;

impl AtCommand for DisableEchoCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        buffer.write_str("E0")
    }
}

/// Queries AT and SDK version information
pub(crate) struct VersionCommand;

impl AtCommand for VersionCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        buffer.write_str("+GMR")
    }
}

/// Sets the WIFI mode
pub(crate) struct WifiModeCommand {
    /// WIFI mode:
    ///     0: Null mode. Wi-Fi RF will be disabled.
    ///     1: Station mode.
    ///     2: SoftAP mode.
    ///     3: SoftAP+Station mode.
    mode: usize,
}

impl WifiModeCommand {
    pub fn station_mode() -> Self {
        Self { mode: 1 }
    }
}

impl AtCommand for WifiModeCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        write!(buffer, "+CWMODE={}", self.mode)
    }
}

impl CommandErrorHandler for WifiModeCommand {
    type Error = JoinError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        JoinError::ModeError(error)
    }
}

/// Command for joining the target WIFI access point
pub(crate) struct AccessPointConnectCommand<'a> {
    /// The SSID of the target access point
    ssid: &'a str,

    /// The password/key of the target access point
    password: &'a str,
}

impl<'a> AccessPointConnectCommand<'a> {
    pub fn new(ssid: &'a str, password: &'a str) -> Self {
        Self { ssid, password }
    }
}

impl AtCommand for AccessPointConnectCommand<'_> {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        write!(buffer, "+CWJAP=\"{}\",\"{}\"", self.ssid, self.password)
    }
}

/// Queries the access point the modem is joined to
pub(crate) struct JoinStatusCommand;

impl AtCommand for JoinStatusCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        buffer.write_str("+CWJAP?")
    }
}

/// Leaves the current access point
pub(crate) struct DisconnectCommand;

impl AtCommand for DisconnectCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        buffer.write_str("+CWQAP")
    }
}

/// Sets the transmission mode
pub(crate) struct TransmissionModeCommand {
    /// 0: normal transmission mode, 1: transparent (passthrough) mode
    mode: usize,
}

impl TransmissionModeCommand {
    pub fn normal() -> Self {
        Self { mode: 0 }
    }
}

impl AtCommand for TransmissionModeCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        write!(buffer, "+CIPMODE={}", self.mode)
    }
}

impl CommandErrorHandler for TransmissionModeCommand {
    type Error = SendError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        SendError::ModeError(error)
    }
}

/// Establish TCP Connection or UDP Transmission
pub(crate) struct ConnectCommand<'a> {
    /// Connection type
    socket_type: SocketType,

    /// Remote host name or IP address
    remote_host: &'a str,

    /// Remote port
    port: u16,
}

impl<'a> ConnectCommand<'a> {
    pub fn new(socket_type: SocketType, remote_host: &'a str, port: u16) -> Self {
        Self {
            socket_type,
            remote_host,
            port,
        }
    }
}

impl AtCommand for ConnectCommand<'_> {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        write!(
            buffer,
            "+CIPSTART=\"{}\",\"{}\",{}",
            self.socket_type.as_str(),
            self.remote_host,
            self.port
        )
    }
}

impl CommandErrorHandler for ConnectCommand<'_> {
    type Error = SendError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        SendError::ConnectError(error)
    }
}

/// Announces the given number of payload bytes, answered by a `>` prompt
pub(crate) struct TransmissionPrepareCommand {
    length: usize,
}

impl TransmissionPrepareCommand {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl AtCommand for TransmissionPrepareCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        write!(buffer, "+CIPSEND={}", self.length)
    }
}

/// Closes the current connection
pub(crate) struct CloseSocketCommand;

impl AtCommand for CloseSocketCommand {
    fn write_body(&self, buffer: &mut CommandBuffer) -> core::fmt::Result {
        buffer.write_str("+CIPCLOSE")
    }
}

impl CommandErrorHandler for CloseSocketCommand {
    type Error = SendError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        SendError::CloseError(error)
    }
}
