//! # Modem adapter
//!
//! [Adapter] owns the serial transport, the timer and all session state. WIFI, socket and
//! console functionality is implemented on top of it in the respective modules.
use crate::channel::CommandError;
use crate::commands::{DisableEchoCommand, RestartCommand, UartConfigCommand, VersionCommand};
use crate::responses::{Completion, Response};
use crate::transport::{ModemLink, Transport};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use fugit::TimerDurationU32;
use fugit_timer::Timer;

/// Baud rate the modem is expected to listen on before reconfiguration
pub const FALLBACK_BAUD: u32 = 9_600;

/// Settle time after a soft reset in ms
pub const RESET_SETTLE_MS: u32 = 1_500;

/// Receive buffer size requested from the transport after initialization
pub const RECEIVE_BUFFER_SIZE: usize = 254;

/// Delay in ms before sending a command that awaits a response
pub const COMMAND_SETTLE_MS: u32 = 100;

/// Signal for aborting a pending response wait
pub type CancelSignal = Signal<CriticalSectionRawMutex, ()>;

/// Response timeouts per command family
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Timeout for regular commands in ms
    pub command_ms: u32,

    /// Timeout for joining an access point in ms
    pub join_ms: u32,

    /// Timeout for the send prompt and the transmission confirmation in ms
    pub send_ms: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_ms: 5_000,
            join_ms: 20_000,
            send_ms: 5_000,
        }
    }
}

impl Timeouts {
    pub(crate) fn for_completion(&self, completion: Completion) -> u32 {
        match completion {
            Completion::Generic | Completion::Custom(_) => self.command_ms,
            Completion::Join => self.join_ms,
            Completion::Transmission => self.send_ms,
        }
    }
}

/// Central client for modem communication
///
/// TIMER_HZ: Frequency of the timer used for delays and timeout measurement
pub struct Adapter<'a, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    /// Serial link to the modem
    pub(crate) transport: T,

    /// Timer used for delays and timeout measurement
    pub(crate) timer: Tm,

    /// Response timeouts
    pub(crate) timeouts: Timeouts,

    /// Pins and baud rate of the modem. None until initialized.
    pub(crate) link: Option<ModemLink<T::Pins>>,

    /// True if commands and responses are mirrored to the console
    pub(crate) debug: bool,

    /// True => Last transmission failed and the failure was not consumed by `send_ok()` yet
    pub(crate) last_send_failed: bool,

    /// Byte read ahead after a CR line delimiter
    pub(crate) lookahead: Option<u8>,

    /// Optional signal for aborting a pending response wait
    pub(crate) cancel: Option<&'a CancelSignal>,
}

impl<'a, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<'a, T, Tm, TIMER_HZ> {
    /// Creates a new adapter. Transport is expected to be connected to the modem already,
    /// otherwise [init()](Adapter::init) needs to be called.
    pub fn new(transport: T, timer: Tm) -> Self {
        Self {
            transport,
            timer,
            timeouts: Timeouts::default(),
            link: None,
            debug: false,
            last_send_failed: false,
            lookahead: None,
            cancel: None,
        }
    }

    /// Attaches the serial link to the modem, resets the modem and disables command echo
    ///
    /// The modem UART is forced to 115200 8N1 before reset, afterwards the link is reconnected at
    /// the given baud rate.
    pub fn init(&mut self, pins: T::Pins, baud: u32) -> Result<(), CommandError> {
        self.attach_link(ModemLink::new(pins, FALLBACK_BAUD))?;

        self.push(&UartConfigCommand)?;
        self.push(&RestartCommand)?;
        pause(&mut self.timer, RESET_SETTLE_MS)?;

        self.attach_link(ModemLink::new(pins, baud))?;
        self.transport
            .set_receive_buffer_size(RECEIVE_BUFFER_SIZE)
            .map_err(CommandError::transport)?;

        let discarded = self.discard_input()?;
        debug!("Discarded {} bytes after modem reset", discarded);

        let response = self.send_command(&DisableEchoCommand)?;
        Self::assert_ok(&response)
    }

    /// Checks if the modem responds to a bare `AT`
    pub fn ping(&mut self) -> Result<(), CommandError> {
        self.expect_ok("")
    }

    /// Returns the AT and SDK version lines (`+GMR`), terminated by `OK`
    pub fn firmware_version(&mut self) -> Result<Response, CommandError> {
        self.send_command(&VersionCommand)
    }

    /// Enables/Disables mirroring of commands and responses to the console
    pub fn enable_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    /// Registers a signal, which aborts any pending response wait with [CommandError::Cancelled].
    /// The signal is consumed by the aborted operation.
    pub fn set_cancel_signal(&mut self, signal: &'a CancelSignal) {
        self.cancel = Some(signal);
    }

    /// Sets the timeout for regular commands in ms
    pub fn set_command_timeout_ms(&mut self, timeout: u32) {
        self.timeouts.command_ms = timeout;
    }

    /// Sets the timeout for joining an access point in ms
    pub fn set_join_timeout_ms(&mut self, timeout: u32) {
        self.timeouts.join_ms = timeout;
    }

    /// Sets the timeout for sending socket data in ms
    pub fn set_send_timeout_ms(&mut self, timeout: u32) {
        self.timeouts.send_ms = timeout;
    }

    /// Current response timeouts
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Current modem link, None if not initialized
    pub fn link(&self) -> Option<ModemLink<T::Pins>> {
        self.link
    }

    /// Releases transport and timer
    pub fn release(self) -> (T, Tm) {
        (self.transport, self.timer)
    }

    fn attach_link(&mut self, link: ModemLink<T::Pins>) -> Result<(), CommandError> {
        self.transport
            .redirect(link.pins, link.baud)
            .map_err(CommandError::transport)?;
        self.link = Some(link);
        Ok(())
    }
}

/// Blocks for the given duration
pub(crate) fn pause<Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32>(timer: &mut Tm, ms: u32) -> Result<(), CommandError> {
    timer
        .start(TimerDurationU32::millis(ms))
        .map_err(|_| CommandError::TimerError)?;
    nb::block!(timer.wait()).map_err(|_| CommandError::TimerError)
}
