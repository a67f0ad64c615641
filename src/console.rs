//! # Debug console
//!
//! The modem and the debug console share a single serial peripheral. For writing to the console
//! the peripheral is temporarily routed away from the modem. [ConsoleGuard] restores the modem
//! link when dropped, so the link is reattached on every exit path.
//!
//! Output format:
//! * `log()`: `<prefix> <message>`
//! * `log_array()`: `<prefix> (<length>) <message>` per message
use crate::adapter::{pause, Adapter};
use crate::channel::CommandError;
use crate::transport::{ModemLink, Transport};
use fugit_timer::Timer;
use numtoa::NumToA;

/// Settle time in ms before and after switching the serial route
pub const CONSOLE_SETTLE_MS: u32 = 100;

/// Scoped access to the console. Serial route is switched back to the modem on drop.
pub struct ConsoleGuard<'g, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    transport: &'g mut T,
    timer: &'g mut Tm,
    link: ModemLink<T::Pins>,
}

impl<'g, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> ConsoleGuard<'g, T, Tm, TIMER_HZ> {
    /// Routes the transport to the console
    pub fn acquire(transport: &'g mut T, timer: &'g mut Tm, link: ModemLink<T::Pins>) -> Result<Self, CommandError> {
        pause(&mut *timer, CONSOLE_SETTLE_MS)?;

        if let Err(error) = transport.reset_to_console() {
            let _ = transport.redirect(link.pins, link.baud);
            return Err(CommandError::transport(error));
        }

        Ok(Self { transport, timer, link })
    }

    /// Writes all parts followed by CRLF
    pub fn write_line(&mut self, parts: &[&str]) -> Result<(), CommandError> {
        for part in parts {
            self.transport
                .write_all(part.as_bytes())
                .map_err(CommandError::transport)?;
        }

        self.transport.write_all(b"\r\n").map_err(CommandError::transport)
    }
}

impl<T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> Drop for ConsoleGuard<'_, T, Tm, TIMER_HZ> {
    fn drop(&mut self) {
        if self.transport.flush().is_err() {
            warn!("Flushing console output failed");
        }

        if self.transport.redirect(self.link.pins, self.link.baud).is_err() {
            warn!("Reattaching modem link failed");
        }

        let _ = pause(&mut *self.timer, CONSOLE_SETTLE_MS);
    }
}

impl<'a, T: Transport, Tm: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<'a, T, Tm, TIMER_HZ> {
    /// Logs a message to the console, if debug is enabled and the modem link is initialized
    pub fn log(&mut self, prefix: &str, message: &str) {
        let Some(mut console) = self.console() else {
            return;
        };

        if console.write_line(&[prefix, " ", message]).is_err() {
            warn!("Writing to console failed");
        }
    }

    /// Logs multiple messages including their length, if debug is enabled and the modem link is initialized
    pub fn log_array<'m, I: IntoIterator<Item = &'m str>>(&mut self, prefix: &str, messages: I) {
        let Some(mut console) = self.console() else {
            return;
        };

        for message in messages {
            let mut buffer = [0x0; 20];
            let length = (message.len() as u32).numtoa_str(10, &mut buffer);

            if console.write_line(&[prefix, " (", length, ") ", message]).is_err() {
                warn!("Writing to console failed");
                return;
            }
        }
    }

    /// Acquires the console, returns None if debug is disabled or no modem link exists
    fn console(&mut self) -> Option<ConsoleGuard<'_, T, Tm, TIMER_HZ>> {
        if !self.debug {
            return None;
        }

        let link = self.link?;
        match ConsoleGuard::acquire(&mut self.transport, &mut self.timer, link) {
            Ok(console) => Some(console),
            Err(_) => {
                warn!("Switching to console failed");
                None
            }
        }
    }
}
