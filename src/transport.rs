//! # Serial transport
//!
//! The adapter talks to the modem through a single serial peripheral, which is shared with the
//! debug console. Board support code implements [Transport] on top of its UART driver.
use embedded_io::{Read, ReadReady, Write};

/// Serial link to the modem
///
/// Byte I/O is based on [embedded_io]. `read_ready()` must not block, as it's used for polling
/// while timeouts are measured. `flush()` must block until all written bytes left the UART.
pub trait Transport: Read + Write + ReadReady {
    /// Board specific pin pair the modem is wired to
    type Pins: Copy;

    /// Routes the serial peripheral to the given pins at the given baud rate
    fn redirect(&mut self, pins: Self::Pins, baud: u32) -> Result<(), Self::Error>;

    /// Routes the serial peripheral back to the default console (e.g. USB)
    fn reset_to_console(&mut self) -> Result<(), Self::Error>;

    /// Sets the receive buffer capacity in bytes
    fn set_receive_buffer_size(&mut self, size: usize) -> Result<(), Self::Error>;
}

/// Pins and baud rate the modem is currently attached with
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModemLink<P> {
    pub pins: P,
    pub baud: u32,
}

impl<P: Copy> ModemLink<P> {
    pub fn new(pins: P, baud: u32) -> Self {
        Self { pins, baud }
    }
}
