//! Mocks for doc examples
use crate::identity::Cipher;
use crate::transport::Transport;
use core::fmt::Write as _;
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::{Deque, String, Vec};

/// Simulated ESP-AT modem with canned responses
#[derive(Default)]
pub struct ExampleTransport {
    /// Bytes pending to be read
    rx: Deque<u8, 512>,

    /// Command bytes received since the last line delimiter
    command: Vec<u8, 256>,

    /// Remaining payload bytes announced by `CIPSEND`
    pending_payload: usize,

    /// Announced payload length
    payload_length: usize,

    /// True while routed to the console, written bytes are dropped
    console: bool,
}

impl ExampleTransport {
    fn reply(&mut self, data: &[u8]) {
        for byte in data {
            let _ = self.rx.push_back(*byte);
        }
    }

    fn receive_byte(&mut self, byte: u8) {
        if self.pending_payload > 0 {
            self.pending_payload -= 1;

            if self.pending_payload == 0 {
                let mut confirmation: String<64> = String::new();
                let _ = write!(confirmation, "\r\nRecv {} bytes\r\n\r\nSEND OK\r\n", self.payload_length);
                self.reply(confirmation.as_bytes());
            }
            return;
        }

        if self.command.push(byte).is_err() {
            self.command.clear();
            return;
        }

        if self.command.ends_with(b"\r\n") {
            let command = core::mem::take(&mut self.command);
            self.respond(&command[..command.len() - 2]);
        }
    }

    fn respond(&mut self, command: &[u8]) {
        match command {
            b"AT" | b"ATE0" | b"AT+CWMODE=1" | b"AT+CWQAP" | b"AT+CIPMODE=0" => self.reply(b"\r\nOK\r\n"),
            b"AT+UART=115200,8,1,0,0" | b"AT+RST" => {}
            b"AT+GMR" => self.reply(
                b"AT version:1.3.0.0(Jul 14 2016 18:54:01)\r\nSDK version:2.0.0(656edbf)\r\ncompile time:Jul 19 2016 18:44:44\r\n\r\nOK\r\n",
            ),
            b"AT+CWJAP=\"test_wifi\",\"secret\"" => self.reply(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n"),
            b"AT+CWJAP?" => self.reply(b"+CWJAP:\"test_wifi\",\"10:fe:ed:05:ba:50\",6,-60\r\n\r\nOK\r\n"),
            b"AT+CIPCLOSE" => self.reply(b"CLOSED\r\n\r\nOK\r\n"),
            _ if command.starts_with(b"AT+CWJAP=") => self.reply(b"+CWJAP:2\r\n\r\nFAIL\r\n"),
            _ if command.starts_with(b"AT+CIPSTART=") => self.reply(b"CONNECT\r\n\r\nOK\r\n"),
            _ if command.starts_with(b"AT+CIPSEND=") => {
                let length = core::str::from_utf8(&command[11..])
                    .ok()
                    .and_then(|length| length.parse::<usize>().ok());

                match length {
                    Some(length) if length > 0 => {
                        self.pending_payload = length;
                        self.payload_length = length;
                        self.reply(b"\r\nOK\r\n>");
                    }
                    _ => self.reply(b"\r\nERROR\r\n"),
                }
            }
            _ => self.reply(b"\r\nERROR\r\n"),
        }
    }
}

impl ErrorType for ExampleTransport {
    type Error = ErrorKind;
}

impl Read for ExampleTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut length = 0;

        while length < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => buf[length] = byte,
                None => break,
            }
            length += 1;
        }

        Ok(length)
    }
}

impl ReadReady for ExampleTransport {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl Write for ExampleTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if !self.console {
            for byte in buf {
                self.receive_byte(*byte);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Transport for ExampleTransport {
    type Pins = ();

    fn redirect(&mut self, _pins: (), _baud: u32) -> Result<(), Self::Error> {
        self.console = false;
        Ok(())
    }

    fn reset_to_console(&mut self) -> Result<(), Self::Error> {
        self.console = true;
        Ok(())
    }

    fn set_receive_buffer_size(&mut self, _size: usize) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Timer mock, all durations expire immediately
#[derive(Default)]
pub struct ExampleTimer {}

impl Timer<1_000_000> for ExampleTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1000000> {
        TimerInstantU32::from_ticks(0)
    }

    fn start(&mut self, _duration: TimerDurationU32<1000000>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

/// XOR cipher mock, pads to 16 byte blocks. Not suitable for production.
#[derive(Default)]
pub struct ExampleCipher {
    pub key: u8,
}

impl Cipher for ExampleCipher {
    type Error = ();

    fn encrypt(&mut self, plaintext: &[u8], ciphertext: &mut [u8]) -> Result<usize, Self::Error> {
        let length = plaintext.len().div_ceil(16) * 16;
        if ciphertext.len() < length {
            return Err(());
        }

        for (index, target) in ciphertext[..length].iter_mut().enumerate() {
            *target = plaintext.get(index).copied().unwrap_or(0x0) ^ self.key;
        }

        Ok(length)
    }
}
