//! # Telemetry message framing
//!
//! Messages are wrapped into a compact binary frame and sent as UDP datagram to the configured
//! server:
//!
//! | Bytes | Content |
//! |---|---|
//! | 1 | `0xCE` frame marker |
//! | 4 | Device id, big endian |
//! | 1-3 | Length prefix, s. below |
//! | n | Message |
//!
//! Length prefix:
//! * 0-31 bytes: `0xA0 + length`
//! * 32-255 bytes: `0xD9, length`
//! * 256-504 bytes: `0xD9, length >> 8, length & 0xFF`
//!
//! Messages of 505 bytes or more are rejected. If encryption is enabled, length prefix and
//! message are padded with `0x80` and encrypted by the [Cipher]. The header stays plain text.
//!
//! ## Example
//!
//! ````
//! # use esp_at_telemetry::adapter::Adapter;
//! # use esp_at_telemetry::example::{ExampleCipher, ExampleTimer, ExampleTransport};
//! # use esp_at_telemetry::framer::MessageFramer;
//! # use esp_at_telemetry::identity::DeviceIdentity;
//! #
//! let mut adapter: Adapter<'_, _, _, 1_000_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! let identity = DeviceIdentity { id: 0xBC9A_B239, secret: 0x1234_5678 };
//! let mut framer = MessageFramer::new(identity, ExampleCipher::default());
//! framer.set_server("46.23.86.61", 9090).unwrap();
//!
//! let frame = framer.encode(b"{\"light\":50}").unwrap();
//! let mut hex = [0x0; 64];
//! assert_eq!(Some("cebc9ab239ac7b226c69676874223a35307d"), frame.hex(&mut hex));
//!
//! framer.send_number(&mut adapter, "light", 50).unwrap();
//! ````
use crate::identity::{Cipher, IdentityProvider};
use crate::stack::{DatagramSender, SendReport};
use heapless::{String, Vec};
use numtoa::NumToA;

/// Messages of this length or longer are rejected
pub const MESSAGE_LENGTH_LIMIT: usize = 505;

/// First byte of each frame
pub const FRAME_MARKER: u8 = 0xCE;

/// Marker + device id
pub const HEADER_LENGTH: usize = 5;

/// Padding byte appended before encryption
pub const ENCRYPTION_PADDING: u8 = 0x80;

/// Length prefix for messages shorter than 32 bytes, the length is added
const SHORT_MARKER: u8 = 0xA0;

/// Length prefix for messages of 32 bytes or more
const LONG_MARKER: u8 = 0xD9;

/// Max. length of length prefix + message + padding
const MAX_BODY_LENGTH: usize = 3 + MESSAGE_LENGTH_LIMIT - 1 + 1;

/// Max. ciphertext length (body aligned to 16 byte blocks)
pub const MAX_CIPHERTEXT_LENGTH: usize = 512;

/// Max. total frame length
pub const MAX_FRAME_LENGTH: usize = HEADER_LENGTH + MAX_CIPHERTEXT_LENGTH;

/// Max. length of the server host name
pub const MAX_HOST_LENGTH: usize = 64;

/// Target server and encryption setting
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or IP address
    pub host: String<MAX_HOST_LENGTH>,

    /// UDP port
    pub port: u16,

    /// True if frames are encrypted
    pub encryption: bool,
}

/// Framing errors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Message length exceeds the payload limit of the modem, nothing was sent
    MessageTooLarge(usize),

    /// No server host configured
    NoServer,

    /// Given host is longer then [MAX_HOST_LENGTH]
    HostTooLong,

    /// Cipher failed or returned an oversized ciphertext
    CipherFailed,
}

/// Errors when sending a message
#[derive(Clone, Debug, PartialEq)]
pub enum FramerError<E> {
    /// Frame could not be built
    Frame(FrameError),

    /// Sending the datagram failed
    Send(E),
}

impl<E> From<FrameError> for FramerError<E> {
    fn from(error: FrameError) -> Self {
        Self::Frame(error)
    }
}

/// Encoded frame
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8, MAX_FRAME_LENGTH>,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lower case hex representation, None if the buffer is too small (min. twice the frame length)
    pub fn hex<'b>(&self, buffer: &'b mut [u8]) -> Option<&'b str> {
        let length = self.bytes.len() * 2;
        if buffer.len() < length {
            return None;
        }

        base16::encode_config_slice(self.bytes.as_slice(), base16::EncodeLower, &mut buffer[..length]);
        core::str::from_utf8(&buffer[..length]).ok()
    }

    fn extend(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.bytes
            .extend_from_slice(data)
            .map_err(|_| FrameError::MessageTooLarge(data.len()))
    }
}

/// Builds and sends telemetry frames
pub struct MessageFramer<I: IdentityProvider, C: Cipher> {
    config: ServerConfig,
    identity: I,
    cipher: C,
}

impl<I: IdentityProvider, C: Cipher> MessageFramer<I, C> {
    /// Creates a new framer without server and with disabled encryption
    pub fn new(identity: I, cipher: C) -> Self {
        Self {
            config: ServerConfig::default(),
            identity,
            cipher,
        }
    }

    /// Sets the target server
    pub fn set_server(&mut self, host: &str, port: u16) -> Result<(), FrameError> {
        self.config.host = String::try_from(host).map_err(|_| FrameError::HostTooLong)?;
        self.config.port = port;
        Ok(())
    }

    /// Enables/Disables encryption
    pub fn set_encryption(&mut self, enabled: bool) {
        self.config.encryption = enabled;
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Builds the frame for the given message
    pub fn encode(&mut self, message: &[u8]) -> Result<Frame, FrameError> {
        if message.len() >= MESSAGE_LENGTH_LIMIT {
            return Err(FrameError::MessageTooLarge(message.len()));
        }

        let too_large = |_: ()| FrameError::MessageTooLarge(message.len());
        let prefix = length_prefix(message.len());

        let mut body: Vec<u8, MAX_BODY_LENGTH> = Vec::new();
        body.extend_from_slice(&prefix[..prefix_length(message.len())]).map_err(too_large)?;
        body.extend_from_slice(message).map_err(too_large)?;

        let mut frame = Frame::default();
        frame.extend(&[FRAME_MARKER])?;
        frame.extend(&self.identity.identity().id.to_be_bytes())?;

        if !self.config.encryption {
            frame.extend(&body)?;
            return Ok(frame);
        }

        body.push(ENCRYPTION_PADDING).map_err(|_| FrameError::MessageTooLarge(message.len()))?;

        let mut ciphertext = [0x0; MAX_CIPHERTEXT_LENGTH];
        let length = self
            .cipher
            .encrypt(&body, &mut ciphertext)
            .map_err(|_| FrameError::CipherFailed)?;

        if length > ciphertext.len() {
            return Err(FrameError::CipherFailed);
        }

        frame.extend(&ciphertext[..length])?;
        Ok(frame)
    }

    /// Builds the frame and sends it to the configured server
    pub fn encode_and_send<S: DatagramSender>(
        &mut self,
        sender: &mut S,
        message: &[u8],
    ) -> Result<SendReport, FramerError<S::Error>> {
        if message.len() >= MESSAGE_LENGTH_LIMIT {
            return Err(FrameError::MessageTooLarge(message.len()).into());
        }

        if self.config.host.is_empty() {
            return Err(FrameError::NoServer.into());
        }

        let frame = self.encode(message)?;

        #[cfg(any(feature = "log", feature = "defmt"))]
        {
            let mut buffer = [0x0; 2 * MAX_FRAME_LENGTH];
            if let Some(hex) = frame.hex(&mut buffer) {
                trace!("Frame: {}", hex);
            }
        }

        sender
            .send_datagram(self.config.host.as_str(), self.config.port, frame.as_bytes())
            .map_err(FramerError::Send)
    }

    /// Sends `{"<key>":<value>}`
    pub fn send_number<S: DatagramSender>(
        &mut self,
        sender: &mut S,
        key: &str,
        value: i32,
    ) -> Result<SendReport, FramerError<S::Error>> {
        let mut buffer = [0x0; 20];
        let value = (value as i64).numtoa(10, &mut buffer);

        let mut message = JsonObject::new();
        message.key(key)?;
        message.raw(value)?;

        self.encode_and_send(sender, message.finish()?)
    }

    /// Sends `{"<key>":"<value>"}`
    pub fn send_string<S: DatagramSender>(
        &mut self,
        sender: &mut S,
        key: &str,
        value: &str,
    ) -> Result<SendReport, FramerError<S::Error>> {
        let mut message = JsonObject::new();
        message.key(key)?;
        message.string(value)?;

        self.encode_and_send(sender, message.finish()?)
    }
}

/// Length prefix, padded to three bytes. Actual length is returned by [prefix_length].
fn length_prefix(length: usize) -> [u8; 3] {
    if length < 32 {
        return [SHORT_MARKER + length as u8, 0, 0];
    }

    if length < 256 {
        return [LONG_MARKER, length as u8, 0];
    }

    [LONG_MARKER, (length >> 8) as u8, (length & 0xFF) as u8]
}

fn prefix_length(length: usize) -> usize {
    match length {
        0..=31 => 1,
        32..=255 => 2,
        _ => 3,
    }
}

/// Single key JSON object with limited length
struct JsonObject {
    buffer: Vec<u8, MESSAGE_LENGTH_LIMIT>,
}

impl JsonObject {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn key(&mut self, key: &str) -> Result<(), FrameError> {
        self.raw(b"{")?;
        self.quoted(key)?;
        self.raw(b":")
    }

    fn string(&mut self, value: &str) -> Result<(), FrameError> {
        self.quoted(value)
    }

    fn finish(&mut self) -> Result<&[u8], FrameError> {
        self.raw(b"}")?;
        Ok(self.buffer.as_slice())
    }

    fn quoted(&mut self, text: &str) -> Result<(), FrameError> {
        self.raw(b"\"")?;

        for byte in text.bytes() {
            match byte {
                b'"' | b'\\' => self.raw(&[b'\\', byte])?,
                0x00..=0x1F => {
                    let hex = base16::encode_byte_l(byte);
                    self.raw(&[b'\\', b'u', b'0', b'0', hex[0], hex[1]])?
                }
                _ => self.raw(&[byte])?,
            }
        }

        self.raw(b"\"")
    }

    fn raw(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.buffer
            .extend_from_slice(data)
            .map_err(|_| FrameError::MessageTooLarge(MESSAGE_LENGTH_LIMIT))
    }
}
