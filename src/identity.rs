//! Device identity and cipher providers

/// Index of the device secret for [IdentityProvider::get_id]
pub const SECRET_INDEX: usize = 0;

/// Index of the device id for [IdentityProvider::get_id]
pub const DEVICE_ID_INDEX: usize = 1;

/// Identity of this device
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Device id, sent in plain text as part of each frame
    pub id: u32,

    /// Device secret
    pub secret: u32,
}

/// Source of the factory programmed device identity
pub trait IdentityProvider {
    /// Returns the identity word of the given index (0: secret, 1: device id)
    fn get_id(&self, index: usize) -> u32;

    fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            id: self.get_id(DEVICE_ID_INDEX),
            secret: self.get_id(SECRET_INDEX),
        }
    }
}

impl IdentityProvider for DeviceIdentity {
    fn get_id(&self, index: usize) -> u32 {
        match index {
            DEVICE_ID_INDEX => self.id,
            _ => self.secret,
        }
    }

    fn identity(&self) -> DeviceIdentity {
        *self
    }
}

/// Block cipher keyed by the device identity
pub trait Cipher {
    type Error: core::fmt::Debug;

    /// Encrypts the plaintext to the given buffer and returns the ciphertext length.
    /// Ciphertext may be longer than the plaintext due to block alignment.
    fn encrypt(&mut self, plaintext: &[u8], ciphertext: &mut [u8]) -> Result<usize, Self::Error>;
}
