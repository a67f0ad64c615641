#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

#[cfg(test)]
extern crate alloc;

mod fmt;

pub mod adapter;
pub mod channel;
pub(crate) mod commands;
pub mod console;
pub mod framer;
pub mod identity;
pub mod responses;
pub mod stack;
pub mod transport;
pub mod wifi;

#[cfg(feature = "examples")]
pub mod example;

#[cfg(test)]
mod tests;
