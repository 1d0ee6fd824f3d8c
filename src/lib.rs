//! Packet forwarder wire codec for LoRa / FSK radio gateways
//!
//! Translates between the typed radio packets handled by a gateway's radio
//! driver and the JSON objects exchanged with a network server over the
//! Semtech packet forwarder protocol:
//!
//! - [`downlink`] decodes `txpk` transmit requests into [`TransmitPacket`]s
//! - [`uplink`] encodes [`ReceivePacket`]s into `rxpk` receive reports
//!
//! Both directions share the constant bandwidth / coding rate tables in
//! [`modulation::lora`]. The codec is pure and holds no state, so calls may
//! run concurrently on independent packets.
//!
//! The [`Transmit`] and [`Receive`] traits describe the radio driver seen
//! from the codec, with polling helpers in [`blocking`] and glue in
//! [`forwarder`].

#![deny(unsafe_code)]

#[macro_use]
extern crate log;

pub mod blocking;
pub mod config;
pub mod downlink;
pub mod forwarder;
pub mod modulation;
pub mod uplink;

#[cfg(feature = "helpers")]
pub mod helpers;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{DecodeConfig, SchedulePolicy};
pub use downlink::{decode, decode_with, DecodeError, Schedule, TransmitPacket};
pub use modulation::lora::{Bandwidth, CodingRate};
pub use modulation::{Modulation, RxModulation, TxModulation};
pub use uplink::{encode, CrcStatus, ReceivePacket};

/// Transmit trait for radios that can send decoded downlinks
pub trait Transmit {
    /// Radio error
    type Error;

    /// Hand a packet to the radio for (scheduled) transmission
    ///
    /// Returns an error if the transmission could not be queued
    fn start_transmit(&mut self, packet: &TransmitPacket) -> Result<(), Self::Error>;

    /// Check for send completion
    ///
    /// Returns true for send complete, false otherwise
    fn check_transmit(&mut self) -> Result<bool, Self::Error>;
}

/// Receive trait for radios that report received frames
pub trait Receive {
    /// Radio error
    type Error;

    /// Enter receive mode
    fn start_receive(&mut self) -> Result<(), Self::Error>;

    /// Check for reception
    ///
    /// The restart flag indicates on (recoverable) error conditions (such as invalid CRC)
    /// the radio should re-enter receive mode if required and continue reception.
    ///
    /// This returns true for received, false for not received, or the provided error
    fn check_receive(&mut self, restart: bool) -> Result<bool, Self::Error>;

    /// Fetch the received packet if rx is complete
    fn get_received(&mut self) -> Result<ReceivePacket, Self::Error>;
}
