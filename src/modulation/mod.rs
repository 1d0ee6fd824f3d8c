//! Shared types for radio channel / modulation configuration

use core::fmt;
use core::str::FromStr;

pub mod gfsk;

pub mod lora;

use self::gfsk::{FskRx, FskTx};
use self::lora::{LoRaRx, LoRaTx};

/// Common modulation configuration errors
///
/// These are provided as a helper for `TryFrom` implementations,
/// and not intended to be prescriptive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ModError {
    #[error("unsupported bandwidth")]
    UnsupportedBandwidth,
    #[error("unsupported coding rate")]
    UnsupportedCodingRate,
    #[error("unsupported modulation")]
    UnsupportedModulation,
}

/// Modulation identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Modulation {
    /// Chirp spread spectrum, `"LORA"` on the wire
    LoRa,
    /// Frequency shift keying, `"FSK"` on the wire
    Fsk,
}

impl Modulation {
    /// Wire identifier
    pub fn as_str(self) -> &'static str {
        match self {
            Modulation::LoRa => "LORA",
            Modulation::Fsk => "FSK",
        }
    }
}

impl FromStr for Modulation {
    type Err = ModError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LORA" => Ok(Modulation::LoRa),
            "FSK" => Ok(Modulation::Fsk),
            _ => Err(ModError::UnsupportedModulation),
        }
    }
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modulation specific parameters of a transmit packet
#[derive(Clone, PartialEq, Debug)]
pub enum TxModulation {
    LoRa(LoRaTx),
    Fsk(FskTx),
}

impl TxModulation {
    pub fn kind(&self) -> Modulation {
        match self {
            TxModulation::LoRa(_) => Modulation::LoRa,
            TxModulation::Fsk(_) => Modulation::Fsk,
        }
    }
}

/// Modulation specific parameters of a received packet
#[derive(Clone, PartialEq, Debug)]
pub enum RxModulation {
    LoRa(LoRaRx),
    Fsk(FskRx),
}

impl RxModulation {
    pub fn kind(&self) -> Modulation {
        match self {
            RxModulation::LoRa(_) => Modulation::LoRa,
            RxModulation::Fsk(_) => Modulation::Fsk,
        }
    }
}
