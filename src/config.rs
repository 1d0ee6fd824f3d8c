//! Config provides codec options and the static radio channel description

use serde::{Deserialize, Serialize};

use crate::modulation::lora::Bandwidth;
use crate::modulation::Modulation;

/// Which scheduling field of a downlink command is authoritative
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePolicy {
    /// Accept any combination of `imme` / `tmst` / `tmms`.
    /// `imme` wins over `tmms`, which wins over `tmst`.
    Precedence,
    /// Exactly one of `imme = true`, `tmst` or `tmms` must be present
    Exclusive,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        SchedulePolicy::Precedence
    }
}

/// Options for decoding downlink commands
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub schedule: SchedulePolicy,
}

/// Static radio channel entry as found in gateway configuration files
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Centre frequency in Hz
    pub freq: u32,

    /// Modulation identifier, "LORA" or "FSK"
    pub modulation: String,

    /// LoRa bandwidth in Hz, ignored for FSK
    #[serde(default)]
    pub bandwidth: u32,

    /// LoRa spreading factor, or FSK bitrate in bps
    pub spread_factor: u32,

    /// RF preamble size, also accepted under the untagged `PreambleLength` key
    #[serde(default, alias = "PreambleLength")]
    pub preamble_length: u16,
}

/// Validated channel configuration
#[derive(Clone, Debug, PartialEq)]
pub enum Channel {
    LoRa {
        freq_hz: u32,
        bandwidth: Bandwidth,
        spreading_factor: u8,
        preamble_length: u16,
    },
    Fsk {
        freq_hz: u32,
        bitrate_bps: u32,
        preamble_length: u16,
    },
}

/// Channel configuration errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown modulation {0:?}")]
    Modulation(String),
    #[error("unsupported LoRa bandwidth {0} Hz")]
    Bandwidth(u32),
    #[error("spreading factor {0} outside SF5..SF12")]
    SpreadingFactor(u32),
    #[error("FSK bitrate must be non-zero")]
    Bitrate,
    #[error("frequency must be non-zero")]
    Frequency,
}

impl ChannelConfig {
    /// Check the entry and resolve it into typed channel parameters
    pub fn validate(&self) -> Result<Channel, ConfigError> {
        if self.freq == 0 {
            return Err(ConfigError::Frequency);
        }

        let modulation = self
            .modulation
            .parse::<Modulation>()
            .map_err(|_| ConfigError::Modulation(self.modulation.clone()))?;

        match modulation {
            Modulation::LoRa => {
                let bandwidth = Bandwidth::from_hz(self.bandwidth)
                    .ok_or(ConfigError::Bandwidth(self.bandwidth))?;

                let spreading_factor = match self.spread_factor {
                    sf @ 5..=12 => sf as u8,
                    sf => return Err(ConfigError::SpreadingFactor(sf)),
                };

                Ok(Channel::LoRa {
                    freq_hz: self.freq,
                    bandwidth,
                    spreading_factor,
                    preamble_length: self.preamble_length,
                })
            }
            Modulation::Fsk => {
                if self.spread_factor == 0 {
                    return Err(ConfigError::Bitrate);
                }

                Ok(Channel::Fsk {
                    freq_hz: self.freq,
                    bitrate_bps: self.spread_factor,
                    preamble_length: self.preamble_length,
                })
            }
        }
    }
}
