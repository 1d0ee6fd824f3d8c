//! Common FSK modulation options

/// FSK parameters of a packet to be transmitted
#[derive(Clone, PartialEq, Debug)]
pub struct FskTx {
    /// Bitrate in bps
    pub bitrate_bps: u32,
    /// Frequency deviation in whole kHz
    pub freq_deviation_khz: u8,
}

/// FSK parameters of a received packet
#[derive(Clone, PartialEq, Debug)]
pub struct FskRx {
    /// Bitrate in bps
    pub bitrate_bps: u32,
}

/// Convert the wire `fdev` value to the stored deviation.
///
/// The stored value is `trunc(fdev / 1000)`, saturating into a `u8`.
pub fn freq_deviation_from_wire(fdev: f64) -> u8 {
    (fdev / 1000.0) as u8
}
