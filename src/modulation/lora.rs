//! LoRa modulation parameters and the bandwidth / coding rate tables
//!
//! Both directions of the codec resolve bandwidths and coding rates through the
//! constant tables in this module, so the labels accepted on decode and the
//! labels emitted on encode can not drift apart.

use core::fmt;

use super::ModError;

/// LoRa channel bandwidth, discriminants match the concentrator codes
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum Bandwidth {
    /// 7.8 kHz
    Bw7k8 = 1,
    /// 10.4 kHz
    Bw10k4 = 2,
    /// 15.6 kHz
    Bw15k6 = 3,
    /// 20.8 kHz
    Bw20k8 = 4,
    /// 31.2 kHz
    Bw31k2 = 5,
    /// 41.7 kHz
    Bw41k7 = 6,
    /// 62.5 kHz
    Bw62k5 = 7,
    /// 125 kHz
    Bw125k = 8,
    /// 250 kHz
    Bw250k = 9,
    /// 500 kHz
    Bw500k = 10,
}

/// Table entry: bandwidth, whole kHz (decode key), kHz label (encode), Hz
struct BandwidthEntry {
    bw: Bandwidth,
    khz: u32,
    label: &'static str,
    datr: &'static str,
    hz: u32,
}

const BANDWIDTHS: [BandwidthEntry; 10] = [
    BandwidthEntry { bw: Bandwidth::Bw7k8, khz: 7, label: "7.8", datr: "BW7.8", hz: 7_800 },
    BandwidthEntry { bw: Bandwidth::Bw10k4, khz: 10, label: "10.4", datr: "BW10.4", hz: 10_400 },
    BandwidthEntry { bw: Bandwidth::Bw15k6, khz: 15, label: "15.6", datr: "BW15.6", hz: 15_600 },
    BandwidthEntry { bw: Bandwidth::Bw20k8, khz: 20, label: "20.8", datr: "BW20.8", hz: 20_800 },
    BandwidthEntry { bw: Bandwidth::Bw31k2, khz: 31, label: "31.2", datr: "BW31.2", hz: 31_200 },
    BandwidthEntry { bw: Bandwidth::Bw41k7, khz: 41, label: "41.7", datr: "BW41.7", hz: 41_700 },
    BandwidthEntry { bw: Bandwidth::Bw62k5, khz: 62, label: "62.5", datr: "BW62.5", hz: 62_500 },
    BandwidthEntry { bw: Bandwidth::Bw125k, khz: 125, label: "125", datr: "BW125", hz: 125_000 },
    BandwidthEntry { bw: Bandwidth::Bw250k, khz: 250, label: "250", datr: "BW250", hz: 250_000 },
    BandwidthEntry { bw: Bandwidth::Bw500k, khz: 500, label: "500", datr: "BW500", hz: 500_000 },
];

impl Bandwidth {
    /// All bandwidths in code order
    pub const ALL: [Bandwidth; 10] = [
        Bandwidth::Bw7k8,
        Bandwidth::Bw10k4,
        Bandwidth::Bw15k6,
        Bandwidth::Bw20k8,
        Bandwidth::Bw31k2,
        Bandwidth::Bw41k7,
        Bandwidth::Bw62k5,
        Bandwidth::Bw125k,
        Bandwidth::Bw250k,
        Bandwidth::Bw500k,
    ];

    fn entry(self) -> &'static BandwidthEntry {
        // Codes are 1-based and contiguous
        &BANDWIDTHS[self as usize - 1]
    }

    /// Concentrator bandwidth code (1..=10)
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Bandwidth label in kHz as used on the wire ("7.8", "125", ...)
    pub fn khz_label(self) -> &'static str {
        self.entry().label
    }

    /// Datarate suffix emitted in uplink reports ("BW7.8", "BW125", ...)
    pub fn datr_label(self) -> &'static str {
        self.entry().datr
    }

    /// Bandwidth in Hz
    pub fn hz(self) -> u32 {
        self.entry().hz
    }

    /// Look up a bandwidth by its whole kHz value (7, 10, ..., 125, 250, 500)
    pub fn from_khz(khz: u32) -> Option<Self> {
        BANDWIDTHS.iter().find(|e| e.khz == khz).map(|e| e.bw)
    }

    /// Look up a bandwidth by its exact value in Hz
    pub fn from_hz(hz: u32) -> Option<Self> {
        BANDWIDTHS.iter().find(|e| e.hz == hz).map(|e| e.bw)
    }
}

impl TryFrom<u8> for Bandwidth {
    type Error = ModError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1..=10 => Ok(BANDWIDTHS[code as usize - 1].bw),
            _ => Err(ModError::UnsupportedBandwidth),
        }
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kHz", self.khz_label())
    }
}

/// LoRa forward error correction coding rate
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum CodingRate {
    /// LoRa Coding rate 4/5
    Cr4_5 = 5,
    /// LoRa Coding rate 4/6
    Cr4_6 = 6,
    /// LoRa Coding rate 4/7
    Cr4_7 = 7,
    /// LoRa Coding rate 4/8
    Cr4_8 = 8,
}

/// Accepted wire spellings, the first entry per rate is canonical
const CODING_RATES: [(&str, CodingRate); 7] = [
    ("4/5", CodingRate::Cr4_5),
    ("4/6", CodingRate::Cr4_6),
    ("2/3", CodingRate::Cr4_6),
    ("4/7", CodingRate::Cr4_7),
    ("4/8", CodingRate::Cr4_8),
    ("2/4", CodingRate::Cr4_8),
    ("1/2", CodingRate::Cr4_8),
];

impl CodingRate {
    /// Concentrator coding rate code (5..=8)
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Canonical fraction string, always of the form "4/n"
    pub fn as_fraction(self) -> &'static str {
        match self {
            CodingRate::Cr4_5 => "4/5",
            CodingRate::Cr4_6 => "4/6",
            CodingRate::Cr4_7 => "4/7",
            CodingRate::Cr4_8 => "4/8",
        }
    }

    /// Resolve any accepted alias ("4/6", "2/3", "1/2", ...)
    pub fn from_alias(s: &str) -> Option<Self> {
        CODING_RATES.iter().find(|(a, _)| *a == s).map(|(_, cr)| *cr)
    }
}

impl TryFrom<u8> for CodingRate {
    type Error = ModError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            5 => Ok(CodingRate::Cr4_5),
            6 => Ok(CodingRate::Cr4_6),
            7 => Ok(CodingRate::Cr4_7),
            8 => Ok(CodingRate::Cr4_8),
            _ => Err(ModError::UnsupportedCodingRate),
        }
    }
}

impl fmt::Display for CodingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_fraction())
    }
}

/// Failure modes of [`parse_datr`]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DatrError {
    /// String does not match `SF<int>BW<int>[.<int>]`, or the fraction does
    /// not match the label of an otherwise known bandwidth
    Format,
    /// Well formed but the bandwidth is not in the table
    Bandwidth(u32),
}

/// Parse a LoRa datarate identifier such as "SF7BW125" into spreading factor
/// and bandwidth.
///
/// The bandwidth is matched on its whole kHz value. A fractional part is only
/// accepted when it reproduces the table label, so "SF12BW7.8" parses while
/// "SF12BW7.9" does not.
pub fn parse_datr(datr: &str) -> Result<(u32, Bandwidth), DatrError> {
    let rest = datr.strip_prefix("SF").ok_or(DatrError::Format)?;
    let (sf, rest) = split_digits(rest)?;
    let rest = rest.strip_prefix("BW").ok_or(DatrError::Format)?;
    let (khz, rest) = split_digits(rest)?;

    let fraction = match rest {
        "" => None,
        r => {
            let digits = r.strip_prefix('.').ok_or(DatrError::Format)?;
            let (_, tail) = split_digits(digits)?;
            if !tail.is_empty() {
                return Err(DatrError::Format);
            }
            Some(r)
        }
    };

    let bw = Bandwidth::from_khz(khz).ok_or(DatrError::Bandwidth(khz))?;

    if let Some(fraction) = fraction {
        // Known bandwidth, but the suffix does not spell its label
        if format!("{}{}", khz, fraction) != bw.khz_label() {
            return Err(DatrError::Format);
        }
    }

    Ok((sf, bw))
}

/// Split a leading run of ASCII digits off `s` and parse it
fn split_digits(s: &str) -> Result<(u32, &str), DatrError> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    if end == 0 {
        return Err(DatrError::Format);
    }

    let v = s[..end].parse::<u32>().map_err(|_| DatrError::Format)?;
    Ok((v, &s[end..]))
}

/// LoRa parameters of a packet to be transmitted
#[derive(Clone, PartialEq, Debug)]
pub struct LoRaTx {
    /// Spreading factor, stored as given on the wire (7..=12 in practice)
    pub spreading_factor: u32,
    /// Channel bandwidth
    pub bandwidth: Bandwidth,
    /// ECC coding rate
    pub coding_rate: CodingRate,
    /// Invert chirp polarity (downlinks to end devices)
    pub invert_polarity: bool,
}

/// LoRa parameters and link metrics of a received packet
#[derive(Clone, PartialEq, Debug)]
pub struct LoRaRx {
    /// Spreading factor
    pub spreading_factor: u32,
    /// Channel bandwidth
    pub bandwidth: Bandwidth,
    /// ECC coding rate
    pub coding_rate: CodingRate,
    /// Average packet SNR in dB
    pub snr_db: f32,
}
