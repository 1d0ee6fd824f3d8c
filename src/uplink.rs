//! Uplink encoder
//!
//! Serialises a [`ReceivePacket`] into the `rxpk` object reported to the
//! network server. Keys are emitted in a fixed order and numbers with fixed
//! precision, so the object is written as text rather than through a
//! `serde_json` map.

use core::fmt;

use base64::prelude::*;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::modulation::{Modulation, RxModulation};

/// CRC status of a received frame
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CrcStatus {
    /// CRC present and valid
    Ok,
    /// CRC present and invalid
    Fail,
    /// No CRC in the frame
    Absent,
}

impl CrcStatus {
    /// Wire value: 1 = OK, -1 = fail, 0 = no CRC
    pub fn as_i8(self) -> i8 {
        match self {
            CrcStatus::Ok => 1,
            CrcStatus::Fail => -1,
            CrcStatus::Absent => 0,
        }
    }
}

impl TryFrom<i8> for CrcStatus {
    type Error = i8;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(CrcStatus::Ok),
            -1 => Ok(CrcStatus::Fail),
            0 => Ok(CrcStatus::Absent),
            other => Err(other),
        }
    }
}

/// Report of a received RF frame
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivePacket {
    /// Concentrator counter at reception, 1 µs resolution
    pub count_us: u32,
    /// UTC time of reception
    pub received_at: DateTime<Utc>,
    /// RX centre frequency in Hz
    pub freq_hz: u32,
    /// Concentrator IF channel
    pub if_chain: u8,
    /// Concentrator RF chain
    pub rf_chain: u8,
    pub crc_status: CrcStatus,
    pub modulation: RxModulation,
    /// Average packet RSSI in dBm
    pub rssi_dbm: f32,
    pub payload: Vec<u8>,
}

impl ReceivePacket {
    pub fn modulation_kind(&self) -> Modulation {
        self.modulation.kind()
    }
}

/// Encode a received packet as `rxpk` JSON text
pub fn encode(packet: &ReceivePacket) -> String {
    let s = packet.to_string();
    trace!("Encoded rxpk: {}", s);
    s
}

/// Encode a received packet as a JSON value, for embedding in a larger tree.
///
/// Numbers carry the same rounding as [`encode`]; key order follows the
/// `serde_json` map implementation.
pub fn encode_value(packet: &ReceivePacket) -> Value {
    let mut m = Map::new();

    m.insert("tmst".into(), packet.count_us.into());
    m.insert("time".into(), rfc3339(&packet.received_at).into());
    m.insert("chan".into(), packet.if_chain.into());
    m.insert("rfch".into(), packet.rf_chain.into());
    m.insert("freq".into(), rounded(hz_to_mhz(packet.freq_hz), 6));
    m.insert("stat".into(), packet.crc_status.as_i8().into());
    m.insert("modu".into(), packet.modulation_kind().as_str().into());

    match &packet.modulation {
        RxModulation::LoRa(l) => {
            let datr = format!("SF{}{}", l.spreading_factor, l.bandwidth.datr_label());
            m.insert("datr".into(), datr.into());
            m.insert("codr".into(), l.coding_rate.as_fraction().into());
            m.insert("lsnr".into(), rounded(f64::from(l.snr_db), 1));
        }
        RxModulation::Fsk(f) => {
            m.insert("datr".into(), f.bitrate_bps.into());
        }
    }

    let rssi = format!("{:.0}", packet.rssi_dbm)
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or(Value::Null);
    m.insert("rssi".into(), rssi);
    m.insert("size".into(), packet.payload.len().into());
    m.insert("data".into(), BASE64_STANDARD.encode(&packet.payload).into());

    Value::Object(m)
}

impl fmt::Display for ReceivePacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{\"tmst\":{}", self.count_us)?;
        write!(f, ",\"time\":\"{}\"", rfc3339(&self.received_at))?;
        write!(f, ",\"chan\":{}", self.if_chain)?;
        write!(f, ",\"rfch\":{}", self.rf_chain)?;
        write!(f, ",\"freq\":{:.6}", hz_to_mhz(self.freq_hz))?;
        write!(f, ",\"stat\":{}", self.crc_status.as_i8())?;
        write!(f, ",\"modu\":\"{}\"", self.modulation_kind())?;

        match &self.modulation {
            RxModulation::LoRa(l) => {
                write!(f, ",\"datr\":\"SF{}{}\"", l.spreading_factor, l.bandwidth.datr_label())?;
                write!(f, ",\"codr\":\"{}\"", l.coding_rate.as_fraction())?;
                write!(f, ",\"lsnr\":{:.1}", l.snr_db)?;
            }
            RxModulation::Fsk(fsk) => {
                write!(f, ",\"datr\":{}", fsk.bitrate_bps)?;
            }
        }

        write!(f, ",\"rssi\":{:.0}", self.rssi_dbm)?;
        write!(f, ",\"size\":{}", self.payload.len())?;
        write!(f, ",\"data\":\"{}\"}}", BASE64_STANDARD.encode(&self.payload))
    }
}

/// Convert a frequency in Hz to MHz
pub fn hz_to_mhz(hz: u32) -> f64 {
    f64::from(hz) / 1.0e6
}

fn rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn rounded(v: f64, precision: usize) -> Value {
    format!("{:.*}", precision, v)
        .parse::<f64>()
        .map(Value::from)
        .unwrap_or(Value::Null)
}
