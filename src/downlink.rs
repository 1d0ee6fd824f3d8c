//! Downlink decoder
//!
//! Parses the `txpk` object of a PULL_RESP into a [`TransmitPacket`]. The wire
//! object is loosely typed: `datr` is a string for LoRa and a number for FSK,
//! so it is held as a [`Datarate`] until `modu` has been resolved.
//!
//! Decoding is all or nothing, any field level failure is returned as a
//! [`DecodeError`] and no partial packet is produced.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::config::{DecodeConfig, SchedulePolicy};
use crate::modulation::gfsk::{self, FskTx};
use crate::modulation::lora::{self, CodingRate, DatrError, LoRaTx};
use crate::modulation::{Modulation, TxModulation};

/// Seconds between the unix epoch and the GPS epoch (1980-01-06T00:00:00Z)
pub const GPS_EPOCH_UNIX_SECS: i64 = 315_964_800;

/// Wire `datr` value, resolved against `modu` after parsing
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Datarate {
    /// LoRa datarate identifier, e.g. "SF7BW125"
    Text(String),
    /// FSK bitrate in bps
    Number(f64),
    /// Anything else, always rejected
    Other(Value),
}

impl Default for Datarate {
    fn default() -> Self {
        Datarate::Other(Value::Null)
    }
}

impl Datarate {
    fn to_value(&self) -> Value {
        match self {
            Datarate::Text(s) => Value::from(s.as_str()),
            Datarate::Number(n) => Value::from(*n),
            Datarate::Other(v) => v.clone(),
        }
    }
}

/// Transmit request as found on the wire
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Txpk {
    /// Send immediately, ignoring `tmst` and `tmms`
    #[serde(default)]
    pub imme: bool,
    /// Concentrator counter value to send at
    #[serde(default)]
    pub tmst: Option<u32>,
    /// GPS time to send at, milliseconds since the GPS epoch
    #[serde(default)]
    pub tmms: Option<u64>,
    /// Disable the physical layer CRC
    #[serde(default)]
    pub ncrc: bool,
    /// Frequency in MHz
    pub freq: f64,
    /// RF chain used for TX
    pub rfch: u8,
    /// TX power in dBm
    #[serde(default)]
    pub powe: u8,
    /// "LORA" or "FSK"
    pub modu: String,
    #[serde(default)]
    pub datr: Datarate,
    /// ECC coding rate (LoRa only)
    #[serde(default)]
    pub codr: String,
    /// Invert polarity (LoRa only)
    #[serde(default)]
    pub ipol: bool,
    /// Preamble length
    #[serde(default)]
    pub prea: u16,
    /// Frequency deviation (FSK only)
    #[serde(default)]
    pub fdev: f64,
    /// Base64 encoded payload
    pub data: String,
}

/// Active scheduling mode of a [`TransmitPacket`]
#[derive(Clone, Debug, PartialEq)]
pub enum Schedule {
    /// Transmit as soon as possible
    Immediate,
    /// Transmit at a GPS synchronised time, milliseconds since the GPS epoch
    Gps(u64),
    /// Transmit when the concentrator counter reaches this value (µs)
    Counter(u32),
}

/// Command to transmit a packet
#[derive(Clone, Debug, PartialEq)]
pub struct TransmitPacket {
    /// Send packet immediately (will ignore `count_us` and `gps_time_ms`)
    pub immediate: bool,
    /// Concentrator counter value, 1 µs resolution
    pub count_us: u32,
    /// GPS synchronised send time, milliseconds since the GPS epoch
    pub gps_time_ms: Option<u64>,
    /// TX centre frequency in Hz
    pub freq_hz: u32,
    /// TX output power in dBm
    pub power_dbm: u8,
    /// Concentrator RF chain used for TX
    pub rf_chain: u8,
    /// Disable CRC
    pub no_crc: bool,
    /// RF preamble size
    pub preamble_length: u16,
    pub modulation: TxModulation,
    pub payload: Vec<u8>,
}

impl TransmitPacket {
    /// The scheduling mode the radio should honour.
    ///
    /// `immediate` takes precedence over `gps_time_ms`, which takes
    /// precedence over `count_us`.
    pub fn schedule(&self) -> Schedule {
        match (self.immediate, self.gps_time_ms) {
            (true, _) => Schedule::Immediate,
            (false, Some(t)) => Schedule::Gps(t),
            (false, None) => Schedule::Counter(self.count_us),
        }
    }

    pub fn modulation_kind(&self) -> Modulation {
        self.modulation.kind()
    }

    /// GPS send time as a UTC instant, if set and representable.
    /// Leap seconds are not applied.
    pub fn gps_instant(&self) -> Option<DateTime<Utc>> {
        self.gps_time_ms.and_then(gps_time_from_millis)
    }
}

/// Downlink decode errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Missing mandatory field or ill-typed scalar
    #[error("malformed txpk: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown modulation: {0:?}")]
    UnknownModulation(String),

    /// `datr` has the wrong JSON type for the declared modulation.
    ///
    /// Raised for a non-string LoRa `datr` (including a missing one) as well
    /// as a non-numeric FSK `datr`, so a LoRa `datr` only reaches
    /// [`DecodeError::DatarateFormat`] once it is known to be text.
    #[error("datr has the wrong type for {modulation}: {value}")]
    DatarateType { modulation: Modulation, value: Value },

    /// LoRa `datr` does not match `SF<int>BW<int>`
    #[error("can not parse lora datarate {0:?}")]
    DatarateFormat(String),

    #[error("can not parse lora datarate {datr:?}: unknown bandwidth {khz}")]
    UnknownBandwidth { datr: String, khz: u32 },

    #[error("can not parse lora coderate: {0:?}")]
    UnknownCodingRate(String),

    #[error("can not decode data {data:?}: {source}")]
    Payload {
        data: String,
        source: base64::DecodeError,
    },

    /// Scheduling fields present, when exactly one is required
    #[error("expected exactly one of imme / tmst / tmms, found {0:?}")]
    Schedule(Vec<&'static str>),
}

/// Decode a wire `txpk` object with the default [`DecodeConfig`]
pub fn decode(value: &Value) -> Result<TransmitPacket, DecodeError> {
    decode_with(value, &DecodeConfig::default())
}

/// Decode a wire `txpk` object
pub fn decode_with(value: &Value, config: &DecodeConfig) -> Result<TransmitPacket, DecodeError> {
    let txpk = Txpk::deserialize(value)?;
    txpk.decode(config)
}

/// Decode a `txpk` object from raw JSON text
pub fn decode_slice(data: &[u8]) -> Result<TransmitPacket, DecodeError> {
    let txpk: Txpk = serde_json::from_slice(data)?;
    txpk.decode(&DecodeConfig::default())
}

impl TryFrom<&Value> for TransmitPacket {
    type Error = DecodeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        decode(value)
    }
}

impl Txpk {
    /// Resolve the wire object into a typed transmit packet
    pub fn decode(self, config: &DecodeConfig) -> Result<TransmitPacket, DecodeError> {
        if config.schedule == SchedulePolicy::Exclusive {
            let set: Vec<&'static str> = [
                ("imme", self.imme),
                ("tmst", self.tmst.is_some()),
                ("tmms", self.tmms.is_some()),
            ]
            .iter()
            .filter(|(_, present)| *present)
            .map(|(name, _)| *name)
            .collect();

            if set.len() != 1 {
                return Err(DecodeError::Schedule(set));
            }
        }

        let modulation = match self.modu.parse::<Modulation>() {
            Ok(Modulation::LoRa) => TxModulation::LoRa(self.lora()?),
            Ok(Modulation::Fsk) => TxModulation::Fsk(self.fsk()?),
            Err(_) => return Err(DecodeError::UnknownModulation(self.modu)),
        };

        let payload = BASE64_STANDARD
            .decode(&self.data)
            .map_err(|source| DecodeError::Payload {
                data: self.data.clone(),
                source,
            })?;

        let packet = TransmitPacket {
            immediate: self.imme,
            count_us: self.tmst.unwrap_or(0),
            gps_time_ms: self.tmms,
            freq_hz: mhz_to_hz(self.freq),
            power_dbm: self.powe,
            rf_chain: self.rfch,
            no_crc: self.ncrc,
            preamble_length: self.prea,
            modulation,
            payload,
        };

        debug!(
            "Decoded txpk {} at {} Hz ({:?}), {} bytes",
            packet.modulation_kind(),
            packet.freq_hz,
            packet.schedule(),
            packet.payload.len()
        );

        Ok(packet)
    }

    fn lora(&self) -> Result<LoRaTx, DecodeError> {
        let datr = match &self.datr {
            Datarate::Text(s) => s,
            other => {
                return Err(DecodeError::DatarateType {
                    modulation: Modulation::LoRa,
                    value: other.to_value(),
                })
            }
        };

        let (spreading_factor, bandwidth) = lora::parse_datr(datr).map_err(|e| match e {
            DatrError::Format => DecodeError::DatarateFormat(datr.clone()),
            DatrError::Bandwidth(khz) => DecodeError::UnknownBandwidth {
                datr: datr.clone(),
                khz,
            },
        })?;

        let coding_rate = CodingRate::from_alias(&self.codr)
            .ok_or_else(|| DecodeError::UnknownCodingRate(self.codr.clone()))?;

        Ok(LoRaTx {
            spreading_factor,
            bandwidth,
            coding_rate,
            invert_polarity: self.ipol,
        })
    }

    fn fsk(&self) -> Result<FskTx, DecodeError> {
        let bitrate = match &self.datr {
            Datarate::Number(n) => *n,
            other => {
                return Err(DecodeError::DatarateType {
                    modulation: Modulation::Fsk,
                    value: other.to_value(),
                })
            }
        };

        Ok(FskTx {
            bitrate_bps: bitrate as u32,
            freq_deviation_khz: gfsk::freq_deviation_from_wire(self.fdev),
        })
    }
}

/// Convert a frequency in MHz to whole Hz.
///
/// The product is truncated, except that values within a millihertz of an
/// integer are snapped to it so 6 decimal MHz inputs convert exactly.
pub fn mhz_to_hz(mhz: f64) -> u32 {
    let hz = mhz * 1.0e6;
    let nearest = hz.round();

    if (hz - nearest).abs() < 1.0e-3 {
        nearest as u32
    } else {
        hz.trunc() as u32
    }
}

fn gps_time_from_millis(ms: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(ms / 1000)
        .ok()?
        .checked_add(GPS_EPOCH_UNIX_SECS)?;
    let nanos = (ms % 1000) as u32 * 1_000_000;

    DateTime::from_timestamp(secs, nanos)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::modulation::lora::Bandwidth;

    fn lora_txpk() -> Value {
        json!({
            "imme": false,
            "tmst": 3_512_348_611u32,
            "freq": 869.525,
            "rfch": 0,
            "powe": 14,
            "modu": "LORA",
            "datr": "SF9BW125",
            "codr": "4/5",
            "ipol": true,
            "prea": 8,
            "size": 5,
            "data": "SGVsbG8="
        })
    }

    #[test]
    fn test_decode_lora() {
        let p = decode(&lora_txpk()).unwrap();

        assert_eq!(p.immediate, false);
        assert_eq!(p.count_us, 3_512_348_611);
        assert_eq!(p.gps_time_ms, None);
        assert_eq!(p.freq_hz, 869_525_000);
        assert_eq!(p.power_dbm, 14);
        assert_eq!(p.rf_chain, 0);
        assert_eq!(p.no_crc, false);
        assert_eq!(p.preamble_length, 8);
        assert_eq!(p.payload, b"Hello".to_vec());
        assert_eq!(
            p.modulation,
            TxModulation::LoRa(LoRaTx {
                spreading_factor: 9,
                bandwidth: Bandwidth::Bw125k,
                coding_rate: CodingRate::Cr4_5,
                invert_polarity: true,
            })
        );
        assert_eq!(p.schedule(), Schedule::Counter(3_512_348_611));
    }

    #[test]
    fn test_decode_fsk() {
        let v = json!({
            "imme": true,
            "freq": 868.8,
            "rfch": 1,
            "powe": 20,
            "modu": "FSK",
            "datr": 50000,
            "fdev": 25000,
            "prea": 5,
            "ncrc": true,
            "data": "AAEC"
        });

        let p = decode(&v).unwrap();

        assert_eq!(p.freq_hz, 868_800_000);
        assert_eq!(p.no_crc, true);
        assert_eq!(p.preamble_length, 5);
        assert_eq!(p.payload, vec![0, 1, 2]);
        assert_eq!(
            p.modulation,
            TxModulation::Fsk(FskTx {
                bitrate_bps: 50_000,
                freq_deviation_khz: 25,
            })
        );
        assert_eq!(p.schedule(), Schedule::Immediate);
    }

    #[test]
    fn test_decode_unknown_modulation() {
        let mut v = lora_txpk();
        v["modu"] = json!("OOK");

        match decode(&v) {
            Err(DecodeError::UnknownModulation(m)) => assert_eq!(m, "OOK"),
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_decode_lora_datr_type() {
        let mut v = lora_txpk();
        v["datr"] = json!(125);

        assert!(matches!(
            decode(&v),
            Err(DecodeError::DatarateType { modulation: Modulation::LoRa, .. })
        ));

        v.as_object_mut().unwrap().remove("datr");
        match decode(&v) {
            Err(DecodeError::DatarateType { value, .. }) => assert_eq!(value, Value::Null),
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_decode_fsk_datr_type() {
        let v = json!({"freq": 868.8, "rfch": 0, "modu": "FSK", "datr": "50000", "data": ""});

        match decode(&v) {
            Err(DecodeError::DatarateType { modulation, value }) => {
                assert_eq!(modulation, Modulation::Fsk);
                assert_eq!(value, json!("50000"));
            }
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_decode_lora_datr_format() {
        let mut v = lora_txpk();
        v["datr"] = json!("garbage");

        match decode(&v) {
            Err(DecodeError::DatarateFormat(d)) => assert_eq!(d, "garbage"),
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_decode_unknown_bandwidth() {
        let mut v = lora_txpk();
        v["datr"] = json!("SF7BW999");

        match decode(&v) {
            Err(DecodeError::UnknownBandwidth { datr, khz }) => {
                assert_eq!(datr, "SF7BW999");
                assert_eq!(khz, 999);
            }
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_decode_coding_rate() {
        let mut v = lora_txpk();

        for (codr, cr) in [
            ("4/6", CodingRate::Cr4_6),
            ("2/3", CodingRate::Cr4_6),
            ("1/2", CodingRate::Cr4_8),
            ("2/4", CodingRate::Cr4_8),
            ("4/7", CodingRate::Cr4_7),
        ] {
            v["codr"] = json!(codr);
            match decode(&v).unwrap().modulation {
                TxModulation::LoRa(l) => assert_eq!(l.coding_rate, cr),
                m => panic!("unexpected modulation: {:?}", m),
            }
        }

        v["codr"] = json!("5/4");
        assert!(matches!(decode(&v), Err(DecodeError::UnknownCodingRate(c)) if c == "5/4"));

        v.as_object_mut().unwrap().remove("codr");
        assert!(matches!(decode(&v), Err(DecodeError::UnknownCodingRate(c)) if c.is_empty()));
    }

    #[test]
    fn test_decode_payload() {
        let mut v = lora_txpk();

        v["data"] = json!("");
        assert_eq!(decode(&v).unwrap().payload, Vec::<u8>::new());

        v["data"] = json!("not base64!");
        assert!(matches!(decode(&v), Err(DecodeError::Payload { .. })));
    }

    #[test]
    fn test_decode_malformed() {
        let mut v = lora_txpk();
        v.as_object_mut().unwrap().remove("freq");
        assert!(matches!(decode(&v), Err(DecodeError::Malformed(_))));

        let mut v = lora_txpk();
        v["tmst"] = json!(-1);
        assert!(matches!(decode(&v), Err(DecodeError::Malformed(_))));

        assert!(matches!(decode(&json!([1, 2, 3])), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode_slice(b"{not json"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_gps_time() {
        let mut v = lora_txpk();
        v.as_object_mut().unwrap().remove("tmst");
        v["tmms"] = json!(1_000_000_000_500u64);

        let p = decode(&v).unwrap();
        assert_eq!(p.schedule(), Schedule::Gps(1_000_000_000_500));

        let t = p.gps_instant().unwrap();
        assert_eq!(t.timestamp(), GPS_EPOCH_UNIX_SECS + 1_000_000_000);
        assert_eq!(t.timestamp_subsec_millis(), 500);

        // Out of range GPS times are carried through, only the instant is absent
        v["tmms"] = json!(u64::MAX);
        let p = decode(&v).unwrap();
        assert_eq!(p.schedule(), Schedule::Gps(u64::MAX));
        assert_eq!(p.gps_instant(), None);
    }

    #[test]
    fn test_decode_immediate_ignores_gps_time() {
        let mut v = lora_txpk();
        v["imme"] = json!(true);
        v["tmms"] = json!(9_000_000_000_000_000u64);

        let p = decode(&v).unwrap();
        assert_eq!(p.gps_time_ms, Some(9_000_000_000_000_000));
        assert_eq!(p.schedule(), Schedule::Immediate);
    }

    #[test]
    fn test_schedule_precedence() {
        let mut v = lora_txpk();
        v["tmms"] = json!(1_000u64);
        let p = decode(&v).unwrap();
        assert!(matches!(p.schedule(), Schedule::Gps(_)));

        v["imme"] = json!(true);
        let p = decode(&v).unwrap();
        assert_eq!(p.schedule(), Schedule::Immediate);
    }

    #[test]
    fn test_schedule_exclusive() {
        let config = DecodeConfig {
            schedule: SchedulePolicy::Exclusive,
        };

        let mut v = lora_txpk();
        assert!(decode_with(&v, &config).is_ok());

        v["imme"] = json!(true);
        match decode_with(&v, &config) {
            Err(DecodeError::Schedule(set)) => assert_eq!(set, vec!["imme", "tmst"]),
            r => panic!("unexpected result: {:?}", r),
        }

        v["imme"] = json!(false);
        v.as_object_mut().unwrap().remove("tmst");
        match decode_with(&v, &config) {
            Err(DecodeError::Schedule(set)) => assert!(set.is_empty()),
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_mhz_to_hz() {
        assert_eq!(mhz_to_hz(868.1), 868_100_000);
        assert_eq!(mhz_to_hz(867.9), 867_900_000);
        assert_eq!(mhz_to_hz(869.525), 869_525_000);
        assert_eq!(mhz_to_hz(923.3), 923_300_000);
        assert_eq!(mhz_to_hz(868.123456), 868_123_456);
        assert_eq!(mhz_to_hz(868.1234567), 868_123_456);
        assert_eq!(mhz_to_hz(-1.0), 0);
    }
}
