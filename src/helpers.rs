//! Command line helpers for exercising the codec
//!
//! `decode` parses a `txpk` object and prints the resulting packet,
//! `encode` assembles a received packet from options and prints its `rxpk`.

use std::fs;
use std::io::{self, Read};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use structopt::StructOpt;

use crate::config::{DecodeConfig, SchedulePolicy};
use crate::downlink::{decode_with, mhz_to_hz, DecodeError};
use crate::modulation::gfsk::FskRx;
use crate::modulation::lora::{Bandwidth, CodingRate, LoRaRx};
use crate::modulation::{Modulation, RxModulation};
use crate::uplink::{encode, CrcStatus, ReceivePacket};

/// Basic operations supported by the helpers package
#[derive(Clone, StructOpt, PartialEq, Debug)]
pub enum Operation {
    #[structopt(name = "decode")]
    /// Decode a txpk object
    Decode(DecodeOptions),

    #[structopt(name = "encode")]
    /// Encode an rxpk object
    Encode(EncodeOptions),
}

/// Helper errors
#[derive(Debug, thiserror::Error)]
pub enum HelperError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("invalid option: {0}")]
    Option(String),
}

pub fn do_operation(operation: Operation) -> Result<String, HelperError> {
    match operation {
        Operation::Decode(options) => do_decode(options),
        Operation::Encode(options) => do_encode(options),
    }
}

/// Configuration for Decode operation
#[derive(Clone, StructOpt, PartialEq, Debug)]
pub struct DecodeOptions {
    /// txpk JSON object, read from --file or stdin if omitted
    pub txpk: Option<String>,

    /// Read the txpk object from a file
    #[structopt(long)]
    pub file: Option<String>,

    /// Require exactly one of imme / tmst / tmms
    #[structopt(long)]
    pub exclusive: bool,
}

pub fn do_decode(options: DecodeOptions) -> Result<String, HelperError> {
    let text = match (&options.txpk, &options.file) {
        (Some(t), _) => t.clone(),
        (None, Some(f)) => fs::read_to_string(f)?,
        (None, None) => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            s
        }
    };

    let value: serde_json::Value = serde_json::from_str(&text)?;

    // Accept both a bare txpk and the {"txpk": {...}} PULL_RESP body
    let txpk = value.get("txpk").unwrap_or(&value);

    let config = DecodeConfig {
        schedule: if options.exclusive {
            SchedulePolicy::Exclusive
        } else {
            SchedulePolicy::Precedence
        },
    };

    let packet = decode_with(txpk, &config)?;

    info!("Schedule: {:?}", packet.schedule());

    Ok(format!("{:#?}", packet))
}

/// Configuration for Encode operation
#[derive(Clone, StructOpt, PartialEq, Debug)]
pub struct EncodeOptions {
    /// Concentrator counter at reception
    #[structopt(long, default_value = "0")]
    pub tmst: u32,

    /// RFC 3339 reception time, defaults to now
    #[structopt(long, parse(try_from_str = humantime::parse_rfc3339))]
    pub time: Option<SystemTime>,

    /// IF channel
    #[structopt(long, default_value = "0")]
    pub chan: u8,

    /// RF chain
    #[structopt(long, default_value = "0")]
    pub rfch: u8,

    /// Frequency in MHz
    #[structopt(long)]
    pub freq: f64,

    /// CRC status (1 = OK, -1 = fail, 0 = no CRC)
    #[structopt(long, default_value = "1", allow_hyphen_values = true)]
    pub stat: i8,

    /// Modulation, LORA or FSK
    #[structopt(long, default_value = "LORA")]
    pub modu: Modulation,

    /// LoRa spreading factor
    #[structopt(long, default_value = "7")]
    pub sf: u32,

    /// LoRa bandwidth in whole kHz
    #[structopt(long, default_value = "125")]
    pub bw: u32,

    /// LoRa coding rate
    #[structopt(long, default_value = "4/5")]
    pub codr: String,

    /// FSK bitrate in bps
    #[structopt(long, default_value = "50000")]
    pub bitrate: u32,

    /// LoRa SNR in dB
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    pub snr: f32,

    /// RSSI in dBm
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    pub rssi: f32,

    /// Payload as text
    #[structopt(long, default_value = "")]
    pub payload: String,
}

pub fn do_encode(options: EncodeOptions) -> Result<String, HelperError> {
    let crc_status = CrcStatus::try_from(options.stat)
        .map_err(|v| HelperError::Option(format!("stat {}", v)))?;

    let modulation = match options.modu {
        Modulation::LoRa => RxModulation::LoRa(LoRaRx {
            spreading_factor: options.sf,
            bandwidth: Bandwidth::from_khz(options.bw)
                .ok_or_else(|| HelperError::Option(format!("bw {}", options.bw)))?,
            coding_rate: CodingRate::from_alias(&options.codr)
                .ok_or_else(|| HelperError::Option(format!("codr {}", options.codr)))?,
            snr_db: options.snr,
        }),
        Modulation::Fsk => RxModulation::Fsk(FskRx {
            bitrate_bps: options.bitrate,
        }),
    };

    let packet = ReceivePacket {
        count_us: options.tmst,
        received_at: DateTime::<Utc>::from(options.time.unwrap_or_else(SystemTime::now)),
        freq_hz: mhz_to_hz(options.freq),
        if_chain: options.chan,
        rf_chain: options.rfch,
        crc_status,
        modulation,
        rssi_dbm: options.rssi,
        payload: options.payload.into_bytes(),
    };

    Ok(encode(&packet))
}
