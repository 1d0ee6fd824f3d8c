//! Glue between the codec and a radio driver
//!
//! Datagram framing and acknowledgements stay with the caller; these helpers
//! only move single packets between wire objects and the radio.

use core::fmt::Debug;

use serde_json::Value;

use crate::config::DecodeConfig;
use crate::downlink::{decode_with, DecodeError};
use crate::uplink::encode;
use crate::{Receive, Transmit};

/// Errors forwarding a downlink to the radio
#[derive(Debug, thiserror::Error)]
pub enum ForwardError<E: Debug> {
    /// The `txpk` object was rejected, nothing was sent to the radio
    #[error("invalid downlink: {0}")]
    Decode(#[from] DecodeError),

    #[error("radio error: {0:?}")]
    Radio(E),
}

/// Decode a `txpk` object and hand it to the radio for transmission
pub fn forward_downlink<T, E>(
    radio: &mut T,
    txpk: &Value,
    config: &DecodeConfig,
) -> Result<(), ForwardError<E>>
where
    T: Transmit<Error = E>,
    E: Debug,
{
    let packet = decode_with(txpk, config).map_err(|e| {
        warn!("Dropping downlink: {}", e);
        e
    })?;

    radio.start_transmit(&packet).map_err(ForwardError::Radio)?;

    Ok(())
}

/// Poll the radio and return the `rxpk` text for a received packet, if any
pub fn collect_uplink<T, E>(radio: &mut T, restart: bool) -> Result<Option<String>, E>
where
    T: Receive<Error = E>,
{
    if !radio.check_receive(restart)? {
        return Ok(None);
    }

    let packet = radio.get_received()?;

    debug!(
        "Received {} packet at {} Hz, {} bytes",
        packet.modulation_kind(),
        packet.freq_hz,
        packet.payload.len()
    );

    Ok(Some(encode(&packet)))
}
