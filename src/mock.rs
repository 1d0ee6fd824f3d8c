//! Mock radio driver for application testing
//!
//! Expectation driven implementation of the [`Transmit`] and [`Receive`]
//! traits: each call must match the next queued [`Transaction`], which also
//! supplies the response.

use chrono::DateTime;
use embedded_hal::delay::DelayNs;
use embedded_hal_mock::common::Generic;

use crate::modulation::lora::{Bandwidth, CodingRate, LoRaRx, LoRaTx};
use crate::modulation::{RxModulation, TxModulation};
use crate::{CrcStatus, Receive, ReceivePacket, Transmit, TransmitPacket};

/// MockError for use with mock radio
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MockError {
    #[error("Timeout")]
    Timeout,
}

/// Transactions describe interactions with a radio device
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    request: Request,
    response: Response,
}

#[derive(Debug, Clone, PartialEq)]
enum Request {
    StartTransmit(TransmitPacket),
    CheckTransmit,
    StartReceive,
    CheckReceive(bool),
    GetReceived,
    DelayNs(u32),
    DelayUs(u32),
}

#[derive(Debug, Clone, PartialEq)]
enum Response {
    Ok,
    Bool(bool),
    Received(ReceivePacket),
    Err(MockError),
}

impl From<Option<MockError>> for Response {
    fn from(e: Option<MockError>) -> Self {
        match e {
            Some(v) => Response::Err(v),
            None => Response::Ok,
        }
    }
}

impl Transaction {
    /// Start radio transmission
    pub fn start_transmit(packet: TransmitPacket, err: Option<MockError>) -> Self {
        Self {
            request: Request::StartTransmit(packet),
            response: err.into(),
        }
    }

    /// Check for transmission completed
    pub fn check_transmit(res: Result<bool, MockError>) -> Self {
        Self {
            request: Request::CheckTransmit,
            response: res.map_or_else(Response::Err, Response::Bool),
        }
    }

    /// Start radio reception
    pub fn start_receive(err: Option<MockError>) -> Self {
        Self {
            request: Request::StartReceive,
            response: err.into(),
        }
    }

    /// Check for radio reception
    pub fn check_receive(restart: bool, res: Result<bool, MockError>) -> Self {
        Self {
            request: Request::CheckReceive(restart),
            response: res.map_or_else(Response::Err, Response::Bool),
        }
    }

    /// Fetch received packet
    pub fn get_received(res: Result<ReceivePacket, MockError>) -> Self {
        Self {
            request: Request::GetReceived,
            response: res.map_or_else(Response::Err, Response::Received),
        }
    }

    /// Delay for a certain number of nanoseconds
    pub fn delay_ns(ns: u32) -> Self {
        Self {
            request: Request::DelayNs(ns),
            response: Response::Ok,
        }
    }

    /// Delay for a certain number of microseconds
    pub fn delay_us(us: u32) -> Self {
        Self {
            request: Request::DelayUs(us),
            response: Response::Ok,
        }
    }
}

/// Mock radio, panics on any call that does not match the next expectation
///
/// Based on `embedded_hal_mock::common::Generic`
#[derive(Debug, Clone)]
pub struct MockRadio {
    inner: Generic<Transaction>,
}

impl MockRadio {
    pub fn new(expectations: &[Transaction]) -> Self {
        let inner = Generic::new(expectations);

        Self { inner }
    }

    pub fn expect(&mut self, expectations: &[Transaction]) {
        self.inner.expect(expectations);
    }

    pub fn next(&mut self) -> Option<Transaction> {
        self.inner.next()
    }

    /// Assert all expectations have been consumed
    pub fn done(&mut self) {
        self.inner.done()
    }

    fn respond(&mut self, request: Request) -> Response {
        let n = match self.next() {
            Some(n) => n,
            None => panic!("no expectation for {:?} call", request),
        };

        assert_eq!(&n.request, &request);

        n.response
    }

    fn unit(&mut self, request: Request) -> Result<(), MockError> {
        match self.respond(request) {
            Response::Ok => Ok(()),
            Response::Err(e) => Err(e),
            r => panic!("invalid response for request: {:?}", r),
        }
    }

    fn flag(&mut self, request: Request) -> Result<bool, MockError> {
        match self.respond(request) {
            Response::Bool(b) => Ok(b),
            Response::Err(e) => Err(e),
            r => panic!("invalid response for request: {:?}", r),
        }
    }
}

impl Transmit for MockRadio {
    type Error = MockError;

    fn start_transmit(&mut self, packet: &TransmitPacket) -> Result<(), Self::Error> {
        debug!("Start transmit {:?}", packet);
        self.unit(Request::StartTransmit(packet.clone()))
    }

    fn check_transmit(&mut self) -> Result<bool, Self::Error> {
        let res = self.flag(Request::CheckTransmit);
        debug!("Check transmit {:?}", res);
        res
    }
}

impl Receive for MockRadio {
    type Error = MockError;

    fn start_receive(&mut self) -> Result<(), Self::Error> {
        debug!("Start receive");
        self.unit(Request::StartReceive)
    }

    fn check_receive(&mut self, restart: bool) -> Result<bool, Self::Error> {
        let res = self.flag(Request::CheckReceive(restart));
        debug!("Check receive {:?}", res);
        res
    }

    fn get_received(&mut self) -> Result<ReceivePacket, Self::Error> {
        let res = match self.respond(Request::GetReceived) {
            Response::Received(p) => Ok(p),
            Response::Err(e) => Err(e),
            r => panic!("invalid response for request: {:?}", r),
        };

        debug!("Get received {:?}", res);

        res
    }
}

impl DelayNs for MockRadio {
    fn delay_ns(&mut self, ns: u32) {
        let _ = self.respond(Request::DelayNs(ns));
    }

    fn delay_us(&mut self, us: u32) {
        let _ = self.respond(Request::DelayUs(us));
    }
}

/// LoRa downlink for driver tests
pub fn tx_packet() -> TransmitPacket {
    TransmitPacket {
        immediate: false,
        count_us: 1_000_000,
        gps_time_ms: None,
        freq_hz: 869_525_000,
        power_dbm: 14,
        rf_chain: 0,
        no_crc: true,
        preamble_length: 8,
        modulation: TxModulation::LoRa(LoRaTx {
            spreading_factor: 9,
            bandwidth: Bandwidth::Bw125k,
            coding_rate: CodingRate::Cr4_5,
            invert_polarity: true,
        }),
        payload: vec![0xaa, 0xbb, 0xcc],
    }
}

/// LoRa uplink for driver tests
pub fn rx_packet() -> ReceivePacket {
    ReceivePacket {
        count_us: 2_000_000,
        received_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        freq_hz: 868_300_000,
        if_chain: 1,
        rf_chain: 0,
        crc_status: CrcStatus::Ok,
        modulation: RxModulation::LoRa(LoRaRx {
            spreading_factor: 7,
            bandwidth: Bandwidth::Bw125k,
            coding_rate: CodingRate::Cr4_5,
            snr_db: 9.5,
        }),
        rssi_dbm: -57.0,
        payload: vec![0x40, 0x01, 0x02],
    }
}
