//! Blocking APIs on top of the base radio traits
//!
//! These implementations use the radio's `DelayNs` implementation to
//! poll on completion of operations.

use core::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::{Receive, ReceivePacket, Transmit, TransmitPacket};

/// BlockingOptions for blocking radio functions
#[derive(Clone, PartialEq, Debug)]
pub struct BlockingOptions {
    /// Interval for polling for device state
    pub poll_interval: Duration,

    /// Timeout for blocking operation
    pub timeout: Duration,
}

impl Default for BlockingOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_micros(100),
            timeout: Duration::from_millis(100),
        }
    }
}

/// BlockingError wraps radio error type to provide a `Timeout` variant
#[derive(Clone, Debug, PartialEq)]
pub enum BlockingError<E> {
    Inner(E),
    Timeout,
}

impl<E> From<E> for BlockingError<E> {
    fn from(e: E) -> Self {
        BlockingError::Inner(e)
    }
}

/// Blocking transmit implemented over `Transmit`, polling for completion
/// with the radio's `DelayNs` impl
pub trait BlockingTransmit<E> {
    fn do_transmit(
        &mut self,
        packet: &TransmitPacket,
        tx_options: BlockingOptions,
    ) -> Result<(), BlockingError<E>>;
}

impl<T, E> BlockingTransmit<E> for T
where
    T: Transmit<Error = E> + DelayNs,
    E: core::fmt::Debug,
{
    fn do_transmit(
        &mut self,
        packet: &TransmitPacket,
        tx_options: BlockingOptions,
    ) -> Result<(), BlockingError<E>> {
        // Enter transmit mode
        self.start_transmit(packet)?;

        let t = tx_options.timeout.as_micros();
        let mut c = 0;
        loop {
            // Check for transmit complete
            if self.check_transmit()? {
                debug!("Blocking send complete");
                break;
            }

            // Update poll time and timeout if overrun
            c += tx_options.poll_interval.as_micros();
            if c > t {
                debug!("Blocking send timeout");
                return Err(BlockingError::Timeout);
            }

            // Wait for next poll
            self.delay_us(tx_options.poll_interval.as_micros() as u32);
        }

        Ok(())
    }
}

/// Blocking receive implemented over `Receive`, polling for a packet
/// with the radio's `DelayNs` impl
pub trait BlockingReceive<E> {
    fn do_receive(&mut self, rx_options: BlockingOptions) -> Result<ReceivePacket, BlockingError<E>>;
}

impl<T, E> BlockingReceive<E> for T
where
    T: Receive<Error = E> + DelayNs,
    E: core::fmt::Debug,
{
    fn do_receive(&mut self, rx_options: BlockingOptions) -> Result<ReceivePacket, BlockingError<E>> {
        // Start receive mode
        self.start_receive()?;

        let t = rx_options.timeout.as_micros();
        let mut c = 0;
        loop {
            if self.check_receive(true)? {
                return Ok(self.get_received()?);
            }

            c += rx_options.poll_interval.as_micros();
            if c > t {
                debug!("Blocking receive timeout");
                return Err(BlockingError::Timeout);
            }

            self.delay_us(rx_options.poll_interval.as_micros() as u32);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::*;

    #[test]
    fn test_do_transmit() {
        let packet = tx_packet();

        let mut radio = MockRadio::new(&[
            Transaction::start_transmit(packet.clone(), None),
            Transaction::check_transmit(Ok(false)),
            Transaction::delay_us(100),
            Transaction::check_transmit(Ok(true)),
        ]);

        let res = radio.do_transmit(&packet, BlockingOptions::default());
        assert_eq!(res, Ok(()));

        radio.done();
    }

    #[test]
    fn test_do_transmit_timeout() {
        let packet = tx_packet();
        let options = BlockingOptions {
            poll_interval: Duration::from_micros(100),
            timeout: Duration::from_micros(150),
        };

        let mut radio = MockRadio::new(&[
            Transaction::start_transmit(packet.clone(), None),
            Transaction::check_transmit(Ok(false)),
            Transaction::delay_us(100),
            Transaction::check_transmit(Ok(false)),
        ]);

        let res = radio.do_transmit(&packet, options);
        assert_eq!(res, Err(BlockingError::Timeout));

        radio.done();
    }

    #[test]
    fn test_do_transmit_error() {
        let packet = tx_packet();

        let mut radio = MockRadio::new(&[Transaction::start_transmit(
            packet.clone(),
            Some(MockError::Timeout),
        )]);

        let res = radio.do_transmit(&packet, BlockingOptions::default());
        assert_eq!(res, Err(BlockingError::Inner(MockError::Timeout)));

        radio.done();
    }

    #[test]
    fn test_do_receive() {
        let packet = rx_packet();

        let mut radio = MockRadio::new(&[
            Transaction::start_receive(None),
            Transaction::check_receive(true, Ok(false)),
            Transaction::delay_us(100),
            Transaction::check_receive(true, Ok(true)),
            Transaction::get_received(Ok(packet.clone())),
        ]);

        let res = radio.do_receive(BlockingOptions::default());
        assert_eq!(res, Ok(packet));

        radio.done();
    }
}
