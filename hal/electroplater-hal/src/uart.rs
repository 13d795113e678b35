//! UART serial communication abstractions
//!
//! Provides blocking serial traits implemented by the host for USB-serial
//! adapters and by tests with in-memory buffers.

use crate::BusFault;

/// UART transmitter
pub trait UartTx {
    /// Error type for transmit operations
    type Error: Into<BusFault>;

    /// Write data to the UART
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// UART receiver
pub trait UartRx {
    /// Error type for receive operations
    type Error: Into<BusFault>;

    /// Read data from the UART
    ///
    /// Returns the number of bytes placed in `buf`. Zero means the read
    /// timed out with nothing received.
    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Read a single byte from the UART
    ///
    /// A timeout with no data is reported as [`BusFault::Timeout`].
    fn read_byte(&mut self) -> Result<u8, BusFault> {
        let mut buf = [0u8; 1];
        match self.read_blocking(&mut buf) {
            Ok(0) => Err(BusFault::Timeout),
            Ok(_) => Ok(buf[0]),
            Err(e) => Err(e.into()),
        }
    }

    /// Fill `buf` completely
    ///
    /// Keeps reading until the buffer is full. A read that returns no data
    /// ends the attempt with [`BusFault::Timeout`].
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), BusFault> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read_blocking(&mut buf[filled..]) {
                Ok(0) => return Err(BusFault::Timeout),
                Ok(n) => filled += n,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Combined UART interface
///
/// For UARTs that provide both TX and RX on a single peripheral.
pub trait Uart: UartTx + UartRx {}

// Blanket implementation
impl<T: UartTx + UartRx> Uart for T {}

/// UART configuration
#[derive(Debug, Clone, Copy)]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl UartConfig {
    /// 8N1 at the given baud rate
    pub const fn with_baudrate(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}
