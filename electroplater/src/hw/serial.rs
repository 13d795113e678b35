//! Serial ports as station UARTs

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

use electroplater_hal::uart::{DataBits, Parity, StopBits, UartConfig};
use electroplater_hal::{BusFault, UartRx, UartTx};

/// Classify an I/O error from a serial port
pub fn classify(e: &io::Error) -> BusFault {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => BusFault::Timeout,
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected
        | io::ErrorKind::NotFound
        | io::ErrorKind::UnexpectedEof => BusFault::Disconnected,
        _ => BusFault::Other,
    }
}

fn data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
    }
}

fn stop_bits(bits: StopBits) -> serialport::StopBits {
    match bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
    }
}

/// Blocking serial port
pub struct SerialUart {
    port: Box<dyn SerialPort>,
}

impl SerialUart {
    /// Open `path` with the given framing and read timeout
    pub fn open(path: &str, config: UartConfig, timeout: Duration) -> serialport::Result<Self> {
        let port = serialport::new(path, config.baudrate)
            .data_bits(data_bits(config.data_bits))
            .parity(parity(config.parity))
            .stop_bits(stop_bits(config.stop_bits))
            .timeout(timeout)
            .open()?;
        debug!(path, baudrate = config.baudrate, "Serial port opened");
        Ok(Self { port })
    }
}

impl UartTx for SerialUart {
    type Error = BusFault;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.port.write_all(data).map_err(|e| classify(&e))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Write::flush(&mut self.port).map_err(|e| classify(&e))
    }
}

impl UartRx for SerialUart {
    type Error = BusFault;

    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => {
                debug!(error = %e, "Serial read failed");
                Err(classify(&e))
            }
        }
    }
}
