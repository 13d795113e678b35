//! In-memory buses for driver tests

use std::collections::VecDeque;
use std::vec::Vec;

use electroplater_hal::{BusFault, I2cBus, UartRx, UartTx};

/// UART that records writes and replays scripted replies
#[derive(Default)]
pub struct MockUart {
    pub tx: Vec<u8>,
    pub rx: VecDeque<u8>,
    pub fail_writes: Option<BusFault>,
}

impl MockUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be read back
    pub fn reply(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Bytes written so far as text
    pub fn sent_text(&self) -> std::string::String {
        std::string::String::from_utf8_lossy(&self.tx).into_owned()
    }
}

impl UartTx for MockUart {
    type Error = BusFault;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if let Some(fault) = self.fail_writes {
            return Err(fault);
        }
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl UartRx for MockUart {
    type Error = BusFault;

    /// Hands out at most one byte per call to exercise partial reads
    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match (buf.first_mut(), self.rx.pop_front()) {
            (Some(slot), Some(byte)) => {
                *slot = byte;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

/// I2C bus that records every write
#[derive(Default)]
pub struct MockI2c {
    pub writes: Vec<(u8, Vec<u8>)>,
    pub fault: Option<BusFault>,
}

impl I2cBus for MockI2c {
    type Error = BusFault;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        self.writes.push((address, data.to_vec()));
        Ok(())
    }
}
