//! Modbus RTU framing
//!
//! Only the two functions the power supply needs are supported:
//! - 0x03 read holding registers
//! - 0x06 write single register
//!
//! Frames are `slave, function, payload.., crc_lo, crc_hi`. Register
//! addresses and values are big-endian, the CRC is little-endian.

use electroplater_core::traits::HardwareError;
use thiserror::Error;

/// Read holding registers
pub const READ_HOLDING_REGISTERS: u8 = 0x03;
/// Write single register
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Set on the function code of an exception response
const EXCEPTION_FLAG: u8 = 0x80;

/// Length of the slave/function/first-byte header every response starts with
pub const HEADER_LEN: usize = 3;

/// Modbus protocol errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModbusError {
    /// Frame CRC does not match its contents
    #[error("CRC mismatch")]
    Checksum,
    /// Device answered with an exception code
    #[error("exception {code:#04x} for function {function:#04x}")]
    Exception { function: u8, code: u8 },
    /// Response came from another slave
    #[error("response from unexpected slave {0}")]
    WrongSlave(u8),
    /// Response carries a function code that was not requested
    #[error("unexpected function code {0:#04x}")]
    UnexpectedFunction(u8),
    /// Frame is too short or its byte count is inconsistent
    #[error("bad frame length")]
    Length,
}

impl From<ModbusError> for HardwareError {
    fn from(e: ModbusError) -> Self {
        match e {
            ModbusError::Checksum => HardwareError::Checksum,
            ModbusError::Exception { .. } => HardwareError::Rejected,
            ModbusError::WrongSlave(_)
            | ModbusError::UnexpectedFunction(_)
            | ModbusError::Length => HardwareError::Malformed,
        }
    }
}

/// CRC-16/MODBUS
///
/// Reflected polynomial 0xA001, initial value 0xFFFF, no final xor.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0xFFFFu16;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

fn request(slave: u8, function: u8, first: u16, second: u16) -> [u8; 8] {
    let mut frame = [0u8; 8];
    frame[0] = slave;
    frame[1] = function;
    frame[2..4].copy_from_slice(&first.to_be_bytes());
    frame[4..6].copy_from_slice(&second.to_be_bytes());
    let crc = crc16(&frame[..6]);
    frame[6..].copy_from_slice(&crc.to_le_bytes());
    frame
}

/// Build a read holding registers request
pub fn build_read_request(slave: u8, start: u16, count: u16) -> [u8; 8] {
    request(slave, READ_HOLDING_REGISTERS, start, count)
}

/// Build a write single register request
pub fn build_write_single(slave: u8, register: u16, value: u16) -> [u8; 8] {
    request(slave, WRITE_SINGLE_REGISTER, register, value)
}

/// Total length of a response given its first three bytes
pub fn response_len(header: &[u8; HEADER_LEN]) -> Result<usize, ModbusError> {
    let function = header[1];
    if function & EXCEPTION_FLAG != 0 {
        // slave, function, code, crc
        return Ok(5);
    }
    match function {
        READ_HOLDING_REGISTERS => Ok(HEADER_LEN + usize::from(header[2]) + 2),
        WRITE_SINGLE_REGISTER => Ok(8),
        other => Err(ModbusError::UnexpectedFunction(other)),
    }
}

/// Decoded response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    /// Register data of a read, two big-endian bytes per register
    Registers(&'a [u8]),
    /// Echo of a single register write
    Written { register: u16, value: u16 },
}

impl<'a> Response<'a> {
    /// Register values of a read response
    pub fn registers(&self) -> impl Iterator<Item = u16> + 'a {
        let data: &'a [u8] = match *self {
            Response::Registers(data) => data,
            Response::Written { .. } => &[],
        };
        data.chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
    }
}

/// Check and decode a complete response frame
pub fn parse(frame: &[u8], slave: u8) -> Result<Response<'_>, ModbusError> {
    if frame.len() < 5 {
        return Err(ModbusError::Length);
    }
    let (body, crc) = frame.split_at(frame.len() - 2);
    if crc16(body) != u16::from_le_bytes([crc[0], crc[1]]) {
        return Err(ModbusError::Checksum);
    }
    if body[0] != slave {
        return Err(ModbusError::WrongSlave(body[0]));
    }

    let function = body[1];
    if function & EXCEPTION_FLAG != 0 {
        return Err(ModbusError::Exception {
            function: function & !EXCEPTION_FLAG,
            code: body[2],
        });
    }

    match function {
        READ_HOLDING_REGISTERS => {
            let data = &body[HEADER_LEN..];
            if data.len() != usize::from(body[2]) || data.len() % 2 != 0 {
                return Err(ModbusError::Length);
            }
            Ok(Response::Registers(data))
        }
        WRITE_SINGLE_REGISTER => {
            if body.len() != 6 {
                return Err(ModbusError::Length);
            }
            Ok(Response::Written {
                register: u16::from_be_bytes([body[2], body[3]]),
                value: u16::from_be_bytes([body[4], body[5]]),
            })
        }
        other => Err(ModbusError::UnexpectedFunction(other)),
    }
}
