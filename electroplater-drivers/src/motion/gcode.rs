//! G-code motion over the printer's serial link
//!
//! Each command is one line. The firmware answers every line with `ok`,
//! possibly preceded by `busy:`, `echo:` or temperature report lines.
//! `Error:` and `!!` replies mean the command was refused.

use core::fmt::{self, Write};

use electroplater_core::traits::{HardwareError, Motion, MoveTo};
use electroplater_hal::{Uart, UartRx, UartTx};
use heapless::String;
use thiserror::Error;
use tracing::{debug, warn};

use crate::bus_error;

/// Longest command or reply line handled
pub const MAX_LINE: usize = 96;

/// G-code link errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GcodeError {
    /// Command does not fit in one line buffer
    #[error("command line too long")]
    LineTooLong,
    /// Firmware refused the command
    #[error("firmware reported an error")]
    Refused,
    /// Reply line too long or not text
    #[error("unreadable reply line")]
    BadReply,
    /// No `ok` within the allowed number of reply lines
    #[error("no acknowledgement")]
    NoAcknowledge,
}

impl From<GcodeError> for HardwareError {
    fn from(e: GcodeError) -> Self {
        match e {
            GcodeError::LineTooLong | GcodeError::Refused => HardwareError::Rejected,
            GcodeError::BadReply | GcodeError::NoAcknowledge => HardwareError::Malformed,
        }
    }
}

/// G-code link configuration
#[derive(Debug, Clone)]
pub struct GcodeConfig {
    /// Reply lines read while waiting for `ok` before giving up
    pub max_reply_lines: u16,
}

impl Default for GcodeConfig {
    fn default() -> Self {
        Self {
            max_reply_lines: 32,
        }
    }
}

/// Printer motion over G-code
pub struct GcodeMotion<U: Uart> {
    uart: U,
    config: GcodeConfig,
    /// `G90` sent since this link was opened
    absolute: bool,
}

impl<U: Uart> GcodeMotion<U> {
    /// Create a driver on an open serial link
    pub fn new(uart: U, config: GcodeConfig) -> Self {
        Self {
            uart,
            config,
            absolute: false,
        }
    }

    /// Send one command line and wait for its acknowledgement
    pub fn send(&mut self, command: fmt::Arguments<'_>) -> Result<(), HardwareError> {
        let mut line: String<MAX_LINE> = String::new();
        writeln!(line, "{}", command).map_err(|_| GcodeError::LineTooLong)?;
        debug!(command = line.trim_end(), "G-code");

        self.uart
            .write_blocking(line.as_bytes())
            .map_err(|e| bus_error(e.into()))?;
        self.uart.flush().map_err(|e| bus_error(e.into()))?;
        self.await_ok()
    }

    fn await_ok(&mut self) -> Result<(), HardwareError> {
        for _ in 0..self.config.max_reply_lines {
            let reply = self.read_line()?;
            let reply = reply.trim();
            if reply.starts_with("ok") {
                return Ok(());
            }
            if reply.starts_with("Error:") || reply.starts_with("!!") {
                warn!(reply, "Printer refused command");
                return Err(GcodeError::Refused.into());
            }
            // busy:, echo:, temperature reports and blank lines
            debug!(reply, "Skipping printer reply");
        }
        Err(GcodeError::NoAcknowledge.into())
    }

    fn read_line(&mut self) -> Result<String<MAX_LINE>, HardwareError> {
        let mut bytes: heapless::Vec<u8, MAX_LINE> = heapless::Vec::new();
        loop {
            match self.uart.read_byte().map_err(bus_error)? {
                b'\n' => break,
                b'\r' => {}
                byte => bytes.push(byte).map_err(|_| GcodeError::BadReply)?,
            }
        }
        String::from_utf8(bytes).map_err(|_| GcodeError::BadReply.into())
    }
}

impl<U: Uart> Motion for GcodeMotion<U> {
    fn set_bed_temperature(&mut self, celsius: f32) -> Result<(), HardwareError> {
        self.send(format_args!("M140 S{}", celsius))
    }

    fn select_tool(&mut self, tool: u8) -> Result<(), HardwareError> {
        self.send(format_args!("T{}", tool))
    }

    fn move_absolute(&mut self, target: MoveTo) -> Result<(), HardwareError> {
        if target.is_empty() {
            return Ok(());
        }
        if !self.absolute {
            self.send(format_args!("G90"))?;
            self.absolute = true;
        }
        self.send(format_args!("{}", target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockUart;

    fn motion() -> GcodeMotion<MockUart> {
        GcodeMotion::new(MockUart::new(), GcodeConfig::default())
    }

    #[test]
    fn test_bed_and_tool_lines() {
        let mut motion = motion();
        motion.uart.reply(b"ok\nok\nok\n");

        motion.set_bed_temperature(60.0).unwrap();
        motion.set_bed_temperature(0.0).unwrap();
        motion.select_tool(1).unwrap();

        assert_eq!(motion.uart.sent_text(), "M140 S60\nM140 S0\nT1\n");
    }

    #[test]
    fn test_absolute_mode_sent_once() {
        let mut motion = motion();
        motion.uart.reply(b"ok\nok\nok\n");

        motion.move_absolute(MoveTo::x(340.0)).unwrap();
        motion.move_absolute(MoveTo::xy(197.0, 172.0)).unwrap();

        assert_eq!(
            motion.uart.sent_text(),
            "G90\nG1 X340\nG1 X197 Y172\n"
        );
    }

    #[test]
    fn test_empty_move_sends_nothing() {
        let mut motion = motion();

        motion.move_absolute(MoveTo::default()).unwrap();

        assert!(motion.uart.tx.is_empty());
    }

    #[test]
    fn test_skips_busy_and_echo() {
        let mut motion = motion();
        motion
            .uart
            .reply(b"echo:busy: processing\r\nbusy: processing\r\n T:21.0 /0.0 B:60.1 /60.0\r\nok\r\n");

        motion.select_tool(1).unwrap();
        assert!(motion.uart.rx.is_empty());
    }

    #[test]
    fn test_error_reply_rejected() {
        let mut motion = motion();
        motion.uart.reply(b"Error:Unknown command: \"T9\"\n");
        assert_eq!(motion.select_tool(9), Err(HardwareError::Rejected));

        let mut motion = self::motion();
        motion.uart.reply(b"!! kill\n");
        assert_eq!(motion.select_tool(1), Err(HardwareError::Rejected));
    }

    #[test]
    fn test_no_reply_times_out() {
        let mut motion = motion();
        assert_eq!(motion.select_tool(1), Err(HardwareError::Timeout));
    }

    #[test]
    fn test_too_many_unrelated_lines() {
        let mut motion = GcodeMotion::new(
            MockUart::new(),
            GcodeConfig {
                max_reply_lines: 3,
            },
        );
        motion.uart.reply(b"echo:a\necho:b\necho:c\nok\n");

        assert_eq!(motion.select_tool(1), Err(HardwareError::Malformed));
    }

    #[test]
    fn test_overlong_reply_malformed() {
        let mut motion = motion();
        let mut reply = vec![b'x'; MAX_LINE + 1];
        reply.push(b'\n');
        motion.uart.reply(&reply);

        assert_eq!(motion.select_tool(1), Err(HardwareError::Malformed));
    }

    #[test]
    fn test_failed_g90_is_retried() {
        let mut motion = motion();
        motion.uart.reply(b"Error:busy\nok\nok\n");

        assert_eq!(
            motion.move_absolute(MoveTo::z(50.0)),
            Err(HardwareError::Rejected)
        );
        motion.move_absolute(MoveTo::z(50.0)).unwrap();

        assert_eq!(motion.uart.sent_text(), "G90\nG90\nG1 Z50\n");
    }
}
