//! Serial badge reader driver.
//!
//! Talks to a 125 kHz reader wired to a UART (9600 baud, 8N1, no flow
//! control). The `serialport` API is blocking, so every read runs on the
//! blocking thread pool while the async side stays responsive.

use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use badgegate_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_SCAN_TIMEOUT_MS, DEFAULT_SERIAL_PATH, MIN_FRAME_LEN,
};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info, trace, warn};

use crate::error::{HardwareError, Result};
use crate::traits::CredentialReader;

/// Configuration for the serial badge reader
///
/// # Example
///
/// ```
/// use badgegate_hardware::serial::SerialConfig;
/// use std::time::Duration;
///
/// let config = SerialConfig::new("/dev/ttyUSB0")
///     .baud_rate(19200)
///     .timeout(Duration::from_millis(250));
/// assert_eq!(config.path, "/dev/ttyUSB0");
/// ```
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path of the UART
    pub path: String,

    /// Line speed
    pub baud_rate: u32,

    /// Upper bound of a single scan attempt
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SERIAL_PATH.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS),
        }
    }
}

impl SerialConfig {
    /// Create a configuration for the given device path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the line speed
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the per-scan timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Badge reader attached to a serial port.
///
/// The port is opened once and reused for every scan.
pub struct SerialReader {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    name: String,
}

impl std::fmt::Debug for SerialReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialReader")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SerialReader {
    /// Open and configure the serial port.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the port cannot be
    /// opened or configured.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        info!(
            path = %config.path,
            baud_rate = config.baud_rate,
            timeout_ms = config.timeout.as_millis() as u64,
            "Opening badge reader"
        );

        let port = serialport::new(&config.path, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|e| {
                HardwareError::initialization_failed(format!(
                    "failed to open {}: {}",
                    config.path, e
                ))
            })?;

        // Frames that piled up before we started would be reported as scans
        if let Err(e) = port.clear(ClearBuffer::Input) {
            warn!(path = %config.path, error = %e, "Failed to flush reader input buffer");
        }

        Ok(Self {
            port: Arc::new(Mutex::new(port)),
            name: config.path.clone(),
        })
    }
}

impl CredentialReader for SerialReader {
    async fn scan(&mut self, out: &mut [u8]) -> Result<usize> {
        let port = Arc::clone(&self.port);
        let len = out.len();

        let (n, frame) = tokio::task::spawn_blocking(move || -> Result<(usize, Vec<u8>)> {
            let mut port = port
                .lock()
                .map_err(|_| HardwareError::communication("serial port lock poisoned"))?;
            let mut frame = vec![0u8; len];
            let n = read_frame(port.as_mut(), &mut frame)?;
            if n > 0 {
                // A badge held on the reader keeps streaming frames
                port.clear(ClearBuffer::Input)?;
            }
            Ok((n, frame))
        })
        .await
        .map_err(|e| HardwareError::communication(format!("serial read task failed: {e}")))??;

        if n > 0 {
            trace!(device = %self.name, bytes = n, "Frame received");
        }
        out[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Read until a full frame arrived or the line went quiet for one timeout.
fn read_frame<P: Read + ?Sized>(port: &mut P, frame: &mut [u8]) -> Result<usize> {
    let wanted = frame.len().min(MIN_FRAME_LEN);
    let mut filled = 0;

    while filled < wanted {
        match port.read(&mut frame[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if filled > 0 && filled < wanted {
        debug!(bytes = filled, "Partial frame discarded by decoder");
    }
    Ok(filled)
}
