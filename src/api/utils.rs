use anyhow::{anyhow, Result};

/// Open a serial port for async Modbus RTU, enabling exclusive access on Unix systems.
pub fn open_serial_stream(port: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let builder = tokio_serial::new(port, baud_rate);

    #[cfg(unix)]
    {
        let mut stream = tokio_serial::SerialStream::open(&builder)
            .map_err(|err| anyhow!("Failed to open port {port}: {err}"))?;
        stream
            .set_exclusive(true)
            .map_err(|err| anyhow!("Failed to acquire exclusive access to {port}: {err}"))?;
        Ok(stream)
    }

    #[cfg(not(unix))]
    {
        tokio_serial::SerialStream::open(&builder)
            .map_err(|err| anyhow!("Failed to open port {port}: {err}"))
    }
}
