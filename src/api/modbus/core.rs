/// Core transaction logic - functions that only depend on the `ReadWriteRegisters` seam
///
/// Every Mastervolt access is one function 0x17 request:
/// - the frame (address words + value words) is written at the frame's write address
/// - `READ_COUNT` registers are read back from `READ_ADDRESS` in the same request
///
/// Failures are classified into a `TransactionOutcome` and logged here; nothing
/// past this boundary sees a raw transport error.
use std::time::Duration;

use super::traits::ReadWriteRegisters;
use crate::protocol::mastervolt::{
    build_read_frame, build_write_frame, decode_response, DecodeError, DeviceAddress,
    ModbusError, RegisterFrame, TransactionOutcome, READ_ADDRESS, READ_COUNT,
};

/// Parameters of one combined read/write transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionParams {
    pub unit_id: u8,
    pub read_address: u16,
    pub read_count: u16,
    pub write_address: u16,
    pub timeout: Duration,
}

impl TransactionParams {
    /// Standard Mastervolt parameters for `frame`.
    pub fn for_frame(unit_id: u8, frame: &RegisterFrame, timeout: Duration) -> Self {
        Self {
            unit_id,
            read_address: READ_ADDRESS,
            read_count: READ_COUNT,
            write_address: frame.write_address(),
            timeout,
        }
    }
}

/// Issue one combined read/write-registers request and classify the result.
///
/// The call is bounded by `params.timeout`. A timeout is reported as
/// `ModbusError::Timeout` and never retried; the endpoint is reset before it
/// is handed back so the next transaction starts on a clean stream.
pub async fn execute_transaction<E>(
    endpoint: &mut E,
    frame: &RegisterFrame,
    params: &TransactionParams,
) -> TransactionOutcome
where
    E: ReadWriteRegisters + ?Sized,
{
    log::debug!(
        "Read/write registers: unit={}, write=0x{:04X} {:04X?}, read=0x{:04X}+{}",
        params.unit_id,
        params.write_address,
        frame.words(),
        params.read_address,
        params.read_count
    );

    let request = endpoint.read_write_registers(
        params.unit_id,
        params.read_address,
        params.read_count,
        params.write_address,
        frame.words(),
    );

    let elapsed = tokio::time::timeout(params.timeout, request).await;
    let result = match elapsed {
        Ok(result) => result,
        Err(_) => {
            if let Err(err) = endpoint.reset().await {
                log::warn!("Failed to reset endpoint after timeout: {}", err);
            }
            Err(ModbusError::Timeout(params.timeout))
        }
    };

    match result {
        Ok(registers) if registers.len() < params.read_count as usize => {
            log::error!(
                "Modbus response does not contain enough data: expected {} registers, got {}",
                params.read_count,
                registers.len()
            );
            TransactionOutcome::InsufficientData {
                expected: params.read_count,
                received: registers.len(),
            }
        }
        Ok(registers) => {
            log::debug!("Read/write registers response: {:04X?}", registers);
            TransactionOutcome::Ok(registers)
        }
        Err(err) => {
            log::error!(
                "Error in Modbus read/write operation on unit {}: {}",
                params.unit_id,
                err
            );
            TransactionOutcome::ModbusError(err)
        }
    }
}

/// Read and decode the variable at `address`.
pub async fn read_variable<E>(
    endpoint: &mut E,
    unit_id: u8,
    address: &DeviceAddress,
    timeout: Duration,
) -> Result<f32, DecodeError>
where
    E: ReadWriteRegisters + ?Sized,
{
    let frame = build_read_frame(address);
    let params = TransactionParams::for_frame(unit_id, &frame, timeout);
    let outcome = execute_transaction(endpoint, &frame, &params).await;
    decode_response(&outcome)
}

/// Write `value` to the variable at `address`.
///
/// The read-back half of the transaction is not decoded; only its
/// classification is returned.
pub async fn write_variable<E>(
    endpoint: &mut E,
    unit_id: u8,
    address: &DeviceAddress,
    value: f32,
    timeout: Duration,
) -> TransactionOutcome
where
    E: ReadWriteRegisters + ?Sized,
{
    let frame = build_write_frame(address, value);
    let params = TransactionParams::for_frame(unit_id, &frame, timeout);
    execute_transaction(endpoint, &frame, &params).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedEndpoint {
        reply: Result<Vec<u16>, ModbusError>,
        delay: Option<Duration>,
        requests: Vec<(u8, u16, u16, u16, Vec<u16>)>,
        resets: usize,
    }

    impl ScriptedEndpoint {
        fn replying(reply: Result<Vec<u16>, ModbusError>) -> Self {
            Self {
                reply,
                delay: None,
                requests: Vec::new(),
                resets: 0,
            }
        }
    }

    #[async_trait]
    impl ReadWriteRegisters for ScriptedEndpoint {
        async fn read_write_registers(
            &mut self,
            unit_id: u8,
            read_address: u16,
            read_count: u16,
            write_address: u16,
            values: &[u16],
        ) -> Result<Vec<u16>, ModbusError> {
            self.requests.push((
                unit_id,
                read_address,
                read_count,
                write_address,
                values.to_vec(),
            ));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone()
        }

        async fn reset(&mut self) -> Result<(), ModbusError> {
            self.resets += 1;
            Ok(())
        }
    }

    fn address() -> DeviceAddress {
        DeviceAddress::new(0x05, 0x010203, 0x0010, 0x0020)
    }

    #[test]
    fn test_read_sends_single_combined_request() {
        let mut endpoint = ScriptedEndpoint::replying(Ok(vec![
            0x0501, 0x0203, 0x0010, 0x0020, 0x0000, 0x4841,
        ]));

        let value = tokio_test::block_on(read_variable(
            &mut endpoint,
            1,
            &address(),
            Duration::from_secs(1),
        ));

        assert_eq!(value, Ok(12.5));
        assert_eq!(
            endpoint.requests,
            vec![(
                1,
                0x0000,
                6,
                0x0000,
                vec![0x0501, 0x0203, 0x0010, 0x0020, 0x0000, 0x0000]
            )]
        );
    }

    #[test]
    fn test_write_uses_write_offset() {
        let mut endpoint = ScriptedEndpoint::replying(Ok(vec![0; 6]));

        let outcome = tokio_test::block_on(write_variable(
            &mut endpoint,
            3,
            &address(),
            1.0,
            Duration::from_secs(1),
        ));

        assert!(outcome.is_ok());
        let (unit_id, read_address, read_count, write_address, values) = &endpoint.requests[0];
        assert_eq!((*unit_id, *read_address, *read_count), (3, 0x0000, 6));
        assert_eq!(*write_address, 0x0001);
        assert_eq!(&values[4..], &[0x0000, 0x803F]);
    }

    #[test]
    fn test_short_reply_is_insufficient_data() {
        let mut endpoint = ScriptedEndpoint::replying(Ok(vec![0x0501, 0x0203, 0x0010]));
        let frame = build_read_frame(&address());
        let params = TransactionParams::for_frame(1, &frame, Duration::from_secs(1));

        let outcome = tokio_test::block_on(execute_transaction(&mut endpoint, &frame, &params));
        assert_eq!(
            outcome,
            TransactionOutcome::InsufficientData {
                expected: 6,
                received: 3
            }
        );
    }

    #[test]
    fn test_exception_is_modbus_error() {
        let mut endpoint =
            ScriptedEndpoint::replying(Err(ModbusError::Exception("ServerDeviceBusy".into())));

        let value = tokio_test::block_on(read_variable(
            &mut endpoint,
            1,
            &address(),
            Duration::from_secs(1),
        ));
        assert_eq!(
            value,
            Err(DecodeError::Modbus(ModbusError::Exception(
                "ServerDeviceBusy".into()
            )))
        );
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let mut endpoint = ScriptedEndpoint::replying(Ok(vec![0; 6]));
        endpoint.delay = Some(Duration::from_secs(10));

        let timeout = Duration::from_millis(50);
        let value = read_variable(&mut endpoint, 1, &address(), timeout).await;

        assert_eq!(value, Err(DecodeError::Modbus(ModbusError::Timeout(timeout))));
        assert_eq!(endpoint.requests.len(), 1);
        assert_eq!(endpoint.resets, 1);
    }

    #[test]
    fn test_failures_other_than_timeout_keep_endpoint() {
        let mut endpoint =
            ScriptedEndpoint::replying(Err(ModbusError::Transport("broken pipe".into())));

        let outcome = tokio_test::block_on(write_variable(
            &mut endpoint,
            1,
            &address(),
            2.0,
            Duration::from_secs(1),
        ));

        assert_eq!(
            outcome,
            TransactionOutcome::ModbusError(ModbusError::Transport("broken pipe".into()))
        );
        assert_eq!(endpoint.resets, 0);
    }
}
