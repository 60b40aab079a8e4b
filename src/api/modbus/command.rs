use super::MastervoltClient;
use crate::{
    core::{AddressRegistry, MastervoltError},
    protocol::mastervolt::{TransactionOutcome, RESPONSE_BYTES},
};

/// Write `value` to the variable registered as `target_name`.
///
/// An unknown target is a no-op that returns `TargetResolution`; no
/// transaction is issued for it.
pub async fn send_command(
    client: &MastervoltClient,
    registry: &AddressRegistry,
    target_name: &str,
    value: f32,
) -> Result<(), MastervoltError> {
    let address = registry.resolve(target_name).inspect_err(|err| {
        log::error!("Cannot send command: {}", err);
    })?;

    log::info!(
        "Sending command to {} ({}): value={}",
        target_name,
        address,
        value
    );

    match client.write_variable(&address, value).await {
        TransactionOutcome::Ok(_) => {
            log::info!("Command to {} acknowledged", target_name);
            Ok(())
        }
        TransactionOutcome::ModbusError(err) => Err(err.into()),
        TransactionOutcome::InsufficientData { received, .. } => {
            Err(MastervoltError::InsufficientData {
                expected: RESPONSE_BYTES,
                received: received * 2,
            })
        }
    }
}
