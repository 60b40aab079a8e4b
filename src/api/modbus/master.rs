use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

use super::{
    traits::{ChannelHandler, VariableHandler},
    MastervoltClient,
};
use crate::core::{EntityStore, MastervoltError, VariableUpdate};

/// Control messages accepted by a running poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Stop,
}

/// Read one entity and store its value.
///
/// On any failure the entity keeps its previous value.
pub async fn poll_entity(
    client: &MastervoltClient,
    store: &EntityStore,
    name: &str,
) -> Result<VariableUpdate, MastervoltError> {
    let entity = store
        .get(name)
        .ok_or_else(|| MastervoltError::TargetResolution(name.to_string()))?;

    match client.read_variable(&entity.address).await {
        Ok(value) => store
            .update_value(name, value)
            .ok_or_else(|| MastervoltError::TargetResolution(name.to_string())),
        Err(err) => {
            let err = MastervoltError::from(err);
            log::warn!(
                "Keeping previous value {:?} of {} after failed read: {}",
                entity.value,
                name,
                err
            );
            Err(err)
        }
    }
}

struct Schedule {
    name: String,
    interval: Duration,
    next_poll_at: Instant,
}

/// Long-running poll loop over every read-mode entity in `store`.
///
/// Each entity is read once at start-up and then on its own scan interval.
/// Entities are polled one after another, so only one transaction is ever in
/// flight. The loop exits when `control_rx` delivers `PollControl::Stop` or is
/// disconnected, or when the handler asks to stop.
pub async fn run_poll_loop(
    client: Arc<MastervoltClient>,
    store: EntityStore,
    handler: Arc<dyn VariableHandler>,
    control_rx: Option<flume::Receiver<PollControl>>,
) -> Result<()> {
    let now = Instant::now();
    let mut schedule: Vec<Schedule> = store
        .polled()
        .into_iter()
        .map(|entity| Schedule {
            name: entity.name,
            interval: entity.scan_interval,
            next_poll_at: now,
        })
        .collect();

    if schedule.is_empty() {
        log::warn!("No read-mode variables configured, nothing to poll");
        return Ok(());
    }

    log::info!("Starting poll loop for {} variables", schedule.len());

    loop {
        if !handler.should_continue() {
            log::info!("Handler requested stop, exiting poll loop");
            break;
        }

        let Some(next) = schedule
            .iter_mut()
            .min_by_key(|entry| entry.next_poll_at)
        else {
            break;
        };

        let stop_requested = match &control_rx {
            Some(control) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(next.next_poll_at) => false,
                    cmd = control.recv_async() => match cmd {
                        Ok(PollControl::Stop) => true,
                        Err(_) => {
                            log::info!("Control channel closed, exiting poll loop");
                            true
                        }
                    },
                }
            }
            None => {
                tokio::time::sleep_until(next.next_poll_at).await;
                false
            }
        };

        if stop_requested {
            log::info!("Poll loop received stop command, exiting gracefully");
            break;
        }

        match poll_entity(&client, &store, &next.name).await {
            Ok(update) => {
                if let Err(err) = handler.handle_update(update) {
                    log::warn!("Failed to handle update of {}: {}", next.name, err);
                }
            }
            Err(err) => log::error!("Poll of {} failed: {}", next.name, err),
        }

        next.next_poll_at = Instant::now() + next.interval;
    }

    log::info!("Poll loop exited cleanly");
    Ok(())
}

/// Handle to a running poll loop
pub struct MastervoltPoller {
    receiver: flume::Receiver<VariableUpdate>,
    control_sender: flume::Sender<PollControl>,
    handle: tokio::task::JoinHandle<Result<()>>,
}

impl MastervoltPoller {
    /// Spawn a poll loop on the current tokio runtime.
    pub fn spawn(client: Arc<MastervoltClient>, store: EntityStore) -> Self {
        let (update_tx, update_rx) = flume::unbounded();
        let (control_tx, control_rx) = flume::unbounded();
        let handler: Arc<dyn VariableHandler> = Arc::new(ChannelHandler::new(update_tx));

        let handle = tokio::spawn(run_poll_loop(client, store, handler, Some(control_rx)));

        Self {
            receiver: update_rx,
            control_sender: control_tx,
            handle,
        }
    }

    pub fn try_recv(&self) -> Option<VariableUpdate> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next update; `None` once the loop has exited.
    pub async fn recv(&self) -> Option<VariableUpdate> {
        self.receiver.recv_async().await.ok()
    }

    /// Ask the loop to stop after the current transaction.
    pub fn stop(&self) -> Result<()> {
        self.control_sender
            .send(PollControl::Stop)
            .map_err(|e| anyhow::anyhow!("Failed to send control command: {}", e))
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.control_sender.send(PollControl::Stop);
        self.handle
            .await
            .map_err(|e| anyhow::anyhow!("Poll task failed: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::modbus::{traits::NoOpHandler, MastervoltBuilder, ReadWriteRegisters},
        core::{AccessMode, SensorEntity},
        protocol::mastervolt::{DeviceAddress, ModbusError},
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEndpoint(Vec<u16>);

    #[async_trait]
    impl ReadWriteRegisters for FixedEndpoint {
        async fn read_write_registers(
            &mut self,
            _unit_id: u8,
            _read_address: u16,
            _read_count: u16,
            _write_address: u16,
            _values: &[u16],
        ) -> std::result::Result<Vec<u16>, ModbusError> {
            Ok(self.0.clone())
        }
    }

    struct StopAfterFirst(AtomicUsize);

    impl VariableHandler for StopAfterFirst {
        fn handle_update(&self, _update: VariableUpdate) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn should_continue(&self) -> bool {
            self.0.load(Ordering::SeqCst) == 0
        }
    }

    fn client() -> Arc<MastervoltClient> {
        Arc::new(
            MastervoltBuilder::new()
                .build_with_endpoint(Box::new(FixedEndpoint(vec![0, 0, 0, 0, 0x0000, 0x4841]))),
        )
    }

    #[tokio::test]
    async fn test_loop_without_read_variables_returns() {
        let store = EntityStore::from_entities([SensorEntity::new(
            "setpoint",
            DeviceAddress::new(1, 2, 3, 4),
            AccessMode::Write,
        )]);

        run_poll_loop(client(), store, Arc::new(NoOpHandler), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_loop_stops_when_handler_declines() {
        let store = EntityStore::from_entities([SensorEntity::new(
            "voltage",
            DeviceAddress::new(1, 2, 3, 4),
            AccessMode::Read,
        )]);
        let handler = Arc::new(StopAfterFirst(AtomicUsize::new(0)));

        run_poll_loop(client(), store.clone(), handler.clone(), None)
            .await
            .unwrap();

        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
        assert_eq!(store.value("voltage"), Some(12.5));
    }

    #[tokio::test]
    async fn test_poll_unknown_entity() {
        let err = poll_entity(&client(), &EntityStore::new(), "missing")
            .await
            .unwrap_err();
        assert_eq!(err, MastervoltError::TargetResolution("missing".to_string()));
    }

    #[tokio::test]
    async fn test_poller_stop_ends_updates() {
        let mut entity = SensorEntity::new(
            "voltage",
            DeviceAddress::new(1, 2, 3, 4),
            AccessMode::Read,
        );
        entity.scan_interval = Duration::from_secs(3600);
        let poller = MastervoltPoller::spawn(client(), EntityStore::from_entities([entity]));

        let first = tokio::time::timeout(Duration::from_secs(5), poller.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.value, 12.5);
        assert!(poller.try_recv().is_none());

        poller.stop().unwrap();
        let after_stop = tokio::time::timeout(Duration::from_secs(5), poller.recv())
            .await
            .unwrap();
        assert!(after_stop.is_none());
    }
}
