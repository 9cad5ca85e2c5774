//! Simulated RGB light for tests and the demo front end.
//!
//! `MockLight` keeps its state in memory and records every command it
//! receives, so tests can assert on exactly what reached the "device" and
//! when. Clones share state: hand one clone to a [`MockConnector`] and keep
//! another for inspection.
//!
//! Failure injection:
//! - [`MockLight::set_id`] with [`crate::transport::READ_ID_FAILED`] makes the identity query fail
//! - [`MockLight::fail_commands`] makes every command return `DeviceCommandFailure`
//! - [`MockConnector::fail_open`] makes claiming fail with `DeviceUnavailable`

use crate::capabilities::DeviceColor;
use crate::error::{LightError, LightResult};
use crate::transport::{BlinkCycle, Connector, LightTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A command as observed by the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Color set directly
    SetColor(DeviceColor),
    /// Current color saved
    SaveColor,
    /// Saved color restored (carries the color that was restored)
    ResumeColor(DeviceColor),
    /// Identity queried
    ReadId,
    /// Hardware flashing period programmed or cleared
    SetFlashingPeriod(Option<BlinkCycle>),
    /// Link closed
    Close,
}

/// A recorded command with the time it arrived.
#[derive(Debug, Clone, Copy)]
pub struct CommandRecord {
    /// The command
    pub command: DeviceCommand,
    /// Arrival time (tokio clock, so paused-time tests see virtual time)
    pub at: Instant,
}

#[derive(Debug)]
struct MockState {
    color: DeviceColor,
    saved: DeviceColor,
    flashing: Option<BlinkCycle>,
    id: i32,
    closed: bool,
    fail_commands: bool,
    flashing_supported: bool,
    log: Vec<CommandRecord>,
}

/// In-memory light that records every command.
#[derive(Debug, Clone)]
pub struct MockLight {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockLight {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLight {
    /// Create a light that is off, reports id 1 and supports hardware flashing.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                color: DeviceColor::Off,
                saved: DeviceColor::Off,
                flashing: None,
                id: 1,
                closed: false,
                fail_commands: false,
                flashing_supported: true,
                log: Vec::new(),
            })),
        }
    }

    /// Set the value returned by the identity query.
    pub fn set_id(&self, id: i32) {
        self.state.lock().id = id;
    }

    /// Make every subsequent command fail.
    pub fn fail_commands(&self, fail: bool) {
        self.state.lock().fail_commands = fail;
    }

    /// Simulate firmware without a flashing register.
    pub fn without_flashing_register(self) -> Self {
        self.state.lock().flashing_supported = false;
        self
    }

    /// Color currently displayed.
    pub fn color(&self) -> DeviceColor {
        self.state.lock().color
    }

    /// Programmed hardware flashing period.
    pub fn flashing(&self) -> Option<BlinkCycle> {
        self.state.lock().flashing
    }

    /// Whether the link was closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Snapshot of all recorded commands.
    pub fn history(&self) -> Vec<CommandRecord> {
        self.state.lock().log.clone()
    }

    /// Recorded commands without timestamps.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.lock().log.iter().map(|r| r.command).collect()
    }

    /// Number of recorded commands.
    pub fn command_count(&self) -> usize {
        self.state.lock().log.len()
    }

    /// Forget recorded commands.
    pub fn clear_history(&self) {
        self.state.lock().log.clear();
    }

    fn reopen(&self) {
        self.state.lock().closed = false;
    }

    fn record(&self, command: DeviceCommand) -> LightResult<()> {
        let mut state = self.state.lock();
        if state.fail_commands {
            return Err(LightError::DeviceCommandFailure(format!(
                "simulated failure on {:?}",
                command
            )));
        }
        if state.closed {
            return Err(LightError::DeviceUnavailable("link closed".to_string()));
        }
        match command {
            DeviceCommand::SetColor(color) => state.color = color,
            DeviceCommand::SaveColor => state.saved = state.color,
            DeviceCommand::SetFlashingPeriod(cycle) => state.flashing = cycle,
            DeviceCommand::Close => state.closed = true,
            DeviceCommand::ResumeColor(_) | DeviceCommand::ReadId => {}
        }
        state.log.push(CommandRecord {
            command,
            at: Instant::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl LightTransport for MockLight {
    async fn set_color(&mut self, color: DeviceColor) -> LightResult<()> {
        self.record(DeviceCommand::SetColor(color))
    }

    async fn save_color(&mut self) -> LightResult<()> {
        self.record(DeviceCommand::SaveColor)
    }

    async fn resume_color(&mut self) -> LightResult<()> {
        let saved = self.state.lock().saved;
        self.record(DeviceCommand::ResumeColor(saved))?;
        self.state.lock().color = saved;
        Ok(())
    }

    async fn read_id(&mut self) -> LightResult<i32> {
        self.record(DeviceCommand::ReadId)?;
        Ok(self.state.lock().id)
    }

    async fn set_flashing_period(&mut self, cycle: Option<BlinkCycle>) -> LightResult<()> {
        if !self.state.lock().flashing_supported {
            return Err(LightError::UnsupportedOperation(
                "hardware flashing period".to_string(),
            ));
        }
        self.record(DeviceCommand::SetFlashingPeriod(cycle))
    }

    async fn close(&mut self) -> LightResult<()> {
        self.record(DeviceCommand::Close)
    }
}

/// Connector handing out clones of one [`MockLight`].
#[derive(Debug, Clone)]
pub struct MockConnector {
    light: MockLight,
    fail_open: bool,
    open_delay: Option<Duration>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    /// Connector that always opens `light`.
    pub fn new(light: MockLight) -> Self {
        Self {
            light,
            fail_open: false,
            open_delay: None,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every open attempt fail.
    pub fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Delay each open attempt, e.g. to exercise claim timeouts.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Port names that were opened, in order.
    pub fn opened_ports(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, port_name: &str) -> LightResult<Box<dyn LightTransport>> {
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_open {
            return Err(LightError::DeviceUnavailable(format!(
                "cannot open {}",
                port_name
            )));
        }
        self.light.reopen();
        self.opened.lock().push(port_name.to_string());
        tracing::debug!(port = port_name, "Opened simulated light");
        Ok(Box::new(self.light.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::READ_ID_FAILED;

    #[tokio::test]
    async fn test_save_and_resume() {
        let mut light = MockLight::new();
        light.set_color(DeviceColor::Blue).await.unwrap();
        light.save_color().await.unwrap();
        light.set_color(DeviceColor::Off).await.unwrap();
        light.resume_color().await.unwrap();

        assert_eq!(light.color(), DeviceColor::Blue);
        assert_eq!(
            light.commands(),
            vec![
                DeviceCommand::SetColor(DeviceColor::Blue),
                DeviceCommand::SaveColor,
                DeviceCommand::SetColor(DeviceColor::Off),
                DeviceCommand::ResumeColor(DeviceColor::Blue),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mut light = MockLight::new();
        light.fail_commands(true);
        assert!(matches!(
            light.set_color(DeviceColor::Red).await,
            Err(LightError::DeviceCommandFailure(_))
        ));
        assert_eq!(light.command_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_link_rejects_commands() {
        let mut light = MockLight::new();
        light.close().await.unwrap();
        assert!(light.is_closed());
        assert!(matches!(
            light.set_color(DeviceColor::Red).await,
            Err(LightError::DeviceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_read_id_sentinel() {
        let mut light = MockLight::new();
        assert_eq!(light.read_id().await.unwrap(), 1);
        light.set_id(READ_ID_FAILED);
        assert_eq!(light.read_id().await.unwrap(), READ_ID_FAILED);
    }

    #[tokio::test]
    async fn test_connector_records_ports() {
        let light = MockLight::new();
        let connector = MockConnector::new(light.clone());
        let mut transport = connector.connect("/dev/ttyACM0").await.unwrap();
        transport.set_color(DeviceColor::Green).await.unwrap();

        assert_eq!(connector.opened_ports(), vec!["/dev/ttyACM0".to_string()]);
        assert_eq!(light.color(), DeviceColor::Green);

        let failing = MockConnector::new(MockLight::new()).fail_open();
        assert!(matches!(
            failing.connect("/dev/ttyACM0").await,
            Err(LightError::DeviceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_flashing_register_optional() {
        let mut light = MockLight::new().without_flashing_register();
        assert!(matches!(
            light
                .set_flashing_period(Some(BlinkCycle::from_millis(10, 10)))
                .await,
            Err(LightError::UnsupportedOperation(_))
        ));
    }
}
