//! Telemetry, GPS control and Find My keys.

use tracing::{debug, info};
use tracker_protocol::{Command, DeviceStatus, FindMyKeys, Response, SysInfo};

use crate::connection::{unexpected, Connection};
use crate::error::{LinkError, Result};
use crate::transport::Transport;

impl<T: Transport> Connection<T> {
    /// Read and decode the system telemetry block.
    pub async fn get_sys_info(&self) -> Result<SysInfo> {
        self.ensure_no_session()?;
        let response = self
            .request_ok(
                Command::GetSysInfo,
                self.chunk_size(),
                self.config().sysinfo_timeout(),
            )
            .await?;

        match response {
            Response::SysInfo(payload) => {
                let info = SysInfo::decode(&payload, self.config().sysinfo_layout)?;
                debug!(
                    "sysinfo: gps {}, {} sats, battery {:.2} V",
                    info.gps_state, info.satellites, info.battery_voltage
                );
                Ok(info)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Ask the tracker to power up its GPS now.
    pub async fn trigger_gps_wakeup(&self) -> Result<()> {
        self.ensure_no_session()?;
        match self.simple_request(Command::GpsWakeup).await? {
            Response::GpsWokeUp => {
                info!("GPS wake-up sent");
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    /// Keep the GPS powered for `minutes`; 0 cancels a running keep-alive.
    pub async fn set_gps_keep_alive(&self, minutes: u16) -> Result<()> {
        self.ensure_no_session()?;
        match self.simple_request(Command::GpsKeepAlive { minutes }).await? {
            Response::KeepAliveSet => {
                info!("GPS keep-alive set to {} min", minutes);
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    /// Store Find My keys on the tracker. It starts advertising with them
    /// immediately.
    pub async fn write_findmy_keys(&self, keys: &FindMyKeys) -> Result<()> {
        self.ensure_no_session()?;
        match self
            .simple_request(Command::WriteFindMyKeys { keys: keys.clone() })
            .await?
        {
            Response::FindMyKeysWritten => {
                info!("Find My keys written, epoch {}", keys.epoch);
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    /// Read the stored Find My keys, if any.
    pub async fn read_findmy_keys(&self) -> Result<Option<FindMyKeys>> {
        self.ensure_no_session()?;
        match self.simple_request(Command::ReadFindMyKeys).await {
            Ok(Response::FindMyKeys(keys)) => Ok(keys),
            Ok(other) => Err(unexpected(other)),
            Err(LinkError::Device(DeviceStatus::NotFound)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether the tracker is advertising on Find My.
    pub async fn findmy_enabled(&self) -> Result<bool> {
        self.ensure_no_session()?;
        match self.simple_request(Command::GetFindMyStatus).await? {
            Response::FindMyStatus { enabled } => Ok(enabled),
            other => Err(unexpected(other)),
        }
    }
}
