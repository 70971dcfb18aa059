// wifi.rs

use log::*;
use tokio::time::{sleep, Duration};

use crate::*;

/// Station-mode wireless link.
pub trait Network {
    /// Bring the interface up and start associating with the configured AP.
    fn activate(&mut self) -> anyhow::Result<()>;
    /// Associated and holding an IP address.
    fn is_connected(&mut self) -> anyhow::Result<bool>;
    fn deactivate(&mut self) -> anyhow::Result<()>;
}

impl<N, B, C, L> Collector<N, B, C, L>
where
    N: Network,
    B: Broker,
    C: ClimateSensor,
    L: LightSensor,
{
    pub async fn connect_wifi(&self) -> bool {
        let retries = self.state.config.read().await.wifi_retries;

        if let Err(e) = self.wifi.lock().await.activate() {
            error!("WiFi activation failed: {e:?}");
            *self.state.wifi_up.write().await = false;
            return false;
        }

        info!("Connecting to Wi-Fi...");
        for _ in 0..retries {
            let status = self.wifi.lock().await.is_connected();
            match status {
                Ok(true) => {
                    info!("WiFi connected.");
                    *self.state.wifi_up.write().await = true;
                    return true;
                }
                Ok(false) => {}
                Err(e) => warn!("WiFi status error: {e:?}"),
            }
            sleep(Duration::from_secs(1)).await;
        }

        *self.state.wifi_up.write().await = false;
        false
    }

    pub async fn ensure_wifi(&self) {
        let status = self.wifi.lock().await.is_connected();
        if !matches!(status, Ok(true)) {
            warn!("Wi-Fi lost! Reconnecting...");
            self.connect_wifi().await;
        }
    }

    pub async fn disconnect_wifi(&self) {
        let res = self.wifi.lock().await.deactivate();
        if let Err(e) = res {
            error!("WiFi deactivation failed: {e:?}");
        }
        *self.state.wifi_up.write().await = false;
        *self.state.mqtt_up.write().await = false;
    }
}


// EOF
