// esp/wifi.rs

use anyhow::anyhow;
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};
use log::*;

use crate::{MyConfig, Network};

pub struct EspNetwork<'a> {
    wifi: EspWifi<'a>,
    ssid: String,
    pass: String,
}

impl<'a> EspNetwork<'a> {
    pub fn new(wifi: EspWifi<'a>, config: &MyConfig) -> Self {
        EspNetwork {
            wifi,
            ssid: config.wifi_ssid.clone(),
            pass: config.wifi_pass.clone(),
        }
    }

    pub fn myid(&self) -> anyhow::Result<String> {
        let mac = self.wifi.sta_netif().get_mac()?;
        Ok(format!(
            "kbcollect-{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5],
        ))
    }
}

impl Network for EspNetwork<'_> {
    fn activate(&mut self) -> anyhow::Result<()> {
        info!("WiFi setting credentials...");
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: self
                    .ssid
                    .as_str()
                    .try_into()
                    .map_err(|_| anyhow!("WiFi ssid too long"))?,
                password: self
                    .pass
                    .as_str()
                    .try_into()
                    .map_err(|_| anyhow!("WiFi password too long"))?,
                auth_method: if self.pass.is_empty() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            }))?;

        if !self.wifi.is_started()? {
            info!("WiFi driver starting...");
            self.wifi.start()?;
        }

        info!("WiFi connecting...");
        self.wifi.connect()?;
        Ok(())
    }

    fn is_connected(&mut self) -> anyhow::Result<bool> {
        Ok(self.wifi.is_up()?)
    }

    fn deactivate(&mut self) -> anyhow::Result<()> {
        if self.wifi.is_connected()? {
            self.wifi.disconnect()?;
        }
        info!("WiFi driver stopping...");
        self.wifi.stop()?;
        Ok(())
    }
}

// EOF
