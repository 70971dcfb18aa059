// config.rs

use anyhow::bail;
use crc::{Crc, CRC_32_ISCSI};
use log::*;
use serde::{Deserialize, Serialize};

pub const NVS_BUF_SIZE: usize = 512;

const DEFAULT_POLL_DELAY: u64 = 5;
const DEFAULT_LISTEN_MS: u64 = 100;
const DEFAULT_SESSION: u64 = 0;
const DEFAULT_IDLE: u64 = 5;
const DEFAULT_WIFI_RETRIES: u32 = 20;

pub const DEFAULT_TOPIC: &str = "b6610545391/time_to_dry";
pub const DEFAULT_LAT: f64 = 13.837202976085079;
pub const DEFAULT_LON: f64 = 100.57642001151498;

#[cfg(target_os = "espidf")]
const CONFIG_NAME: &str = "cfg";

static CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MyConfig {
    /// seconds between published readings
    pub delay: u64,
    /// milliseconds between inbound message polls
    pub listen_ms: u64,
    /// length of one collection session in seconds, 0 = forever
    pub session: u64,
    /// seconds to wait between sessions
    pub idle: u64,
    pub wifi_retries: u32,

    pub wifi_ssid: String,
    pub wifi_pass: String,

    pub mqtt_url: String,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub mqtt_client_id: String,
    pub mqtt_topic: String,

    pub lat: f64,
    pub lon: f64,
    pub ldr_a: f64,
    pub ldr_b: f64,
}

impl Default for MyConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_POLL_DELAY,
            listen_ms: DEFAULT_LISTEN_MS,
            session: DEFAULT_SESSION,
            idle: DEFAULT_IDLE,
            wifi_retries: DEFAULT_WIFI_RETRIES,

            wifi_ssid: option_env!("WIFI_SSID").unwrap_or("internet").into(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or("password").into(),

            mqtt_url: option_env!("MQTT_BROKER")
                .unwrap_or("mqtt://mqtt.local:1883")
                .into(),
            mqtt_user: option_env!("MQTT_USER").unwrap_or("").into(),
            mqtt_pass: option_env!("MQTT_PASS").unwrap_or("").into(),
            mqtt_client_id: String::new(),
            mqtt_topic: DEFAULT_TOPIC.into(),

            lat: DEFAULT_LAT,
            lon: DEFAULT_LON,
            ldr_a: crate::DEFAULT_LDR_A,
            ldr_b: crate::DEFAULT_LDR_B,
        }
    }
}

impl MyConfig {
    pub fn from_bytes(b: &[u8]) -> Option<Self> {
        match postcard::from_bytes_crc32::<MyConfig>(b, CRC.digest()) {
            Ok(c) => {
                info!("Successfully parsed config.");
                Some(c)
            }
            Err(e) => {
                error!("Cannot parse config: {e:?}");
                None
            }
        }
    }

    pub fn to_bytes<'a>(&self, buf: &'a mut [u8]) -> anyhow::Result<&'a mut [u8]> {
        match postcard::to_slice_crc32(self, buf, CRC.digest()) {
            Ok(d) => Ok(d),
            Err(e) => bail!("Cannot encode config to buffer {e:?}"),
        }
    }

    pub fn calibration(&self) -> crate::LdrCalibration {
        crate::LdrCalibration {
            a: self.ldr_a,
            b: self.ldr_b,
        }
    }

    pub fn location(&self) -> crate::Location {
        crate::Location {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

#[cfg(target_os = "espidf")]
impl MyConfig {
    pub fn from_nvs(nvs: &mut esp_idf_svc::nvs::EspNvs<esp_idf_svc::nvs::NvsDefault>) -> Option<Self> {
        let mut nvsbuf = [0u8; NVS_BUF_SIZE];
        info!("Reading up to {sz} bytes from nvs...", sz = NVS_BUF_SIZE);
        let b = match nvs.get_raw(CONFIG_NAME, &mut nvsbuf) {
            Err(e) => {
                error!("Nvs read error {e:?}");
                return None;
            }
            Ok(Some(b)) => b,
            _ => {
                error!("Nvs key not found");
                return None;
            }
        };
        info!("Got {sz} bytes from nvs. Parsing config...", sz = b.len());
        Self::from_bytes(b)
    }

    pub fn to_nvs(&self, nvs: &mut esp_idf_svc::nvs::EspNvs<esp_idf_svc::nvs::NvsDefault>) -> anyhow::Result<()> {
        let mut nvsbuf = [0u8; NVS_BUF_SIZE];
        let nvsdata = self.to_bytes(&mut nvsbuf)?;
        info!(
            "Encoded config to {sz} bytes. Saving to nvs...",
            sz = nvsdata.len()
        );

        match nvs.set_raw(CONFIG_NAME, nvsdata) {
            Ok(_) => {
                info!("Config saved.");
                Ok(())
            }
            Err(e) => bail!("Cannot save to nvs: {e:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_collector_setup() {
        let c = MyConfig::default();
        assert_eq!(c.delay, 5);
        assert_eq!(c.listen_ms, 100);
        assert_eq!(c.wifi_retries, 20);
        assert_eq!(c.session, 0);
        assert_eq!(c.mqtt_topic, "b6610545391/time_to_dry");
        assert_eq!(c.calibration(), crate::LdrCalibration::default());
    }

    #[test]
    fn stored_blob_survives_reload() {
        let mut c = MyConfig::default();
        c.delay = 180;
        c.mqtt_user = "kb".into();
        let mut buf = [0u8; NVS_BUF_SIZE];
        let stored = c.to_bytes(&mut buf).unwrap().to_vec();
        assert_eq!(MyConfig::from_bytes(&stored), Some(c));
    }

    #[test]
    fn corrupt_blob_is_rejected() {
        let mut buf = [0u8; NVS_BUF_SIZE];
        let stored = MyConfig::default().to_bytes(&mut buf).unwrap();
        stored[3] ^= 0x5a;
        assert_eq!(MyConfig::from_bytes(stored), None);
    }

    #[test]
    fn undersized_buffer_fails_encode() {
        let mut buf = [0u8; 8];
        assert!(MyConfig::default().to_bytes(&mut buf).is_err());
    }
}

// EOF
