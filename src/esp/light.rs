// esp/light.rs

use esp_idf_hal::{
    adc::{
        attenuation,
        oneshot::{config::AdcChannelConfig, AdcChannelDriver, AdcDriver},
        ADC1,
    },
    gpio::Gpio34,
};
use log::*;

use crate::{LightSensor, SensorError};

/// Photoresistor divider on GPIO34, full 0..3.3 V range.
pub struct Photoresistor {
    channel: AdcChannelDriver<'static, Gpio34, AdcDriver<'static, ADC1>>,
}

impl Photoresistor {
    pub fn new(adc: ADC1, pin: Gpio34) -> anyhow::Result<Self> {
        let driver = AdcDriver::new(adc)?;
        let config = AdcChannelConfig {
            attenuation: attenuation::DB_11,
            ..Default::default()
        };
        let channel = AdcChannelDriver::new(driver, pin, &config)?;
        Ok(Photoresistor { channel })
    }
}

impl LightSensor for Photoresistor {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.channel.read_raw().map_err(|e| {
            error!("ADC read error: {e:?}");
            SensorError::Adc
        })
    }
}

// EOF
