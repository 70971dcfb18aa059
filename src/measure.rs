// measure.rs

use log::*;
use serde::Serialize;

use crate::{difference, LdrCalibration, LuxError};

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("sensor did not respond in time")]
    Timeout,
    #[error("sensor frame checksum mismatch")]
    Checksum,
    #[error("gpio access failed")]
    Pin,
    #[error("adc read failed")]
    Adc,
    #[error(transparent)]
    Lux(#[from] LuxError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    pub temperature: f32,
    pub humidity: f32,
}

/// Combined temperature/humidity sensor, e.g. a DHT11.
pub trait ClimateSensor {
    fn measure(&mut self) -> Result<Climate, SensorError>;
}

/// Photoresistor behind an ADC, raw 12-bit counts.
pub trait LightSensor {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// One published sample. Field order is the order on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub lat: f64,
    pub lon: f64,
    pub light: f64,
    pub temp_in: f32,
    pub temp_out: f32,
    pub hum_in: f32,
    pub hum_out: f32,
    pub diff_hum: f64,
    pub diff_temp: f64,
}

impl Reading {
    pub fn new(loc: Location, light: f64, inside: Climate, outside: Climate) -> Self {
        Reading {
            lat: loc.lat,
            lon: loc.lon,
            light,
            temp_in: inside.temperature,
            temp_out: outside.temperature,
            hum_in: inside.humidity,
            hum_out: outside.humidity,
            diff_hum: difference(inside.humidity, outside.humidity),
            diff_temp: difference(inside.temperature, outside.temperature),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub struct Sensors<C, L> {
    pub inside: C,
    pub outside: C,
    pub light: L,
    pub calibration: LdrCalibration,
    pub location: Location,
}

impl<C: ClimateSensor, L: LightSensor> Sensors<C, L> {
    pub fn sample(&mut self) -> Result<Reading, SensorError> {
        let raw = self.light.read_raw()?;
        let lux = self.calibration.lux(raw)?;

        let inside = self.inside.measure()?;
        let outside = self.outside.measure()?;
        debug!("Sampled light {raw} -> {lux:.1} lx, in {inside:?}, out {outside:?}");

        Ok(Reading::new(self.location, lux, inside, outside))
    }
}


// EOF
