// convert.rs

use serde::{Deserialize, Serialize};

/// Full scale of the 12-bit ADC at 11 dB attenuation (0..3.3 V).
pub const ADC_MAX: u16 = 4095;

pub const DEFAULT_LDR_A: f64 = 500.0;
pub const DEFAULT_LDR_B: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum LuxError {
    #[error("light sensor reads zero, no current through the divider")]
    ZeroReading,
    #[error("light sensor reading {0} exceeds ADC range")]
    OutOfRange(u16),
}

/// Empirical photoresistor curve `lux = a * (4095 / raw - 1) ^ b`.
///
/// `a` scales to real light conditions and `b` depends on the LDR part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LdrCalibration {
    pub a: f64,
    pub b: f64,
}

impl Default for LdrCalibration {
    fn default() -> Self {
        Self {
            a: DEFAULT_LDR_A,
            b: DEFAULT_LDR_B,
        }
    }
}

impl LdrCalibration {
    pub fn lux(&self, raw: u16) -> Result<f64, LuxError> {
        if raw == 0 {
            return Err(LuxError::ZeroReading);
        }
        if raw > ADC_MAX {
            return Err(LuxError::OutOfRange(raw));
        }
        let ratio = f64::from(ADC_MAX) / f64::from(raw) - 1.0;
        Ok(self.a * ratio.powf(self.b))
    }
}

/// `inside - outside`, rounded to the 0.1 resolution of the DHT sensors so
/// f32 noise does not reach the payload.
pub fn difference(inside: f32, outside: f32) -> f64 {
    let d = f64::from(inside) - f64::from(outside);
    (d * 10.0).round() / 10.0
}


// EOF
