// esp/mod.rs
//
// ESP-IDF implementations of the board facing traits.

use esp_idf_hal::{
    delay::Ets,
    gpio::{AnyIOPin, InputOutput, PinDriver, Pull},
    interrupt,
};

use crate::{DhtKind, DhtSensor, ReadGuard};

mod light;
pub use light::*;

mod mqtt;
pub use mqtt::*;

mod wifi;
pub use wifi::*;

/// Masks interrupts on this core, Wi-Fi and esp-mqtt would otherwise stretch pulses.
pub struct IrqFree;

impl ReadGuard for IrqFree {
    fn guarded<R>(&mut self, f: impl FnOnce() -> R) -> R {
        interrupt::free(f)
    }
}

pub type EspDht = DhtSensor<PinDriver<'static, AnyIOPin, InputOutput>, Ets, IrqFree>;

/// DHT11 on an open-drain pin with the internal pull-up enabled.
pub fn dht11(pin: AnyIOPin) -> anyhow::Result<EspDht> {
    let mut drv = PinDriver::input_output_od(pin)?;
    drv.set_pull(Pull::Up)?;
    drv.set_high()?;
    Ok(DhtSensor::new(drv, Ets, DhtKind::Dht11).with_guard(IrqFree))
}

// EOF
