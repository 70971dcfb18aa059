// dht.rs

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::{Climate, ClimateSensor, SensorError};

// Longest any single level may last before we give up, in polls of ~1 µs.
const MAX_WAIT: u32 = 255;
// A data bit high longer than this is a one. Zero is ~27 µs, one is ~70 µs.
const HIGH_THRESHOLD: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhtKind {
    Dht11,
    Dht22,
}

impl DhtKind {
    fn start_ms(self) -> u32 {
        match self {
            DhtKind::Dht11 => 18,
            DhtKind::Dht22 => 1,
        }
    }

    fn min_gap_ms(self) -> u32 {
        match self {
            DhtKind::Dht11 => 1000,
            DhtKind::Dht22 => 2000,
        }
    }

    pub fn decode(self, frame: &[u8; 5]) -> Result<Climate, SensorError> {
        let sum = frame[..4]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != frame[4] {
            return Err(SensorError::Checksum);
        }

        let (humidity, temperature) = match self {
            DhtKind::Dht11 => {
                let h = f32::from(frame[0]) + f32::from(frame[1]) / 10.0;
                let t = f32::from(frame[2]) + f32::from(frame[3] & 0x7f) / 10.0;
                (h, if frame[3] & 0x80 != 0 { -t } else { t })
            }
            DhtKind::Dht22 => {
                let h = f32::from(u16::from(frame[0]) << 8 | u16::from(frame[1])) / 10.0;
                let t = f32::from(u16::from(frame[2] & 0x7f) << 8 | u16::from(frame[3])) / 10.0;
                (h, if frame[2] & 0x80 != 0 { -t } else { t })
            }
        };
        Ok(Climate {
            temperature,
            humidity,
        })
    }
}

/// Wraps the timing critical part of a read, e.g. with interrupts masked.
pub trait ReadGuard {
    fn guarded<R>(&mut self, f: impl FnOnce() -> R) -> R;
}

pub struct Unguarded;

impl ReadGuard for Unguarded {
    fn guarded<R>(&mut self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

/// The single-wire line itself: start pulse and bit capture.
struct DhtLine<P, D> {
    pin: P,
    delay: D,
    kind: DhtKind,
}

impl<P, D> DhtLine<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn start(&mut self) -> Result<(), SensorError> {
        self.pin.set_low().map_err(|_| SensorError::Pin)?;
        self.delay.delay_ms(self.kind.start_ms());
        self.pin.set_high().map_err(|_| SensorError::Pin)
    }

    fn receive(&mut self) -> Result<[u8; 5], SensorError> {
        // sensor acknowledges by pulling low then high for ~80 µs each
        self.wait_while(true)?;
        self.wait_while(false)?;
        self.wait_while(true)?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            self.wait_while(false)?;
            let high = self.wait_while(true)?;
            if high > HIGH_THRESHOLD {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        Ok(frame)
    }

    fn wait_while(&mut self, high: bool) -> Result<u32, SensorError> {
        let mut n = 0;
        while self.pin.is_high().map_err(|_| SensorError::Pin)? == high {
            if n >= MAX_WAIT {
                return Err(SensorError::Timeout);
            }
            n += 1;
            self.delay.delay_us(1);
        }
        Ok(n)
    }
}

/// Bit-banged DHT reader on an open-drain pin with a pull-up.
///
/// A failed frame is retried once after the sensor's minimum gap between reads.
pub struct DhtSensor<P, D, G = Unguarded> {
    line: DhtLine<P, D>,
    guard: G,
}

impl<P, D> DhtSensor<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D, kind: DhtKind) -> Self {
        DhtSensor {
            line: DhtLine { pin, delay, kind },
            guard: Unguarded,
        }
    }
}

impl<P, D, G> DhtSensor<P, D, G>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    G: ReadGuard,
{
    pub fn with_guard<H: ReadGuard>(self, guard: H) -> DhtSensor<P, D, H> {
        DhtSensor {
            line: self.line,
            guard,
        }
    }

    pub fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        self.line.start()?;
        self.guard.guarded(|| self.line.receive())
    }

    fn read_once(&mut self) -> Result<Climate, SensorError> {
        let frame = self.read_frame()?;
        self.line.kind.decode(&frame)
    }
}

impl<P, D, G> ClimateSensor for DhtSensor<P, D, G>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    G: ReadGuard,
{
    fn measure(&mut self) -> Result<Climate, SensorError> {
        match self.read_once() {
            Err(SensorError::Checksum | SensorError::Timeout) => {
                self.line.delay.delay_ms(self.line.kind.min_gap_ms());
                self.read_once()
            }
            res => res,
        }
    }
}


// EOF
