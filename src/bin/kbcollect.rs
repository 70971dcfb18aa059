// bin/kbcollect.rs

#![warn(clippy::large_futures)]

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    device::main()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!(
        "kbcollect {} is firmware for ESP-IDF targets, build with --target xtensa-esp32-espidf",
        kbcollect::FW_VERSION
    );
    std::process::exit(1);
}

#[cfg(target_os = "espidf")]
mod device {
    use std::sync::Arc;

    use esp_idf_hal::{
        delay::FreeRtos,
        gpio::{AnyInputPin, IOPin, Input, InputPin, PinDriver, Pull},
        prelude::Peripherals,
    };
    use esp_idf_svc::{
        eventloop::EspSystemEventLoop,
        nvs::{self, EspNvs, NvsDefault},
        wifi::EspWifi,
    };
    use esp_idf_sys::esp_app_desc;
    use kbcollect::{esp::*, *};
    use log::*;
    use tokio::time::{sleep, Duration};

    const CONFIG_RESET_COUNT: i32 = 9;
    const STATUS_INTERVAL: usize = 300;

    esp_app_desc!();

    pub fn main() -> anyhow::Result<()> {
        esp_idf_sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();

        info!("Hello.");
        info!("Starting up kbcollect {FW_VERSION}.");

        let sysloop = EspSystemEventLoop::take()?;
        let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

        let ns = env!("CARGO_BIN_NAME");
        let mut nvs = match EspNvs::new(nvs_default_partition.clone(), ns, true) {
            Ok(nvs) => {
                info!("Got namespace {ns:?} from default partition");
                nvs
            }
            Err(e) => bail!("Could not get namespace {ns}: {e:?}"),
        };

        #[cfg(feature = "reset_settings")]
        let config = {
            let c = MyConfig::default();
            c.to_nvs(&mut nvs)?;
            c
        };

        #[cfg(not(feature = "reset_settings"))]
        let config = match MyConfig::from_nvs(&mut nvs) {
            None => {
                error!("Could not read nvs config, using defaults");
                let c = MyConfig::default();
                c.to_nvs(&mut nvs)?;
                info!("Successfully saved default config to nvs.");
                c
            }

            // using settings saved on nvs if we could find them
            Some(c) => c,
        };
        info!("My config:\n{config:#?}");

        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        // S1 on the KidBright board
        let mut button = PinDriver::input(pins.gpio16.downgrade_input())?;
        button.set_pull(Pull::Up)?;

        let sensors = Sensors {
            inside: dht11(pins.gpio32.downgrade())?,
            outside: dht11(pins.gpio33.downgrade())?,
            light: Photoresistor::new(peripherals.adc1, pins.gpio34)?,
            calibration: config.calibration(),
            location: config.location(),
        };

        info!("Initializing Wi-Fi...");
        let wifi = EspWifi::new(peripherals.modem, sysloop, Some(nvs_default_partition))?;
        let network = EspNetwork::new(wifi, &config);
        let myid = network.myid()?;
        let client_id = if config.mqtt_client_id.is_empty() {
            myid.clone()
        } else {
            config.mqtt_client_id.clone()
        };
        let broker = EspBroker::new(&config, client_id);

        let mut state = MyState::new(config);
        *state.myid.get_mut() = myid;
        let shared_state = Arc::new(state);
        let collector = Collector::new(shared_state.clone(), network, broker, sensors);

        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(Box::pin(async move {
                info!("Entering main loop...");
                tokio::select! {
                    _ = Box::pin(poll_reset(shared_state.clone(), nvs, button)) => { error!("poll_reset() ended."); }
                    _ = Box::pin(collector.run()) => { error!("collector.run() ended."); }
                };
            }));

        // not actually returning from main() but we reboot instead
        info!("main() finished, reboot.");
        FreeRtos::delay_ms(3000);
        esp_idf_hal::reset::restart();
    }

    async fn poll_reset(
        state: Arc<MyState>,
        mut nvs: EspNvs<NvsDefault>,
        button: PinDriver<'_, AnyInputPin, Input>,
    ) -> anyhow::Result<()> {
        let mut uptime: usize = 0;
        loop {
            sleep(Duration::from_secs(2)).await;

            uptime += 2;
            *(state.uptime.write().await) = uptime;

            if uptime % STATUS_INTERVAL == 0 {
                info!(
                    "Uptime {uptime}s, wifi {}, mqtt {}, published {}, publish errors {}, sensor errors {}",
                    *state.wifi_up.read().await,
                    *state.mqtt_up.read().await,
                    *state.published.read().await,
                    *state.publish_errors.read().await,
                    *state.sensor_errors.read().await,
                );
            }

            if button.is_low() {
                Box::pin(reset_button(&mut nvs, &button)).await?;
            }
        }
    }

    async fn reset_button(
        nvs: &mut EspNvs<NvsDefault>,
        button: &PinDriver<'_, AnyInputPin, Input>,
    ) -> anyhow::Result<()> {
        let mut reset_cnt = CONFIG_RESET_COUNT;

        while button.is_low() {
            // button is pressed and kept down, countdown and factory reset if reach zero
            error!("Reset? {reset_cnt}");

            if reset_cnt == 0 {
                error!("Factory resetting...");

                MyConfig::default().to_nvs(nvs)?;
                sleep(Duration::from_millis(2000)).await;
                esp_idf_hal::reset::restart();
            }

            reset_cnt -= 1;
            sleep(Duration::from_millis(500)).await;
        }
        Ok(())
    }
}

// EOF
