// collector.rs

use log::*;
use tokio::{
    sync::Mutex,
    time::{sleep, timeout, Duration},
};

use crate::*;

/// Owns the radio, the broker client and the sensors. The sampling and
/// listener loops run concurrently on one task and share each handle
/// through an async mutex, locked for a single operation at a time.
pub struct Collector<N, B, C, L> {
    pub state: Arc<MyState>,
    pub(crate) wifi: Mutex<N>,
    pub(crate) mqtt: Mutex<B>,
    pub(crate) sensors: Mutex<Sensors<C, L>>,
}

impl<N, B, C, L> Collector<N, B, C, L>
where
    N: Network,
    B: Broker,
    C: ClimateSensor,
    L: LightSensor,
{
    pub fn new(state: Arc<MyState>, wifi: N, mqtt: B, sensors: Sensors<C, L>) -> Self {
        Collector {
            state,
            wifi: Mutex::new(wifi),
            mqtt: Mutex::new(mqtt),
            sensors: Mutex::new(sensors),
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        loop {
            self.cycle().await;
        }
    }

    /// Connect, collect for one session and then idle.
    pub async fn cycle(&self) {
        let (session, idle) = {
            let c = self.state.config.read().await;
            (c.session, c.idle)
        };

        if self.connect_wifi().await {
            *self.state.sessions.write().await += 1;
            self.mqtt_setup().await;

            let collect = async {
                tokio::join!(self.publish_readings(), self.mqtt_listener());
            };
            if session == 0 {
                collect.await;
            } else {
                let _ = timeout(Duration::from_secs(session), collect).await;
                info!("Disconnecting Wi-Fi after {session} s of data collection.");
                self.disconnect_wifi().await;
            }
        } else {
            error!("Wi-Fi connection failed!");
        }

        sleep(Duration::from_secs(idle)).await;
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;

    use anyhow::bail;

    use crate::measure::tests::{sensors, FakeClimate, FakeLight};
    use crate::*;

    #[derive(Default)]
    pub(crate) struct MockNet {
        pub up: bool,
        /// status polls after activation until association succeeds
        pub up_after: Option<u32>,
        pub polls: u32,
        pub activations: u32,
        pub deactivations: u32,
        pub fail_activate: bool,
        /// status queries that fail before answering normally
        pub status_errors: u32,
    }

    impl MockNet {
        pub(crate) fn connected() -> Self {
            MockNet {
                up: true,
                up_after: Some(1),
                ..Default::default()
            }
        }

        pub(crate) fn up_after(polls: u32) -> Self {
            MockNet {
                up_after: Some(polls),
                ..Default::default()
            }
        }
    }

    impl Network for MockNet {
        fn activate(&mut self) -> anyhow::Result<()> {
            if self.fail_activate {
                bail!("radio not responding");
            }
            self.activations += 1;
            self.polls = 0;
            Ok(())
        }

        fn is_connected(&mut self) -> anyhow::Result<bool> {
            if self.status_errors > 0 {
                self.status_errors -= 1;
                bail!("status query failed");
            }
            if !self.up {
                self.polls += 1;
                self.up = self.activations > 0 && self.up_after.is_some_and(|n| self.polls >= n);
            }
            Ok(self.up)
        }

        fn deactivate(&mut self) -> anyhow::Result<()> {
            self.deactivations += 1;
            self.up = false;
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct MockBroker {
        pub connected: bool,
        pub refuse: bool,
        pub fail_publish: u32,
        pub connects: u32,
        pub published: Vec<(String, String)>,
        pub inbox: VecDeque<Inbound>,
    }

    impl MockBroker {
        pub(crate) fn connected() -> Self {
            MockBroker {
                connected: true,
                ..Default::default()
            }
        }
    }

    impl Broker for MockBroker {
        fn connect(&mut self) -> anyhow::Result<()> {
            self.connects += 1;
            if self.refuse {
                bail!("connection refused");
            }
            self.connected = true;
            Ok(())
        }

        fn ping(&mut self) -> anyhow::Result<()> {
            if !self.connected {
                bail!("not connected");
            }
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
            if !self.connected {
                bail!("not connected");
            }
            if self.fail_publish > 0 {
                self.fail_publish -= 1;
                self.connected = false;
                bail!("socket closed");
            }
            self.published
                .push((topic.into(), String::from_utf8_lossy(payload).into_owned()));
            Ok(())
        }

        fn check_msg(&mut self) -> anyhow::Result<Option<Inbound>> {
            if !self.connected {
                bail!("not connected");
            }
            Ok(self.inbox.pop_front())
        }
    }

    pub(crate) type TestCollector = Collector<MockNet, MockBroker, FakeClimate, FakeLight>;

    pub(crate) fn collector(config: MyConfig, net: MockNet, broker: MockBroker, raw: u16) -> TestCollector {
        Collector::new(Arc::new(MyState::new(config)), net, broker, sensors(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn publishes_once_wifi_comes_up() {
        let c = collector(MyConfig::default(), MockNet::up_after(3), MockBroker::default(), 819);
        // associated at t=2, publishes at t=2 and t=7
        let _ = timeout(Duration::from_secs(10), c.run()).await;

        let broker = c.mqtt.lock().await;
        assert_eq!(broker.connects, 1);
        assert_eq!(broker.published.len(), 2);
        let (topic, payload) = &broker.published[0];
        assert_eq!(topic, "b6610545391/time_to_dry");
        assert!(payload.starts_with("{\"lat\":13.837202976085079,\"lon\":100.57642001151498,\"light\":400.0"));
        assert!(payload.ends_with("\"diff_hum\":-12.0,\"diff_temp\":3.0}"));

        assert_eq!(c.wifi.lock().await.activations, 1);
        assert_eq!(*c.state.published.read().await, 2);
        assert_eq!(*c.state.sessions.read().await, 1);
        assert!(*c.state.wifi_up.read().await);
        assert!(*c.state.mqtt_up.read().await);
        assert_eq!(c.state.last_reading.read().await.as_ref().map(|r| r.diff_temp), Some(3.0));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_wifi_after_idle() {
        let c = collector(MyConfig::default(), MockNet::default(), MockBroker::default(), 819);
        // 20 polls, 5 s idle, then a second attempt
        let _ = timeout(Duration::from_secs(30), c.run()).await;

        assert_eq!(c.wifi.lock().await.activations, 2);
        assert_eq!(c.mqtt.lock().await.connects, 0);
        assert_eq!(*c.state.sessions.read().await, 0);
        assert!(!*c.state.wifi_up.read().await);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_session_drops_wifi_and_reconnects() {
        let config = MyConfig {
            session: 8,
            ..Default::default()
        };
        let c = collector(config, MockNet::up_after(1), MockBroker::default(), 819);
        // session one publishes at t=0 and t=5, ends at t=8, idles until t=13
        let _ = timeout(Duration::from_secs(15), c.run()).await;

        let wifi = c.wifi.lock().await;
        assert_eq!(wifi.deactivations, 1);
        assert_eq!(wifi.activations, 2);
        assert_eq!(c.mqtt.lock().await.published.len(), 3);
        assert_eq!(*c.state.sessions.read().await, 2);
    }
}

// EOF
