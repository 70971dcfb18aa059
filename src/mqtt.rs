// mqtt.rs

use log::*;
use tokio::time::{sleep, Duration};

use crate::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// MQTT client session. Framing and keepalive belong to the implementation.
pub trait Broker {
    /// Open a fresh session, dropping any previous one.
    fn connect(&mut self) -> anyhow::Result<()>;
    fn ping(&mut self) -> anyhow::Result<()>;
    fn publish(&mut self, topic: &str, payload: &[u8]) -> anyhow::Result<()>;
    /// Non-blocking poll for one received message.
    fn check_msg(&mut self) -> anyhow::Result<Option<Inbound>>;
}

impl<N, B, C, L> Collector<N, B, C, L>
where
    N: Network,
    B: Broker,
    C: ClimateSensor,
    L: LightSensor,
{
    /// Starts a new session. `mqtt_up` only turns true once a ping or a
    /// publish succeeds on it.
    pub async fn mqtt_setup(&self) {
        *self.state.mqtt_up.write().await = false;
        let res = self.mqtt.lock().await.connect();
        match res {
            Ok(_) => info!("MQTT session started"),
            Err(e) => error!("MQTT connection failed: {e:?}"),
        }
    }

    pub async fn ensure_mqtt(&self) {
        let res = self.mqtt.lock().await.ping();
        match res {
            Ok(_) => *self.state.mqtt_up.write().await = true,
            Err(e) => {
                warn!("MQTT lost ({e})! Reconnecting...");
                self.mqtt_setup().await;
            }
        }
    }

    pub async fn publish_readings(&self) {
        loop {
            self.publish_once().await;
            let delay = self.state.config.read().await.delay;
            sleep(Duration::from_secs(delay)).await;
        }
    }

    pub async fn publish_once(&self) {
        self.ensure_wifi().await;
        self.ensure_mqtt().await;

        let sample = self.sensors.lock().await.sample();
        let reading = match sample {
            Ok(r) => r,
            Err(e) => {
                error!("Sensor read failed: {e}");
                *self.state.sensor_errors.write().await += 1;
                return;
            }
        };
        let payload = match reading.to_json() {
            Ok(p) => p,
            Err(e) => {
                error!("Cannot serialize reading: {e:?}");
                return;
            }
        };

        let topic = self.state.config.read().await.mqtt_topic.clone();
        info!("Publishing: {payload}");
        let res = self.mqtt.lock().await.publish(&topic, payload.as_bytes());
        match res {
            Ok(_) => {
                *self.state.mqtt_up.write().await = true;
                *self.state.published.write().await += 1;
                *self.state.last_reading.write().await = Some(reading);
            }
            Err(e) => {
                error!("Error publishing data: {e:?}");
                *self.state.publish_errors.write().await += 1;
                self.mqtt_setup().await;
            }
        }
    }

    pub async fn mqtt_listener(&self) {
        loop {
            let res = self.mqtt.lock().await.check_msg();
            match res {
                Ok(Some(msg)) => {
                    info!(
                        "MQTT received on {}: {}",
                        msg.topic,
                        String::from_utf8_lossy(&msg.payload)
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    error!("MQTT listener error: {e:?}");
                    self.mqtt_setup().await;
                }
            }
            let listen_ms = self.state.config.read().await.listen_ms;
            sleep(Duration::from_millis(listen_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::timeout;

    use crate::collector::mock::*;
    use crate::*;

    #[tokio::test]
    async fn failed_publish_reopens_session() {
        let broker = MockBroker {
            fail_publish: 1,
            ..MockBroker::connected()
        };
        let c = collector(MyConfig::default(), MockNet::connected(), broker, 819);

        c.publish_once().await;
        assert_eq!(c.mqtt.lock().await.connects, 1);
        assert_eq!(*c.state.publish_errors.read().await, 1);
        assert!(c.state.last_reading.read().await.is_none());

        c.publish_once().await;
        let broker = c.mqtt.lock().await;
        assert_eq!(broker.published.len(), 1);
        assert_eq!(broker.connects, 1);
        assert_eq!(*c.state.published.read().await, 1);
    }

    #[tokio::test]
    async fn dead_session_reconnects_before_publish() {
        let c = collector(MyConfig::default(), MockNet::connected(), MockBroker::default(), 819);

        c.publish_once().await;

        let broker = c.mqtt.lock().await;
        assert_eq!(broker.connects, 1);
        assert_eq!(broker.published.len(), 1);
        assert!(*c.state.mqtt_up.read().await);
    }

    #[tokio::test]
    async fn session_counts_as_up_only_after_ping() {
        let c = collector(MyConfig::default(), MockNet::connected(), MockBroker::default(), 819);

        c.mqtt_setup().await;
        assert_eq!(c.mqtt.lock().await.connects, 1);
        assert!(!*c.state.mqtt_up.read().await);

        c.ensure_mqtt().await;
        assert!(*c.state.mqtt_up.read().await);
    }

    #[tokio::test]
    async fn sensor_fault_skips_cycle() {
        let c = collector(MyConfig::default(), MockNet::connected(), MockBroker::connected(), 0);

        c.publish_once().await;

        let broker = c.mqtt.lock().await;
        assert!(broker.published.is_empty());
        assert_eq!(broker.connects, 0);
        assert_eq!(*c.state.sensor_errors.read().await, 1);
    }

    #[tokio::test]
    async fn refused_broker_is_logged_not_fatal() {
        let broker = MockBroker {
            refuse: true,
            ..Default::default()
        };
        let c = collector(MyConfig::default(), MockNet::connected(), broker, 819);

        c.publish_once().await;

        let broker = c.mqtt.lock().await;
        assert_eq!(broker.connects, 2);
        assert!(broker.published.is_empty());
        assert_eq!(*c.state.publish_errors.read().await, 1);
        assert!(!*c.state.mqtt_up.read().await);
    }

    #[tokio::test(start_paused = true)]
    async fn listener_recovers_and_drains_inbox() {
        let mut broker = MockBroker::default();
        broker.inbox.push_back(Inbound {
            topic: "b6610545391/cmd".into(),
            payload: b"hello".to_vec(),
        });
        let c = collector(MyConfig::default(), MockNet::connected(), broker, 819);

        let _ = timeout(Duration::from_millis(250), c.mqtt_listener()).await;

        let broker = c.mqtt.lock().await;
        assert_eq!(broker.connects, 1);
        assert!(broker.inbox.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn readings_follow_configured_delay() {
        let config = MyConfig {
            delay: 180,
            ..Default::default()
        };
        let c = collector(config, MockNet::connected(), MockBroker::connected(), 819);

        let _ = timeout(Duration::from_secs(400), c.publish_readings()).await;

        // t=0, t=180, t=360
        assert_eq!(c.mqtt.lock().await.published.len(), 3);
    }
}

// EOF
