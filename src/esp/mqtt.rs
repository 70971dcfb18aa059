// esp/mqtt.rs

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use esp_idf_svc::{
    mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS},
    sys::EspError,
};
use log::*;

use crate::{Broker, Inbound, Link, LinkEvent, MyConfig};

fn link_event(payload: EventPayload<'_, EspError>) -> Option<LinkEvent> {
    match payload {
        EventPayload::Connected(_) => Some(LinkEvent::Connected),
        EventPayload::Disconnected => Some(LinkEvent::Disconnected),
        EventPayload::Received {
            topic: Some(topic),
            data,
            ..
        } => Some(LinkEvent::Received(Inbound {
            topic: topic.to_string(),
            payload: data.to_vec(),
        })),
        EventPayload::Error(e) => Some(LinkEvent::Error(format!("{e:?}"))),
        other => {
            debug!("MQTT event: {other:?}");
            None
        }
    }
}

pub struct EspBroker {
    url: String,
    client_id: String,
    user: String,
    pass: String,
    client: Option<EspMqttClient<'static>>,
    link: Arc<Link>,
}

impl EspBroker {
    pub fn new(config: &MyConfig, client_id: String) -> Self {
        EspBroker {
            url: config.mqtt_url.clone(),
            client_id,
            user: config.mqtt_user.clone(),
            pass: config.mqtt_pass.clone(),
            client: None,
            link: Arc::new(Link::idle()),
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

impl Broker for EspBroker {
    fn connect(&mut self) -> anyhow::Result<()> {
        // tear down the old session before its callback can race the new one
        self.client = None;
        self.link = Arc::new(Link::connecting(Instant::now()));

        info!("MQTT connecting to {}...", self.url);
        let link = self.link.clone();
        let client = EspMqttClient::new_cb(
            &self.url,
            &MqttClientConfiguration {
                client_id: Some(&self.client_id),
                username: non_empty(&self.user),
                password: non_empty(&self.pass),
                keep_alive_interval: Some(Duration::from_secs(25)),
                ..Default::default()
            },
            move |event| {
                if let Some(ev) = link_event(event.payload()) {
                    link.on_event(ev);
                }
            },
        )?;
        self.client = Some(client);
        Ok(())
    }

    fn ping(&mut self) -> anyhow::Result<()> {
        self.link.check(Instant::now())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
        self.link.check(Instant::now())?;
        match self.client.as_mut() {
            Some(client) => {
                client.publish(topic, QoS::AtLeastOnce, false, payload)?;
                Ok(())
            }
            None => anyhow::bail!("MQTT client not created"),
        }
    }

    fn check_msg(&mut self) -> anyhow::Result<Option<Inbound>> {
        self.link.next_message(Instant::now())
    }
}

// EOF
