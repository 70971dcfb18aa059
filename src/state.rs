// state.rs

use tokio::sync::RwLock;

use crate::*;

pub struct MyState {
    pub config: RwLock<MyConfig>,
    pub uptime: RwLock<usize>,
    pub myid: RwLock<String>,
    pub wifi_up: RwLock<bool>,
    pub mqtt_up: RwLock<bool>,
    pub last_reading: RwLock<Option<Reading>>,
    pub published: RwLock<u64>,
    pub publish_errors: RwLock<u64>,
    pub sensor_errors: RwLock<u64>,
    pub sessions: RwLock<u64>,
}

impl MyState {
    pub fn new(config: MyConfig) -> Self {
        MyState {
            config: RwLock::new(config),
            uptime: RwLock::new(0),
            myid: RwLock::new("kbcollect".into()),
            wifi_up: RwLock::new(false),
            mqtt_up: RwLock::new(false),
            last_reading: RwLock::new(None),
            published: RwLock::new(0),
            publish_errors: RwLock::new(0),
            sensor_errors: RwLock::new(0),
            sessions: RwLock::new(0),
        }
    }
}

// EOF
