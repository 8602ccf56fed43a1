// Managed device health sample (APs, switches, gateways)

use serde::{Deserialize, Serialize};

/// Controller state code for a connected, adopted device.
pub const DEVICE_STATE_CONNECTED: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHealthSample {
    pub timestamp: i64,
    pub device_name: String,
    pub device_mac: String,
    /// Controller device type, e.g. "uap", "usw", "ugw".
    pub device_type: String,
    /// Raw adoption/connection state code from the controller.
    pub state: i64,
    pub cpu_usage: f64,
    pub mem_usage: f64,
    pub uptime: u64,
    /// Absent on devices without a temperature sensor.
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceMetric {
    Cpu,
    Memory,
    Uptime,
    Temperature,
}

impl DeviceHealthSample {
    /// None when the metric is not reported (temperature without a sensor).
    pub fn value(&self, metric: DeviceMetric) -> Option<f64> {
        match metric {
            DeviceMetric::Cpu => Some(self.cpu_usage),
            DeviceMetric::Memory => Some(self.mem_usage),
            DeviceMetric::Uptime => Some(self.uptime as f64),
            DeviceMetric::Temperature => self.temperature,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == DEVICE_STATE_CONNECTED
    }
}
