//! `Emulation` domain: device metrics overrides used by `setViewport`.

use std::borrow::Cow;

use serde::Serialize;

use crate::types::{Command, Method};

#[derive(Debug, Clone, Serialize)]
pub struct SetDeviceMetricsOverrideParams {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "deviceScaleFactor")]
    pub device_scale_factor: f64,
    pub mobile: bool,
}

impl SetDeviceMetricsOverrideParams {
    pub fn new(width: u32, height: u32, device_scale_factor: f64) -> Self {
        Self {
            width,
            height,
            device_scale_factor,
            mobile: false,
        }
    }
}

impl Method for SetDeviceMetricsOverrideParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Emulation.setDeviceMetricsOverride".into()
    }
}
impl Command for SetDeviceMetricsOverrideParams {
    type Response = serde_json::Value;
}
