//! `Runtime` domain: expression evaluation and console/exception events.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::types::{Command, Method};

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateParams {
    pub expression: String,
    #[serde(rename = "returnByValue")]
    pub return_by_value: bool,
    #[serde(rename = "awaitPromise")]
    pub await_promise: bool,
}

impl EvaluateParams {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            return_by_value: true,
            await_promise: true,
        }
    }
}

impl Method for EvaluateParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Runtime.evaluate".into()
    }
}
impl Command for EvaluateParams {
    type Response = EvaluateResponse;
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResponse {
    pub result: RemoteObject,
    #[serde(rename = "exceptionDetails")]
    pub exception_details: Option<ExceptionDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionDetails {
    pub text: String,
    pub exception: Option<ExceptionObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionObject {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnableParams;

impl Method for EnableParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Runtime.enable".into()
    }
}
impl Command for EnableParams {
    type Response = serde_json::Value;
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventExceptionThrown {
    #[serde(rename = "exceptionDetails")]
    pub exception_details: ExceptionDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventConsoleApiCalled {
    #[serde(rename = "type")]
    pub kind: String,
    pub args: Vec<RemoteObject>,
}
