#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use moodle_gateway::app::ports::TransportPort;
use moodle_gateway::error::TransportError;
use moodle_gateway::request::WireRequest;
use moodle_gateway::{Gateway, GatewayConfig, Operation, ResponseMode};

type Responder = Box<dyn Fn(&WireRequest) -> Result<Value, TransportError> + Send + Sync>;

/// Transport that answers from canned responses and records every request.
#[derive(Default)]
pub struct MockTransport {
    responders: HashMap<Operation, Responder>,
    calls: Mutex<Vec<WireRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, operation: Operation, body: Value) -> Self {
        self.respond_with(operation, move |_| Ok(body.clone()))
    }

    pub fn respond_with(
        mut self,
        operation: Operation,
        responder: impl Fn(&WireRequest) -> Result<Value, TransportError> + Send + Sync + 'static,
    ) -> Self {
        self.responders.insert(operation, Box::new(responder));
        self
    }

    pub fn calls(&self) -> Vec<WireRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.operation == operation)
            .count()
    }
}

#[async_trait]
impl TransportPort for MockTransport {
    async fn execute(&self, request: &WireRequest) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.responders.get(&request.operation) {
            Some(responder) => responder(request),
            None => Err(TransportError::Other(format!(
                "no canned response for {}",
                request.operation
            ))),
        }
    }
}

pub fn config(mode: ResponseMode) -> GatewayConfig {
    let mut config = GatewayConfig::new("https://moodle.test", "test-token");
    config.response_mode = mode;
    config
}

pub fn gateway(transport: &Arc<MockTransport>) -> Gateway {
    gateway_in_mode(transport, ResponseMode::Safe)
}

pub fn gateway_in_mode(transport: &Arc<MockTransport>, mode: ResponseMode) -> Gateway {
    Gateway::with_transport(&config(mode), transport.clone()).expect("test config is valid")
}
