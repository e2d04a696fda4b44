use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use broan::{Transport, TransportError};

/// Transport that replays a fixed script of exchange results.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    results: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
}

impl ScriptedTransport {
    pub fn new(results: impl IntoIterator<Item = Result<Vec<u8>, TransportError>>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exchange(&self, _frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.results
            .lock()
            .expect("script lock should not be poisoned")
            .pop_front()
            .expect("script should have a result for every exchange")
    }
}

pub fn hex(value: &str) -> Vec<u8> {
    hex::decode(value).expect("test hex should decode")
}
