//! Recording store for tests
//!
//! Answers every statement from a queue of canned responses (or a fixed
//! default) and records what it was asked to run.

use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{Row, SqlValue, Statement};
use crate::store::EventStore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub(crate) struct RecordingStore {
    statements: Mutex<Vec<Statement>>,
    responses: Mutex<VecDeque<StoreResult<Vec<Row>>>>,
    fallback: Vec<Row>,
}

impl RecordingStore {
    /// Store answering every statement with a single `COUNT(*)` row
    pub(crate) fn counting(count: i64) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            fallback: vec![Row::new(vec![SqlValue::Integer(count)])],
        }
    }

    /// Queue the response for the next unanswered statement
    pub(crate) fn respond(self, response: StoreResult<Vec<Row>>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Queue a failure for the next unanswered statement
    pub(crate) fn fail_next(self) -> Self {
        self.respond(Err(StoreError::Task("store unavailable".to_string())))
    }

    pub(crate) fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    pub(crate) fn round_trips(&self) -> usize {
        self.statements.lock().unwrap().len()
    }
}

#[async_trait]
impl EventStore for RecordingStore {
    fn kind(&self) -> &'static str {
        "fake"
    }

    async fn fetch(&self, statement: &Statement) -> StoreResult<Vec<Row>> {
        self.statements.lock().unwrap().push(statement.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        }
    }
}
