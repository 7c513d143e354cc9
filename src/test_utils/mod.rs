//! A recording [`Connector`] for exercising scopes without a database.
//!
//! Every connection it opens appends [`Event`]s to a shared log; commits,
//! rollbacks, and connects can be made to fail on demand.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::driver::{Connector, PhysicalConnection};
use crate::error::DbError;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect(u64),
    Execute {
        conn: u64,
        sql: String,
        params: Vec<RowValues>,
    },
    Query {
        conn: u64,
        sql: String,
        params: Vec<RowValues>,
    },
    Commit(u64),
    Rollback(u64),
    Close(u64),
}

#[derive(Debug, Default)]
struct Recorder {
    events: Vec<Event>,
    next_id: u64,
    fail_connect: bool,
    fail_commit: bool,
    fail_rollback: bool,
    fail_execute: bool,
    affected: usize,
    results: VecDeque<ResultSet>,
}

#[derive(Debug, Clone)]
pub struct RecordingConnector {
    state: Arc<Mutex<Recorder>>,
    style: PlaceholderStyle,
}

impl Default for RecordingConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingConnector {
    /// Records statements exactly as written (`?` markers are kept).
    #[must_use]
    pub fn new() -> Self {
        Self::with_style(PlaceholderStyle::Question)
    }

    #[must_use]
    pub fn with_style(style: PlaceholderStyle) -> Self {
        Self {
            state: Arc::new(Mutex::new(Recorder {
                affected: 1,
                ..Recorder::default()
            })),
            style,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorder> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    pub fn clear(&self) {
        self.lock().events.clear();
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.lock().events.iter().filter(|e| pred(e)).count()
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.count(|e| matches!(e, Event::Connect(_)))
    }

    #[must_use]
    pub fn closes(&self) -> usize {
        self.count(|e| matches!(e, Event::Close(_)))
    }

    #[must_use]
    pub fn commits(&self) -> usize {
        self.count(|e| matches!(e, Event::Commit(_)))
    }

    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.count(|e| matches!(e, Event::Rollback(_)))
    }

    pub fn fail_connects(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    pub fn fail_commits(&self, fail: bool) {
        self.lock().fail_commit = fail;
    }

    pub fn fail_rollbacks(&self, fail: bool) {
        self.lock().fail_rollback = fail;
    }

    pub fn fail_executes(&self, fail: bool) {
        self.lock().fail_execute = fail;
    }

    /// Row count reported by every `execute`.
    pub fn set_affected(&self, affected: usize) {
        self.lock().affected = affected;
    }

    /// Queue the result of the next query; queries with nothing queued return no rows.
    pub fn push_result(&self, result: ResultSet) {
        self.lock().results.push_back(result);
    }
}

impl Connector for RecordingConnector {
    fn connect(&self) -> Result<Box<dyn PhysicalConnection>, DbError> {
        let mut state = self.lock();
        if state.fail_connect {
            return Err(DbError::ConnectionError("injected connect failure".into()));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.events.push(Event::Connect(id));
        Ok(Box::new(RecordingConnection {
            id,
            state: Arc::clone(&self.state),
        }))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }
}

struct RecordingConnection {
    id: u64,
    state: Arc<Mutex<Recorder>>,
}

impl RecordingConnection {
    fn lock(&self) -> MutexGuard<'_, Recorder> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PhysicalConnection for RecordingConnection {
    fn id(&self) -> u64 {
        self.id
    }

    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<usize, DbError> {
        let mut state = self.lock();
        if state.fail_execute {
            return Err(DbError::ExecutionError("injected execute failure".into()));
        }
        state.events.push(Event::Execute {
            conn: self.id,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        Ok(state.affected)
    }

    fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, DbError> {
        let mut state = self.lock();
        state.events.push(Event::Query {
            conn: self.id,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        Ok(state.results.pop_front().unwrap_or_default())
    }

    fn commit(&mut self) -> Result<(), DbError> {
        let mut state = self.lock();
        state.events.push(Event::Commit(self.id));
        if state.fail_commit {
            return Err(DbError::ExecutionError("injected commit failure".into()));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        let mut state = self.lock();
        state.events.push(Event::Rollback(self.id));
        if state.fail_rollback {
            return Err(DbError::ExecutionError("injected rollback failure".into()));
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), DbError> {
        self.lock().events.push(Event::Close(self.id));
        Ok(())
    }
}
