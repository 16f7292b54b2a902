#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sessionbind::{
    BatchResult, BoundSession, Configuration, ExecutorType, Param, RawConnection, Result, Row,
    RowBounds, RowCursor, RowHandler, ScopeProvider, Session, SessionError, SessionFactory,
    SourceResolver,
};

/// In-memory engine stub recording every lifecycle event a test could want
/// to assert on.
pub struct StubSession {
    pub id: usize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    closes: AtomicUsize,
    statements: Mutex<Vec<String>>,
    rows: Mutex<Vec<Row>>,
    fail_next: Mutex<Option<SessionError>>,
    configuration: Arc<Configuration>,
}

impl StubSession {
    fn new(id: usize, configuration: Arc<Configuration>) -> Self {
        Self {
            id,
            commits: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            statements: Mutex::new(Vec::new()),
            rows: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            configuration,
        }
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn seed_rows(&self, rows: Vec<Row>) {
        *self.rows.lock().unwrap() = rows;
    }

    /// Makes the next data operation fail with `err`.
    pub fn fail_next(&self, err: SessionError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    fn record(&self, statement: &str) -> Result<()> {
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        self.statements.lock().unwrap().push(statement.to_string());
        Ok(())
    }
}

impl Session for StubSession {
    fn select_one(&self, statement: &str, _param: Option<Param>) -> Result<Option<Row>> {
        self.record(statement)?;
        Ok(self.rows.lock().unwrap().first().cloned())
    }

    fn select_list(
        &self,
        statement: &str,
        _param: Option<Param>,
        bounds: Option<RowBounds>,
    ) -> Result<Vec<Row>> {
        self.record(statement)?;
        let rows = self.rows.lock().unwrap().clone();
        Ok(match bounds {
            Some(bounds) => rows.into_iter().skip(bounds.offset).take(bounds.limit).collect(),
            None => rows,
        })
    }

    fn select_cursor(&self, statement: &str, _param: Option<Param>) -> Result<RowCursor> {
        self.record(statement)?;
        let rows = self.rows.lock().unwrap().clone();
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn select_each(
        &self,
        statement: &str,
        _param: Option<Param>,
        handler: &mut dyn RowHandler,
    ) -> Result<()> {
        self.record(statement)?;
        for row in self.rows.lock().unwrap().iter() {
            handler.handle(row.clone())?;
        }
        Ok(())
    }

    fn insert(&self, statement: &str, param: Option<Param>) -> Result<u64> {
        self.record(statement)?;
        if let Some(row) = param {
            self.rows.lock().unwrap().push(row);
        }
        Ok(1)
    }

    fn update(&self, statement: &str, _param: Option<Param>) -> Result<u64> {
        self.record(statement)?;
        Ok(1)
    }

    fn delete(&self, statement: &str, _param: Option<Param>) -> Result<u64> {
        self.record(statement)?;
        Ok(1)
    }

    fn flush_statements(&self) -> Result<Vec<BatchResult>> {
        Ok(vec![BatchResult {
            statement: "flushed".into(),
            update_counts: vec![self.statements.lock().unwrap().len() as u64],
        }])
    }

    fn clear_cache(&self) -> Result<()> {
        Ok(())
    }

    fn connection(&self) -> Result<RawConnection> {
        Ok(Arc::new(self.id))
    }

    fn configuration(&self) -> Arc<Configuration> {
        Arc::clone(&self.configuration)
    }

    fn commit(&self, _force: bool) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self, _force: bool) -> Result<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory stub that hands out [`StubSession`]s and keeps a handle to each.
pub struct StubFactory {
    configuration: Arc<Configuration>,
    sessions: Mutex<Vec<Arc<StubSession>>>,
    poison: Mutex<Option<SessionError>>,
}

impl StubFactory {
    pub fn new() -> Arc<Self> {
        Self::with_configuration(Arc::new(Configuration::default()))
    }

    pub fn with_configuration(configuration: Arc<Configuration>) -> Arc<Self> {
        Arc::new(Self {
            configuration,
            sessions: Mutex::new(Vec::new()),
            poison: Mutex::new(None),
        })
    }

    /// Makes the first data operation of the next opened session fail.
    pub fn poison_next_session(&self, err: SessionError) {
        *self.poison.lock().unwrap() = Some(err);
    }

    pub fn opened(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn session(&self, index: usize) -> Arc<StubSession> {
        Arc::clone(&self.sessions.lock().unwrap()[index])
    }

    pub fn sessions(&self) -> Vec<Arc<StubSession>> {
        self.sessions.lock().unwrap().clone()
    }
}

impl SessionFactory for StubFactory {
    fn open_session(&self, _executor: ExecutorType) -> Result<Arc<dyn Session>> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = Arc::new(StubSession::new(
            sessions.len(),
            Arc::clone(&self.configuration),
        ));
        if let Some(err) = self.poison.lock().unwrap().take() {
            session.fail_next(err);
        }
        sessions.push(Arc::clone(&session));
        Ok(session)
    }

    fn configuration(&self) -> Arc<Configuration> {
        Arc::clone(&self.configuration)
    }
}

/// Fixed-map container stand-in for binding resolution tests.
pub struct StaticResolver {
    facades: HashMap<String, Arc<BoundSession>>,
    factories: HashMap<String, Arc<dyn SessionFactory>>,
    scope: Arc<dyn ScopeProvider>,
}

impl StaticResolver {
    pub fn new(scope: Arc<dyn ScopeProvider>) -> Self {
        Self {
            facades: HashMap::new(),
            factories: HashMap::new(),
            scope,
        }
    }

    pub fn with_facade(mut self, name: &str, facade: Arc<BoundSession>) -> Self {
        self.facades.insert(name.to_string(), facade);
        self
    }

    pub fn with_factory(mut self, name: &str, factory: Arc<dyn SessionFactory>) -> Self {
        self.factories.insert(name.to_string(), factory);
        self
    }
}

impl SourceResolver for StaticResolver {
    fn facade(&self, name: &str) -> Option<Arc<BoundSession>> {
        self.facades.get(name).cloned()
    }

    fn factory(&self, name: &str) -> Option<Arc<dyn SessionFactory>> {
        self.factories.get(name).cloned()
    }

    fn autowired_facade(&self) -> Option<Arc<BoundSession>> {
        (self.facades.len() == 1).then(|| self.facades.values().next().cloned()).flatten()
    }

    fn autowired_factory(&self) -> Option<Arc<dyn SessionFactory>> {
        (self.factories.len() == 1)
            .then(|| self.factories.values().next().cloned())
            .flatten()
    }

    fn scope(&self) -> Arc<dyn ScopeProvider> {
        Arc::clone(&self.scope)
    }
}
