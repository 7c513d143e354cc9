use sql_scope::context::{self, with_current};
use sql_scope::test_utils::{Event, RecordingConnector};
use sql_scope::{DbError, Engine};

fn recording_engine() -> (RecordingConnector, Engine) {
    let connector = RecordingConnector::new();
    let engine = Engine::new(connector.clone());
    (connector, engine)
}

fn nest_connections(engine: &Engine, depth: usize) -> Result<(), DbError> {
    let scope = engine.connection()?;
    assert_eq!(scope.owns_connection(), depth == 0);
    engine.update("update t set a = ?", &sql_scope::params![depth as i64])?;
    if depth < 4 {
        nest_connections(engine, depth + 1)?;
    }
    scope.close()
}

#[test]
fn nested_scopes_share_one_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (connector, engine) = recording_engine();

    nest_connections(&engine, 0)?;

    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.closes(), 1);
    let events = connector.events();
    assert_eq!(events.first(), Some(&Event::Connect(1)));
    assert_eq!(events.last(), Some(&Event::Close(1)));
    assert!(!context::is_initialized());
    Ok(())
}

#[test]
fn only_outermost_scope_owns_the_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (connector, engine) = recording_engine();

    let outer = engine.connection()?;
    assert!(outer.owns_connection());
    {
        let inner = engine.connection()?;
        assert!(!inner.owns_connection());
        engine.select("select 1", &[])?;
    }
    // the inner scope's exit leaves the connection open
    assert!(context::is_initialized());
    assert_eq!(connector.closes(), 0);

    engine.select("select 2", &[])?;
    drop(outer);

    assert!(!context::is_initialized());
    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.closes(), 1);
    Ok(())
}

#[test]
fn connection_opens_lazily() -> Result<(), Box<dyn std::error::Error>> {
    let (connector, engine) = recording_engine();

    {
        let _scope = engine.connection()?;
        assert!(context::is_initialized());
    }

    assert_eq!(connector.connects(), 0);
    assert_eq!(connector.closes(), 0);
    Ok(())
}

#[test]
fn scope_releases_connection_on_error_path() {
    let (connector, engine) = recording_engine();

    let result: Result<(), DbError> = engine.with_connection(|| {
        engine.update("insert into t values (?)", &sql_scope::params![1])?;
        connector.fail_executes(true);
        engine.update("insert into t values (?)", &sql_scope::params![2])?;
        Ok(())
    });

    assert!(matches!(result, Err(DbError::ExecutionError(_))));
    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.closes(), 1);
    assert!(!context::is_initialized());
}

#[test]
fn cursor_requires_an_initialized_context() {
    let result = with_current(|ctx| ctx.cursor().map(|_| ()));
    assert!(matches!(result, Err(DbError::ContextNotInitialized)));

    let result = with_current(|ctx| ctx.cleanup());
    assert!(matches!(result, Err(DbError::ContextNotInitialized)));
}

#[test]
fn context_init_is_not_reentrant() -> Result<(), Box<dyn std::error::Error>> {
    let (_connector, engine) = recording_engine();

    with_current(|ctx| ctx.init(&engine))?;
    let second = with_current(|ctx| ctx.init(&engine));
    assert!(matches!(second, Err(DbError::ContextAlreadyInitialized)));
    with_current(|ctx| ctx.cleanup())?;
    assert!(!context::is_initialized());
    Ok(())
}

#[test]
fn lazy_connection_commit_before_use_fails() {
    let (connector, engine) = recording_engine();
    let mut lazy = sql_scope::LazyConnection::new(engine);

    assert!(matches!(lazy.commit(), Err(DbError::NotConnected)));
    assert!(matches!(lazy.rollback(), Err(DbError::NotConnected)));
    assert!(lazy.cleanup().is_ok());
    assert!(lazy.cleanup().is_ok());
    assert_eq!(connector.closes(), 0);
}

#[test]
fn lazy_connection_cleanup_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let (connector, engine) = recording_engine();
    let mut lazy = sql_scope::LazyConnection::new(engine);

    lazy.cursor()?.execute("select 1", &[])?;
    assert!(lazy.is_connected());
    lazy.cleanup()?;
    lazy.cleanup()?;
    drop(lazy);

    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.closes(), 1);
    Ok(())
}

#[test]
fn connect_failure_surfaces_and_context_is_released() {
    let (connector, engine) = recording_engine();
    connector.fail_connects(true);

    let err = engine.select("select 1", &[]).unwrap_err();

    assert!(matches!(err, DbError::ConnectionError(_)));
    assert!(!context::is_initialized());
}

#[test]
fn each_thread_gets_its_own_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (connector, engine) = recording_engine();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = engine.clone();
            std::thread::spawn(move || -> Result<(), DbError> {
                let scope = engine.connection()?;
                engine.update("update t set a = ?", &sql_scope::params![i])?;
                engine.update("update t set b = ?", &sql_scope::params![i])?;
                scope.close()
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread panicked")?;
    }

    assert_eq!(connector.connects(), 4);
    assert_eq!(connector.closes(), 4);
    // statements of one worker never land on another worker's connection
    for event in connector.events() {
        if let Event::Execute { conn, params, .. } = event {
            let same_worker = connector
                .events()
                .into_iter()
                .filter(|e| matches!(e, Event::Execute { conn: c, params: p, .. } if *c == conn && *p == params))
                .count();
            assert_eq!(same_worker, 2);
        }
    }
    Ok(())
}

#[test]
fn foreign_engine_cannot_join_the_open_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (connector_a, engine_a) = recording_engine();
    let connector_b = RecordingConnector::with_style(sql_scope::PlaceholderStyle::Sqlite);
    let engine_b = Engine::new(connector_b.clone());

    let scope = engine_a.connection()?;
    let err = engine_b
        .update("delete from t where id = ?", &sql_scope::params![1])
        .unwrap_err();
    assert!(matches!(err, DbError::EngineMismatch));
    assert!(matches!(engine_b.connection(), Err(DbError::EngineMismatch)));
    assert!(matches!(engine_b.transaction(), Err(DbError::EngineMismatch)));
    assert_eq!(context::transaction_depth(), 0);

    // clones of the same engine still join
    let clone = engine_a.clone();
    clone.update("delete from t where id = ?", &sql_scope::params![2])?;
    scope.close()?;

    assert!(connector_b.events().is_empty());
    assert_eq!(connector_a.connects(), 1);
    assert_eq!(connector_a.closes(), 1);
    Ok(())
}

#[test]
fn releasing_the_owner_before_an_inner_scope_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let (connector, engine) = recording_engine();

    let outer = engine.connection()?;
    let inner = engine.connection()?;
    engine.select("select 1", &[])?;

    let err = outer.close().unwrap_err();
    assert!(matches!(err, DbError::ScopeOrder(_)));
    assert_eq!(connector.closes(), 1);
    assert!(!context::is_initialized());

    // the stale inner scope no longer affects the thread
    inner.close()?;
    let fresh = engine.connection()?;
    assert!(fresh.owns_connection());
    fresh.close()?;
    Ok(())
}
