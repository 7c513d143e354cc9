#![cfg(feature = "sqlite")]

use sql_scope::prelude::*;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sqlite_engine(dir: &TempDir) -> Result<Engine, DbError> {
    init_tracing();
    let path = dir.path().join("blog.db");
    let cfg = EngineConfig::builder("root", "password", &path.to_string_lossy())
        .option("busy_timeout", 2000)
        .finish()?;
    let engine = Engine::from_config(cfg)?;
    engine.update(
        "create table user (id integer primary key, name text, email text, score real)",
        &[],
    )?;
    Ok(engine)
}

#[test]
fn insert_then_select_one_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;

    let affected = engine.insert("user", &[("id", 1.into()), ("name", "a".into())])?;
    assert_eq!(affected, 1);

    let row = engine
        .select_one("select name from user where id=?", &params![1])?
        .expect("row inserted");
    assert_eq!(row.into_map(), vec![("name".to_string(), RowValues::Text("a".into()))]);

    engine.update("delete from user where id=?", &params![1])?;
    assert!(
        engine
            .select_one("select name from user where id=?", &params![1])?
            .is_none()
    );
    Ok(())
}

#[test]
fn select_returns_empty_vec_and_ordered_rows() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;

    assert!(engine.select("select * from user", &[])?.is_empty());

    for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
        engine.insert(
            "user",
            &[("id", id.into()), ("name", name.into()), ("score", 1.5.into())],
        )?;
    }
    let rows = engine.select(
        "select id, name, score from user where score = ? order by id",
        &params![1.5],
    )?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].columns(), ["id", "name", "score"]);
    assert_eq!(rows[2].get("name"), Some(&RowValues::Text("c".into())));
    assert_eq!(rows[1].get("score").and_then(RowValues::as_float), Some(1.5));
    Ok(())
}

#[test]
fn select_one_returns_first_of_several_matches() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;

    engine.insert("user", &[("id", 1.into()), ("email", "same@x".into())])?;
    engine.insert("user", &[("id", 2.into()), ("email", "same@x".into())])?;

    let row = engine
        .select_one("select id from user where email = ? order by id", &params!["same@x"])?
        .expect("two rows match");
    assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
    Ok(())
}

#[test]
fn select_int_requires_one_column_and_one_row() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;
    engine.insert("user", &[("id", 1.into()), ("name", "a".into())])?;
    engine.insert("user", &[("id", 2.into()), ("name", "b".into())])?;

    assert_eq!(engine.select_int("select count(*) from user", &[])?, 2);

    let err = engine
        .select_int("select id, name from user where id = ?", &params![1])
        .unwrap_err();
    assert!(matches!(err, DbError::MultiColumnError(2)));

    let err = engine.select_int("select id from user", &[]).unwrap_err();
    assert!(matches!(err, DbError::RowCountError(2)));

    let err = engine
        .select_int("select id from user where id = ?", &params![99])
        .unwrap_err();
    assert!(matches!(err, DbError::RowCountError(0)));

    let err = engine
        .select_int("select name from user where id = ?", &params![1])
        .unwrap_err();
    assert!(matches!(err, DbError::TypeMismatch(_)));

    assert_eq!(
        engine.select_scalar("select name from user where id = ?", &params![2])?,
        RowValues::Text("b".into())
    );
    Ok(())
}

#[test]
fn transaction_is_invisible_until_commit() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;

    let tx = engine.transaction()?;
    engine.insert("user", &[("id", 10.into()), ("name", "pending".into())])?;

    // a second worker has its own connection and must not see the pending row
    let observer = engine.clone();
    let seen = std::thread::spawn(move || observer.select_int("select count(*) from user", &[]))
        .join()
        .expect("observer thread panicked")?;
    assert_eq!(seen, 0);

    tx.commit()?;
    assert_eq!(engine.select_int("select count(*) from user", &[])?, 1);
    Ok(())
}

#[test]
fn rolled_back_transaction_leaves_no_rows() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;

    let result: Result<(), DbError> = engine.with_transaction(|| {
        engine.insert("user", &[("id", 1.into())])?;
        // duplicate primary key
        engine.insert("user", &[("id", 1.into())])?;
        Ok(())
    });

    assert!(matches!(result, Err(DbError::SqliteError(_))));
    assert_eq!(engine.select_int("select count(*) from user", &[])?, 0);
    Ok(())
}

#[test]
fn nested_helpers_share_one_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;

    fn add_user(engine: &Engine, id: i64) -> Result<usize, DbError> {
        engine.with_transaction(|| engine.insert("user", &[("id", id.into())]))
    }

    let outer = engine.transaction()?;
    add_user(&engine, 1)?;
    add_user(&engine, 2)?;
    // inner commits did not end the transaction, so rolling back drops both rows
    outer.rollback()?;
    assert_eq!(engine.select_int("select count(*) from user", &[])?, 0);

    engine.with_transaction(|| {
        add_user(&engine, 1)?;
        add_user(&engine, 2)
    })?;
    assert_eq!(engine.select_int("select count(*) from user", &[])?, 2);
    Ok(())
}

#[test]
fn values_round_trip_through_sqlite() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;
    engine.update(
        "create table misc (flag int, payload blob, note text, at text)",
        &[],
    )?;

    let at = chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
        .and_then(|d| d.and_hms_opt(12, 0, 1))
        .expect("valid date");
    engine.insert(
        "misc",
        &[
            ("flag", true.into()),
            ("payload", vec![1_u8, 2, 3].into()),
            ("note", Option::<&str>::None.into()),
            ("at", at.into()),
        ],
    )?;

    let row = engine
        .select_one("select flag, payload, note, at from misc", &[])?
        .expect("row inserted");
    assert_eq!(row.get("flag").and_then(RowValues::as_bool), Some(&true));
    assert_eq!(row.get("payload").and_then(RowValues::as_blob), Some(&[1_u8, 2, 3][..]));
    assert!(row.get("note").is_some_and(RowValues::is_null));
    assert_eq!(row.get("at").and_then(RowValues::as_timestamp), Some(at));
    Ok(())
}

#[test]
fn literal_question_marks_are_not_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;

    engine.insert("user", &[("id", 1.into()), ("name", "who?".into())])?;
    let row = engine
        .select_one("select id from user where name = 'who?' and id = ?", &params![1])?
        .expect("row matches");
    assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
    Ok(())
}

#[test]
fn reader_in_connection_scope_does_not_block_other_writers() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let engine = sqlite_engine(&dir)?;
    engine.insert("user", &[("id", 1.into()), ("name", "a".into())])?;

    let reader = engine.connection()?;
    assert_eq!(engine.select("select * from user", &[])?.len(), 1);

    let writer = engine.clone();
    std::thread::spawn(move || -> Result<(), DbError> {
        let tx = writer.transaction()?;
        writer.insert("user", &[("id", 2.into()), ("name", "b".into())])?;
        tx.commit()
    })
    .join()
    .expect("writer thread panicked")?;

    // the held connection sees the other worker's commit
    assert_eq!(engine.select_int("select count(*) from user", &[])?, 2);
    reader.close()?;
    Ok(())
}
