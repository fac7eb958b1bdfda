//! Command implementations.

use std::path::Path;

use weftdb_core::{
    Arena, CollectionId, Config, ContentsArg, Database, DbError, DbResult, Options, Places,
    ReadSelection, ScanTasks, View,
};

fn open(path: &Path) -> DbResult<Database> {
    Database::with_config(Config::new().directory(path))
}

fn resolve(db: &Database, name: &str, create: bool) -> DbResult<CollectionId> {
    if name.is_empty() {
        return Ok(CollectionId::MAIN);
    }
    match db.collection_named(name) {
        Ok(id) => Ok(id),
        Err(DbError::NotFound { .. }) if create => db.create_collection(name, ""),
        Err(err) => Err(err),
    }
}

pub fn inspect(path: &Path) -> DbResult<()> {
    let db = open(path)?;
    println!("{}", db.control("info")?);
    println!("{}", db.control("usage")?);
    Ok(())
}

pub fn collections(path: &Path) -> DbResult<()> {
    let db = open(path)?;
    let listed = db.list_collections();
    if listed.is_empty() {
        println!("(no named collections)");
    }
    for (id, name) in listed {
        println!("{:>6}  {name}", id.as_u64());
    }
    Ok(())
}

pub fn get(path: &Path, collection: &str, key: i64) -> DbResult<()> {
    let db = open(path)?;
    let col = resolve(&db, collection, false)?;
    let mut arena = Arena::new();
    let keys = [key];
    let out = db.read(
        View::Head,
        &Places::in_collection(col, &keys),
        ReadSelection::ALL,
        Options::default(),
        &mut arena,
    )?;
    match out.value(&arena, 0) {
        Some(bytes) => println!("{}", String::from_utf8_lossy(bytes)),
        None => println!("(missing)"),
    }
    Ok(())
}

pub fn put(path: &Path, collection: &str, create: bool, key: i64, value: &str) -> DbResult<()> {
    let db = open(path)?;
    let col = resolve(&db, collection, create)?;
    let keys = [key];
    let values = [Some(value.as_bytes())];
    db.write(
        View::Head,
        &Places::in_collection(col, &keys),
        &ContentsArg::separate(&values),
        Options::WRITE_FLUSH,
    )?;
    db.close()
}

pub fn del(path: &Path, collection: &str, key: i64) -> DbResult<()> {
    let db = open(path)?;
    let col = resolve(&db, collection, false)?;
    let keys = [key];
    let values = [None];
    db.write(
        View::Head,
        &Places::in_collection(col, &keys),
        &ContentsArg::separate(&values),
        Options::WRITE_FLUSH,
    )?;
    db.close()
}

pub fn scan(path: &Path, collection: &str, start: i64, end: i64, limit: u32) -> DbResult<()> {
    let db = open(path)?;
    let col = resolve(&db, collection, false)?;
    let mut arena = Arena::new();
    let tasks = ScanTasks::single(col, start, end, limit);
    let out = db.scan(View::Head, &tasks, Options::default(), &mut arena)?;
    for key in out.task_keys(&arena, 0) {
        println!("{key}");
    }
    Ok(())
}

pub fn control(path: &Path, request: &str) -> DbResult<()> {
    let db = open(path)?;
    println!("{}", db.control(request)?);
    db.close()
}
