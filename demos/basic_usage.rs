//! Basic usage example for the mylite MySQL client.
//!
//! Walks through the whole surface: tolerant schema setup, batched
//! parameterized inserts, rolled-back and committed transactions, the
//! callback-per-row query form, and the cursor form.

use mylite::client::{Connection, Driver};
use mylite::{MyliteError, Value};
use std::error::Error;

const HOST: &str = "localhost";
const PORT: u16 = 3306;
const USER: &str = "root";
const PASSWORD: &str = "";
const DATABASE: &str = "foo";

/// Establishes a connection to the MySQL server.
async fn example_connection() -> Result<Connection, Box<dyn Error>> {
    let driver = Driver::new();
    let conn_string = format!(
        "mysql://{}:{}@{}:{}/{}",
        USER, PASSWORD, HOST, PORT, DATABASE
    );
    let database = driver.open(&conn_string)?;
    let connection = database.connect().await?;
    Ok(connection)
}

/// Drops and recreates the demo tables.
///
/// The drops tolerate a missing table so the example runs on a fresh
/// database; creation is unconditional.
async fn example_schema_setup(db: &Connection) -> Result<(), Box<dyn Error>> {
    for table in ["foo", "bar"] {
        if let Err(e) = db.execute_batch(format!("drop table {}", table), &[]).await {
            let e = MyliteError::from(e);
            if !e.is_unknown_table() {
                return Err(e.into());
            }
        }
    }

    db.execute_batch(
        "create table foo(id int primary key, text text, f float)",
        &[],
    )
    .await?;
    db.execute_batch(
        "create table bar(id int primary key, text text, f float)",
        &[],
    )
    .await?;
    Ok(())
}

/// Parameterized inserts, then a rolled-back and a committed transaction.
async fn example_transactions(db: &Connection) -> Result<(), Box<dyn Error>> {
    db.execute_batch("delete from foo", &[]).await?;
    db.execute_batch(
        "insert into foo(id, text) values(?, ?)",
        &[1.into(), "foo".into()],
    )
    .await?;
    db.execute_batch(
        "insert into foo(id, text) values(?, ?)",
        &[2.into(), "bar".into()],
    )
    .await?;

    // This insert is rolled back and never becomes visible
    db.begin_transaction().await?;
    db.execute_batch(
        "insert into foo(id, text) values(?, ?)",
        &[3.into(), "baz".into()],
    )
    .await?;
    db.rollback().await?;

    db.begin_transaction().await?;
    db.execute_batch(
        "insert into foo(id, text) values(?, ?)",
        &[4.into(), "bazoooo!".into()],
    )
    .await?;
    db.commit().await?;

    Ok(())
}

/// Bulk insert inside one transaction, then print every row.
async fn example_bulk_insert(db: &Connection) -> Result<usize, Box<dyn Error>> {
    db.begin_transaction().await?;
    for (i, x) in (1..=100).enumerate() {
        db.execute_batch(
            "insert into bar(id, text) values(?, ?)",
            &[(i as i64).into(), format!("{}", x).into()],
        )
        .await?;
    }
    db.commit().await?;

    let count = db
        .query_each("select * from bar", &[], |row, _fields| {
            println!("{}", row);
        })
        .await?;
    Ok(count)
}

/// NULL and float columns, then the cursor form of iteration.
async fn example_cursor(db: &Connection) -> Result<(), Box<dyn Error>> {
    db.execute_batch("delete from bar", &[]).await?;
    db.execute_batch(
        "insert into bar(id, text, f) values(?, ?, ?)",
        &[1.into(), "bababa".into(), Value::Null],
    )
    .await?;
    db.execute_batch(
        "insert into bar(id, text, f) values(?, ?, ?)",
        &[2.into(), "bababa".into(), 3.14.into()],
    )
    .await?;

    db.query_each("select * from bar", &[], |row, _fields| {
        println!("{}", row);
    })
    .await?;

    let mut rows = db.query("select * from bar", &[]).await?;
    println!("{:?}", rows.fields());
    while let Some(cols) = rows.next_row()? {
        println!("{}", cols);
    }
    rows.close();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let db = example_connection().await?;
    println!("Connected: connection id {}", db.connection_id());

    example_schema_setup(&db).await?;
    example_transactions(&db).await?;

    let rows = example_bulk_insert(&db).await?;
    println!("Bulk insert: {} row(s)", rows);

    example_cursor(&db).await?;

    db.close().await?;
    println!("Done");

    Ok(())
}
