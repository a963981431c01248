use quarry_core::{op, DatabaseProvider, Error, Result, Row, StubDatabase};

#[tokio::main]
async fn main() -> Result<()> {
    println!("🪨 Quarry Transaction Examples\n");

    let db = StubDatabase::new();

    println!("1. Committed transfer:");
    db.stub(vec![Row::new().with("balance", 1000)]);
    db.stub(vec![]);
    db.stub(vec![]);
    let moved = db
        .transaction(|conn| async move {
            let from = conn
                .table("accounts")
                .find("id", 1)
                .await?
                .ok_or_else(|| Error::invalid_query("account 1 not found"))?;
            let balance = from.get("balance")?.as_i64().unwrap_or(0);

            conn.table("accounts")
                .where_(("id", 1))
                .update([("balance", balance - 100)])
                .await?;
            conn.table("accounts")
                .where_(("id", 2))
                .update([("balance", 100)])
                .await?;
            Ok(100)
        })
        .await?;
    println!("   moved {}", moved);
    print_statements(&db);

    println!("2. Failed transfer rolls back:");
    db.stub_error("insufficient funds");
    let result: Result<()> = db
        .transaction(|conn| async move {
            conn.table("accounts")
                .where_(("balance", op::LT, 0))
                .delete()
                .await?;
            Ok(())
        })
        .await;
    println!("   error: {}", result.err().map(|e| e.to_string()).unwrap_or_default());
    print_statements(&db);

    db.shutdown().await?;
    Ok(())
}

fn print_statements(db: &StubDatabase) {
    for statement in db.statements() {
        println!("   {}", statement);
    }
    db.clear();
    println!();
}
