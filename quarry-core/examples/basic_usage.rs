use quarry_core::{col, op, DatabaseProvider, JoinType, Result, Row, StubDatabase};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    name: String,
    age: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("🪨 Quarry Basic Usage Examples\n");

    // The stub database records every statement instead of touching a server.
    let db = StubDatabase::new();

    println!("1. Simple SELECT:");
    let query = db.table("users").select(("id", "name", "age")).where_(("age", op::GT, 18));
    let sql = query.to_sql()?;
    println!("   SQL: {}", sql.sql());
    println!("   Bindings: {:?}\n", sql.bindings());

    println!("2. Nested conditions:");
    let sql = db
        .table("users")
        .where_(col("active").eq(true))
        .where_nested(|q| q.where_(("role", "admin")).or_where(("role", "owner")))
        .to_sql()?;
    println!("   SQL: {}\n", sql.sql());

    println!("3. Joins, grouping and paging:");
    let sql = db
        .table("users")
        .select(("users.name", "COUNT(posts.id) AS posts"))
        .join("posts", "posts.user_id", op::EQ, "users.id", JoinType::Left)
        .group_by("users.name")
        .having(("COUNT(posts.id)", op::GTE, 3))
        .order_by_desc("posts")
        .for_page(2, 25)
        .to_sql()?;
    println!("   SQL: {}\n", sql.sql());

    println!("4. IN and NULL checks:");
    let sql = db
        .table("orders")
        .where_in("status", ["pending", "shipped"])
        .where_not_null("shipped_at")
        .to_sql()?;
    println!("   SQL: {}\n", sql.sql());

    println!("5. Executing against the stub:");
    db.stub(vec![Row::new().with("id", 1).with("name", "Josh").with("age", 27)]);
    let users: Vec<User> = db.table("users").where_(("age", op::GT, 18)).get_as().await?;
    for user in &users {
        println!("   {:?} (id {}, {} years)", user.name, user.id, user.age);
    }

    db.stub(vec![Row::new().with("count", 42)]);
    let count = db.table("users").count().await?;
    println!("   count = {}", count);

    db.stub(vec![]);
    db.table("users").insert([("name", "Chris"), ("email", "chris@example.com")]).await?;

    db.stub(vec![]);
    db.table("users").where_(("id", 1)).update([("name", "Joshua")]).await?;

    db.stub(vec![]);
    db.table("users").where_(("id", 1)).delete().await?;

    println!("\n   Executed statements:");
    for statement in db.statements() {
        println!("   {}", statement);
    }

    Ok(())
}
