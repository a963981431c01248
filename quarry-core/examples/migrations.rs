use quarry_core::grammar::{MySqlGrammar, PostgresGrammar};
use quarry_core::schema::{Migration, Migrator, ReferenceOption, Schema};
use quarry_core::{Grammar, Result, StubDatabase};

struct CreateUsers;

impl Migration for CreateUsers {
    fn name(&self) -> &str {
        "2024_01_01_create_users"
    }

    fn up(&self, schema: &mut Schema<'_>) -> Result<()> {
        schema.create("users", |table| {
            table.increments("id").primary();
            table.string("name").not_null();
            table.string_with_length("email", 128).not_null().unique();
            table.bool("is_admin").not_null().default(false);
            table.json("settings");
            table.timestamps();
            table.index(&["name"], false);
        })
    }

    fn down(&self, schema: &mut Schema<'_>) -> Result<()> {
        schema.drop("users");
        Ok(())
    }
}

struct CreatePosts;

impl Migration for CreatePosts {
    fn name(&self) -> &str {
        "2024_01_02_create_posts"
    }

    fn up(&self, schema: &mut Schema<'_>) -> Result<()> {
        schema.create("posts", |table| {
            table.increments("id").primary();
            table
                .big_int("user_id")
                .not_null()
                .references("id", "users", Some(ReferenceOption::Cascade), None);
            table.string("title").not_null();
        })
    }

    fn down(&self, schema: &mut Schema<'_>) -> Result<()> {
        schema.drop("posts");
        Ok(())
    }
}

fn print_plan(grammar: &dyn Grammar, migration: &dyn Migration) -> Result<()> {
    let mut schema = Schema::new(grammar);
    migration.up(&mut schema)?;
    println!("-- {} ({})", migration.name(), grammar.name());
    for statement in schema.statements() {
        println!("{};", statement.sql());
    }
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("🪨 Quarry Migration Examples\n");

    let grammars: [&dyn Grammar; 2] = [&PostgresGrammar, &MySqlGrammar];
    for grammar in grammars {
        print_plan(grammar, &CreateUsers)?;
        print_plan(grammar, &CreatePosts)?;
    }

    let db = StubDatabase::new();
    // no migrations applied yet
    db.stub(vec![]);
    db.stub(vec![]);
    db.stub(vec![]);

    let migrator = Migrator::new(&db).add(CreateUsers).add(CreatePosts);
    let applied = migrator.migrate().await?;
    println!("applied: {:?}", applied);
    for statement in db.statements() {
        println!("  {}", statement.lines().next().unwrap_or_default());
    }

    Ok(())
}
