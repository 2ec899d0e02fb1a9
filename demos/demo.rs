use rowdb::*;

fn print_rows(rows: &[Row]) {
    for row in rows {
        let cells: Vec<String> = row.values().iter().map(|v| format!("{v:<10}")).collect();
        println!("  {}", cells.join(" "));
    }
    if rows.is_empty() {
        println!("  (no rows)");
    }
}

fn main() -> Result<()> {
    println!("In-Memory Database Demo\n");

    let mut db = Database::new();

    // Create table "names" through the API
    let schema = Schema::new(vec![
        ColumnDef::new("id", DataType::Int),
        ColumnDef::new("value", DataType::Text),
    ])?;
    db.create_table("names".into(), schema)?;
    println!("Created table 'names'");

    println!("Tables:");
    print_rows(&db.execute("show tables")?);
    println!("Indexes on 'names':");
    print_rows(&db.execute("show index from names")?);

    println!("\nInserting data...");
    db.execute("insert into names values (1, \"John\")")?;
    db.execute("insert into names values (2, \"Jane\")")?;
    println!("Inserted 2 rows\n");

    for sql in [
        "select value from names where id = 1",
        "select id from names where value = \"Jane\"",
        "select id from names where value like \"Ja%\"",
        "select * from names order by id desc",
    ] {
        println!("{sql}");
        print_rows(&db.execute(sql)?);
    }

    println!("\nIndexing 'id'...");
    db.execute("create index id on names (id)")?;
    println!("Indexes on 'names':");
    print_rows(&db.execute("show index from names")?);

    for sql in [
        "select value from names where id = 1",
        "select value from names where id = 2",
    ] {
        println!("{sql}");
        print_rows(&db.execute(sql)?);
    }

    if let Some(table) = db.get_table("names") {
        println!(
            "\n'names' holds {} live rows in {} bytes",
            table.live_count(),
            table.allocated_bytes()
        );
    }

    db.execute("drop table names")?;
    println!("Dropped 'names', {} tables left", db.list_tables().len());

    Ok(())
}
