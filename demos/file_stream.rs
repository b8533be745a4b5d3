use kusto_ingest::{Config, KustoIngest};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt().try_init();

    let cfg = Config::from_file("conf/config.json")?;
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/data/datafile01.txt".to_string());

    let file = tokio::fs::File::open(&path).await?;
    let result = KustoIngest::ingest_from_stream(file, &cfg).await?;
    println!(
        "ingested {} bytes from {} into {}.{}",
        result.bytes, path, result.database, result.table
    );
    Ok(())
}
