use kusto_ingest::{Config, KustoIngest};
use rand::Rng;

#[derive(serde::Serialize)]
struct LogRow {
    pipeline_path: &'static str,
    when: jiff::Timestamp,
    what: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt().try_init();

    // Copy conf/config-example.json to conf/config.json and fill it in
    let cfg = Config::from_file("conf/config.json")?;

    let mut rng = rand::thread_rng();
    let rows: Vec<LogRow> = (0..100)
        .map(|_| LogRow {
            pipeline_path: "/usr/share/logstash/input/Simple.json",
            when: jiff::Timestamp::now(),
            what: rng.r#gen::<f64>().to_string(),
        })
        .collect();

    let result = KustoIngest::ingest_from_array(rows, &cfg).await?;
    println!(
        "ingested {} records into {}.{} ({} request(s), source id {})",
        result.records, result.database, result.table, result.requests, result.source_id
    );
    Ok(())
}
