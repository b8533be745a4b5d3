
use jiff::Zoned;

use crate::config::Config;

use super::*;

/// Live run against a real cluster; needs the KUSTO_* environment variables.
#[ignore]
#[tokio::test]
async fn it_works() {
    #[derive(serde::Serialize, Clone)]
    struct RowType {
        id: u64,
        data: String,
        dt: Zoned,
    }

    let config = Config::from_env().expect("KUSTO_* env vars must be set");
    let rows = (1..1000).map(|id| RowType {
        id,
        data: "some data".to_string(),
        dt: Zoned::now(),
    });
    let result = KustoIngest::ingest_from_array(rows, &config)
        .await
        .expect("ingest should succeed");
    assert_eq!(result.records, 999);
}
