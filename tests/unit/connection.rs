use kusto_ingest::{AadCredential, Config, DataFormat, Error, StreamingIngestClient};

fn config() -> Config {
    Config::from_values(
        "tenant",
        "app-id",
        Some("app-secret".into()),
        "mycluster",
        "westeurope",
        "db",
        "events",
        Some("events_mapping".into()),
        DataFormat::Json,
    )
}

#[test]
fn cluster_and_region_build_public_cloud_endpoints() {
    let connection = config().connection().expect("connection");
    assert_eq!(
        connection.data_source().host_str(),
        Some("ingest-mycluster.westeurope.kusto.windows.net")
    );
    assert_eq!(
        connection.engine_uri().unwrap().host_str(),
        Some("mycluster.westeurope.kusto.windows.net")
    );
    assert_eq!(
        connection.token_endpoint(),
        "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
    );
}

#[test]
fn cluster_uri_override_wins() {
    let connection = config()
        .with_cluster_uri("https://ingest-private.example.net")
        .connection()
        .expect("connection");
    assert_eq!(
        connection.engine_uri().unwrap().host_str(),
        Some("private.example.net")
    );
}

#[test]
fn client_exposes_defaults_from_config() {
    let client = StreamingIngestClient::from_config(&config()).expect("client");
    let props = client.default_properties();
    assert_eq!(props.database, "db");
    assert_eq!(props.table, "events");
    assert_eq!(props.format, DataFormat::Json);
    assert_eq!(props.ingestion_mapping_reference.as_deref(), Some("events_mapping"));
    assert!(matches!(
        client.connection().credential(),
        AadCredential::ApplicationKey { .. }
    ));
}

#[test]
fn invalid_authority_host_fails_fast() {
    let cfg = config().with_authority_host("ftp://login.example");
    match StreamingIngestClient::from_config(&cfg) {
        Ok(_) => panic!("expected invalid authority host"),
        Err(Error::Config(msg)) => assert!(msg.contains("Invalid authority host")),
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn missing_credentials_fail_fast() {
    let mut cfg = config();
    cfg.app_key = None;
    match StreamingIngestClient::from_config(&cfg) {
        Ok(_) => panic!("expected missing credential error"),
        Err(Error::Config(msg)) => assert!(msg.contains("app_key or certificate")),
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn blank_table_is_rejected() {
    let mut cfg = config();
    cfg.table = "  ".into();
    assert!(matches!(
        StreamingIngestClient::from_config(&cfg),
        Err(Error::Config(_))
    ));
}
