#![allow(clippy::expect_used, clippy::unwrap_used)]

use missive::{Missive, find_config_file};
use missive_delivery::{TlsMode, TransportConfig};
use missive_store::StoreConfig;

#[test]
fn test_empty_config_uses_defaults() {
    let missive = Missive::from_ron("Missive ()").unwrap();

    assert!(matches!(missive.store, StoreConfig::Memory { capacity: None }));
    assert!(matches!(missive.transport, TransportConfig::Log));
    assert_eq!(missive.api.listen_address, "[::]:8000");
    assert_eq!(missive.api.request_timeout_secs, 60);
    assert!(!missive.delivery.serialize_identical_sends);
    assert!(missive.audit.enabled);
    assert!(!missive.audit.redact_recipients);
}

#[test]
fn test_full_config() {
    let missive = Missive::from_ron(
        r#"
        Missive (
            store: File (
                path: "/var/lib/missive",
            ),
            transport: Smtp ((
                host: "smtp.example.com",
                port: Some(2525),
                from: "Missive <noreply@example.com>",
                username: Some("mailer"),
                password: Some("secret"),
                tls: StartTls,
                timeout_secs: 10,
            )),
            api: (
                listen_address: "127.0.0.1:9000",
                request_timeout_secs: 15,
            ),
            delivery: (
                serialize_identical_sends: true,
            ),
            audit: (
                enabled: true,
                redact_recipients: true,
            ),
        )
        "#,
    )
    .unwrap();

    assert_eq!(
        missive.store.path(),
        Some(std::path::Path::new("/var/lib/missive"))
    );

    let TransportConfig::Smtp(smtp) = &missive.transport else {
        panic!("expected SMTP transport");
    };
    assert_eq!(smtp.host, "smtp.example.com");
    assert_eq!(smtp.port(), 2525);
    assert_eq!(smtp.tls, TlsMode::StartTls);
    assert_eq!(smtp.timeout_secs, 10);

    assert_eq!(missive.api.listen_address, "127.0.0.1:9000");
    assert_eq!(missive.api.request_timeout_secs, 15);
    assert!(missive.delivery.serialize_identical_sends);
    assert!(missive.audit.redact_recipients);
}

#[test]
fn test_unknown_store_type_is_rejected() {
    assert!(Missive::from_ron("Missive (store: Postgres (url: \"x\"))").is_err());
}

#[test]
fn test_load_reports_path_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missive.config.ron");
    std::fs::write(&path, "Missive (store: ").unwrap();

    let err = Missive::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("missive.config.ron"));
}

#[test]
fn test_find_config_file_prefers_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.ron");
    std::fs::write(&path, "Missive ()").unwrap();

    assert_eq!(find_config_file(Some(&path)).unwrap(), path);

    let missing = dir.path().join("missing.ron");
    let err = find_config_file(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("missing.ron"));
}

#[tokio::test]
async fn test_service_from_memory_config() {
    let missive = Missive::from_ron("Missive (store: Memory (capacity: Some(10)))").unwrap();
    let service = missive.service().unwrap();

    let outcome = service.send("a@x.com", "Hello", "World").await.unwrap();
    assert!(outcome.success);
    assert_eq!(service.statistics().await.unwrap().sent, 1);
}

#[tokio::test]
async fn test_service_from_file_config() {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("records");
    let missive = Missive::from_ron(&format!(
        "Missive (store: File (path: {:?}))",
        records.display().to_string()
    ))
    .unwrap();

    let service = missive.service().unwrap();
    let outcome = service.send("a@x.com", "Hello", "World").await.unwrap();
    assert!(outcome.success);
    assert!(records.join(format!("{}.bin", outcome.record.id())).exists());

    // A second service over the same directory sees the sent record
    let again = missive.service().unwrap();
    let duplicate = again.send("a@x.com", "Hello", "World").await.unwrap();
    assert_eq!(duplicate.record.id(), outcome.record.id());
}

#[test]
fn test_service_rejects_relative_store_path() {
    let missive = Missive::from_ron("Missive (store: File (path: \"relative/records\"))").unwrap();
    let err = missive.service().unwrap_err();
    assert!(format!("{err:#}").contains("must be absolute"));
}
