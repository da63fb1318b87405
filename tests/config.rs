use assert_matches::assert_matches;

use modis_sync::config::ConfigLoader;
use modis_sync::error::SyncError;

#[test]
fn resolve_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("modis-sync.json");
    std::fs::write(
        &path,
        r#"{
            "base_dir": "/data/modis",
            "products": [
                "MYD06_L2:61",
                { "product": "MCD43D07", "collection": "6", "dir": "/data/albedo" }
            ],
            "day_night": "DB"
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(config.products.len(), 2);
    assert_eq!(config.products[0].code.as_str(), "MYD06_L2");
    assert_eq!(config.products[1].dir.as_str(), "/data/albedo");
    assert_eq!(config.day_night.as_str(), "DB");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let err = ConfigLoader::resolve(Some("/no/such/modis-sync.json")).unwrap_err();
    assert_matches!(err, SyncError::ConfigRead(_));
}

#[test]
fn malformed_json_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("modis-sync.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, SyncError::ConfigParse(_));
}
