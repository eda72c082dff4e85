#[cfg(all(test, feature = "load_tests"))]
mod load_test;

/// Url of a running service, overridable with `BOOKCATALOG_URL`
#[cfg(all(test, any(feature = "system_tests", feature = "load_tests")))]
fn service_url() -> String {
    std::env::var("BOOKCATALOG_URL").unwrap_or("http://127.0.0.1:3030".to_string())
}
