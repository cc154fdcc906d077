use super::*;

#[test]
fn test_config_error_display() {
    let error = Error::from(ConfigurationError::RequiredConfigMissing {
        key: "sonarr.main.api_key".to_string(),
    });
    assert!(error.to_string().starts_with("Configuration error: "));
    assert!(error.to_string().contains("sonarr.main.api_key"));
}

#[test]
fn test_client_error_display() {
    let error = Error::from(arr_client::Error::Unauthorized);
    assert_eq!(
        error.to_string(),
        "Client error: The API key was rejected by the server"
    );
}

#[test]
fn test_task_error_display() {
    let error = Error::Task("checkout panicked".to_string());
    assert_eq!(error.to_string(), "Background task failed: checkout panicked");
}

#[test]
fn test_error_debug_format() {
    let error = Error::Task("test".to_string());
    let debug_output = format!("{:?}", error);
    assert!(debug_output.contains("Task"));
    assert!(debug_output.contains("test"));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}
