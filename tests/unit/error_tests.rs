use notebook_chat::AppError;

#[test]
fn display_prefixes_category() {
    assert_eq!(AppError::Config("bad".into()).to_string(), "config: bad");
    assert_eq!(AppError::Command("no".into()).to_string(), "command: no");
    assert_eq!(AppError::Runner("boom".into()).to_string(), "runner: boom");
    assert_eq!(AppError::NotFound("cell 3".into()).to_string(), "not found: cell 3");
}

#[test]
fn kind_names_error_class() {
    assert_eq!(AppError::Runner(String::new()).kind(), "RunnerError");
    assert_eq!(AppError::Document(String::new()).kind(), "DocumentError");
    assert_eq!(AppError::Template(String::new()).kind(), "TemplateError");
}

#[test]
fn toml_errors_convert_to_config() {
    let err = toml::from_str::<toml::Value>("= nope").expect_err("invalid toml");

    assert!(matches!(AppError::from(err), AppError::Config(_)));
}

#[test]
fn json_errors_convert_to_io() {
    let err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");

    assert!(matches!(AppError::from(err), AppError::Io(_)));
}
