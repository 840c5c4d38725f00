use cosmo_core::errors::{CosmoError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("parameter", "omega_b")
        .with_context("line", "12")
}

#[test]
fn parse_error_surface() {
    let err = CosmoError::Parse(sample_info("P001", "missing field"));
    assert_eq!(err.info().code, "P001");
    assert!(err.info().context.contains_key("line"));
}

#[test]
fn unknown_parameter_helper_records_name() {
    let err = CosmoError::unknown_parameter("H0");
    assert!(matches!(err, CosmoError::UnknownParameter(_)));
    assert_eq!(err.info().context.get("parameter").map(String::as_str), Some("H0"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = CosmoError::MissingArtifact(
        sample_info("M001", "no covmat").with_hint("run the analysis first"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("missing artifact: no covmat (code: M001)"));
    assert!(rendered.contains("parameter=omega_b"));
    assert!(rendered.ends_with("hint: run the analysis first"));
}

#[test]
fn io_helper_attaches_path() {
    let err = CosmoError::io(
        "chain-read",
        std::path::Path::new("/tmp/chain_1.txt"),
        std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
    );
    assert_eq!(err.info().context["path"], "/tmp/chain_1.txt");
}

#[test]
fn errors_round_trip_json() {
    let err = CosmoError::MalformedChain(sample_info("MC01", "ragged"));
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"MalformedChain\""));
    let decoded: CosmoError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}
