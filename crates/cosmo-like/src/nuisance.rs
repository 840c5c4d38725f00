use std::fs;
use std::path::Path;

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, CosmoResult};
use indexmap::IndexMap;

/// Parses `name = value` lines into an ordered map.
///
/// Blank lines and `#` comments are skipped. A later line for the same name
/// replaces the earlier value.
pub fn parse_nuisance(text: &str) -> CosmoResult<IndexMap<String, f64>> {
    let mut values = IndexMap::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = (idx + 1).to_string();
        let Some((name, value)) = line.split_once('=') else {
            return Err(CosmoError::Parse(
                ErrorInfo::new("nuisance-assignment", "expected 'name = value'")
                    .with_context("line", line_no),
            ));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(CosmoError::Parse(
                ErrorInfo::new("nuisance-name", "assignment without a parameter name")
                    .with_context("line", line_no),
            ));
        }
        let value = value.trim().parse::<f64>().map_err(|_| {
            CosmoError::Parse(
                ErrorInfo::new("nuisance-value", "nuisance value is not a number")
                    .with_context("line", line_no)
                    .with_context("parameter", name)
                    .with_context("value", value.trim()),
            )
        })?;
        values.insert(name.to_string(), value);
    }
    Ok(values)
}

/// Reads and parses a nuisance file.
pub fn read_nuisance(path: &Path) -> CosmoResult<IndexMap<String, f64>> {
    let text = fs::read_to_string(path).map_err(|err| CosmoError::io("nuisance-read", path, err))?;
    parse_nuisance(&text).map_err(|err| match err {
        CosmoError::Parse(info) => CosmoError::Parse(info.with_path(path)),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_spaced_and_compact_assignments() {
        let values = parse_nuisance("# planck\nA_ps_100 = 150\n\nA_cib_143=4.5\n").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["A_ps_100"], 150.0);
        assert_eq!(values["A_cib_143"], 4.5);
    }

    #[test]
    fn missing_equals_is_rejected() {
        let err = parse_nuisance("A_ps_100 150\n").unwrap_err();
        assert_eq!(err.info().code, "nuisance-assignment");
        assert_eq!(err.info().context["line"], "1");
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let err = parse_nuisance("\ncalib = high\n").unwrap_err();
        assert!(matches!(err, CosmoError::Parse(_)));
        assert_eq!(err.info().context["line"], "2");
    }
}
