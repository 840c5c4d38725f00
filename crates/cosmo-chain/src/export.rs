use std::fs;
use std::path::{Path, PathBuf};

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, CosmoResult};
use indexmap::IndexMap;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::catalog::{ParameterCatalog, ParameterClass};

/// Value of an input handed to the spectrum code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// Numeric argument.
    Number(f64),
    /// Any other argument (flags, output lists, file paths).
    Text(String),
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Number(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

/// A path token that may appear in fixed arguments, with the directory it stands for.
#[derive(Debug, Clone, Copy)]
pub struct SubstitutionRule {
    /// Literal token as written in the metadata file.
    pub token: &'static str,
    /// Produces the replacement directory from the caller-supplied base directory.
    pub resolve: fn(&Path) -> PathBuf,
}

fn spectrum_code_root(base: &Path) -> PathBuf {
    base.to_path_buf()
}

/// Path tokens resolved while normalizing fixed arguments.
pub const SUBSTITUTIONS: &[SubstitutionRule] = &[
    SubstitutionRule {
        token: "data.path['cosmo']",
        resolve: spectrum_code_root,
    },
    SubstitutionRule {
        token: "data.path[\"cosmo\"]",
        resolve: spectrum_code_root,
    },
];

/// Rebuilds spectrum-code and likelihood inputs from single chain rows.
#[derive(Debug, Clone)]
pub struct PointExporter<'a> {
    catalog: &'a ParameterCatalog,
    base_dir: Option<PathBuf>,
}

impl<'a> PointExporter<'a> {
    /// Exporter for rows laid out according to `catalog`.
    pub fn new(catalog: &'a ParameterCatalog) -> Self {
        Self {
            catalog,
            base_dir: None,
        }
    }

    /// Directory path tokens in fixed arguments are resolved against.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Cosmological inputs for the spectrum code at `row`.
    ///
    /// Fixed arguments come first, then fixed and varying cosmological
    /// parameters; `fixed_overrides` are applied last and win.
    pub fn spectrum_inputs(
        &self,
        row: ArrayView1<'_, f64>,
        fixed_overrides: &IndexMap<String, ArgValue>,
    ) -> CosmoResult<IndexMap<String, ArgValue>> {
        self.check_row(&row)?;
        let mut inputs = IndexMap::new();
        for (name, raw) in self.catalog.fixed_arguments() {
            inputs.insert(name.clone(), self.normalize_argument(name, raw)?);
        }
        for entry in self.catalog.entries() {
            match entry.class {
                ParameterClass::VaryingCosmological => {
                    inputs.insert(
                        entry.name.clone(),
                        ArgValue::Number(self.column_value(&row, &entry.name)?),
                    );
                }
                ParameterClass::FixedCosmological => {
                    if let Some(value) = entry.scaled_central() {
                        inputs.insert(entry.name.clone(), ArgValue::Number(value));
                    }
                }
                ParameterClass::Nuisance | ParameterClass::Derived => {}
            }
        }
        for (name, value) in fixed_overrides {
            inputs.insert(name.clone(), value.clone());
        }
        Ok(inputs)
    }

    /// Nuisance parameter values at `row`, in declaration order.
    ///
    /// Nuisance parameters that were not sampled take their declared value.
    pub fn nuisance_inputs(&self, row: ArrayView1<'_, f64>) -> CosmoResult<IndexMap<String, f64>> {
        self.check_row(&row)?;
        let mut values = IndexMap::new();
        for entry in self
            .catalog
            .entries()
            .filter(|entry| entry.class == ParameterClass::Nuisance)
        {
            let value = if entry.sampled {
                self.column_value(&row, &entry.name)?
            } else {
                entry.scaled_central().ok_or_else(|| {
                    CosmoError::NotApplicable(
                        ErrorInfo::new(
                            "nuisance-fixed-value",
                            "fixed nuisance parameter has no declared value",
                        )
                        .with_context("parameter", entry.name.as_str()),
                    )
                })?
            };
            values.insert(entry.name.clone(), value);
        }
        Ok(values)
    }

    /// Writes the nuisance values at `row` to `destination` as `name=value` lines.
    pub fn write_nuisance(
        &self,
        row: ArrayView1<'_, f64>,
        destination: &Path,
    ) -> CosmoResult<IndexMap<String, f64>> {
        let values = self.nuisance_inputs(row)?;
        let mut contents = String::new();
        for (name, value) in &values {
            contents.push_str(&format!("{name}={value}\n"));
        }
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|err| CosmoError::io("nuisance-mkdir", parent, err))?;
            }
        }
        fs::write(destination, contents)
            .map_err(|err| CosmoError::io("nuisance-write", destination, err))?;
        Ok(values)
    }

    fn check_row(&self, row: &ArrayView1<'_, f64>) -> CosmoResult<()> {
        let expected = self.catalog.column_count();
        if row.len() != expected {
            return Err(CosmoError::MalformedChain(
                ErrorInfo::new("row-length", "row does not match the catalog column layout")
                    .with_context("expected", expected.to_string())
                    .with_context("found", row.len().to_string()),
            ));
        }
        Ok(())
    }

    fn column_value(&self, row: &ArrayView1<'_, f64>, name: &str) -> CosmoResult<f64> {
        let position = self
            .catalog
            .position(name)
            .ok_or_else(|| CosmoError::unknown_parameter(name))?;
        Ok(row[position + 2])
    }

    fn normalize_argument(&self, name: &str, raw: &str) -> CosmoResult<ArgValue> {
        if let Some(rule) = SUBSTITUTIONS.iter().find(|rule| raw.contains(rule.token)) {
            let path = self.resolve_reference(name, raw, rule)?;
            return Ok(ArgValue::Text(path.display().to_string()));
        }
        let text = strip_quotes(raw);
        Ok(match text.parse::<f64>() {
            Ok(value) => ArgValue::Number(value),
            Err(_) => ArgValue::Text(text),
        })
    }

    fn resolve_reference(
        &self,
        name: &str,
        raw: &str,
        rule: &SubstitutionRule,
    ) -> CosmoResult<PathBuf> {
        let Some(base) = &self.base_dir else {
            return Err(CosmoError::MissingReference(
                ErrorInfo::new(
                    "reference-base",
                    "argument references the spectrum code tree but no base directory was given",
                )
                .with_context("argument", name)
                .with_context("value", raw),
            ));
        };
        let mut path = (rule.resolve)(base);
        let remainder = strip_quotes(&raw.replace(rule.token, ""));
        for piece in remainder.split('+') {
            let piece = piece.trim().trim_start_matches('/');
            if !piece.is_empty() {
                path.push(piece);
            }
        }
        if !path.is_file() {
            return Err(CosmoError::MissingReference(
                ErrorInfo::new(
                    "reference-missing",
                    "argument references a file absent from the spectrum code tree",
                )
                .with_path(&path)
                .with_context("argument", name)
                .with_context("value", raw),
            ));
        }
        Ok(path)
    }
}

fn strip_quotes(raw: &str) -> String {
    raw.replace(['\'', '"'], "").trim().to_string()
}
