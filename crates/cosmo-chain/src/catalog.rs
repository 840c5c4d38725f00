use std::fs;
use std::path::{Path, PathBuf};

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, CosmoResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Metadata file dialects understood by [`ParameterCatalog::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataDialect {
    /// MontePython `log.param`: a script-like file assigning into `data.*` maps.
    LogParam,
    /// CosmoMC `<prefix>.inputparams` plus its `<prefix>.paramnames` companion.
    InputParams,
}

/// Role a parameter plays in the chain and in downstream re-evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterClass {
    /// Cosmological parameter held fixed during sampling.
    FixedCosmological,
    /// Cosmological parameter sampled by the chain.
    VaryingCosmological,
    /// Likelihood nuisance parameter (sampled or fixed, see [`ParameterEntry::sampled`]).
    Nuisance,
    /// Computed post hoc from the sampled parameters.
    Derived,
}

impl ParameterClass {
    /// Declaration tag used when checking for conflicting redeclarations.
    fn tag(self) -> &'static str {
        match self {
            ParameterClass::FixedCosmological | ParameterClass::VaryingCosmological => "cosmo",
            ParameterClass::Nuisance => "nuisance",
            ParameterClass::Derived => "derived",
        }
    }
}

/// Normalized declaration of a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    /// Parameter name with any dialect markers removed.
    pub name: String,
    /// Classification of the parameter.
    pub class: ParameterClass,
    /// Whether the parameter occupies a column in the chain files.
    pub sampled: bool,
    /// Declared central (or fixed) value, unscaled.
    pub central: Option<f64>,
    /// Declared lower bound, unscaled.
    pub lower: Option<f64>,
    /// Declared upper bound, unscaled.
    pub upper: Option<f64>,
    /// Declared proposal width.
    pub sigma: Option<f64>,
    /// Multiplicative factor converting stored values to physical units.
    pub scale: f64,
    /// Display label.
    pub label: String,
}

impl ParameterEntry {
    fn new(name: &str, class: ParameterClass, sampled: bool) -> Self {
        Self {
            name: name.to_string(),
            class,
            sampled,
            central: None,
            lower: None,
            upper: None,
            sigma: None,
            scale: 1.0,
            label: name.to_string(),
        }
    }

    /// Central value converted to physical units.
    pub fn scaled_central(&self) -> Option<f64> {
        self.central.map(|value| value * self.scale)
    }
}

/// Registry of the parameters stored in a chain, independent of the sampler dialect.
///
/// Chain columns follow [`ParameterCatalog::parameters`]: every sampled
/// parameter in declaration order, then every derived parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterCatalog {
    dialect: MetadataDialect,
    entries: IndexMap<String, ParameterEntry>,
    varying: Vec<String>,
    derived: Vec<String>,
    fixed_arguments: IndexMap<String, String>,
    paths: IndexMap<String, String>,
    sources: Vec<PathBuf>,
}

impl ParameterCatalog {
    /// Parses the metadata file at `metadata_path` written in `dialect`.
    ///
    /// For [`MetadataDialect::InputParams`] the `.paramnames` companion is
    /// expected next to the `.inputparams` file.
    pub fn load(metadata_path: &Path, dialect: MetadataDialect) -> CosmoResult<Self> {
        let text = read_metadata(metadata_path)?;
        let mut catalog = match dialect {
            MetadataDialect::LogParam => Self::from_log_param(&text)?,
            MetadataDialect::InputParams => {
                let names_path = metadata_path.with_extension("paramnames");
                let names = read_metadata(&names_path)?;
                let mut catalog = Self::from_cosmomc(&text, &names)?;
                catalog.sources.push(names_path);
                catalog
            }
        };
        catalog.sources.insert(0, metadata_path.to_path_buf());
        debug!(
            path = %metadata_path.display(),
            varying = catalog.varying.len(),
            derived = catalog.derived.len(),
            "parameter catalog loaded"
        );
        Ok(catalog)
    }

    /// Builds a catalog from the contents of a MontePython `log.param` file.
    pub fn from_log_param(text: &str) -> CosmoResult<Self> {
        let mut entries: IndexMap<String, ParameterEntry> = IndexMap::new();
        let mut fixed_arguments = IndexMap::new();
        let mut paths = IndexMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line_no = idx + 1;
            if line.contains(".update") {
                continue;
            }
            if line.starts_with("data.cosmo_arguments") {
                let (key, value) = bracketed_assignment(line, line_no)?;
                fixed_arguments.insert(key, statement_value(value).to_string());
            } else if line.starts_with("data.parameters") {
                let (key, value) = bracketed_assignment(line, line_no)?;
                let entry = parse_log_param_entry(&key, statement_value(value), line_no)?;
                insert_entry(&mut entries, entry, line_no)?;
            } else if line.starts_with("data.path") {
                let (key, value) = bracketed_assignment(line, line_no)?;
                paths.insert(key, statement_value(value).to_string());
            }
        }

        Ok(Self::assemble(
            MetadataDialect::LogParam,
            entries,
            fixed_arguments,
            paths,
        ))
    }

    /// Builds a catalog from the contents of CosmoMC `.inputparams` and `.paramnames` files.
    pub fn from_cosmomc(inputparams: &str, paramnames: &str) -> CosmoResult<Self> {
        let mut declared: IndexMap<String, ParameterEntry> = IndexMap::new();
        let mut fixed_arguments = IndexMap::new();

        for (idx, raw) in inputparams.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((left, right)) = line.split_once('=') else {
                continue;
            };
            let line_no = idx + 1;
            let left = left.trim();
            if let Some(rest) = left.strip_prefix("param[") {
                let name = rest.trim_end().trim_end_matches(']').trim();
                if name.is_empty() {
                    return Err(parse_error(
                        "inputparams-name",
                        "parameter declaration without a name",
                        line_no,
                    ));
                }
                let entry = parse_inputparams_entry(name, right, line_no)?;
                declared.insert(name.to_string(), entry);
            } else {
                fixed_arguments.insert(left.to_string(), right.trim().to_string());
            }
        }

        let mut entries: IndexMap<String, ParameterEntry> = IndexMap::new();
        for (idx, raw) in paramnames.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line_no = idx + 1;
            let (token, label) = match line.split_once(char::is_whitespace) {
                Some((token, label)) if !label.trim().is_empty() => (token, label.trim()),
                _ => {
                    return Err(parse_error(
                        "paramnames-label",
                        "parameter name without a display label",
                        line_no,
                    )
                    .map_info(|info| info.with_context("parameter", line)))
                }
            };
            let (name, derived) = match token.strip_suffix('*') {
                Some(name) => (name, true),
                None => (token, false),
            };
            if entries.contains_key(name) {
                return Err(parse_error(
                    "paramnames-duplicate",
                    "parameter listed twice in paramnames",
                    line_no,
                )
                .map_info(|info| info.with_context("parameter", name)));
            }
            let entry = match (derived, declared.shift_remove(name)) {
                (true, None) => ParameterEntry::new(name, ParameterClass::Derived, true),
                (true, Some(_)) => {
                    return Err(conflict(name, "derived", "cosmo", line_no));
                }
                (false, Some(entry)) if !entry.sampled => {
                    return Err(conflict(name, "varying", "fixed", line_no));
                }
                (false, Some(entry)) => entry,
                (false, None) => ParameterEntry::new(name, ParameterClass::VaryingCosmological, true),
            };
            let mut entry = entry;
            entry.label = label.to_string();
            insert_entry(&mut entries, entry, line_no)?;
        }

        for (name, mut entry) in declared {
            if entry.sampled {
                warn!(
                    parameter = %name,
                    "parameter declared varying but absent from paramnames; treating as fixed"
                );
                entry.sampled = false;
                entry.class = ParameterClass::FixedCosmological;
            }
            entries.entry(name).or_insert(entry);
        }

        Ok(Self::assemble(
            MetadataDialect::InputParams,
            entries,
            fixed_arguments,
            IndexMap::new(),
        ))
    }

    fn assemble(
        dialect: MetadataDialect,
        entries: IndexMap<String, ParameterEntry>,
        fixed_arguments: IndexMap<String, String>,
        paths: IndexMap<String, String>,
    ) -> Self {
        let varying = entries
            .values()
            .filter(|entry| entry.sampled && entry.class != ParameterClass::Derived)
            .map(|entry| entry.name.clone())
            .collect();
        let derived = entries
            .values()
            .filter(|entry| entry.class == ParameterClass::Derived)
            .map(|entry| entry.name.clone())
            .collect();
        Self {
            dialect,
            entries,
            varying,
            derived,
            fixed_arguments,
            paths,
            sources: Vec::new(),
        }
    }

    /// Dialect the catalog was parsed from.
    pub fn dialect(&self) -> MetadataDialect {
        self.dialect
    }

    /// Metadata files the catalog was read from (empty for in-memory catalogs).
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Sampled parameters in declaration order.
    pub fn varying_parameters(&self) -> &[String] {
        &self.varying
    }

    /// Derived parameters in declaration order.
    pub fn derived_parameters(&self) -> &[String] {
        &self.derived
    }

    /// Varying parameters followed by derived parameters.
    pub fn parameters(&self) -> Vec<String> {
        self.varying
            .iter()
            .chain(self.derived.iter())
            .cloned()
            .collect()
    }

    /// Number of columns every chain row must have.
    pub fn column_count(&self) -> usize {
        2 + self.varying.len() + self.derived.len()
    }

    /// Position of `name` within [`ParameterCatalog::parameters`].
    pub fn position(&self, name: &str) -> Option<usize> {
        if let Some(idx) = self.varying.iter().position(|p| p == name) {
            return Some(idx);
        }
        self.derived
            .iter()
            .position(|p| p == name)
            .map(|idx| self.varying.len() + idx)
    }

    /// Full declaration of any catalogued parameter, including fixed ones.
    pub fn entry(&self, name: &str) -> CosmoResult<&ParameterEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| CosmoError::unknown_parameter(name))
    }

    /// All declarations in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &ParameterEntry> {
        self.entries.values()
    }

    /// Classification of a catalogued parameter.
    pub fn class_of(&self, name: &str) -> CosmoResult<ParameterClass> {
        self.entry(name).map(|entry| entry.class)
    }

    /// Scale factor applied to the parameter's chain column.
    pub fn scale_of(&self, name: &str) -> CosmoResult<f64> {
        self.entry(name).map(|entry| entry.scale)
    }

    /// Nuisance parameter names, sampled or not, in declaration order.
    pub fn nuisance_parameters(&self) -> Vec<&str> {
        self.entries
            .values()
            .filter(|entry| entry.class == ParameterClass::Nuisance)
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// Raw fixed arguments handed to the spectrum code.
    pub fn fixed_arguments(&self) -> &IndexMap<String, String> {
        &self.fixed_arguments
    }

    /// Raw `data.path` declarations (MontePython only).
    pub fn paths(&self) -> &IndexMap<String, String> {
        &self.paths
    }

    /// Display label of a chain parameter.
    pub fn label_of(&self, name: &str) -> CosmoResult<&str> {
        self.ensure_in_chain(name)?;
        self.entry(name).map(|entry| entry.label.as_str())
    }

    /// Overrides display labels for known chain parameters.
    ///
    /// Unknown names are ignored so a single label map can serve several
    /// catalogs. Returns the names whose label changed, in input order.
    pub fn set_labels<I, K, V>(&mut self, overrides: I) -> Vec<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut applied = Vec::new();
        for (name, label) in overrides {
            let name = name.as_ref();
            if self.position(name).is_none() {
                continue;
            }
            if let Some(entry) = self.entries.get_mut(name) {
                entry.label = label.into();
                applied.push(name.to_string());
            }
        }
        applied
    }

    /// Sampling bounds of a varying parameter in physical units; `None` means unbounded.
    pub fn bounds_of(&self, name: &str) -> CosmoResult<(Option<f64>, Option<f64>)> {
        if self.derived.iter().any(|p| p == name) {
            return Err(CosmoError::NotApplicable(
                ErrorInfo::new(
                    "bounds-derived",
                    format!("parameter '{name}' has no bounds: it is a derived parameter"),
                )
                .with_context("parameter", name),
            ));
        }
        if !self.varying.iter().any(|p| p == name) {
            return Err(CosmoError::unknown_parameter(name));
        }
        let entry = self.entry(name)?;
        Ok((
            entry.lower.map(|value| value * entry.scale),
            entry.upper.map(|value| value * entry.scale),
        ))
    }

    fn ensure_in_chain(&self, name: &str) -> CosmoResult<()> {
        match self.position(name) {
            Some(_) => Ok(()),
            None => Err(CosmoError::unknown_parameter(name)),
        }
    }
}

fn read_metadata(path: &Path) -> CosmoResult<String> {
    fs::read_to_string(path).map_err(|err| CosmoError::io("metadata-read", path, err))
}

fn parse_error(code: &str, message: &str, line: usize) -> CosmoError {
    CosmoError::Parse(ErrorInfo::new(code, message).with_context("line", line.to_string()))
}

fn conflict(name: &str, first: &str, second: &str, line: usize) -> CosmoError {
    CosmoError::Parse(
        ErrorInfo::new(
            "conflicting-classification",
            format!("parameter '{name}' declared both {first} and {second}"),
        )
        .with_context("parameter", name)
        .with_context("line", line.to_string()),
    )
}

trait MapInfo {
    fn map_info(self, f: impl FnOnce(ErrorInfo) -> ErrorInfo) -> Self;
}

impl MapInfo for CosmoError {
    fn map_info(self, f: impl FnOnce(ErrorInfo) -> ErrorInfo) -> Self {
        match self {
            CosmoError::Parse(info) => CosmoError::Parse(f(info)),
            other => other,
        }
    }
}

fn insert_entry(
    entries: &mut IndexMap<String, ParameterEntry>,
    entry: ParameterEntry,
    line: usize,
) -> CosmoResult<()> {
    if let Some(existing) = entries.get_mut(&entry.name) {
        if existing.class.tag() != entry.class.tag() {
            return Err(conflict(
                &entry.name,
                existing.class.tag(),
                entry.class.tag(),
                line,
            ));
        }
        *existing = entry;
        return Ok(());
    }
    entries.insert(entry.name.clone(), entry);
    Ok(())
}

/// Splits `prefix['key'] = value` into the unquoted key and the raw value text.
fn bracketed_assignment(line: &str, line_no: usize) -> CosmoResult<(String, &str)> {
    let (left, right) = line
        .split_once('=')
        .ok_or_else(|| parse_error("assignment", "expected an assignment", line_no))?;
    let key = match (left.find('['), left.rfind(']')) {
        (Some(open), Some(close)) if open < close => unquote(&left[open + 1..close]),
        _ => {
            return Err(parse_error(
                "assignment-key",
                "expected a bracketed key",
                line_no,
            ))
        }
    };
    if key.is_empty() {
        return Err(parse_error("assignment-key", "empty bracketed key", line_no));
    }
    Ok((key.to_string(), right))
}

/// Value text of a statement, cut at the first `;`.
fn statement_value(right: &str) -> &str {
    right.split(';').next().unwrap_or("").trim()
}

fn unquote(text: &str) -> &str {
    text.trim().trim_matches(|c| c == '\'' || c == '"')
}

fn parse_log_param_entry(name: &str, value: &str, line: usize) -> CosmoResult<ParameterEntry> {
    let inner = value.trim().trim_start_matches('[').trim_end_matches(']');
    let fields: Vec<&str> = inner.split(',').map(unquote).collect();
    if fields.len() < 6 || fields.iter().take(6).any(|field| field.is_empty()) {
        return Err(parse_error(
            "parameter-fields",
            "parameter declaration needs six fields",
            line,
        )
        .map_info(|info| {
            info.with_context("parameter", name)
                .with_hint("expected [central, lower, upper, sigma, scale, 'tag']")
        }));
    }
    let sigma = number(fields[3], name, line)?;
    let sampled = sigma != 0.0;
    let class = match fields[5] {
        "cosmo" if sampled => ParameterClass::VaryingCosmological,
        "cosmo" => ParameterClass::FixedCosmological,
        "nuisance" => ParameterClass::Nuisance,
        "derived" => ParameterClass::Derived,
        other => {
            return Err(parse_error(
                "parameter-tag",
                "unknown parameter classification",
                line,
            )
            .map_info(|info| {
                info.with_context("parameter", name)
                    .with_context("tag", other)
            }))
        }
    };
    let mut entry = ParameterEntry::new(name, class, sampled || class == ParameterClass::Derived);
    entry.central = optional_number(fields[0], name, line)?;
    entry.lower = bound(fields[1], name, line)?;
    entry.upper = bound(fields[2], name, line)?;
    entry.sigma = Some(sigma);
    entry.scale = number(fields[4], name, line)?;
    Ok(entry)
}

fn parse_inputparams_entry(name: &str, value: &str, line: usize) -> CosmoResult<ParameterEntry> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    match fields.len() {
        1 => {
            let mut entry = ParameterEntry::new(name, ParameterClass::FixedCosmological, false);
            entry.central = Some(number(fields[0], name, line)?);
            Ok(entry)
        }
        n if n >= 5 => {
            let central = number(fields[0], name, line)?;
            let lower = number(fields[1], name, line)?;
            let upper = number(fields[2], name, line)?;
            let width = number(fields[3], name, line)?;
            let sampled = width != 0.0 && lower != upper;
            let class = if sampled {
                ParameterClass::VaryingCosmological
            } else {
                ParameterClass::FixedCosmological
            };
            let mut entry = ParameterEntry::new(name, class, sampled);
            entry.central = Some(central);
            entry.lower = Some(lower);
            entry.upper = Some(upper);
            entry.sigma = Some(width);
            Ok(entry)
        }
        _ => Err(parse_error(
            "parameter-fields",
            "parameter declaration needs one or five fields",
            line,
        )
        .map_info(|info| {
            info.with_context("parameter", name)
                .with_hint("expected 'center min max width propose_width' or a fixed value")
        })),
    }
}

fn number(field: &str, name: &str, line: usize) -> CosmoResult<f64> {
    field.parse::<f64>().map_err(|_| {
        parse_error("parameter-number", "expected a numeric field", line).map_info(|info| {
            info.with_context("parameter", name)
                .with_context("field", field)
        })
    })
}

fn optional_number(field: &str, name: &str, line: usize) -> CosmoResult<Option<f64>> {
    if field == "None" {
        return Ok(None);
    }
    number(field, name, line).map(Some)
}

fn bound(field: &str, name: &str, line: usize) -> CosmoResult<Option<f64>> {
    if field == "-1" {
        return Ok(None);
    }
    optional_number(field, name, line)
}
