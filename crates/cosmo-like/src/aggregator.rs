use std::path::Path;

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{Channel, CosmoError, CosmoResult, LikelihoodModule, Spectrum};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::nuisance::read_nuisance;

/// Module artifacts evaluated when no explicit list is given.
pub const DEFAULT_LIKELIHOODS: [&str; 3] = [
    "commander_v4.1_lm49.clik",
    "CAMspec_v6.2TN_2013_02_26_dist.clik",
    "lowlike_v222.clik",
];

/// Opens likelihood module artifacts from disk.
pub trait ModuleLoader {
    /// Loads the module stored at `path`.
    fn load(&self, path: &Path) -> CosmoResult<Box<dyn LikelihoodModule>>;
}

/// Outcome of scoring one spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodReport {
    /// Log-likelihood of every module, in registration order.
    pub per_module: IndexMap<String, f64>,
    /// Sum of the per-module log-likelihoods.
    pub total: f64,
    /// Effective chi-square, `-2 * total`.
    pub chi2_eff: f64,
}

struct Registered {
    module: Box<dyn LikelihoodModule>,
    nuisance: IndexMap<String, Option<f64>>,
}

/// A set of likelihood modules sharing one nuisance parameter pool.
pub struct LikelihoodAggregator {
    modules: Vec<Registered>,
}

impl std::fmt::Debug for LikelihoodAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LikelihoodAggregator")
            .field("modules", &self.module_names())
            .finish()
    }
}

impl LikelihoodAggregator {
    /// Wraps already loaded modules. Nuisance values start unset.
    pub fn new(modules: Vec<Box<dyn LikelihoodModule>>) -> Self {
        let modules = modules
            .into_iter()
            .map(|module| {
                let nuisance = module
                    .nuisance_names()
                    .iter()
                    .map(|name| (name.clone(), None))
                    .collect();
                Registered { module, nuisance }
            })
            .collect();
        Self { modules }
    }

    /// Loads `names` (or [`DEFAULT_LIKELIHOODS`]) from `directory`.
    pub fn from_directory<S: AsRef<str>>(
        directory: &Path,
        names: Option<&[S]>,
        loader: &dyn ModuleLoader,
    ) -> CosmoResult<Self> {
        let names: Vec<&str> = match names {
            Some(names) => names.iter().map(AsRef::as_ref).collect(),
            None => DEFAULT_LIKELIHOODS.to_vec(),
        };
        let mut modules = Vec::with_capacity(names.len());
        for name in names {
            let path = directory.join(name);
            debug!(path = %path.display(), "loading likelihood module");
            modules.push(loader.load(&path)?);
        }
        info!(modules = modules.len(), "likelihood modules loaded");
        Ok(Self::new(modules))
    }

    /// Module names in registration order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules
            .iter()
            .map(|registered| registered.module.name())
            .collect()
    }

    /// Every nuisance name any module requires, first occurrence wins.
    pub fn nuisance_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for registered in &self.modules {
            for name in registered.nuisance.keys() {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Whether every required nuisance value has been set.
    pub fn is_ready(&self) -> bool {
        self.modules
            .iter()
            .all(|registered| registered.nuisance.values().all(Option::is_some))
    }

    /// Assigns nuisance values; every name a module requires must be present.
    ///
    /// Extra names are ignored. On failure no value is changed.
    pub fn set_nuisance(&mut self, values: &IndexMap<String, f64>) -> CosmoResult<()> {
        for registered in &self.modules {
            if let Some(missing) = registered
                .nuisance
                .keys()
                .find(|name| !values.contains_key(name.as_str()))
            {
                return Err(CosmoError::Likelihood(
                    ErrorInfo::new("nuisance-missing", "nuisance parameter not defined")
                        .with_context("parameter", missing.as_str())
                        .with_context("module", registered.module.name()),
                ));
            }
        }
        for registered in &mut self.modules {
            for (name, slot) in registered.nuisance.iter_mut() {
                *slot = values.get(name.as_str()).copied();
            }
        }
        Ok(())
    }

    /// Reads `name = value` lines from `path` and assigns them.
    pub fn set_nuisance_file(&mut self, path: &Path) -> CosmoResult<()> {
        let values = read_nuisance(path)?;
        self.set_nuisance(&values)
    }

    /// Builds the flat input vector of module `index` for `spectrum`.
    pub fn assemble(&self, spectrum: &dyn Spectrum, index: usize) -> CosmoResult<Vec<f64>> {
        let registered = self.modules.get(index).ok_or_else(|| {
            CosmoError::Likelihood(
                ErrorInfo::new("module-index", "no likelihood module at this index")
                    .with_context("index", index.to_string()),
            )
        })?;
        let table = spectrum_table(spectrum)?;
        let module = registered.module.as_ref();
        let mut vector = channel_vector(&table, module)?;
        for (name, value) in &registered.nuisance {
            let value = value.ok_or_else(|| unset(name, module.name()))?;
            vector.push(value);
        }
        Ok(vector)
    }

    /// Scores `spectrum` against every module.
    pub fn log_likelihood(&self, spectrum: &dyn Spectrum) -> CosmoResult<LikelihoodReport> {
        for registered in &self.modules {
            if let Some((name, _)) = registered
                .nuisance
                .iter()
                .find(|(_, value)| value.is_none())
            {
                return Err(unset(name, registered.module.name()));
            }
        }
        let table = spectrum_table(spectrum)?;
        let mut per_module = IndexMap::new();
        for registered in &self.modules {
            let module = registered.module.as_ref();
            let mut vector = channel_vector(&table, module)?;
            vector.extend(registered.nuisance.values().flatten());
            let loglik = module.evaluate(&vector)?;
            debug!(module = module.name(), loglik, chi2_eff = -2.0 * loglik, "module evaluated");
            per_module.insert(module.name().to_string(), loglik);
        }
        let total: f64 = per_module.values().sum();
        info!(total, chi2_eff = -2.0 * total, "likelihood evaluated");
        Ok(LikelihoodReport {
            per_module,
            total,
            chi2_eff: -2.0 * total,
        })
    }
}

fn unset(name: &str, module: &str) -> CosmoError {
    CosmoError::Likelihood(
        ErrorInfo::new("nuisance-unset", "nuisance parameters not yet defined")
            .with_context("parameter", name)
            .with_context("module", module)
            .with_hint("set them with set_nuisance or set_nuisance_file"),
    )
}

/// Spectrum columns indexed by multipole from zero, in [`Channel::ALL`] order.
///
/// Multipoles below the first one provided, and channels the spectrum does
/// not carry, are zero.
fn spectrum_table(spectrum: &dyn Spectrum) -> CosmoResult<Vec<Vec<f64>>> {
    let multipoles = spectrum.multipoles();
    let first = multipoles.first().copied().unwrap_or(0) as usize;
    let rows = first + multipoles.len();
    let mut table = Vec::with_capacity(Channel::ALL.len());
    for channel in Channel::ALL {
        let mut column = vec![0.0; rows];
        if let Some(values) = spectrum.cl(channel) {
            if values.len() != multipoles.len() {
                return Err(CosmoError::Likelihood(
                    ErrorInfo::new(
                        "spectrum-length",
                        "spectrum channel does not match its multipole list",
                    )
                    .with_context("channel", channel.as_str())
                    .with_context("expected", multipoles.len().to_string())
                    .with_context("found", values.len().to_string()),
                ));
            }
            column[first..].copy_from_slice(values);
        }
        table.push(column);
    }
    Ok(table)
}

fn channel_vector(table: &[Vec<f64>], module: &dyn LikelihoodModule) -> CosmoResult<Vec<f64>> {
    let has_cl = module.has_cl();
    let lmax = module.lmax();
    let available = table.first().map_or(0, Vec::len);
    let mut vector = Vec::new();
    for channel in Channel::ALL {
        let pos = channel.position();
        if !has_cl[pos] {
            continue;
        }
        let needed = usize::try_from(lmax[pos]).map_or(0, |lmax| lmax + 1);
        if needed > available {
            return Err(CosmoError::Likelihood(
                ErrorInfo::new("multipoles-short", "not enough multipoles for likelihood")
                    .with_context("module", module.name())
                    .with_context("channel", channel.as_str())
                    .with_context("needed", needed.to_string())
                    .with_context("available", available.to_string()),
            ));
        }
        vector.extend_from_slice(&table[pos][..needed]);
    }
    Ok(vector)
}
