#![deny(missing_docs)]
#![doc = "Core error taxonomy and collaborator contracts shared by the cosmochain crates."]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod provenance;

pub use errors::{CosmoError, CosmoResult, ErrorInfo};
pub use provenance::{ChainProvenance, SchemaVersion};

/// Polarization and cross channels of a CMB angular power spectrum.
///
/// The declaration order is the column order expected by likelihood modules:
/// TT, EE, BB, TE, TB, EB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    /// Temperature auto spectrum.
    TT,
    /// E-mode auto spectrum.
    EE,
    /// B-mode auto spectrum.
    BB,
    /// Temperature / E-mode cross spectrum.
    TE,
    /// Temperature / B-mode cross spectrum.
    TB,
    /// E-mode / B-mode cross spectrum.
    EB,
}

impl Channel {
    /// All channels in likelihood column order.
    pub const ALL: [Channel; 6] = [
        Channel::TT,
        Channel::EE,
        Channel::BB,
        Channel::TE,
        Channel::TB,
        Channel::EB,
    ];

    /// Column position of the channel within a likelihood spectrum table.
    pub fn position(self) -> usize {
        self as usize
    }

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::TT => "TT",
            Channel::EE => "EE",
            Channel::BB => "BB",
            Channel::TE => "TE",
            Channel::TB => "TB",
            Channel::EB => "EB",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CosmoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                CosmoError::Config(
                    ErrorInfo::new("channel-unknown", "unknown spectrum channel")
                        .with_context("channel", value),
                )
            })
    }
}

/// Theoretical angular power spectrum handed over by the spectrum-computation collaborator.
///
/// Values are `C_ell` in µK² without the `ell (ell + 1) / 2π` prefactor, aligned
/// with [`Spectrum::multipoles`].
pub trait Spectrum {
    /// Harmonic indices covered by the spectrum, in increasing order.
    fn multipoles(&self) -> &[u32];

    /// Spectrum values for the requested channel, if the collaborator computed it.
    fn cl(&self, channel: Channel) -> Option<&[f64]>;
}

/// A single likelihood module from the external likelihood library.
pub trait LikelihoodModule {
    /// Identifier of the module (usually the artifact file name).
    fn name(&self) -> &str;

    /// Which channels the module consumes, in [`Channel::ALL`] order.
    fn has_cl(&self) -> [bool; 6];

    /// Maximum multipole required per channel, in [`Channel::ALL`] order.
    /// Channels the module does not consume report `-1`.
    fn lmax(&self) -> [i32; 6];

    /// Nuisance parameters required by the module, in evaluation order.
    fn nuisance_names(&self) -> &[String];

    /// Evaluates the log-likelihood for a flat input vector.
    fn evaluate(&self, vector: &[f64]) -> CosmoResult<f64>;
}
