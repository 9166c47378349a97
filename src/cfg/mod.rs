use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::carrier::DualFrequency;

mod profile;
pub use profile::Profile;

/// Configuration Error
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Error {
    #[error("invalid user profile")]
    InvalidUserProfile,
    #[error("invalid positioning mode")]
    InvalidPositioning,
    #[error("invalid estimator kind")]
    InvalidEstimator,
    #[error("carriers must have distinct frequencies")]
    IdenticalCarriers,
}

/// Coordinates unknowns the filter estimates.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Positioning {
    /// ECEF coordinates corrections (dx, dy, dz)
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "ecef", alias = "ECEF"))]
    Ecef,
    /// Local corrections (north, east, up)
    #[cfg_attr(feature = "serde", serde(alias = "neu", alias = "NEU"))]
    Neu,
    /// Coordinates are perfectly known and not estimated.
    /// Typically used in timing applications.
    #[cfg_attr(feature = "serde", serde(alias = "fixed"))]
    Fixed,
}

impl std::str::FromStr for Positioning {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ecef" => Ok(Self::Ecef),
            "neu" => Ok(Self::Neu),
            "fixed" => Ok(Self::Fixed),
            _ => Err(Error::InvalidPositioning),
        }
    }
}

impl std::fmt::Display for Positioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ecef => write!(f, "ECEF"),
            Self::Neu => write!(f, "NEU"),
            Self::Fixed => write!(f, "Fixed"),
        }
    }
}

fn default_code_sigma() -> f64 {
    0.3
}

fn default_phase_sigma() -> f64 {
    0.003
}

fn default_iono_constraint_variance() -> f64 {
    4.0
}

fn default_tropo_constraint_variance() -> f64 {
    1.0E9
}

fn default_fixed_ambiguity_weight() -> f64 {
    1.0E14
}

fn default_tropo_variance() -> f64 {
    0.25
}

fn default_coordinates_variance() -> f64 {
    0.25
}

fn default_clock_variance() -> f64 {
    9.0E10
}

fn default_iono_variance() -> f64 {
    2500.0
}

fn default_ambiguity_variance() -> f64 {
    4.0E14
}

fn default_clock_sigma() -> f64 {
    3.0E5
}

fn default_tropo_psd() -> f64 {
    3.0E-8
}

fn default_iono_psd() -> f64 {
    1.0E-2
}

/// Measurement and constraint rows weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Weighting {
    /// Code observation standard deviation (m)
    #[cfg_attr(feature = "serde", serde(default = "default_code_sigma"))]
    pub code_sigma_m: f64,
    /// Phase observation standard deviation (m)
    #[cfg_attr(feature = "serde", serde(default = "default_phase_sigma"))]
    pub phase_sigma_m: f64,
    /// Assumed variance of the single difference ionospheric
    /// constraint (m²). Smaller values constrain more.
    #[cfg_attr(feature = "serde", serde(default = "default_iono_constraint_variance"))]
    pub iono_constraint_variance_m2: f64,
    /// Assumed variance of the tropospheric constraint (m²).
    /// The default value leaves the troposphere almost free.
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_constraint_variance"))]
    pub tropo_constraint_variance_m2: f64,
    /// Weight of the fixed ambiguity pseudo measurements
    #[cfg_attr(feature = "serde", serde(default = "default_fixed_ambiguity_weight"))]
    pub fixed_ambiguity_weight: f64,
}

impl Default for Weighting {
    fn default() -> Self {
        Self {
            code_sigma_m: default_code_sigma(),
            phase_sigma_m: default_phase_sigma(),
            iono_constraint_variance_m2: default_iono_constraint_variance(),
            tropo_constraint_variance_m2: default_tropo_constraint_variance(),
            fixed_ambiguity_weight: default_fixed_ambiguity_weight(),
        }
    }
}

impl Weighting {
    /// Base weight of code observations
    pub fn code_weight(&self) -> f64 {
        1.0 / self.code_sigma_m.powi(2)
    }

    /// Base weight of phase observations
    pub fn phase_weight(&self) -> f64 {
        1.0 / self.phase_sigma_m.powi(2)
    }
}

/// Variances assigned to unknowns when they enter the system,
/// at the first epoch or when a satellite rises.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InitialVariances {
    /// Zenith wet delay (m²)
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_variance"))]
    pub troposphere_m2: f64,
    /// Each coordinate (m²)
    #[cfg_attr(feature = "serde", serde(default = "default_coordinates_variance"))]
    pub coordinates_m2: f64,
    /// Receiver clock offset (m²)
    #[cfg_attr(feature = "serde", serde(default = "default_clock_variance"))]
    pub clock_m2: f64,
    /// Slant ionospheric delay (m²)
    #[cfg_attr(feature = "serde", serde(default = "default_iono_variance"))]
    pub ionosphere_m2: f64,
    /// Phase ambiguities
    #[cfg_attr(feature = "serde", serde(default = "default_ambiguity_variance"))]
    pub ambiguity: f64,
}

impl Default for InitialVariances {
    fn default() -> Self {
        Self {
            troposphere_m2: default_tropo_variance(),
            coordinates_m2: default_coordinates_variance(),
            clock_m2: default_clock_variance(),
            ionosphere_m2: default_iono_variance(),
            ambiguity: default_ambiguity_variance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Frequency pair the observations are sampled on
    #[cfg_attr(feature = "serde", serde(default))]
    pub carriers: DualFrequency,
    /// Coordinates unknowns, [Positioning::Ecef] by default.
    #[cfg_attr(feature = "serde", serde(default))]
    pub positioning: Positioning,
    /// [Profile] defines the type of application.
    #[cfg_attr(feature = "serde", serde(default))]
    pub profile: Profile,
    /// Measurement and constraint rows [Weighting]
    #[cfg_attr(feature = "serde", serde(default))]
    pub weighting: Weighting,
    /// [InitialVariances] of each unknown
    #[cfg_attr(feature = "serde", serde(default))]
    pub variances: InitialVariances,
    /// Receiver clock white noise standard deviation (m)
    #[cfg_attr(feature = "serde", serde(default = "default_clock_sigma"))]
    pub clock_sigma_m: f64,
    /// Zenith wet delay random walk PSD (m².s⁻¹)
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_psd"))]
    pub tropo_psd_m2_s: f64,
    /// Slant ionospheric delay random walk PSD (m².s⁻¹)
    #[cfg_attr(feature = "serde", serde(default = "default_iono_psd"))]
    pub iono_psd_m2_s: f64,
    /// When true, an epoch where no ambiguity could be fixed is an error.
    /// Otherwise, we proceed with the float solution.
    #[cfg_attr(feature = "serde", serde(default))]
    pub require_fixed_ambiguities: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            carriers: DualFrequency::default(),
            positioning: Positioning::default(),
            profile: Profile::default(),
            weighting: Weighting::default(),
            variances: InitialVariances::default(),
            clock_sigma_m: default_clock_sigma(),
            tropo_psd_m2_s: default_tropo_psd(),
            iono_psd_m2_s: default_iono_psd(),
            require_fixed_ambiguities: false,
        }
    }
}

impl Config {
    /// Returns [Config] for static PPP positioning.
    /// You can then customize [Self] as you will.
    pub fn static_preset() -> Self {
        let mut s = Self::default();
        s.profile = Profile::Static;
        s.positioning = Positioning::Ecef;
        s
    }

    /// Returns [Config] for dynamic PPP positioning, with desired rover [Profile].
    /// You can then customize [Self] as you will.
    pub fn kinematic_preset(profile: Profile) -> Self {
        let mut s = Self::default();
        s.profile = profile;
        s.positioning = Positioning::Ecef;
        s
    }

    /// Copies and returns [Config] with desired [Positioning]
    pub fn with_positioning(&self, positioning: Positioning) -> Self {
        let mut s = self.clone();
        s.positioning = positioning;
        s
    }

    /// Verifies this [Config]uration can be used by a solver
    pub fn validate(&self) -> Result<(), Error> {
        self.carriers.validate()
    }

    /// Copies and returns [Config] with desired [DualFrequency] pair.
    /// The pair is verified when the solver is built.
    pub fn with_carriers(&self, carriers: DualFrequency) -> Self {
        let mut s = self.clone();
        s.carriers = carriers;
        s
    }
}
