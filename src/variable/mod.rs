//! Unknowns identification.
//!
//! A [Variable] is a pure identity: two [Variable]s are equal when they
//! describe the same physical unknown, whatever model or variance is
//! attached to them. Their total order defines the column order of every
//! matrix formed within one epoch.
use crate::prelude::SV;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod catalog;
mod set;

pub use catalog::VariableCatalog;
pub use set::{ColumnIndex, Coefficient, VariableAttributes, VariableSet};

/// Physical nature of an unknown.
/// The declaration order matters: it defines the column layout,
/// source indexed unknowns first (troposphere leading), then
/// satellite indexed unknowns grouped by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Observable {
    /// Zenith wet tropospheric delay (m)
    WetTroposphere,
    /// ECEF x coordinate (m)
    Dx,
    /// ECEF y coordinate (m)
    Dy,
    /// ECEF z coordinate (m)
    Dz,
    /// North coordinate (m)
    DLat,
    /// East coordinate (m)
    DLon,
    /// Up coordinate (m)
    DHeight,
    /// Receiver clock offset (m)
    ClockOffset,
    /// Slant ionospheric delay on the primary frequency (m)
    Ionosphere,
    /// Phase ambiguity on the primary frequency (cycles)
    AmbiguityL1,
    /// Phase ambiguity on the secondary frequency (cycles)
    AmbiguityL2,
}

impl std::fmt::Display for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WetTroposphere => write!(f, "zwd"),
            Self::Dx => write!(f, "dx"),
            Self::Dy => write!(f, "dy"),
            Self::Dz => write!(f, "dz"),
            Self::DLat => write!(f, "dlat"),
            Self::DLon => write!(f, "dlon"),
            Self::DHeight => write!(f, "dh"),
            Self::ClockOffset => write!(f, "cdt"),
            Self::Ionosphere => write!(f, "iono"),
            Self::AmbiguityL1 => write!(f, "BL1"),
            Self::AmbiguityL2 => write!(f, "BL2"),
        }
    }
}

impl Observable {
    /// True if this [Observable] is estimated separately per satellite
    pub fn is_satellite_indexed(&self) -> bool {
        matches!(self, Self::Ionosphere | Self::AmbiguityL1 | Self::AmbiguityL2)
    }

    /// True if this [Observable] is a phase ambiguity
    pub fn is_ambiguity(&self) -> bool {
        matches!(self, Self::AmbiguityL1 | Self::AmbiguityL2)
    }

    /// True if this [Observable] is a coordinate
    pub fn is_coordinate(&self) -> bool {
        matches!(
            self,
            Self::Dx | Self::Dy | Self::Dz | Self::DLat | Self::DLon | Self::DHeight
        )
    }
}

/// Receiver (data source) identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceId(String);

impl From<&str> for SourceId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for SourceId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one unknown.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Variable {
    observable: Observable,
    source: Option<SourceId>,
    satellite: Option<SV>,
    source_indexed: bool,
    satellite_indexed: bool,
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.source, &self.satellite) {
            (Some(source), Some(sv)) => write!(f, "{}({}:{})", self.observable, source, sv),
            (Some(source), None) => write!(f, "{}({})", self.observable, source),
            (None, Some(sv)) => write!(f, "{}({})", self.observable, sv),
            (None, None) => write!(f, "{}", self.observable),
        }
    }
}

impl Variable {
    /// Unknown shared by all satellites of one receiver
    /// (coordinates, clock, troposphere).
    pub fn source_indexed(observable: Observable, source: SourceId) -> Self {
        Self {
            observable,
            source: Some(source),
            satellite: None,
            source_indexed: true,
            satellite_indexed: false,
        }
    }

    /// Unknown estimated per satellite, for one receiver
    /// (ionosphere, ambiguities).
    pub fn satellite_indexed(observable: Observable, source: SourceId, sv: SV) -> Self {
        Self {
            observable,
            source: Some(source),
            satellite: Some(sv),
            source_indexed: true,
            satellite_indexed: true,
        }
    }

    pub fn observable(&self) -> Observable {
        self.observable
    }

    pub fn source(&self) -> Option<&SourceId> {
        self.source.as_ref()
    }

    pub fn satellite(&self) -> Option<SV> {
        self.satellite
    }

    pub fn is_source_indexed(&self) -> bool {
        self.source_indexed
    }

    pub fn is_satellite_indexed(&self) -> bool {
        self.satellite_indexed
    }

    /// True if this [Variable] is a phase ambiguity
    pub fn is_ambiguity(&self) -> bool {
        self.observable.is_ambiguity()
    }
}
