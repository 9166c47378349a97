use crate::{cfg::Error, navigation::StochasticModel};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rover, receiver or user [Profile], which is application dependent.
/// It drives the [StochasticModel] of the coordinates unknowns.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Profile {
    /// Receiver held in static.
    /// Typically used in Geodetic surveys (GNSS stations Referencing)
    /// and laboratories applications.
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "static", alias = "Static"))]
    Static,
    /// [Profile::Pedestrian]: < 10 km/h very low velocity
    #[cfg_attr(feature = "serde", serde(alias = "pedestrian", alias = "Pedestrian"))]
    Pedestrian,
    /// [Profile::Car]: < 100 km/h slow velocity
    #[cfg_attr(feature = "serde", serde(alias = "car", alias = "Car"))]
    Car,
    /// [Profile::Airplane]: < 1000 km/h high velocity
    #[cfg_attr(feature = "serde", serde(alias = "airplane", alias = "Airplane"))]
    Airplane,
    /// [Profile::Rocket]: > 1000 km/h ultra high velocity
    #[cfg_attr(feature = "serde", serde(alias = "rocket", alias = "Rocket"))]
    Rocket,
}

impl Profile {
    /// True if this [Profile] is [Profile::Static]
    pub fn is_static(&self) -> bool {
        *self == Self::Static
    }

    /// Power spectral density (m².s⁻¹) of the coordinates random walk.
    /// Null for [Profile::Static].
    pub fn coordinates_psd(&self) -> f64 {
        match self {
            Self::Static => 0.0,
            Self::Pedestrian => 0.5_f64.powi(2),
            Self::Car => 2.0_f64.powi(2),
            Self::Airplane => 50.0_f64.powi(2),
            Self::Rocket => 1000.0_f64.powi(2),
        }
    }

    /// [StochasticModel] of the coordinates unknowns
    pub fn coordinates_model(&self) -> StochasticModel {
        if self.is_static() {
            StochasticModel::Constant
        } else {
            StochasticModel::RandomWalk {
                psd: self.coordinates_psd(),
            }
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        let trimmed = s.trim();
        match trimmed {
            "static" => Ok(Self::Static),
            "pedestrian" => Ok(Self::Pedestrian),
            "car" => Ok(Self::Car),
            "airplane" => Ok(Self::Airplane),
            "rocket" => Ok(Self::Rocket),
            _ => Err(Error::InvalidUserProfile),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Pedestrian => write!(f, "pedestrian"),
            Self::Car => write!(f, "car"),
            Self::Airplane => write!(f, "airplane"),
            Self::Rocket => write!(f, "rocket"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Profile;
    use crate::navigation::StochasticModel;
    use std::str::FromStr;

    #[test]
    fn profile_parsing() {
        for (desc, expected) in [
            ("static", Profile::Static),
            (" Car ", Profile::Car),
            ("ROCKET", Profile::Rocket),
        ] {
            let profile = Profile::from_str(desc).unwrap();
            assert_eq!(profile, expected);
            assert_eq!(Profile::from_str(&profile.to_string()).unwrap(), profile);
        }

        assert!(Profile::from_str("boat").is_err());
    }

    #[test]
    fn profile_coordinates_model() {
        assert_eq!(Profile::Static.coordinates_model(), StochasticModel::Constant);
        assert_eq!(
            Profile::Car.coordinates_model(),
            StochasticModel::RandomWalk { psd: 4.0 }
        );
    }
}
