use crate::{cfg::Error, constants::SPEED_OF_LIGHT_M_S};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Carrier {
    /// L1 (GPS/QZSS/SBAS) same frequency as E1 and B1aB1c
    #[default]
    L1,
    /// L2 (GPS/QZSS)
    L2,
    /// L5 (GPS/QZSS/SBAS) same frequency as E5A and B2A
    L5,
    /// E1 (Galileo)
    E1,
    /// E5A (Galileo) same frequency as L5
    E5A,
    /// E5B (Galileo) same frequency as B2iB2b
    E5B,
    /// B1I (BDS)
    B1I,
    /// B2I/B2B (BDS) same frequency as E5b
    B2iB2b,
    /// B3 (BDS)
    B3,
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L5 => write!(f, "L5"),
            Self::E1 => write!(f, "E1"),
            Self::E5A => write!(f, "E5A"),
            Self::E5B => write!(f, "E5B"),
            Self::B1I => write!(f, "B1I"),
            Self::B2iB2b => write!(f, "B2I/B2B"),
            Self::B3 => write!(f, "B3"),
        }
    }
}

impl Carrier {
    /// Carrier frequency in Hz
    pub fn frequency(&self) -> f64 {
        match self {
            Self::L1 | Self::E1 => 1575.42E6_f64,
            Self::L2 => 1227.60E6_f64,
            Self::L5 | Self::E5A => 1176.45E6_f64,
            Self::E5B | Self::B2iB2b => 1207.14E6_f64,
            Self::B1I => 1561.098E6_f64,
            Self::B3 => 1268.52E6_f64,
        }
    }

    /// Carrier wavelength in meters
    pub fn wavelength(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / self.frequency()
    }
}

/// Frequency pair the uncombined observations are sampled on.
/// Every satellite indexed coefficient of the design matrix derives from it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DualFrequency {
    /// Primary frequency, the ionospheric unknowns are expressed on it
    pub lhs: Carrier,
    /// Secondary frequency
    pub rhs: Carrier,
}

impl Default for DualFrequency {
    fn default() -> Self {
        Self {
            lhs: Carrier::L1,
            rhs: Carrier::L2,
        }
    }
}

impl std::fmt::Display for DualFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{}/{}", self.lhs, self.rhs)
    }
}

impl DualFrequency {
    /// Creates a new [DualFrequency] pair. Both carriers must
    /// have distinct frequencies (L5 and E5A do not form a pair).
    pub fn new(lhs: Carrier, rhs: Carrier) -> Result<Self, Error> {
        let pair = Self { lhs, rhs };
        pair.validate()?;
        Ok(pair)
    }

    /// Verifies that this pair can form the dual frequency combinations
    pub fn validate(&self) -> Result<(), Error> {
        if self.lhs.frequency() == self.rhs.frequency() {
            Err(Error::IdenticalCarriers)
        } else {
            Ok(())
        }
    }

    /// (f1/f2)², scales the primary ionospheric delay onto the secondary frequency
    pub fn gamma(&self) -> f64 {
        (self.lhs.frequency() / self.rhs.frequency()).powi(2)
    }

    /// Widelane wavelength in meters
    pub fn widelane_wavelength(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / (self.lhs.frequency() - self.rhs.frequency())
    }

    /// Narrowlane wavelength in meters
    pub fn narrowlane_wavelength(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / (self.lhs.frequency() + self.rhs.frequency())
    }

    /// f2/(f1-f2)
    pub fn widelane_factor(&self) -> f64 {
        self.rhs.frequency() / (self.lhs.frequency() - self.rhs.frequency())
    }
}

#[cfg(test)]
mod test {
    use super::{Carrier, DualFrequency};
    use crate::cfg::Error;

    #[test]
    fn identical_frequencies() {
        assert_eq!(
            DualFrequency::new(Carrier::L5, Carrier::E5A),
            Err(Error::IdenticalCarriers)
        );

        assert_eq!(
            DualFrequency::new(Carrier::L1, Carrier::L1),
            Err(Error::IdenticalCarriers)
        );

        let pair = DualFrequency::new(Carrier::E1, Carrier::E5A).unwrap();
        assert!(pair.widelane_wavelength().is_finite());
    }

    #[test]
    fn gps_l1_l2_constants() {
        let pair = DualFrequency::default();

        assert!((pair.gamma() - 1.646944444).abs() < 1.0E-9);
        assert!((Carrier::L1.wavelength() - 0.190293672798).abs() < 1.0E-11);
        assert!((Carrier::L2.wavelength() - 0.244210213425).abs() < 1.0E-11);
        assert!((pair.widelane_wavelength() - 0.861918400322).abs() < 1.0E-11);
        assert!((pair.narrowlane_wavelength() - 0.106953378142).abs() < 1.0E-11);
    }
}
