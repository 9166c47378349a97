/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Minimal number of satellites for the uncombined PPP system to be well posed:
/// position, clock and troposphere rank, plus at least one non reference
/// satellite for the ionospheric constraint.
pub const MIN_SATELLITES: usize = 4;

/// Number of satellite indexed unknowns (ionosphere, two ambiguities).
pub const SATELLITE_UNKNOWNS: usize = 3;
