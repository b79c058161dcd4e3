pub const LIGHT_SPEED: f64 = 299_792_458.0; // speed of light in a vacuum (m/s)
pub const TWO_PI: f64 = 2.0 * std::f64::consts::PI;
pub const GAP_ERROR_TOLERANCE: f64 = 1.0e-16; // default residual for the gap gain search
pub const GAP_MAX_ITERATIONS: u32 = 100; // default iteration ceiling for the gap gain search
pub const PROTON_REST_ENERGY: f64 = 938.272e6; // eV
pub const ELECTRON_REST_ENERGY: f64 = 0.510_998_95e6; // eV
