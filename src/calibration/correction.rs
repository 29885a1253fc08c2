// Gravity temperature correction
//
// Standard hydrometer correction: scales a gravity reading taken at
// `temp_c` to what it would read at the calibration temperature. The
// density polynomial is expressed in Fahrenheit.

/// Default calibration temperature (°C)
pub const DEFAULT_CALIBRATION_TEMP_C: f64 = 20.0;

/// Convert Celsius to Fahrenheit
#[inline]
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 1.8 + 32.0
}

/// Relative water density at `temp_f`
fn density_factor(temp_f: f64) -> f64 {
    1.00130346 - 0.000134722124 * temp_f + 0.00000204052596 * temp_f.powi(2)
        - 0.00000000232820948 * temp_f.powi(3)
}

/// Correct an SG reading taken at `temp_c` for a hydrometer calibrated at `cal_temp_c`
pub fn gravity_temperature_correction_c(gravity: f64, temp_c: f64, cal_temp_c: f64) -> f64 {
    let measured = density_factor(celsius_to_fahrenheit(temp_c));
    let calibrated = density_factor(celsius_to_fahrenheit(cal_temp_c));
    gravity * (measured / calibrated)
}
