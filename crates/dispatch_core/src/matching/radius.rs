/// Multiples of the initial radius tried in order.
const EXPANSION_FACTORS: [f64; 4] = [1.0, 2.0, 4.0, 10.0];

/// Radius tiers searched for one dispatch, ascending.
///
/// Terms are `initial × {1, 2, 4, 10}`. The first term that reaches or passes
/// `max_radius_km` is replaced by `max_radius_km` and ends the sequence. When
/// no term reaches the maximum, only the generated terms are searched.
pub fn radius_sequence(initial_radius_km: f64, max_radius_km: f64) -> Vec<f64> {
    let mut radii = Vec::with_capacity(EXPANSION_FACTORS.len());
    for factor in EXPANSION_FACTORS {
        let radius = initial_radius_km * factor;
        if radius >= max_radius_km {
            if radii.last().map_or(true, |last| *last < max_radius_km) {
                radii.push(max_radius_km);
            }
            break;
        }
        radii.push(radius);
    }
    radii
}
