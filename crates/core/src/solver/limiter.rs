//! Flux limiting for the nonlinear diffusivity
//!
//! The face diffusivity `D·u^m` is evaluated from a MUSCL reconstruction of
//! the density on both sides of each face. Slopes are limited with the
//! generalised minmod family
//!
//! ```text
//! σᵢ = minmod(θ(uᵢ − uᵢ₋₁), (uᵢ₊₁ − uᵢ₋₁)/2, θ(uᵢ₊₁ − uᵢ)),   θ ∈ [1, 2]
//! ```
//!
//! `θ = 1` is the most dissipative (classic minmod), `θ = 2` the least
//! (monotonised central). For any θ in range the reconstructed face values
//! stay between the two cell values, so the face diffusivity is never
//! evaluated outside the data range.

/// Two-argument minmod
#[inline]
pub fn minmod(a: f64, b: f64) -> f64 {
    if a * b <= 0.0 {
        0.0
    } else if a.abs() < b.abs() {
        a
    } else {
        b
    }
}

/// Three-argument minmod
#[inline]
pub fn minmod3(a: f64, b: f64, c: f64) -> f64 {
    minmod(a, minmod(b, c))
}

/// Limited slope at a cell from its two neighbours
///
/// A missing neighbour (outside the region or off the grid) yields a zero slope.
#[inline]
pub fn limited_slope(theta: f64, left: Option<f64>, centre: f64, right: Option<f64>) -> f64 {
    match (left, right) {
        (Some(l), Some(r)) => minmod3(theta * (centre - l), 0.5 * (r - l), theta * (r - centre)),
        _ => 0.0,
    }
}

/// Nonlinear diffusivity `u^m` (density clipped at zero)
#[inline]
pub fn diffusivity(u: f64, exponent: f64) -> f64 {
    if exponent == 0.0 {
        1.0
    } else {
        u.max(0.0).powf(exponent)
    }
}

/// Transformed density `Φ = u^(m+1) / (m+1)`, whose Laplacian is `∇·(u^m ∇u)`
#[inline]
pub fn transformed_density(u: f64, exponent: f64) -> f64 {
    u.max(0.0).powf(exponent + 1.0) / (exponent + 1.0)
}

/// Limited face diffusivity between cells `i` and `i+1`
///
/// `outer_left` is `uᵢ₋₁` and `outer_right` is `uᵢ₊₂`; either may be missing.
#[inline]
pub fn face_diffusivity(
    theta: f64,
    exponent: f64,
    outer_left: Option<f64>,
    u_i: f64,
    u_next: f64,
    outer_right: Option<f64>,
) -> f64 {
    let sigma_i = limited_slope(theta, outer_left, u_i, Some(u_next));
    let sigma_next = limited_slope(theta, Some(u_i), u_next, outer_right);
    let u_left_face = u_i + 0.5 * sigma_i;
    let u_right_face = u_next - 0.5 * sigma_next;
    0.5 * (diffusivity(u_left_face, exponent) + diffusivity(u_right_face, exponent))
}
