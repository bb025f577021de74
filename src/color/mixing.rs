//! Closed-form pigment mixing
//!
//! Each color is lifted into an 8-component latent made of fixed combinations
//! of its channels, the two latents are interpolated component-wise, and the
//! result is projected back through a fixed weight matrix. The projection is
//! an exact left inverse of the linear part of the lift, so pure colors
//! survive the round trip; the saturation component is what makes mixtures
//! of distant hues darken the way pigments do instead of turning into a flat
//! RGB average.
//!
//! The same arithmetic is mirrored in the GPU compositing shader.

use super::Color;

/// Number of latent components
pub const LATENT_SIZE: usize = 8;

/// Latent representation of a color
pub type Latent = [f32; LATENT_SIZE];

/// How strongly lost saturation darkens the mixture
const SUBTRACTIVE_DARKENING: f32 = 0.35;

/// Rows map latent components 0..7 back to r, g, b.
///
/// Each row reproduces its own channel exactly when fed an unmixed latent:
/// `41/60 + 2 * (1/4 / 2) + (1/5) / 3 == 1` for the own channel and the
/// cross terms cancel to zero.
const PROJECTION: [[f32; 7]; 3] = [
    [41.0 / 60.0, 0.0, 0.0, 0.25, -23.0 / 60.0, 0.25, 0.2],
    [0.0, 41.0 / 60.0, 0.0, 0.25, 0.25, -23.0 / 60.0, 0.2],
    [0.0, 0.0, 41.0 / 60.0, -23.0 / 60.0, 0.25, 0.25, 0.2],
];

/// Lift a color into latent space
pub fn to_latent(color: Color) -> Latent {
    let Color { r, g, b } = color;
    [
        r,
        g,
        b,
        (r + g) / 2.0,
        (g + b) / 2.0,
        (r + b) / 2.0,
        (r + g + b) / 3.0,
        spread(r, g, b),
    ]
}

/// Project a latent back to a display color, clamped to 0.0 - 1.0
pub fn from_latent(latent: &Latent) -> Color {
    let project = |row: &[f32; 7]| -> f32 {
        row.iter()
            .zip(latent.iter())
            .map(|(weight, component)| weight * component)
            .sum()
    };

    let r = project(&PROJECTION[0]);
    let g = project(&PROJECTION[1]);
    let b = project(&PROJECTION[2]);

    // Saturation carried by the latent that the linear channels no longer show
    let lost = (latent[7] - spread(latent[0], latent[1], latent[2])).max(0.0);
    let shade = 1.0 - SUBTRACTIVE_DARKENING * lost;

    Color::new(r * shade, g * shade, b * shade).clamped()
}

/// Mix `b` into `a` by fraction `t` (clamped to 0.0 - 1.0).
///
/// `pigment_mix(a, b, 0.0) == a` and `pigment_mix(a, b, 1.0) == b` hold
/// exactly. The function is pure, which replay depends on.
pub fn pigment_mix(a: Color, b: Color, t: f32) -> Color {
    if t.is_nan() || t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }

    let la = to_latent(a);
    let lb = to_latent(b);
    let mut mixed = [0.0f32; LATENT_SIZE];
    for (i, component) in mixed.iter_mut().enumerate() {
        *component = (1.0 - t) * la[i] + t * lb[i];
    }

    from_latent(&mixed)
}

#[inline]
fn spread(r: f32, g: f32, b: f32) -> f32 {
    r.max(g).max(b) - r.min(g).min(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Color, b: Color) -> bool {
        (a.r - b.r).abs() < 1e-5 && (a.g - b.g).abs() < 1e-5 && (a.b - b.b).abs() < 1e-5
    }

    fn samples() -> Vec<Color> {
        vec![
            Color::BLACK,
            Color::WHITE,
            Color::new(1.0, 0.0, 0.0),
            Color::new(0.973, 0.973, 0.961),
            Color::from_hex("#1C3575").unwrap(),
            Color::from_hex("#F5E84C").unwrap(),
            Color::new(0.2, 0.7, 0.4),
        ]
    }

    #[test]
    fn test_boundary_identity() {
        for a in samples() {
            for b in samples() {
                assert_eq!(pigment_mix(a, b, 0.0), a);
                assert_eq!(pigment_mix(a, b, 1.0), b);
            }
        }
    }

    #[test]
    fn test_projection_inverts_lift() {
        for c in samples() {
            assert!(close(from_latent(&to_latent(c)), c), "round trip of {:?}", c);
        }
    }

    #[test]
    fn test_mixing_same_color_is_stable() {
        let c = Color::new(0.3, 0.6, 0.9);
        assert!(close(pigment_mix(c, c, 0.5), c));
    }

    #[test]
    fn test_complementary_mix_darkens() {
        let yellow = Color::new(1.0, 1.0, 0.0);
        let blue = Color::new(0.0, 0.0, 1.0);
        let mixed = pigment_mix(yellow, blue, 0.5);
        // A plain RGB average would be mid grey at 0.5
        assert!(mixed.r < 0.5 && mixed.g < 0.5 && mixed.b < 0.5);
    }

    #[test]
    fn test_out_of_range_t_is_clamped() {
        let a = Color::new(0.1, 0.2, 0.3);
        let b = Color::new(0.9, 0.8, 0.7);
        assert_eq!(pigment_mix(a, b, -0.5), a);
        assert_eq!(pigment_mix(a, b, 1.5), b);
        assert_eq!(pigment_mix(a, b, f32::NAN), a);
    }

    #[test]
    fn test_mix_is_deterministic() {
        let a = Color::new(0.12, 0.5, 0.77);
        let b = Color::new(0.8, 0.1, 0.05);
        assert_eq!(pigment_mix(a, b, 0.37), pigment_mix(a, b, 0.37));
    }
}
