//! Dab spacing along pointer motion

use super::Point;

/// Dab positions between two consecutive pointer samples.
///
/// Emits `ceil(distance / spacing)` evenly spaced points ending exactly at
/// `to`; `from` itself is not repeated. Consecutive dabs (including `from`
/// and the first emitted point) are never farther apart than `spacing`.
/// Returns nothing when the samples coincide.
pub fn interpolate_dabs(from: Point, to: Point, spacing: f32) -> Vec<Point> {
    let distance = from.distance(&to);
    if distance <= 0.0 || !distance.is_finite() {
        return Vec::new();
    }

    let spacing = spacing.max(f32::EPSILON);
    let steps = (distance / spacing).ceil().max(1.0) as usize;

    (1..=steps)
        .map(|step| {
            if step == steps {
                return to;
            }
            let t = step as f32 / steps as f32;
            lerp_point(&from, &to, t)
        })
        .collect()
}

/// Sample positions along a smudge segment, `step` pixels apart.
///
/// Includes both endpoints; at least two samples are produced
/// (`floor(distance / step)` intervals, minimum one).
pub fn segment_samples(from: Point, to: Point, step: f32) -> Vec<Point> {
    let distance = from.distance(&to);
    let step = step.max(f32::EPSILON);
    let intervals = ((distance / step).floor() as usize).max(1);

    (0..=intervals)
        .map(|i| lerp_point(&from, &to, i as f32 / intervals as f32))
        .collect()
}

/// Calculate the length of a path through points
pub fn path_length(points: &[Point]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }

    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

fn lerp_point(from: &Point, to: &Point, t: f32) -> Point {
    let pressure = match (from.pressure, to.pressure) {
        (Some(a), Some(b)) => Some(a + (b - a) * t),
        _ => None,
    };
    Point {
        x: from.x + (to.x - from.x) * t,
        y: from.y + (to.y - from.y) * t,
        pressure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dab_count_is_ceil_of_distance_over_spacing() {
        let from = Point::new(0.0, 0.0);
        let to = Point::new(9.0, 0.0);
        let dabs = interpolate_dabs(from, to, 2.0);
        assert_eq!(dabs.len(), 5); // ceil(9 / 2)
        assert_eq!(*dabs.last().unwrap(), to);
    }

    #[test]
    fn test_no_gap_exceeds_spacing() {
        let from = Point::new(3.0, 4.0);
        let to = Point::new(40.0, -17.5);
        let spacing = 2.5;
        let dabs = interpolate_dabs(from, to, spacing);

        let mut prev = from;
        for dab in &dabs {
            assert!(prev.distance(dab) <= spacing + 1e-4);
            prev = *dab;
        }
        assert_eq!(
            dabs.len(),
            (from.distance(&to) / spacing).ceil() as usize
        );
    }

    #[test]
    fn test_coincident_samples_produce_nothing() {
        let p = Point::new(5.0, 5.0);
        assert!(interpolate_dabs(p, p, 2.0).is_empty());
    }

    #[test]
    fn test_segment_samples_include_endpoints() {
        let from = Point::new(0.0, 0.0);
        let to = Point::new(10.0, 0.0);
        let samples = segment_samples(from, to, 2.0);
        assert_eq!(samples.len(), 6);
        assert_eq!(samples[0], from);
        assert_eq!(samples[5], to);
    }

    #[test]
    fn test_short_segment_still_samples_both_ends() {
        let samples = segment_samples(Point::new(0.0, 0.0), Point::new(1.0, 0.0), 2.0);
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_path_length() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        ];
        assert!((path_length(&points) - 30.0).abs() < 0.01);
        assert_eq!(path_length(&[]), 0.0);
    }
}
