use crate::particle::{ColorKey, Particle};
use std::collections::BTreeMap;

/// One histogram entry: a representative color and the keys merged into it
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBucket {
    pub color: ColorKey,
    pub count: usize,
    pub members: Vec<ColorKey>,
}

/// Count particles per color key, most common first.
///
/// With a positive `tolerance`, keys are merged greedily into the most
/// common bucket whose representative lies within that RGB distance.
pub fn color_histogram(particles: &[Particle], tolerance: f32) -> Vec<ColorBucket> {
    let mut counts: BTreeMap<&ColorKey, usize> = BTreeMap::new();
    for p in particles {
        *counts.entry(&p.color).or_default() += 1;
    }

    let mut exact: Vec<(&ColorKey, usize)> = counts.into_iter().collect();
    exact.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut buckets: Vec<ColorBucket> = Vec::new();
    for (key, count) in exact {
        let target = if tolerance > 0.0 {
            buckets
                .iter()
                .position(|b| matches!(b.color.distance(key), Some(d) if d <= tolerance))
        } else {
            None
        };
        match target {
            Some(i) => {
                buckets[i].count += count;
                buckets[i].members.push(key.clone());
            }
            None => buckets.push(ColorBucket {
                color: key.clone(),
                count,
                members: vec![key.clone()],
            }),
        }
    }

    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.color.cmp(&b.color)));
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleShape;
    use glam::Vec2;

    fn particles(colors: &[(u8, u8, u8)]) -> Vec<Particle> {
        colors
            .iter()
            .map(|(r, g, b)| Particle::new(Vec2::ZERO, ColorKey::from_rgb(*r, *g, *b), 1.0, ParticleShape::Circle))
            .collect()
    }

    #[test]
    fn exact_histogram_sorted_by_count() {
        let ps = particles(&[(0, 0, 0), (255, 0, 0), (255, 0, 0), (0, 0, 0), (255, 0, 0)]);
        let hist = color_histogram(&ps, 0.0);
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[0].color, ColorKey::from_rgb(255, 0, 0));
        assert_eq!(hist[0].count, 3);
        assert_eq!(hist[1].count, 2);
    }

    #[test]
    fn tolerance_merges_close_colors() {
        let ps = particles(&[(200, 0, 0), (200, 0, 0), (204, 0, 0), (0, 0, 200)]);
        let hist = color_histogram(&ps, 10.0);
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[0].count, 3);
        assert_eq!(hist[0].members.len(), 2);
    }
}
