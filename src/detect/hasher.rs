//! Triplet geometry, hash keys, and hash-table training/verification (§4.5).

use crate::core::types::Point;
use crate::detect::criteria::Criteria;
use crate::detect::template::Template;
use crate::error::Result;
use crate::quantize::quantize_relative_depth;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Three points (center, p1, p2) in a normalized `gridW x gridH` grid,
/// rescaled to a template or window bbox before sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triplet {
    pub c: Point,
    pub p1: Point,
    pub p2: Point,
    pub grid: (i32, i32),
}

impl Triplet {
    /// Rescale this triplet's normalized grid coordinates onto a `width x
    /// height` box anchored at `origin`.
    #[must_use]
    pub fn scale_to(&self, origin: Point, width: i32, height: i32) -> (Point, Point, Point) {
        let (gw, gh) = self.grid;
        let scale = |p: Point| {
            let x = origin.x + (p.x * width) / gw.max(1);
            let y = origin.y + (p.y * height) / gh.max(1);
            Point::new(x, y)
        };
        (scale(self.c), scale(self.p1), scale(self.p2))
    }
}

fn random_triplet(rng: &mut ChaCha8Rng, grid: (i32, i32)) -> Triplet {
    let (gw, gh) = grid;
    let mut point = || Point::new(rng.gen_range(0..gw.max(1)), rng.gen_range(0..gh.max(1)));
    Triplet {
        c: point(),
        p1: point(),
        p2: point(),
        grid,
    }
}

/// Generate `count` random triplets from a single seeded stream, so that
/// generating twice with the same seed and grid yields identical triplets.
#[must_use]
pub fn generate_triplets(criteria: &Criteria, count: usize) -> Vec<Triplet> {
    let mut rng = ChaCha8Rng::seed_from_u64(criteria.triplet_seed);
    (0..count)
        .map(|_| random_triplet(&mut rng, criteria.triplet_grid))
        .collect()
}

/// 5-tuple hash key: two relative-depth bins and three normal-octant bins,
/// each representable in 3 bits, for a total key space of 2^15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashKey {
    pub d1_bin: u8,
    pub d2_bin: u8,
    pub normal_c_bin: u8,
    pub normal_p1_bin: u8,
    pub normal_p2_bin: u8,
}

/// One trained table: a triplet geometry plus a key to deduplicated
/// template-id bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashTable {
    pub triplet: Triplet,
    pub buckets: HashMap<HashKey, HashSet<i32>>,
}

impl HashTable {
    fn insert(&mut self, key: HashKey, template_id: i32) {
        self.buckets.entry(key).or_default().insert(template_id);
    }
}

/// Surface normal bin and depth at a template-local point, sampled from the
/// template's own stored source depth, used only while training a hash key.
fn template_depth_and_normal_bin(template: &Template, p: Point) -> Option<(f32, u8)> {
    let depth = template.depth.at_f32(p.y as usize, p.x as usize, 0).ok()?;
    if depth <= 0.0 {
        return None;
    }
    let bin = crate::imgproc::normal_bin_at(&template.depth, p.x, p.y).ok().flatten()?;
    Some((depth, bin))
}

fn hash_key_for_template(
    template: &Template,
    triplet: &Triplet,
    criteria: &Criteria,
) -> Option<HashKey> {
    let (c, p1, p2) = triplet.scale_to(
        Point::new(0, 0),
        template.object_bb.width,
        template.object_bb.height,
    );

    let (depth_c, normal_c_bin) = template_depth_and_normal_bin(template, c)?;
    let (depth_p1, normal_p1_bin) = template_depth_and_normal_bin(template, p1)?;
    let (depth_p2, normal_p2_bin) = template_depth_and_normal_bin(template, p2)?;

    Some(HashKey {
        d1_bin: quantize_relative_depth(depth_p1 - depth_c, &criteria.depth_bin_ranges),
        d2_bin: quantize_relative_depth(depth_p2 - depth_c, &criteria.depth_bin_ranges),
        normal_c_bin,
        normal_p1_bin,
        normal_p2_bin,
    })
}

/// Train `criteria.hash_table_count` hash tables over `templates`.
///
/// Templates for which a triplet point lands on an invalid or bordering
/// pixel are simply absent from that table's buckets; the template remains
/// discoverable through its other hash tables.
#[must_use]
pub fn train_hash_tables(templates: &[Template], criteria: &Criteria) -> Vec<HashTable> {
    let triplets = generate_triplets(criteria, criteria.hash_table_count);

    triplets
        .into_iter()
        .map(|triplet| {
            let mut table = HashTable {
                triplet,
                buckets: HashMap::new(),
            };
            for template in templates {
                if let Some(key) = hash_key_for_template(template, &triplet, criteria) {
                    table.insert(key, template.id);
                }
            }
            table
        })
        .collect()
}

/// Per-scene depth/normal sampler a table's verification pass reads from.
/// Implemented over `Scene`'s quantized normal map and raw depth, kept
/// generic here so tests can supply a minimal stand-in.
pub trait SceneSampler {
    fn depth_at(&self, p: Point) -> Option<f32>;
    fn normal_bin_at(&self, p: Point) -> Option<u8>;
}

impl SceneSampler for crate::detect::scene::Scene {
    fn depth_at(&self, p: Point) -> Option<f32> {
        if p.x < 0 || p.y < 0 || p.x as usize >= self.cols() || p.y as usize >= self.rows() {
            return None;
        }
        let v = self.depth_f32.at_f32(p.y as usize, p.x as usize, 0).ok()?;
        if v <= 0.0 {
            None
        } else {
            Some(v)
        }
    }

    fn normal_bin_at(&self, p: Point) -> Option<u8> {
        crate::imgproc::normal_bin_at(&self.depth_f32, p.x, p.y).ok().flatten()
    }
}

fn hash_key_for_window(
    sampler: &impl SceneSampler,
    triplet: &Triplet,
    origin: Point,
    size: (i32, i32),
    criteria: &Criteria,
) -> Option<HashKey> {
    let (c, p1, p2) = triplet.scale_to(origin, size.0, size.1);

    let depth_c = sampler.depth_at(c)?;
    let depth_p1 = sampler.depth_at(p1)?;
    let depth_p2 = sampler.depth_at(p2)?;
    let normal_c_bin = sampler.normal_bin_at(c)?;
    let normal_p1_bin = sampler.normal_bin_at(p1)?;
    let normal_p2_bin = sampler.normal_bin_at(p2)?;

    Some(HashKey {
        d1_bin: quantize_relative_depth(depth_p1 - depth_c, &criteria.depth_bin_ranges),
        d2_bin: quantize_relative_depth(depth_p2 - depth_c, &criteria.depth_bin_ranges),
        normal_c_bin,
        normal_p1_bin,
        normal_p2_bin,
    })
}

/// Verify a window against all trained tables, returning surviving
/// candidate template ids sorted descending by vote count and capped at
/// `criteria.max_candidates`.
#[must_use]
pub fn verify_window(
    sampler: &impl SceneSampler,
    tables: &[HashTable],
    origin: Point,
    size: (i32, i32),
    criteria: &Criteria,
) -> Vec<(i32, usize)> {
    let mut votes: HashMap<i32, usize> = HashMap::new();

    for table in tables {
        let Some(key) = hash_key_for_window(sampler, &table.triplet, origin, size, criteria)
        else {
            continue;
        };
        if let Some(bucket) = table.buckets.get(&key) {
            for &id in bucket {
                *votes.entry(id).or_insert(0) += 1;
            }
        }
    }

    let threshold = criteria.vote_threshold();
    let mut survivors: Vec<(i32, usize)> =
        votes.into_iter().filter(|&(_, v)| v >= threshold).collect();
    survivors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    survivors.truncate(criteria.max_candidates);
    survivors
}

/// Load a serialized set of hash tables, verifying the result is structurally
/// sound for callers that deserialize untrusted input (§6 round-trip).
pub fn load_hash_tables(json: &str) -> Result<Vec<HashTable>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplet_generation_is_deterministic_for_fixed_seed() {
        let criteria = Criteria::default();
        let a = generate_triplets(&criteria, 10);
        let b = generate_triplets(&criteria, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn triplet_scale_to_anchors_at_origin() {
        let triplet = Triplet {
            c: Point::new(0, 0),
            p1: Point::new(11, 11),
            p2: Point::new(6, 6),
            grid: (12, 12),
        };
        let (c, p1, _p2) = triplet.scale_to(Point::new(100, 100), 120, 120);
        assert_eq!(c, Point::new(100, 100));
        assert_eq!(p1, Point::new(210, 210));
    }

    struct FixedSampler {
        depth: f32,
        normal_bin: u8,
    }

    impl SceneSampler for FixedSampler {
        fn depth_at(&self, _p: Point) -> Option<f32> {
            Some(self.depth)
        }
        fn normal_bin_at(&self, _p: Point) -> Option<u8> {
            Some(self.normal_bin)
        }
    }

    #[test]
    fn verify_window_votes_for_matching_bucket() {
        let criteria = Criteria::default();
        let triplet = Triplet {
            c: Point::new(0, 0),
            p1: Point::new(6, 6),
            p2: Point::new(11, 11),
            grid: (12, 12),
        };
        let key = HashKey {
            d1_bin: 4,
            d2_bin: 4,
            normal_c_bin: 2,
            normal_p1_bin: 2,
            normal_p2_bin: 2,
        };
        let mut buckets = HashMap::new();
        buckets.insert(key, HashSet::from([7]));
        let tables = vec![HashTable { triplet, buckets }];

        let sampler = FixedSampler {
            depth: 1000.0,
            normal_bin: 2,
        };
        let mut criteria = criteria;
        criteria.hash_table_count = 1;
        criteria.min_vote_ratio = 0.0;
        let survivors = verify_window(&sampler, &tables, Point::new(0, 0), (100, 100), &criteria);
        assert_eq!(survivors, vec![(7, 1)]);
    }
}
