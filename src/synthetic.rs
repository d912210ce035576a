//! Seeded synthetic interaction streams.
//!
//! Actors are split into groups that mostly write among themselves, with a
//! configurable share of cross-group traffic, so the output has a planted
//! community structure and a realistic time spread.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::graph::Interaction;

const FIRST_NAMES: [&str; 16] = [
    "john", "mary", "kevin", "sara", "louise", "mark", "jeff", "susan", "greg", "tana", "steven",
    "vince", "kay", "phillip", "sally", "richard",
];

const LAST_NAMES: [&str; 16] = [
    "smith", "jones", "allen", "brown", "taylor", "white", "davis", "miller", "wilson", "moore",
    "clark", "lewis", "walker", "hall", "young", "king",
];

const MAX_SUFFIX: usize = 100;

/// Number of distinct addresses [`AddressGenerator`] can produce.
pub const ADDRESS_CAPACITY: usize = FIRST_NAMES.len() * LAST_NAMES.len() * (MAX_SUFFIX - 1);

/// Shape of a generated stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSpec {
    pub actors: usize,
    pub groups: usize,
    pub interactions: usize,
    /// Probability that a message goes to a member of another group. Actors
    /// alone in their group always write outside it.
    pub cross_group_ratio: f64,
    pub start: DateTime<Utc>,
    pub span_days: u32,
    pub domain: String,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            actors: 140,
            groups: 7,
            interactions: 2_000,
            cross_group_ratio: 0.1,
            // 2001-01-01T00:00:00Z
            start: DateTime::from_timestamp(978_307_200, 0).unwrap_or_default(),
            span_days: 730,
            domain: "example.com".to_string(),
        }
    }
}

impl SyntheticSpec {
    pub fn validate(&self) -> Result<()> {
        if self.actors < 2 || self.actors > ADDRESS_CAPACITY {
            return Err(AnalysisError::Config(format!(
                "synthetic actors must be between 2 and {ADDRESS_CAPACITY}, got {}",
                self.actors
            )));
        }
        if self.groups == 0 || self.groups > self.actors {
            return Err(AnalysisError::Config(format!(
                "synthetic groups must be between 1 and {}, got {}",
                self.actors, self.groups
            )));
        }
        if !(0.0..=1.0).contains(&self.cross_group_ratio) {
            return Err(AnalysisError::Config(format!(
                "cross_group_ratio must be in [0, 1], got {}",
                self.cross_group_ratio
            )));
        }
        if self.span_days == 0 {
            return Err(AnalysisError::Config("span_days must be positive".into()));
        }
        Ok(())
    }
}

/// Unique `first.lastNN@domain` addresses.
pub struct AddressGenerator<'a> {
    domain: &'a str,
}

impl<'a> AddressGenerator<'a> {
    pub fn new(domain: &'a str) -> Self {
        Self { domain }
    }

    /// `count` distinct addresses, at most [`ADDRESS_CAPACITY`].
    pub fn unique_batch<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<String> {
        let count = count.min(ADDRESS_CAPACITY);
        let mut used = HashSet::with_capacity(count);
        let mut names = Vec::with_capacity(count);
        while names.len() < count {
            let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
            let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
            let num = rng.gen_range(1..MAX_SUFFIX);
            let name = format!("{first}.{last}{num}@{}", self.domain);
            if used.insert(name.clone()) {
                names.push(name);
            }
        }
        names
    }
}

/// Generate a chronologically sorted stream. The same `spec` and `seed`
/// always give the same output.
pub fn generate_interactions(spec: &SyntheticSpec, seed: u64) -> Result<Vec<Interaction>> {
    spec.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let actors = AddressGenerator::new(&spec.domain).unique_batch(spec.actors, &mut rng);
    let groups: Vec<Vec<usize>> = (0..spec.groups)
        .map(|g| (g..spec.actors).step_by(spec.groups).collect())
        .collect();
    let span = i64::from(spec.span_days) * 86_400;

    // one generator per message keeps the parallel output independent of scheduling
    let mut interactions: Vec<Interaction> = (0..spec.interactions)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(message_seed(seed, i));
            let sender = rng.gen_range(0..actors.len());
            let home = sender % spec.groups;
            let own = &groups[home];

            let recipient = if spec.groups > 1 && rng.gen_bool(spec.cross_group_ratio) {
                let other = rng.gen_range(0..spec.groups - 1);
                let other = if other >= home { other + 1 } else { other };
                let members = &groups[other];
                members[rng.gen_range(0..members.len())]
            } else if own.len() >= 2 {
                let pick = rng.gen_range(0..own.len() - 1);
                own.iter()
                    .copied()
                    .filter(|&a| a != sender)
                    .nth(pick)
                    .unwrap_or(sender)
            } else {
                let other = rng.gen_range(0..actors.len() - 1);
                if other >= sender { other + 1 } else { other }
            };

            let sent = spec.start + Duration::seconds(rng.gen_range(0..span));
            Interaction::new(actors[sender].as_str(), actors[recipient].as_str()).at(sent)
        })
        .collect();

    interactions.sort_by_key(|i| i.timestamp);
    tracing::info!(
        "Generated {} interactions between {} actors in {} groups",
        interactions.len(),
        spec.actors,
        spec.groups
    );
    Ok(interactions)
}

fn message_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
