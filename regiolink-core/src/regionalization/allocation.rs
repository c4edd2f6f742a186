use crate::error::RegiolinkError;
use regiolink_schemas::geography::Geography;
use std::collections::HashMap;

/// Shares below this value are treated as zero and excluded, so markets
/// never carry degenerate near-zero exchanges.
pub const SHARE_EPSILON: f64 = 1e-12;

/// Tolerance on the sum-to-one invariant of market shares.
pub const BALANCE_TOLERANCE: f64 = 1e-6;

/// One supplying origin of a market and its normalized share.
#[derive(Debug, Clone, PartialEq)]
pub struct Share {
    pub origin: Geography,
    pub value: f64,
}

pub fn validate_cutoff(cutoff: f64) -> Result<(), RegiolinkError> {
    if cutoff <= 0.0 || cutoff >= 1.0 {
        return Err(RegiolinkError::InvalidCutoff(cutoff));
    }
    Ok(())
}

/// Normalize supplier quantities into shares, keep the largest suppliers
/// until their cumulative share reaches `cutoff`, and fold everything
/// beyond that point into a single Rest-of-World bucket carrying the exact
/// remainder, so the result always sums to 1.
///
/// Returns an empty vector when there is nothing to allocate (a country
/// with neither trade nor domestic production gets no market and relies on
/// the global fallback instead).
pub fn allocate_shares(quantities: &HashMap<String, f64>, cutoff: f64) -> Vec<Share> {
    let total: f64 = quantities.values().filter(|q| **q > 0.0).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut ranked: Vec<(&str, f64)> = quantities
        .iter()
        .filter(|(_, q)| **q > 0.0)
        .map(|(origin, q)| (origin.as_str(), q / total))
        .filter(|(_, share)| *share >= SHARE_EPSILON)
        .collect();
    // Descending by share; equal shares at the cutoff boundary order by
    // origin code so the fold is deterministic.
    ranked.sort_by(|(code_a, share_a), (code_b, share_b)| {
        share_b
            .partial_cmp(share_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| code_a.cmp(code_b))
    });

    let mut shares: Vec<Share> = Vec::new();
    let mut cumulative = 0.0;
    for (origin, value) in &ranked {
        if cumulative >= cutoff {
            break;
        }
        cumulative += value;
        shares.push(Share {
            origin: Geography::from(origin.to_string()),
            value: *value,
        });
    }

    let remainder = 1.0 - cumulative;
    if remainder >= SHARE_EPSILON {
        match shares.iter_mut().find(|s| s.origin == Geography::RestOfWorld) {
            Some(row) => row.value += remainder,
            None => shares.push(Share {
                origin: Geography::RestOfWorld,
                value: remainder,
            }),
        }
    }

    shares.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.origin.code().cmp(b.origin.code()))
    });
    shares
}

/// Import vector of one consuming country, domestic production included as
/// a self-export.
pub fn import_vector(
    consumption: &HashMap<(String, String), f64>,
    importer: &str,
) -> HashMap<String, f64> {
    let mut vector = HashMap::new();
    for ((to, from), quantity) in consumption {
        if to == importer {
            *vector.entry(from.clone()).or_insert(0.0) += quantity;
        }
    }
    vector
}

/// Apply the cutoff across consuming countries: the largest consumers keep
/// their own consumption market, the tail is folded into one Rest-of-World
/// consumer whose import vector is the tail's sum.
pub fn select_consumers(
    consumption: &HashMap<(String, String), f64>,
    cutoff: f64,
) -> (Vec<String>, HashMap<String, f64>) {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for ((importer, _), quantity) in consumption {
        *totals.entry(importer.as_str()).or_insert(0.0) += quantity;
    }
    let grand_total: f64 = totals.values().sum();
    if grand_total <= 0.0 {
        return (Vec::new(), HashMap::new());
    }

    let mut ranked: Vec<(&str, f64)> = totals
        .iter()
        .map(|(importer, q)| (*importer, q / grand_total))
        .collect();
    ranked.sort_by(|(code_a, share_a), (code_b, share_b)| {
        share_b
            .partial_cmp(share_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| code_a.cmp(code_b))
    });

    let mut named = Vec::new();
    let mut cumulative = 0.0;
    for (importer, share) in &ranked {
        if cumulative >= cutoff {
            break;
        }
        cumulative += share;
        named.push(importer.to_string());
    }

    // A RoW importer in the raw data merges into the residual rather than
    // standing as a named consumer of its own.
    named.retain(|c| c != "RoW");

    let mut residual_vector: HashMap<String, f64> = HashMap::new();
    for ((importer, exporter), quantity) in consumption {
        if !named.contains(importer) {
            *residual_vector.entry(exporter.clone()).or_insert(0.0) += quantity;
        }
    }

    (named, residual_vector)
}
