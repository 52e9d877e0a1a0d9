use chb_core::*;
use std::collections::BTreeMap;

/// Agreement between bins and a ground-truth species assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Adjusted Rand index over contigs present in both tables.
    pub ari: f64,
}

impl Quality {
    /// Scores `bins` against `truth`, both keyed by contig.
    ///
    /// Precision is over binned contigs with a known species; recall is over
    /// every contig in the truth table, so contigs left out of the bins
    /// count against it.
    pub fn measure<K, S>(truth: &BTreeMap<K, S>, bins: &BTreeMap<K, Bin>) -> Self
    where
        K: Ord,
        S: Ord,
    {
        let mut confusion = BTreeMap::<(&S, Bin), usize>::new();
        for (contig, bin) in bins {
            if let Some(species) = truth.get(contig) {
                *confusion.entry((species, *bin)).or_default() += 1;
            }
        }
        let binned = confusion.values().sum::<usize>();
        let total = truth.len();
        let mut species = BTreeMap::<&S, usize>::new();
        let mut clusters = BTreeMap::<Bin, usize>::new();
        let mut species_max = BTreeMap::<&S, usize>::new();
        let mut clusters_max = BTreeMap::<Bin, usize>::new();
        for (&(s, b), &count) in confusion.iter() {
            *species.entry(s).or_default() += count;
            *clusters.entry(b).or_default() += count;
            let best = species_max.entry(s).or_default();
            *best = (*best).max(count);
            let best = clusters_max.entry(b).or_default();
            *best = (*best).max(count);
        }
        let precision = ratio(clusters_max.values().sum(), binned);
        let recall = ratio(species_max.values().sum(), total);
        let f1 = if precision + recall > 0. {
            2. * precision * recall / (precision + recall)
        } else {
            0.
        };
        let pairs = |n: usize| (n * n.saturating_sub(1)) as f64 / 2.;
        let index = confusion.values().map(|&n| pairs(n)).sum::<f64>();
        let rows = species.values().map(|&n| pairs(n)).sum::<f64>();
        let cols = clusters.values().map(|&n| pairs(n)).sum::<f64>();
        let expected = if binned > 1 {
            rows * cols / pairs(binned)
        } else {
            0.
        };
        let maximum = (rows + cols) / 2.;
        // identical trivial partitions have no spread to normalize by
        let ari = if maximum > expected {
            (index - expected) / (maximum - expected)
        } else {
            1.
        };
        Self {
            precision,
            recall,
            f1,
            ari,
        }
    }
}

fn ratio(hits: usize, total: usize) -> f64 {
    match total {
        0 => 0.,
        _ => hits as f64 / total as f64,
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "precision {:.4} recall {:.4} f1 {:.4} ari {:.4}",
            self.precision, self.recall, self.f1, self.ari
        )
    }
}
