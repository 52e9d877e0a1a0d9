use chb_core::*;
use std::collections::BTreeMap;

/// Majority bin per parent contig. Ties go to the lowest bin id.
///
/// `parents[i]` owns fragment i, whose final bin is `bins[i]`. Parents come
/// back in ascending order.
pub fn vote<P>(parents: &[P], bins: &[Bin]) -> Result<BTreeMap<P, Bin>>
where
    P: Ord + Clone,
{
    if parents.len() != bins.len() {
        return Err(Error::DimensionMismatch {
            expected: parents.len(),
            got: bins.len(),
        });
    }
    let mut tallies = BTreeMap::<P, BTreeMap<Bin, usize>>::new();
    for (parent, bin) in parents.iter().zip(bins) {
        *tallies
            .entry(parent.clone())
            .or_default()
            .entry(*bin)
            .or_default() += 1;
    }
    Ok(tallies
        .into_iter()
        .filter_map(|(parent, tally)| {
            tally
                .into_iter()
                .max_by(|(a, x), (b, y)| x.cmp(y).then(b.cmp(a)))
                .map(|(bin, _)| (parent, bin))
        })
        .collect())
}
