use super::*;
use chb_core::*;

/// Up to m of `members` nearest to the query, never the query itself.
///
/// Partial selection keeps this linear in the number of members. Ties in
/// distance go to the lower sample index, and the result is ordered by
/// distance.
pub fn select(row: &[Distance], query: Sample, members: &[Sample], m: usize) -> Vec<Sample> {
    let closer = |a: &Sample, b: &Sample| row[*a].total_cmp(&row[*b]).then(a.cmp(b));
    let mut candidates = members
        .iter()
        .copied()
        .filter(|&j| j != query)
        .collect::<Vec<Sample>>();
    if m == 0 {
        return Vec::new();
    }
    if candidates.len() > m {
        candidates.select_nth_unstable_by(m - 1, closer);
        candidates.truncate(m);
    }
    candidates.sort_unstable_by(closer);
    candidates
}

/// [`select`] over the members of cluster c according to a label vector.
pub fn nearest(row: &[Distance], query: Sample, labels: &Labels, c: Bin, m: usize) -> Vec<Sample> {
    let members = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| **l == Label::Bin(c))
        .map(|(i, _)| i)
        .collect::<Vec<Sample>>();
    select(row, query, &members, m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_brute_force() {
        let samples = Samples::random(60, 3, 12);
        let matrix = Resident::build(&samples).unwrap();
        let labels = Labels::from((0..60).map(|i| Label::Bin(i % 3)).collect::<Vec<_>>());
        for query in [0, 17, 59] {
            let ref row = matrix.row(query);
            for c in 0..3 {
                for m in [1, 5, 19, 20, 40] {
                    let picked = nearest(row, query, &labels, c, m);
                    let mut brute = (0..60)
                        .filter(|&j| j != query && j % 3 == c)
                        .collect::<Vec<_>>();
                    brute.sort_by(|a, b| row[*a].total_cmp(&row[*b]).then(a.cmp(b)));
                    brute.truncate(m);
                    assert_eq!(picked, brute);
                    assert!(picked.len() <= m);
                    assert!(!picked.contains(&query));
                }
            }
        }
    }

    #[test]
    fn small_cluster_returns_all() {
        let row = [0., 3., 1., 2.];
        let mut picked = select(&row, 0, &[3, 1], 5);
        picked.sort();
        assert_eq!(picked, vec![1, 3]);
    }

    #[test]
    fn excludes_query() {
        let row = [0., 3., 1., 2.];
        assert_eq!(select(&row, 0, &[0, 2], 2), vec![2]);
        assert!(select(&row, 0, &[0], 2).is_empty());
    }

    #[test]
    fn empty_cluster_is_empty() {
        let row = [0., 1.];
        assert!(select(&row, 0, &[], 3).is_empty());
        let labels = Labels::from(vec![Label::Bin(0), Label::Bin(0)]);
        assert!(nearest(&row, 0, &labels, 1, 3).is_empty());
    }
}
