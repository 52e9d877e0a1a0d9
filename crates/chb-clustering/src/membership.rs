use super::*;
use chb_core::*;

/// Members of every cluster, kept in step with the label vector.
///
/// Each assigned sample remembers its slot in its cluster's member list,
/// so moving a sample is a swap-remove plus a push.
#[derive(Debug, Clone)]
pub struct Membership {
    members: Vec<Vec<Sample>>,
    slots: Vec<Option<(Bin, usize)>>,
}

impl Membership {
    pub fn new(labels: &Labels, k: usize) -> Self {
        let mut membership = Self {
            members: vec![Vec::new(); k],
            slots: vec![None; labels.len()],
        };
        labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.bin().map(|c| (i, c)))
            .for_each(|(i, c)| membership.insert(i, c));
        membership
    }

    pub fn k(&self) -> usize {
        self.members.len()
    }

    /// Current members of cluster c, in no particular order.
    pub fn members(&self, c: Bin) -> &[Sample] {
        &self.members[c]
    }

    pub fn cluster(&self, i: Sample) -> Option<Bin> {
        self.slots[i].map(|(c, _)| c)
    }

    /// Adds i to cluster c. i must not belong to any cluster.
    pub fn insert(&mut self, i: Sample, c: Bin) {
        debug_assert!(self.slots[i].is_none());
        self.slots[i] = Some((c, self.members[c].len()));
        self.members[c].push(i);
    }

    /// Takes i out of its cluster, if it has one.
    pub fn remove(&mut self, i: Sample) -> Option<Bin> {
        let (c, slot) = self.slots[i].take()?;
        self.members[c].swap_remove(slot);
        if let Some(&moved) = self.members[c].get(slot) {
            self.slots[moved] = Some((c, slot));
        }
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[i64]) -> Labels {
        raw.iter()
            .map(|&l| Label::try_from(l).unwrap())
            .collect::<Vec<Label>>()
            .into()
    }

    #[test]
    fn indexes_members() {
        let membership = Membership::new(&labels(&[0, -1, 1, 0]), 3);
        assert_eq!(membership.members(0), &[0, 3]);
        assert_eq!(membership.members(1), &[2]);
        assert!(membership.members(2).is_empty());
        assert_eq!(membership.cluster(1), None);
    }

    #[test]
    fn moves_keep_slots_consistent() {
        let mut membership = Membership::new(&labels(&[0, 0, 0, 1]), 2);
        assert_eq!(membership.remove(0), Some(0));
        assert_eq!(membership.remove(0), None);
        membership.insert(0, 1);
        assert_eq!(membership.remove(2), Some(0));
        let mut zero = membership.members(0).to_vec();
        zero.sort();
        assert_eq!(zero, vec![1]);
        let mut one = membership.members(1).to_vec();
        one.sort();
        assert_eq!(one, vec![0, 3]);
        for c in 0..2 {
            for &i in membership.members(c) {
                assert_eq!(membership.cluster(i), Some(c));
            }
        }
    }

    #[test]
    fn empties_cluster() {
        let mut membership = Membership::new(&labels(&[0, 1]), 2);
        membership.remove(0);
        assert!(membership.members(0).is_empty());
    }
}
