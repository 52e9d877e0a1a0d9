use chb_core::*;

/// Cluster state of one fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    #[default]
    Unassigned,
    Bin(Bin),
}

impl Label {
    pub fn bin(&self) -> Option<Bin> {
        match self {
            Self::Unassigned => None,
            Self::Bin(c) => Some(*c),
        }
    }
    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Bin(_))
    }
}

impl From<Label> for i64 {
    fn from(label: Label) -> Self {
        match label {
            Label::Unassigned => UNASSIGNED,
            Label::Bin(c) => c as i64,
        }
    }
}

impl TryFrom<i64> for Label {
    type Error = i64;
    /// Accepts the unassigned sentinel or a non-negative cluster id.
    fn try_from(value: i64) -> std::result::Result<Self, i64> {
        match value {
            UNASSIGNED => Ok(Self::Unassigned),
            c if c >= 0 => Ok(Self::Bin(c as Bin)),
            bad => Err(bad),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

/// Labels of every fragment, indexed by sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn get(&self, i: Sample) -> Label {
        self.0[i]
    }
    pub fn set(&mut self, i: Sample, label: Label) {
        self.0[i] = label;
    }
    pub fn iter(&self) -> impl Iterator<Item = &Label> + '_ {
        self.0.iter()
    }

    /// Number of clusters implied by the largest assigned id.
    pub fn k(&self) -> usize {
        self.0
            .iter()
            .filter_map(Label::bin)
            .max()
            .map(|c| c + 1)
            .unwrap_or(0)
    }

    /// Samples currently without a cluster, in index order.
    pub fn unassigned(&self) -> Vec<Sample> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.is_assigned())
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of positions where two label vectors disagree.
    pub fn changes(&self, other: &Self) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Cluster ids of every sample, failing on the first unassigned one.
    pub fn bins(&self) -> Result<Vec<Bin>> {
        let unassigned = self.unassigned();
        match unassigned.first() {
            Some(&first) => Err(Error::Unassigned {
                count: unassigned.len(),
                first,
            }),
            None => Ok(self.0.iter().filter_map(Label::bin).collect()),
        }
    }
}

impl From<Vec<Label>> for Labels {
    fn from(labels: Vec<Label>) -> Self {
        Self(labels)
    }
}

impl From<Labels> for Vec<Label> {
    fn from(labels: Labels) -> Self {
        labels.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_round_trip() {
        assert_eq!(Label::try_from(-1), Ok(Label::Unassigned));
        assert_eq!(Label::try_from(4), Ok(Label::Bin(4)));
        assert_eq!(Label::try_from(-2), Err(-2));
        assert_eq!(i64::from(Label::Unassigned), -1);
        assert_eq!(Label::Bin(3).to_string(), "3");
    }

    #[test]
    fn counts_clusters() {
        let labels = Labels::from(vec![Label::Unassigned, Label::Bin(2), Label::Bin(0)]);
        assert_eq!(labels.k(), 3);
        assert_eq!(labels.unassigned(), vec![0]);
        assert!(matches!(
            labels.bins(),
            Err(Error::Unassigned { count: 1, first: 0 })
        ));
        assert_eq!(Labels::from(vec![Label::Unassigned]).k(), 0);
    }
}
