/// An ordered, immutable sequence of image identifiers forming one navigable
/// series.
///
/// The derived key distinguishes a stack replacement from an in-place index
/// change: two stacks over the same identifiers in the same order compare
/// equal by key.
#[derive(Clone, Debug)]
pub struct Stack {
    ids: Vec<String>,
    key: String,
}

impl Stack {
    pub fn new(ids: Vec<String>) -> Self {
        let key = ids.join("|");
        Self { ids, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    /// Clamps a signed index into `[0, len - 1]`. Empty stacks clamp to 0.
    pub fn clamp_index(&self, index: i64) -> usize {
        if self.ids.is_empty() {
            return 0;
        }
        index.clamp(0, self.ids.len() as i64 - 1) as usize
    }

    /// Indices within `window` slices of `index`, intersected with the valid
    /// range. The anchor comes first, then neighbours ordered by distance,
    /// next slice before previous.
    pub fn neighbors(&self, index: usize, window: usize) -> Vec<usize> {
        let len = self.ids.len() as i64;
        let anchor = index as i64;
        let mut offsets = vec![0i64];
        for distance in 1..=window as i64 {
            offsets.push(distance);
            offsets.push(-distance);
        }
        offsets
            .into_iter()
            .map(|offset| anchor + offset)
            .filter(|&i| i >= 0 && i < len)
            .map(|i| i as usize)
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Stack {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}
