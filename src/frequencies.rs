//! Requested wavelength bands and the first-match bookkeeping used when
//! picking table rows and result links.

/// AIA channels grabbed when no list is given.
pub const DEFAULT_BANDS: [u32; 6] = [94, 335, 193, 131, 171, 211];

/// An ordered, duplicate free list of requested wavelengths (in Ångström).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frequencies(Vec<u32>);

impl Frequencies {
    pub fn new(bands: impl IntoIterator<Item = u32>) -> Self {
        let mut unique: Vec<u32> = vec![];
        for band in bands {
            if !unique.contains(&band) {
                unique.push(band);
            }
        }
        Self(unique)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A fresh working copy for one matching pass.
    pub fn remaining(&self) -> Remaining {
        Remaining(self.0.clone())
    }
}

impl Default for Frequencies {
    fn default() -> Self {
        Self::new(DEFAULT_BANDS)
    }
}

/// Frequencies not yet matched during a single pass. Each one can be taken once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remaining(Vec<u32>);

impl Remaining {
    /// Removes `band` if it is still pending; returns whether it was.
    pub fn take(&mut self, band: u32) -> bool {
        match self.0.iter().position(|&b| b == band) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes and returns the first pending band accepted by `pred`.
    pub fn take_first(&mut self, pred: impl Fn(u32) -> bool) -> Option<u32> {
        let index = self.0.iter().position(|&b| pred(b))?;
        Some(self.0.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}
