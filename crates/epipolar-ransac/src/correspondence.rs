use std::ops::Index;

use glam::{DVec2, DVec3};

use crate::error::CorrespondenceError;

/// A matched pair of image coordinates: `x1` in the first image, `x2` in the second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Point in the first image.
    pub x1: DVec2,
    /// Point in the second image.
    pub x2: DVec2,
}

impl Correspondence {
    /// Create a correspondence from its four coordinates.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: DVec2::new(x1, y1),
            x2: DVec2::new(x2, y2),
        }
    }

    /// The coordinates as `[x1, y1, x2, y2]`.
    pub fn as_array(&self) -> [f64; 4] {
        [self.x1.x, self.x1.y, self.x2.x, self.x2.y]
    }

    /// Homogeneous coordinates of the first point.
    pub fn homogeneous1(&self) -> DVec3 {
        self.x1.extend(1.0)
    }

    /// Homogeneous coordinates of the second point.
    pub fn homogeneous2(&self) -> DVec3 {
        self.x2.extend(1.0)
    }
}

impl From<[f64; 4]> for Correspondence {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// Ordered list of correspondences for one image pair.
///
/// The order is kept stable so that sampling with a fixed seed is reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrespondenceSet {
    matches: Vec<Correspondence>,
}

impl CorrespondenceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with room for `capacity` correspondences.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            matches: Vec::with_capacity(capacity),
        }
    }

    /// Build a set by zipping points of the first and second image.
    ///
    /// Example:
    ///
    /// ```
    /// use epipolar_ransac::CorrespondenceSet;
    ///
    /// let set = CorrespondenceSet::from_points(&[[0.0, 1.0]], &[[2.0, 3.0]]).unwrap();
    /// assert_eq!(set[0].as_array(), [0.0, 1.0, 2.0, 3.0]);
    /// ```
    pub fn from_points(x1: &[[f64; 2]], x2: &[[f64; 2]]) -> Result<Self, CorrespondenceError> {
        if x1.len() != x2.len() {
            return Err(CorrespondenceError::MismatchedLengths {
                left: x1.len(),
                right: x2.len(),
            });
        }
        Ok(x1
            .iter()
            .zip(x2.iter())
            .map(|(p1, p2)| Correspondence::new(p1[0], p1[1], p2[0], p2[1]))
            .collect())
    }

    /// Append a correspondence.
    pub fn push(&mut self, correspondence: Correspondence) {
        self.matches.push(correspondence);
    }

    /// Number of correspondences.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Correspondence at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Correspondence> {
        self.matches.get(index)
    }

    /// Iterate over the correspondences in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Correspondence> {
        self.matches.iter()
    }

    /// Borrow the correspondences as a slice.
    pub fn as_slice(&self) -> &[Correspondence] {
        &self.matches
    }
}

impl Index<usize> for CorrespondenceSet {
    type Output = Correspondence;

    fn index(&self, index: usize) -> &Correspondence {
        &self.matches[index]
    }
}

impl FromIterator<Correspondence> for CorrespondenceSet {
    fn from_iter<I: IntoIterator<Item = Correspondence>>(iter: I) -> Self {
        Self {
            matches: iter.into_iter().collect(),
        }
    }
}

impl Extend<Correspondence> for CorrespondenceSet {
    fn extend<I: IntoIterator<Item = Correspondence>>(&mut self, iter: I) {
        self.matches.extend(iter);
    }
}

impl From<Vec<Correspondence>> for CorrespondenceSet {
    fn from(matches: Vec<Correspondence>) -> Self {
        Self { matches }
    }
}

impl<'a> IntoIterator for &'a CorrespondenceSet {
    type Item = &'a Correspondence;
    type IntoIter = std::slice::Iter<'a, Correspondence>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

/// Correspondences between two images, tagged with the indices of both images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagePairMatches {
    /// Index of the first image.
    pub image1_index: usize,
    /// Index of the second image.
    pub image2_index: usize,
    /// Matched points between both images.
    pub matches: CorrespondenceSet,
}

impl ImagePairMatches {
    /// Tag a correspondence set with its image indices.
    pub fn new(image1_index: usize, image2_index: usize, matches: CorrespondenceSet) -> Self {
        Self {
            image1_index,
            image2_index,
            matches,
        }
    }
}
