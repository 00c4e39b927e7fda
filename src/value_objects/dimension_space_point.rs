//! Dimension space points and sets of them
//!
//! A dimension space point is one coordinate in the configured dimension space,
//! e.g. `{language: en, market: US}`. Its hash is the canonical key used for
//! persistence and fast comparison.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Immutable coordinate in the dimension space
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct DimensionSpacePoint {
    coordinates: BTreeMap<String, String>,
    hash: String,
}

impl DimensionSpacePoint {
    /// Create a point from its coordinates
    pub fn new(coordinates: BTreeMap<String, String>) -> Self {
        let hash = Self::compute_hash(&coordinates);
        Self { coordinates, hash }
    }

    /// Convenience constructor from `(dimension, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The point without any coordinates
    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    fn compute_hash(coordinates: &BTreeMap<String, String>) -> String {
        let mut hasher = blake3::Hasher::new();
        for (dimension, value) in coordinates {
            hasher.update(dimension.as_bytes());
            hasher.update(&[0]);
            hasher.update(value.as_bytes());
            hasher.update(&[0xff]);
        }
        hasher.finalize().to_hex()[..32].to_string()
    }

    /// Canonical hash of the coordinates
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// All coordinates, ordered by dimension
    pub fn coordinates(&self) -> &BTreeMap<String, String> {
        &self.coordinates
    }

    /// Coordinate value for one dimension
    pub fn coordinate(&self, dimension: &str) -> Option<&str> {
        self.coordinates.get(dimension).map(String::as_str)
    }

    /// Whether the point has no coordinates
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// A copy with one coordinate replaced
    pub fn vary(&self, dimension: &str, value: &str) -> Self {
        let mut coordinates = self.coordinates.clone();
        coordinates.insert(dimension.to_string(), value.to_string());
        Self::new(coordinates)
    }
}

impl From<BTreeMap<String, String>> for DimensionSpacePoint {
    fn from(coordinates: BTreeMap<String, String>) -> Self {
        Self::new(coordinates)
    }
}

impl From<DimensionSpacePoint> for BTreeMap<String, String> {
    fn from(point: DimensionSpacePoint) -> Self {
        point.coordinates
    }
}

impl PartialEq for DimensionSpacePoint {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for DimensionSpacePoint {}

impl Hash for DimensionSpacePoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl PartialOrd for DimensionSpacePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DimensionSpacePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coordinates.cmp(&other.coordinates)
    }
}

impl fmt::Debug for DimensionSpacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for DimensionSpacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .coordinates
            .iter()
            .map(|(dimension, value)| format!("{dimension}={value}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// A dimension space point at which a node originates
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginDimensionSpacePoint(DimensionSpacePoint);

impl OriginDimensionSpacePoint {
    /// The origin of dimension-less (root) nodes
    pub fn empty() -> Self {
        Self(DimensionSpacePoint::empty())
    }

    /// The plain point
    pub fn to_dimension_space_point(&self) -> DimensionSpacePoint {
        self.0.clone()
    }
}

impl From<DimensionSpacePoint> for OriginDimensionSpacePoint {
    fn from(point: DimensionSpacePoint) -> Self {
        Self(point)
    }
}

impl Deref for OriginDimensionSpacePoint {
    type Target = DimensionSpacePoint;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for OriginDimensionSpacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "origin{}", self.0)
    }
}

impl fmt::Display for OriginDimensionSpacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unordered, deduplicated set of points, iterated in hash order
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DimensionSpacePoint>", into = "Vec<DimensionSpacePoint>")]
pub struct DimensionSpacePointSet {
    points: BTreeMap<String, DimensionSpacePoint>,
}

impl DimensionSpacePointSet {
    /// Create a set from any collection of points
    pub fn new<I: IntoIterator<Item = DimensionSpacePoint>>(points: I) -> Self {
        Self {
            points: points
                .into_iter()
                .map(|point| (point.hash().to_string(), point))
                .collect(),
        }
    }

    /// The empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the set holds the point
    pub fn contains(&self, point: &DimensionSpacePoint) -> bool {
        self.points.contains_key(point.hash())
    }

    /// Whether the set holds the point with the given hash
    pub fn contains_hash(&self, hash: &str) -> bool {
        self.points.contains_key(hash)
    }

    /// Look up a member by hash
    pub fn get(&self, hash: &str) -> Option<&DimensionSpacePoint> {
        self.points.get(hash)
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over the points in hash order
    pub fn iter(&self) -> impl Iterator<Item = &DimensionSpacePoint> {
        self.points.values()
    }

    /// Iterate over the point hashes
    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.points.keys().map(String::as_str)
    }

    /// A copy with one more point
    pub fn with(&self, point: DimensionSpacePoint) -> Self {
        let mut points = self.points.clone();
        points.insert(point.hash().to_string(), point);
        Self { points }
    }

    /// Points in either set
    pub fn union(&self, other: &Self) -> Self {
        let mut points = self.points.clone();
        for (hash, point) in &other.points {
            points.entry(hash.clone()).or_insert_with(|| point.clone());
        }
        Self { points }
    }

    /// Points in both sets
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|(hash, _)| other.points.contains_key(*hash))
                .map(|(hash, point)| (hash.clone(), point.clone()))
                .collect(),
        }
    }

    /// Points in this set but not in `other`
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|(hash, _)| !other.points.contains_key(*hash))
                .map(|(hash, point)| (hash.clone(), point.clone()))
                .collect(),
        }
    }

    /// Whether every point of this set is in `other`
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.points.keys().all(|hash| other.points.contains_key(hash))
    }
}

impl From<Vec<DimensionSpacePoint>> for DimensionSpacePointSet {
    fn from(points: Vec<DimensionSpacePoint>) -> Self {
        Self::new(points)
    }
}

impl From<DimensionSpacePointSet> for Vec<DimensionSpacePoint> {
    fn from(set: DimensionSpacePointSet) -> Self {
        set.points.into_values().collect()
    }
}

impl FromIterator<DimensionSpacePoint> for DimensionSpacePointSet {
    fn from_iter<T: IntoIterator<Item = DimensionSpacePoint>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl IntoIterator for DimensionSpacePointSet {
    type Item = DimensionSpacePoint;
    type IntoIter = std::collections::btree_map::IntoValues<String, DimensionSpacePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_values()
    }
}

impl<'a> IntoIterator for &'a DimensionSpacePointSet {
    type Item = &'a DimensionSpacePoint;
    type IntoIter = std::collections::btree_map::Values<'a, String, DimensionSpacePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.values()
    }
}

impl fmt::Debug for DimensionSpacePointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.points.values()).finish()
    }
}

impl fmt::Display for DimensionSpacePointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.points.values().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
