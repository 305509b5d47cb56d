use crate::geo::LatLng;

/// Geographic bounding box (south-west / north-east corners).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        LatLngBounds {
            south_west,
            north_east,
        }
    }

    pub fn from_point(p: LatLng) -> Self {
        LatLngBounds::new(p, p)
    }

    /// Smallest box covering every point, or `None` for an empty input.
    pub fn from_points(points: impl IntoIterator<Item = LatLng>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = LatLngBounds::from_point(first);
        for p in iter {
            out.extend(p);
        }
        Some(out)
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.extend(other.south_west);
        out.extend(other.north_east);
        out
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.north_east.lat, self.south_west.lng)
    }

    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.south_west.lat, self.north_east.lng)
    }
}

/// Folds a sequence of optional boxes into their union.
pub fn union_all(boxes: impl IntoIterator<Item = LatLngBounds>) -> Option<LatLngBounds> {
    boxes.into_iter().reduce(|acc, b| acc.union(&b))
}

#[cfg(test)]
mod tests {
    use super::{LatLngBounds, union_all};
    use crate::geo::LatLng;

    #[test]
    fn from_points_covers_all() {
        let b = LatLngBounds::from_points([
            LatLng::new(10.0, 5.0),
            LatLng::new(-2.0, 7.0),
            LatLng::new(4.0, -3.0),
        ])
        .expect("non-empty");
        assert_eq!(b.south_west, LatLng::new(-2.0, -3.0));
        assert_eq!(b.north_east, LatLng::new(10.0, 7.0));
        assert_eq!(b.center(), LatLng::new(4.0, 2.0));
    }

    #[test]
    fn empty_input_has_no_bounds() {
        assert!(LatLngBounds::from_points(std::iter::empty()).is_none());
        assert!(union_all(std::iter::empty()).is_none());
    }

    #[test]
    fn union_contains_both() {
        let a = LatLngBounds::from_point(LatLng::new(0.0, 0.0));
        let b = LatLngBounds::from_point(LatLng::new(5.0, 5.0));
        let u = a.union(&b);
        assert!(u.contains(LatLng::new(2.5, 2.5)));
        assert!(!u.contains(LatLng::new(6.0, 2.5)));
    }
}
