use crate::point::Point2;

/// Geographic extent given by its northwest and southeast corners, in a y-up coordinate system.
///
/// A new `Bounds` is empty. The first call to [`Bounds::extend`] seeds both corners with the
/// given point, every following call grows the box so that it also covers the new point. The
/// corners are kept normalized: `nw.x <= se.x` and `nw.y >= se.y`.
///
/// ```
/// use cartouche_types::Bounds;
///
/// let mut bounds = Bounds::new();
/// bounds.extend(10.0, 10.0);
/// bounds.extend(0.0, 0.0);
///
/// assert_eq!(bounds.width(), 10.0);
/// assert_eq!(bounds.nw().y, 10.0);
/// assert_eq!(bounds.se().y, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    nw: Point2,
    se: Point2,
    is_empty: bool,
}

impl Bounds {
    /// Creates an empty extent.
    pub fn new() -> Self {
        Self {
            nw: Point2::origin(),
            se: Point2::origin(),
            is_empty: true,
        }
    }

    /// Builds the extent covering two corner points, given in any order.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let mut bounds = Self::new();
        bounds.extend(x1, y1);
        bounds.extend(x2, y2);
        bounds
    }

    /// Grows the extent to include the point `(x, y)`.
    pub fn extend(&mut self, x: f64, y: f64) {
        if self.is_empty {
            self.nw = Point2::new(x, y);
            self.se = Point2::new(x, y);
            self.is_empty = false;
            return;
        }

        self.nw.x = self.nw.x.min(x);
        self.nw.y = self.nw.y.max(y);
        self.se.x = self.se.x.max(x);
        self.se.y = self.se.y.min(y);
    }

    /// Returns true if no point was added yet.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Northwest (top-left) corner.
    pub fn nw(&self) -> Point2 {
        self.nw
    }

    /// Southeast (bottom-right) corner.
    pub fn se(&self) -> Point2 {
        self.se
    }

    /// Horizontal size of the extent.
    pub fn width(&self) -> f64 {
        self.se.x - self.nw.x
    }

    /// Vertical size of the extent.
    pub fn height(&self) -> f64 {
        self.nw.y - self.se.y
    }

    /// Returns true if the point is inside the extent or on its border.
    pub fn contains(&self, point: &Point2) -> bool {
        !self.is_empty
            && self.nw.x <= point.x
            && self.se.x >= point.x
            && self.se.y <= point.y
            && self.nw.y >= point.y
    }

    /// Returns the common part of two extents, if they overlap.
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        if self.is_empty || other.is_empty {
            return None;
        }

        let min_x = self.nw.x.max(other.nw.x);
        let max_x = self.se.x.min(other.se.x);
        let min_y = self.se.y.max(other.se.y);
        let max_y = self.nw.y.min(other.nw.y);

        if min_x >= max_x || min_y >= max_y {
            return None;
        }

        Some(Self::from_corners(max_x, max_y, min_x, min_y))
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_extend_seeds_both_corners() {
        let mut bounds = Bounds::new();
        assert!(bounds.is_empty());

        bounds.extend(3.0, 4.0);
        assert!(!bounds.is_empty());
        assert_eq!(bounds.nw(), Point2::new(3.0, 4.0));
        assert_eq!(bounds.se(), Point2::new(3.0, 4.0));
        assert_eq!(bounds.width(), 0.0);
        assert_eq!(bounds.height(), 0.0);
    }

    #[test]
    fn corners_are_normalized() {
        let cases = [
            (10.0, 10.0, 0.0, 0.0),
            (0.0, 0.0, 10.0, 10.0),
            (0.0, 10.0, 10.0, 0.0),
            (-179.231086, 17.831509, -100.859681, 71.441059),
        ];

        for (x1, y1, x2, y2) in cases {
            let bounds = Bounds::from_corners(x1, y1, x2, y2);
            assert!(bounds.nw().x <= bounds.se().x);
            assert!(bounds.nw().y >= bounds.se().y);
            assert!(bounds.width() >= 0.0);
            assert!(bounds.height() >= 0.0);
        }
    }

    #[test]
    fn north_is_up() {
        let bounds = Bounds::from_corners(10.0, 10.0, 0.0, 0.0);
        assert_eq!(bounds.nw(), Point2::new(0.0, 10.0));
        assert_eq!(bounds.se(), Point2::new(10.0, 0.0));
    }

    #[test]
    fn contains_border() {
        let bounds = Bounds::from_corners(10.0, 10.0, 0.0, 0.0);
        assert!(bounds.contains(&Point2::new(0.0, 0.0)));
        assert!(bounds.contains(&Point2::new(5.0, 10.0)));
        assert!(!bounds.contains(&Point2::new(10.1, 5.0)));
        assert!(!Bounds::new().contains(&Point2::origin()));
    }

    #[test]
    fn intersection() {
        let a = Bounds::from_corners(10.0, 10.0, 0.0, 0.0);
        let b = Bounds::from_corners(15.0, 15.0, 5.0, 5.0);
        let common = a.intersection(&b).unwrap();
        assert_eq!(common, Bounds::from_corners(5.0, 5.0, 10.0, 10.0));

        let far = Bounds::from_corners(20.0, 20.0, 30.0, 30.0);
        assert!(a.intersection(&far).is_none());
        assert!(a.intersection(&Bounds::new()).is_none());
    }
}
