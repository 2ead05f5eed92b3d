//! Geometries used by spatial criteria.

use std::fmt;

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Point {
    /// Creates a point.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Renders as `"lat,lon"`, the string form the engine accepts for geo points.
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// A circle around a center point. Radii carry their unit, e.g. `"10km"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    center: Point,
    radius: String,
}

impl Circle {
    /// Creates a circle.
    pub fn new(center: Point, radius: impl Into<String>) -> Self {
        Self {
            center,
            radius: radius.into(),
        }
    }

    /// Center point.
    pub fn center(&self) -> Point {
        self.center
    }

    /// Radius with unit.
    pub fn radius(&self) -> &str {
        &self.radius
    }
}

/// The ring between two circles sharing a center.
#[derive(Debug, Clone, PartialEq)]
pub struct Annulus {
    center: Point,
    inner_radius: String,
    outer_radius: String,
}

impl Annulus {
    /// Creates an annulus.
    pub fn new(center: Point, inner_radius: impl Into<String>, outer_radius: impl Into<String>) -> Self {
        Self {
            center,
            inner_radius: inner_radius.into(),
            outer_radius: outer_radius.into(),
        }
    }

    /// Center point.
    pub fn center(&self) -> Point {
        self.center
    }

    /// Radius of the excluded inner circle.
    pub fn inner_radius(&self) -> &str {
        &self.inner_radius
    }

    /// Radius of the outer circle.
    pub fn outer_radius(&self) -> &str {
        &self.outer_radius
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    top_left: Point,
    bottom_right: Point,
}

impl BoundingBox {
    /// Creates a box from two corners.
    pub fn new(top_left: Point, bottom_right: Point) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Top left corner.
    pub fn top_left(&self) -> Point {
        self.top_left
    }

    /// Bottom right corner.
    pub fn bottom_right(&self) -> Point {
        self.bottom_right
    }
}

/// A polygon given by its ordered vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Vertices in order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// Any geometry a spatial criteria can test against.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A circle.
    Circle(Circle),
    /// A ring.
    Annulus(Annulus),
    /// A bounding box.
    Box(BoundingBox),
    /// A polygon.
    Polygon(Polygon),
}

impl From<Circle> for Geometry {
    fn from(circle: Circle) -> Self {
        Geometry::Circle(circle)
    }
}

impl From<Annulus> for Geometry {
    fn from(annulus: Annulus) -> Self {
        Geometry::Annulus(annulus)
    }
}

impl From<BoundingBox> for Geometry {
    fn from(bounding_box: BoundingBox) -> Self {
        Geometry::Box(bounding_box)
    }
}

impl From<Polygon> for Geometry {
    fn from(polygon: Polygon) -> Self {
        Geometry::Polygon(polygon)
    }
}
