//! Spatial filter handler.

use serde_json::{Value, json};

use crate::error::{TranslationError, TranslationResult};
use crate::query::{Comparand, ComparisonOperator, Geometry, SpatialCriteria};

/// Builds a geo filter for an `in` comparison against a geometry.
pub fn build_filter(criteria: &SpatialCriteria) -> TranslationResult<Value> {
    let path = criteria.attribute_path();
    let comparison = criteria.comparison();

    if comparison.operator() != ComparisonOperator::In {
        return Err(TranslationError::UnsupportedSpatialOperator {
            attribute_path: path.to_string(),
            operator: comparison.operator().to_string(),
        });
    }

    let geometry = match comparison.comparand() {
        Comparand::Geometry(geometry) => geometry,
        Comparand::Scalar(_) | Comparand::List(_) => {
            return Err(TranslationError::UnsupportedGeometryType {
                attribute_path: path.to_string(),
                message: "comparand is not a geometry".to_string(),
            });
        }
    };

    let filter = match geometry {
        Geometry::Circle(circle) => json!({
            "geo_distance": {
                "distance": circle.radius(),
                path: circle.center().to_string()
            }
        }),
        Geometry::Annulus(annulus) => json!({
            "geo_distance_range": {
                "from": annulus.inner_radius(),
                "to": annulus.outer_radius(),
                path: annulus.center().to_string()
            }
        }),
        Geometry::Box(bounding_box) => json!({
            "geo_bounding_box": {
                path: {
                    "top_left": bounding_box.top_left().to_string(),
                    "bottom_right": bounding_box.bottom_right().to_string()
                }
            }
        }),
        Geometry::Polygon(polygon) => {
            let points: Vec<String> = polygon.points().iter().map(ToString::to_string).collect();
            json!({ "geo_polygon": { path: { "points": points } } })
        }
    };

    Ok(filter)
}
