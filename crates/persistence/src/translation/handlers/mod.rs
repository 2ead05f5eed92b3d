//! Filter handlers, one per leaf criteria kind.
//!
//! Each module translates a criteria node into one native filter clause.

pub mod attribute;
pub mod range;
pub mod spatial;
