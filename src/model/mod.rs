pub mod metadata;
pub mod report;
pub mod unit;

pub use metadata::{MetadataGraph, MetadataObject, Property, PropertySet};
pub use report::{
    CategoryGroup, ClassificationKey, ElementGroup, Quantities, TakeoffReport, TypeGroup, NO_TAG,
};
pub use unit::UnitKind;
