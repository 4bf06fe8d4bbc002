pub mod comparator;
pub mod index;
