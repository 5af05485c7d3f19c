//! Light volume geometry — cone signed distance field and its soft edge.

pub mod cone;
pub mod shape;
