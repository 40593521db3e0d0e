//! Data source implementations

pub mod department;

pub use department::DepartmentDataSource;
