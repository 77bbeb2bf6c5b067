//! Product matching and loan economics engine for secured lending quotes.
//!
//! The crate turns {criteria answers, loan parameters, a rate catalog, a
//! runtime pricing overlay} into an ordered set of eligible products with
//! computed figures. Catalog and criteria ingestion normalize the
//! heterogeneous source data once; the matching and calculation core only
//! ever sees canonical records and never performs I/O.

pub mod catalog;
pub mod config;
pub mod criteria;
pub mod error;
pub mod overlay;
pub mod quoting;
pub mod telemetry;
