//! Declarative management of OpenDistro anomaly detection detectors.
//!
//! A detector is declared as a JSON body. [`detector::DetectorResource`]
//! maps the create/read/update/delete lifecycle onto the detector REST API
//! and keeps a [`schema::ResourceData`] record in sync with the server copy.

pub mod config;
pub mod detector;
pub mod es;
pub mod host;
pub mod schema;
pub mod state;
