//! Anomaly detection detectors
//!
//! # Architecture
//!
//! - [`path`] - Expands the REST path templates
//! - [`normalize`] - Strips server-injected defaults before comparison
//! - [`ops`] - Create/get/update/delete calls against the detector API
//! - [`resource`] - The declarative resource wired onto those calls
//!
//! # Example
//!
//! ```ignore
//! use esdetector::detector::DetectorResource;
//! use esdetector::schema::{ResourceData, ResourceLifecycle};
//!
//! async fn create(ctx: &esdetector::es::ProviderContext, body: &str) -> esdetector::es::Result<String> {
//!     let mut d = ResourceData::default();
//!     d.set("body", body);
//!     DetectorResource::new().create(&mut d, ctx).await?;
//!     Ok(d.id().to_string())
//! }
//! ```

pub mod normalize;
pub mod ops;
pub mod path;
pub mod resource;

pub use normalize::{normalize_detector, normalize_json_string};
pub use ops::{
    delete_detector, detector_exists, get_detector, post_detector, put_detector, DetectorResponse,
};
pub use resource::{DetectorResource, BODY, RESOURCE_TYPE};
