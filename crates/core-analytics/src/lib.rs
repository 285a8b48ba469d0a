//! Secondary analytics over live series: anomaly detection, clustering,
//! forecasting, and a small predicate-filter language.
//!
//! All of it is plain numeric code on slices; nothing here touches the
//! per-tick pipeline. The driver samples series (particle counts, CPU
//! load, bound column values) and calls in between frames.

pub mod anomaly;
pub mod cluster;
pub mod forecast;
pub mod query;
pub mod stats;

pub use anomaly::{Anomaly, detect_moving_avg, detect_zscore};
pub use cluster::{Cluster, Clustering, kmeans};
pub use forecast::{Forecast, exponential, linear};
pub use query::{Point, Query};
