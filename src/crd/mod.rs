//! Fleet custom resources read by the admission webhooks.
//!
//! - `ClusterResourcePlacement` / `ResourcePlacement`: where resources go
//! - `MemberCluster`: a cluster that joined the fleet
//! - `ClusterResourceOverride`, `ClusterResourcePlacementEviction`,
//!   `ClusterResourcePlacementDisruptionBudget`: placement companions

mod member_cluster;
mod placement;
mod placement_policy;

pub use member_cluster::*;
pub use placement::*;
pub use placement_policy::*;
