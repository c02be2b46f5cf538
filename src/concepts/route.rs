use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::framework::RoutingSystem;
use crate::router::INF;

/// One forwarding-table entry. Entries are never removed from the table,
/// only driven to [`Route::unreachable`], so a destination that was lost
/// stays known and is still advertised at infinite cost.
///
/// Invariant: `next_hop` and `port` are both present or both absent, and
/// they are absent exactly when the metric is infinite.
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[serde(bound = "")]
pub struct Route<T: RoutingSystem + ?Sized> {
    /// the metric of this route, or FFFF hexadecimal (infinity) for an unreachable destination
    pub metric: u16,
    /// the next-hop address of this route
    pub next_hop: Option<T::NodeAddress>,
    /// the local egress port towards the next hop
    pub port: Option<T::Port>,
}

impl<T: RoutingSystem + ?Sized> Route<T> {
    /// A route through a neighbour; also the shape of a direct route, where
    /// the next hop is the destination itself.
    pub fn via(next_hop: T::NodeAddress, port: T::Port, metric: u16) -> Self {
        Route {
            metric,
            next_hop: Some(next_hop),
            port: Some(port),
        }
    }

    /// The tombstone for a lost destination.
    pub fn unreachable() -> Self {
        Route {
            metric: INF,
            next_hop: None,
            port: None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.metric != INF
    }
}
