use serde::{Deserialize, Serialize};

use crate::framework::RoutingSystem;

/// One directly attached link. Keyed in the router by the neighbour's
/// address; created on link-up and removed on link-down.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Neighbour<T: RoutingSystem + ?Sized> {
    /// the local port the link is attached to, the pair (port, addr) should be unique
    pub port: T::Port,
    /// Direct link-cost to this neighbour. Lower is better.
    pub link_cost: u16,
}
