use std::fmt::Debug;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// The host's type bindings. Implemented once per deployment; the engine is
/// generic over it and never sees concrete address or port types.
pub trait RoutingSystem {
    /// Address of the node on the routing network, MUST be globally unique
    type NodeAddress: Ord + PartialOrd + RootData + RootKey + Debug;
    /// Identifier of a local link endpoint, only meaningful on the node that owns it
    type Port: RootData + RootKey + Debug;
}

pub trait RootData: Clone + Serialize + DeserializeOwned + Sized {}
pub trait RootKey: Eq + PartialEq + Hash {}
impl<T: Eq + PartialEq + Hash> RootKey for T {}
impl<T: Clone + Serialize + DeserializeOwned + Sized> RootData for T {}
