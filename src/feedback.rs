use educe::Educe;
use thiserror::Error;

use crate::framework::RoutingSystem;

/// Contract violations by the surrounding framework, plus codec failures at
/// the serialization boundary. None of these occur in the normal operation
/// envelope; a host may treat them as fatal.
#[derive(Error)]
#[derive(Educe)]
#[educe(Debug)]
pub enum RoutingError<T: RoutingSystem + ?Sized> {
    /// A link event or routing packet referenced a port with no neighbour bound to it.
    #[error("no neighbour is bound to local port {port:?}")]
    UnknownPort { port: T::Port },
    /// An advertisement arrived from an address without a neighbour entry.
    #[error("no neighbour entry exists for advertisement sender {addr:?}")]
    UnknownNeighbour { addr: T::NodeAddress },
    /// An advertisement payload could not be encoded or decoded.
    #[error("malformed advertisement payload")]
    Codec(#[from] serde_json::Error),
}
