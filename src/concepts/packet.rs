use std::collections::HashMap;

use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::feedback::RoutingError;
use crate::framework::RoutingSystem;

/// Discriminates data-plane traffic from routing control traffic.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PacketKind {
    /// host traffic, forwarded hop by hop without inspection of the content
    Traceroute,
    /// carries an encoded [`Advertisement`] between direct neighbours
    Routing,
}

#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[serde(bound = "")]
pub struct Packet<T: RoutingSystem + ?Sized> {
    pub kind: PacketKind,
    pub src: T::NodeAddress,
    pub dst: T::NodeAddress,
    /// opaque payload; the encoded advertisement for routing packets
    pub content: String,
}

impl<T: RoutingSystem + ?Sized> Packet<T> {
    pub fn traceroute(src: T::NodeAddress, dst: T::NodeAddress, content: String) -> Self {
        Packet {
            kind: PacketKind::Traceroute,
            src,
            dst,
            content,
        }
    }

    pub fn routing(
        src: T::NodeAddress,
        dst: T::NodeAddress,
        advert: &Advertisement<T>,
    ) -> Result<Self, RoutingError<T>> {
        Ok(Packet {
            kind: PacketKind::Routing,
            src,
            dst,
            content: advert.encode()?,
        })
    }
}

/// A single destination as advertised to one neighbour.
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[serde(bound = "")]
pub struct RouteUpdate<T: RoutingSystem + ?Sized> {
    /// the advertised metric, FFFF hexadecimal (infinity) when masked or unreachable
    pub metric: u16,
    /// the advertiser's own next hop for this destination
    pub next_hop: Option<T::NodeAddress>,
}

/// The full distance vector sent to one neighbour: a snapshot of the sender's
/// table after poison-reverse masking, never a diff. Exists only between
/// encoding and decoding.
#[serde_as]
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[serde(bound = "")]
pub struct Advertisement<T: RoutingSystem + ?Sized> {
    #[serde_as(as = "Vec<(_, _)>")]
    pub routes: HashMap<T::NodeAddress, RouteUpdate<T>>,
}

impl<T: RoutingSystem + ?Sized> Advertisement<T> {
    /// Encodes to opaque text. `decode(encode(m)) == m` holds for every
    /// well-formed vector; the engine never looks inside the text.
    pub fn encode(&self) -> Result<String, RoutingError<T>> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(content: &str) -> Result<Self, RoutingError<T>> {
        Ok(serde_json::from_str(content)?)
    }
}

/// A packet queued for egress; the surrounding framework drains the queue
/// and performs the actual delivery.
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()))]
#[serde(bound = "")]
pub struct OutboundPacket<T: RoutingSystem + ?Sized> {
    /// send over this local port
    pub port: T::Port,
    /// the neighbour attached to that port
    pub dest: T::NodeAddress,
    pub packet: Packet<T>,
}
