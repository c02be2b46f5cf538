use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::serde_as;

use crate::concepts::neighbour::Neighbour;
use crate::concepts::packet::{Advertisement, OutboundPacket, Packet, PacketKind, RouteUpdate};
use crate::concepts::route::Route;
use crate::feedback::RoutingError;
use crate::framework::RoutingSystem;
use crate::util::sum_inf;

pub const INF: u16 = 0xFFFF;

/// The per-node routing engine: neighbour table, forwarding table and the
/// event handlers the framework drives. I/O free; outbound packets are
/// queued on [`Router::outbound_packets`] for the framework to deliver, and
/// time only advances when [`Router::handle_time`] is called.
#[serde_as]
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Router<T: RoutingSystem + ?Sized> {
    /// Addr, Neighbour
    #[serde_as(as = "Vec<(_, _)>")]
    pub neighbours: HashMap<T::NodeAddress, Neighbour<T>>,
    /// the neighbour address currently bound to each local port
    #[serde_as(as = "Vec<(_, _)>")]
    pub ports: HashMap<T::Port, T::NodeAddress>,
    /// Dest, Route. Entries are tombstoned on loss, never removed.
    #[serde_as(as = "Vec<(_, _)>")]
    pub routes: HashMap<T::NodeAddress, Route<T>>,
    pub address: T::NodeAddress,
    pub outbound_packets: Vec<OutboundPacket<T>>,
    pub heartbeat_interval: u64,
    pub last_broadcast: u64,
}

impl<T: RoutingSystem + ?Sized> Router<T> {
    pub fn new(address: T::NodeAddress, heartbeat_interval: u64) -> Self {
        Self {
            neighbours: HashMap::new(),
            ports: HashMap::new(),
            routes: HashMap::new(),
            address,
            outbound_packets: Vec::new(),
            heartbeat_interval,
            last_broadcast: 0,
        }
    }

    // region Event handlers

    /// Handles a single packet delivered by the framework. Traceroute
    /// packets are forwarded (or silently dropped when no route exists);
    /// routing packets must arrive on a bound port from a known neighbour
    /// and are relaxed into the forwarding table.
    pub fn handle_packet(
        &mut self,
        port: &T::Port,
        packet: &Packet<T>,
    ) -> Result<(), RoutingError<T>> {
        match packet.kind {
            PacketKind::Traceroute => {
                self.forward_packet(packet);
                Ok(())
            }
            PacketKind::Routing => {
                if !self.ports.contains_key(port) {
                    return Err(RoutingError::UnknownPort { port: port.clone() });
                }
                let advert = Advertisement::decode(&packet.content)?;
                self.handle_route_update(&packet.src, &advert)
            }
        }
    }

    /// Attaches a neighbour, or re-costs an existing link. If the direct
    /// route differs from what the table holds, it is installed over
    /// whatever was there and announced immediately rather than waiting for
    /// the next heartbeat.
    pub fn handle_new_link(
        &mut self,
        port: &T::Port,
        addr: &T::NodeAddress,
        link_cost: u16,
    ) -> Result<(), RoutingError<T>> {
        debug!(
            "link up on port {} to {} at cost {link_cost}",
            json!(port),
            json!(addr)
        );
        self.ports.insert(port.clone(), addr.clone());
        self.neighbours.insert(
            addr.clone(),
            Neighbour {
                port: port.clone(),
                link_cost,
            },
        );
        let current = self.routes.get(addr);
        if !current.is_some_and(|route| route.metric == link_cost) {
            self.routes
                .insert(addr.clone(), Route::via(addr.clone(), port.clone(), link_cost));
            self.broadcast_routes()?;
        }
        Ok(())
    }

    /// Detaches the neighbour bound to `port` and tombstones every route
    /// that egressed through it. No re-routing through survivors is
    /// attempted here; recovery only arrives with later advertisements.
    pub fn handle_remove_link(&mut self, port: &T::Port) -> Result<(), RoutingError<T>> {
        let addr = self
            .ports
            .remove(port)
            .ok_or_else(|| RoutingError::UnknownPort { port: port.clone() })?;
        debug!("link down on port {} to {}", json!(port), json!(addr));
        self.neighbours.remove(&addr);
        for route in self.routes.values_mut() {
            if route.port.as_ref() == Some(port) {
                *route = Route::unreachable();
            }
        }
        self.broadcast_routes()
    }

    /// Heartbeat poll against an externally supplied monotonic clock. Only
    /// this handler moves `last_broadcast`; the immediate broadcasts from
    /// link events leave the gate untouched.
    pub fn handle_time(&mut self, now: u64) -> Result<(), RoutingError<T>> {
        if now.saturating_sub(self.last_broadcast) >= self.heartbeat_interval {
            self.last_broadcast = now;
            self.broadcast_routes()?;
        }
        Ok(())
    }

    // endregion

    // region Forwarding

    fn forward_packet(&mut self, packet: &Packet<T>) {
        match self.routes.get(&packet.dst) {
            Some(Route {
                metric,
                next_hop: Some(hop),
                port: Some(egress),
            }) if *metric < INF => {
                self.outbound_packets.push(OutboundPacket {
                    port: egress.clone(),
                    dest: hop.clone(),
                    packet: packet.clone(),
                });
            }
            _ => {
                trace!("no route to {}, dropping packet", json!(packet.dst));
            }
        }
    }

    // endregion

    // region Route table

    /// Bellman-Ford relaxation against one neighbour's advertised vector.
    /// Ties never replace the incumbent route, and a received infinite
    /// metric is skipped outright rather than invalidating anything.
    /// Never broadcasts; changes propagate with the next heartbeat.
    fn handle_route_update(
        &mut self,
        from: &T::NodeAddress,
        advert: &Advertisement<T>,
    ) -> Result<(), RoutingError<T>> {
        let neighbour = self
            .neighbours
            .get(from)
            .ok_or_else(|| RoutingError::UnknownNeighbour { addr: from.clone() })?;
        let link_cost = neighbour.link_cost;
        let port = neighbour.port.clone();
        for (dest, update) in &advert.routes {
            if update.metric == INF {
                continue;
            }
            let candidate = sum_inf(update.metric, link_cost);
            let adopt = match self.routes.get(dest) {
                Some(route) => candidate < route.metric,
                None => true,
            };
            if adopt {
                trace!(
                    "adopting route to {} via {} at metric {candidate}",
                    json!(dest),
                    json!(from)
                );
                self.routes
                    .insert(dest.clone(), Route::via(from.clone(), port.clone(), candidate));
            }
        }
        Ok(())
    }

    /// Pushes one snapshot of the table to every neighbour, applying poison
    /// reverse per recipient.
    pub fn broadcast_routes(&mut self) -> Result<(), RoutingError<T>> {
        let mut outbound = Vec::with_capacity(self.neighbours.len());
        for (addr, neighbour) in &self.neighbours {
            let advert = self.advertisement_for(addr);
            outbound.push(OutboundPacket {
                port: neighbour.port.clone(),
                dest: addr.clone(),
                packet: Packet::routing(self.address.clone(), addr.clone(), &advert)?,
            });
        }
        trace!("broadcasting routes to {} neighbours", outbound.len());
        self.outbound_packets.extend(outbound);
        Ok(())
    }

    /// Builds the distance vector for one neighbour: the full table with its
    /// true metrics, except that a route whose next hop is the recipient is
    /// masked to infinity, unless the destination is the recipient itself.
    fn advertisement_for(&self, neighbour: &T::NodeAddress) -> Advertisement<T> {
        let mut routes = HashMap::with_capacity(self.routes.len());
        for (dest, route) in &self.routes {
            let masked = route.next_hop.as_ref() == Some(neighbour) && dest != neighbour;
            routes.insert(
                dest.clone(),
                RouteUpdate {
                    metric: if masked { INF } else { route.metric },
                    next_hop: route.next_hop.clone(),
                },
            );
        }
        Advertisement { routes }
    }

    // endregion
}

impl<T: RoutingSystem + ?Sized> Display for Router<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Router(addr={:?}, table={{", self.address)?;
        let mut entries: Vec<_> = self.routes.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (i, (dest, route)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if route.is_reachable() {
                write!(f, "{:?}:{}", dest, route.metric)?;
            } else {
                write!(f, "{dest:?}:inf")?;
            }
        }
        write!(f, "}})")
    }
}
