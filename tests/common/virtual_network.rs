use std::collections::{BTreeMap, HashMap};

use hoplite::concepts::packet::{Advertisement, Packet, PacketKind, RouteUpdate};
use hoplite::framework::RoutingSystem;
use hoplite::router::Router;
use serde::{Deserialize, Serialize};

pub const HEARTBEAT: u64 = 100;

/// A synchronous in-memory network. Each tick delivers the packets queued in
/// the previous tick, advances the clock by one heartbeat, and flushes every
/// router's outbound queue. Traceroute packets that reach their destination
/// land in `delivered` instead of being handed back to the router.
#[derive(Serialize, Deserialize)]
pub struct VirtualSystem {
    pub routers: Vec<Router<VirtualSystem>>,
    /// node, (arrival port, packet)
    pub packets: BTreeMap<String, Vec<(i32, Packet<VirtualSystem>)>>,
    pub delivered: Vec<Packet<VirtualSystem>>,
    pub now: u64,
}

impl RoutingSystem for VirtualSystem {
    type NodeAddress = String;
    type Port = i32;
}

impl VirtualSystem {
    pub fn create(nodes: &[&str], links: &[(i32, &str, &str, u16)]) -> VirtualSystem {
        let mut network = VirtualSystem {
            routers: nodes
                .iter()
                .map(|id| Router::new(id.to_string(), HEARTBEAT))
                .collect(),
            packets: BTreeMap::new(),
            delivered: Vec::new(),
            now: 0,
        };
        for (port, a, b, metric) in links {
            network.add_edge(*port, a, b, *metric);
        }
        network
    }

    /// Attaches a link; both endpoints see the same port id.
    pub fn add_edge(&mut self, port: i32, a: &str, b: &str, metric: u16) {
        self.get_node(a)
            .handle_new_link(&port, &b.to_string(), metric)
            .unwrap();
        self.get_node(b)
            .handle_new_link(&port, &a.to_string(), metric)
            .unwrap();
        self.flush_packets();
    }

    /// Re-costs an existing link at both endpoints.
    pub fn update_edge(&mut self, port: i32, metric: u16) {
        for router in &mut self.routers {
            if let Some(peer) = router.ports.get(&port).cloned() {
                router.handle_new_link(&port, &peer, metric).unwrap();
            }
        }
        self.flush_packets();
    }

    /// Cuts a link at both endpoints. Packets still in flight over it are
    /// dropped at delivery time, like a real transport would.
    pub fn remove_edge(&mut self, port: i32) {
        for router in &mut self.routers {
            if router.ports.contains_key(&port) {
                router.handle_remove_link(&port).unwrap();
            }
        }
        self.flush_packets();
    }

    pub fn get_node(&mut self, node: &str) -> &mut Router<Self> {
        self.routers
            .iter_mut()
            .find(|r| r.address == node)
            .unwrap_or_else(|| panic!("No node {node} found"))
    }

    pub fn get_next_hop(&self, cur: &str, dest: &str) -> String {
        let router = self
            .routers
            .iter()
            .find(|r| r.address == cur)
            .unwrap_or_else(|| panic!("No node {cur} found"));
        let route = router
            .routes
            .get(dest)
            .unwrap_or_else(|| panic!("No route found to {dest}"));
        route
            .next_hop
            .clone()
            .unwrap_or_else(|| panic!("Route to {dest} has no next hop"))
    }

    pub fn get_metric_to(&self, cur: &str, dest: &str) -> u16 {
        let router = self
            .routers
            .iter()
            .find(|r| r.address == cur)
            .unwrap_or_else(|| panic!("No node {cur} found"));
        router
            .routes
            .get(dest)
            .unwrap_or_else(|| panic!("No route found to {dest}"))
            .metric
    }

    /// Queues a host-originated packet at `at`, as if the local host handed
    /// it to its own router.
    pub fn inject(&mut self, at: &str, packet: Packet<VirtualSystem>) {
        self.packets
            .entry(at.to_string())
            .or_default()
            .push((-1, packet));
    }

    pub fn flush_packets(&mut self) {
        for router in &mut self.routers {
            for outbound in router.outbound_packets.drain(..) {
                self.packets
                    .entry(outbound.dest)
                    .or_default()
                    .push((outbound.port, outbound.packet));
            }
        }
    }

    pub fn tick(&mut self) {
        let pending = std::mem::take(&mut self.packets);
        for (node, packets) in pending {
            let Some(router) = self.routers.iter_mut().find(|x| x.address == node) else {
                continue;
            };
            for (port, packet) in packets {
                if packet.kind == PacketKind::Traceroute && packet.dst == router.address {
                    self.delivered.push(packet);
                } else if packet.kind == PacketKind::Traceroute || router.ports.contains_key(&port)
                {
                    router.handle_packet(&port, &packet).unwrap();
                }
            }
        }
        self.now += HEARTBEAT;
        for router in &mut self.routers {
            router.handle_time(self.now).unwrap();
        }
        self.flush_packets();
    }

    pub fn tick_n(&mut self, times: i32) {
        for _ in 0..times {
            self.tick();
        }
    }

    pub fn freeze(&mut self) -> String {
        serde_json::to_string(&self).unwrap()
    }

    pub fn restore(state: String) -> VirtualSystem {
        serde_json::from_str(&state).unwrap()
    }
}

/// Decodes the vector carried by a routing packet, for assertions.
pub fn decode_advert(packet: &Packet<VirtualSystem>) -> HashMap<String, RouteUpdate<VirtualSystem>> {
    assert_eq!(packet.kind, PacketKind::Routing);
    Advertisement::<VirtualSystem>::decode(&packet.content)
        .unwrap()
        .routes
}
