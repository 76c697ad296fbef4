//! Derived signaling latencies for the multi-hop interconnect.
//!
//! Latencies are abstract cache-side cycles throughout; callers pick the
//! cycle-ratio constants in [`crate::config::NocParams`] and this module
//! never converts units.

pub type Cycles = u64;

/// Hop count of a dance-hall interconnect shared by `num_clients` symmetric
/// clients. Grows with the log of the client count and never drops below
/// one, so a traversal always costs at least one hop.
pub fn dance_hall_hops(num_clients: usize) -> u32 {
    let clients = num_clients.max(1) as u64;
    clients.ilog2().max(1)
}

/// Total interconnect cost of crossing `hops` hops.
pub fn noc_latency(per_hop: Cycles, hops: u32) -> Cycles {
    per_hop * hops as Cycles
}

/// Component latency plus the interconnect crossing. Applied uniformly to
/// every inter-level path, with per-path component latencies and hop counts.
pub fn round_trip(component: Cycles, per_hop: Cycles, hops: u32) -> Cycles {
    component + noc_latency(per_hop, hops)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_count_is_never_zero() {
        assert_eq!(dance_hall_hops(0), 1);
        assert_eq!(dance_hall_hops(1), 1);
        assert_eq!(dance_hall_hops(2), 1);
    }

    #[test]
    fn hop_count_grows_logarithmically() {
        assert_eq!(dance_hall_hops(4), 2);
        assert_eq!(dance_hall_hops(8), 3);
        assert_eq!(dance_hall_hops(16), 4);
        // floor for non-powers of two
        assert_eq!(dance_hall_hops(9), 3);
    }

    #[test]
    fn hop_count_is_monotone_in_client_count() {
        let mut clients = 1;
        let mut last = dance_hall_hops(clients);
        for _ in 0..16 {
            clients *= 2;
            let hops = dance_hall_hops(clients);
            assert!(hops >= last);
            last = hops;
        }
    }

    #[test]
    fn round_trip_is_component_plus_hops() {
        assert_eq!(round_trip(30, 45, 3), 30 + 135);
        assert_eq!(round_trip(0, 45, 1), 45);
    }

    #[test]
    fn latency_is_monotone_in_hop_count() {
        let mut last = 0;
        for hops in 1..8 {
            let lat = round_trip(30, 45, hops);
            assert!(lat > last);
            last = lat;
        }
    }
}
