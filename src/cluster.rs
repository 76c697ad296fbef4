use crate::controller::{CntrlId, Controller};

/// Internal/external bandwidth capacity of a cluster's links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ClusterBandwidth {
    pub internal: u32,
    pub external: u32,
}

#[derive(Debug, Clone)]
pub enum ClusterMember {
    Controller(Controller),
    Cluster(Cluster),
}

/// One grouping node of the interconnect tree. A cluster owns its direct
/// members, so every controller sits in exactly one member list and the
/// structure is acyclic by construction.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: String,
    pub bandwidth: ClusterBandwidth,
    members: Vec<ClusterMember>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, bandwidth: ClusterBandwidth) -> Self {
        Self {
            name: name.into(),
            bandwidth,
            members: Vec::new(),
        }
    }

    pub fn add_controller(&mut self, controller: Controller) {
        self.members.push(ClusterMember::Controller(controller));
    }

    pub fn add_cluster(&mut self, cluster: Cluster) {
        self.members.push(ClusterMember::Cluster(cluster));
    }

    /// Number of direct members, counting a nested cluster as one.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[ClusterMember] {
        &self.members
    }

    /// All controllers in this subtree, depth-first in member order. The
    /// order is deterministic for a given build.
    pub fn controllers(&self) -> Vec<&Controller> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Controller>) {
        for member in &self.members {
            match member {
                ClusterMember::Controller(cntrl) => out.push(cntrl),
                ClusterMember::Cluster(nested) => nested.collect(out),
            }
        }
    }

    pub fn find(&self, id: CntrlId) -> Option<&Controller> {
        self.controllers()
            .into_iter()
            .find(|cntrl| cntrl.id == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, CacheParams};
    use crate::controller::{CacheAttachment, ControllerKind, ControllerLatency};

    fn controller(id: CntrlId) -> Controller {
        let cache = Cache::build(&CacheParams::sized(4096, 2), 128, 0).unwrap();
        let mut cntrl = Controller::new(
            ControllerKind::CoreL1,
            id,
            16,
            ControllerLatency::default(),
            CacheAttachment::Unified(cache),
        );
        cntrl.id = Some(id);
        cntrl
    }

    fn bw() -> ClusterBandwidth {
        ClusterBandwidth {
            internal: 32,
            external: 32,
        }
    }

    #[test]
    fn len_counts_direct_members_only() {
        let mut inner = Cluster::new("inner", bw());
        inner.add_controller(controller(0));
        inner.add_controller(controller(1));

        let mut outer = Cluster::new("outer", bw());
        outer.add_cluster(inner);
        outer.add_controller(controller(2));

        assert_eq!(outer.len(), 2);
        assert_eq!(outer.controllers().len(), 3);
    }

    #[test]
    fn traversal_is_depth_first_in_member_order() {
        let mut inner = Cluster::new("inner", bw());
        inner.add_controller(controller(1));

        let mut outer = Cluster::new("outer", bw());
        outer.add_controller(controller(0));
        outer.add_cluster(inner);
        outer.add_controller(controller(2));

        let ids: Vec<_> = outer.controllers().iter().map(|c| c.id.unwrap()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(outer.find(1).is_some());
        assert!(outer.find(9).is_none());
    }
}
