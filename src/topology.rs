//! Hardware topology description of a compute node.

use serde::{Deserialize, Serialize};

use crate::errors::TopologyError;

/// The resource grid of a single compute node: sockets, cores, SMT threads
/// and GPUs.
///
/// Constructed once per target machine profile and immutable thereafter.
/// All base attributes must be at least 1, except `gpus_per_node` which may
/// be 0 on CPU-only machines. Both [`NodeTopology::new`] and
/// deserialization enforce this, so a held value is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNodeTopology")]
pub struct NodeTopology {
    /// Number of sockets (NUMA domains) per node.
    sockets_per_node: u32,

    /// Number of physical cores per socket.
    cores_per_socket: u32,

    /// Number of SMT threads each physical core can execute. Typically 1, 2
    /// or 4.
    threads_per_core: u32,

    /// Number of GPUs per node.
    gpus_per_node: u32,
}

impl NodeTopology {
    /// Create a validated topology description.
    pub fn new(
        sockets_per_node: u32,
        cores_per_socket: u32,
        threads_per_core: u32,
        gpus_per_node: u32,
    ) -> Result<Self, TopologyError> {
        if sockets_per_node == 0 {
            return Err(TopologyError::InvalidValue(
                "sockets_per_node must be at least 1".to_string(),
            ));
        }
        if cores_per_socket == 0 {
            return Err(TopologyError::InvalidValue(
                "cores_per_socket must be at least 1".to_string(),
            ));
        }
        if threads_per_core == 0 {
            return Err(TopologyError::InvalidValue(
                "threads_per_core must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            sockets_per_node,
            cores_per_socket,
            threads_per_core,
            gpus_per_node,
        })
    }

    pub fn sockets_per_node(&self) -> u32 {
        self.sockets_per_node
    }

    pub fn cores_per_socket(&self) -> u32 {
        self.cores_per_socket
    }

    pub fn threads_per_core(&self) -> u32 {
        self.threads_per_core
    }

    pub fn gpus_per_node(&self) -> u32 {
        self.gpus_per_node
    }

    /// Number of physical cores per node.
    pub fn cores_per_node(&self) -> u32 {
        self.sockets_per_node * self.cores_per_socket
    }

    /// Number of logical cores (hardware threads) per node.
    pub fn threads_per_node(&self) -> u32 {
        self.cores_per_node() * self.threads_per_core
    }
}

/// Unvalidated mirror used during deserialization. Unset attributes default
/// to a minimal single-core node, matching the construction defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNodeTopology {
    #[serde(default = "default_one")]
    sockets_per_node: u32,
    #[serde(default = "default_one")]
    cores_per_socket: u32,
    #[serde(default = "default_one")]
    threads_per_core: u32,
    #[serde(default)]
    gpus_per_node: u32,
}

fn default_one() -> u32 {
    1
}

impl TryFrom<RawNodeTopology> for NodeTopology {
    type Error = TopologyError;

    fn try_from(raw: RawNodeTopology) -> Result<Self, Self::Error> {
        NodeTopology::new(
            raw.sockets_per_node,
            raw.cores_per_socket,
            raw.threads_per_core,
            raw.gpus_per_node,
        )
    }
}
