//! Port wiring between system components.
//!
//! Components expose named ports. A requestor port (the side that issues requests) is
//! connected to exactly one responder port; a responder port on a crossbar may serve many
//! requestors. Ports that the system cannot run without are registered as required and
//! checked once at instantiation.

use std::collections::BTreeMap;
use std::fmt;

use crate::common::SystemError;

/// A named port on a named component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortRef {
    /// Component (object path) owning the port.
    pub owner: String,
    /// Port name.
    pub port: String,
}

impl PortRef {
    /// Creates a port reference.
    pub fn new(owner: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.port)
    }
}

/// Connections from requestor ports to responder ports.
#[derive(Debug, Clone, Default)]
pub struct PortGraph {
    edges: BTreeMap<PortRef, PortRef>,
    required: Vec<PortRef>,
}

impl PortGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects `requestor` to `responder`.
    ///
    /// # Errors
    ///
    /// `SystemError::PortInUse` if `requestor` is already connected.
    pub fn connect(&mut self, requestor: PortRef, responder: PortRef) -> Result<(), SystemError> {
        if self.edges.contains_key(&requestor) {
            return Err(SystemError::PortInUse {
                owner: requestor.owner,
                port: requestor.port,
            });
        }
        tracing::trace!(%requestor, %responder, "connect");
        let _ = self.edges.insert(requestor, responder);
        Ok(())
    }

    /// Marks `port` as one that must be connected before instantiation.
    pub fn require(&mut self, port: PortRef) {
        self.required.push(port);
    }

    /// Returns the responder `requestor` is connected to.
    pub fn responder_of(&self, requestor: &PortRef) -> Option<&PortRef> {
        self.edges.get(requestor)
    }

    /// Returns `true` if `port` takes part in any connection on either side.
    pub fn is_connected(&self, port: &PortRef) -> bool {
        self.edges.contains_key(port) || self.edges.values().any(|r| r == port)
    }

    /// Returns the requestors connected to `responder`.
    pub fn requestors_of<'a>(&'a self, responder: &'a PortRef) -> impl Iterator<Item = &'a PortRef> {
        self.edges
            .iter()
            .filter(move |(_, r)| *r == responder)
            .map(|(q, _)| q)
    }

    /// Returns every connection as `(requestor, responder)`, ordered by requestor.
    pub fn connections(&self) -> impl Iterator<Item = (&PortRef, &PortRef)> {
        self.edges.iter()
    }

    /// Returns the number of connections.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if nothing is connected.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Checks that every required port is connected.
    ///
    /// # Errors
    ///
    /// `SystemError::UnconnectedPort` for the first required port left unconnected.
    pub fn validate(&self) -> Result<(), SystemError> {
        match self.required.iter().find(|p| !self.is_connected(p)) {
            Some(p) => Err(SystemError::UnconnectedPort {
                owner: p.owner.clone(),
                port: p.port.clone(),
            }),
            None => Ok(()),
        }
    }
}
