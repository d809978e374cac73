use crate::error::ConnectionError;
use crate::graph::Graph;
use crate::model::{CellId, Endpoint, Point};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionRules {
    pub allow_loop: bool,
    /// Lets either end of an edge rest on empty canvas.
    pub allow_blank: bool,
    pub snap_radius: f32,
}

impl Default for ConnectionRules {
    fn default() -> Self {
        Self {
            allow_loop: true,
            allow_blank: false,
            snap_radius: 20.0,
        }
    }
}

impl ConnectionRules {
    pub fn validate(
        &self,
        graph: &Graph,
        source: &Endpoint,
        target: &Endpoint,
    ) -> Result<(), ConnectionError> {
        self.check_endpoint(graph, source)?;
        self.check_endpoint(graph, target)?;
        if !self.allow_loop {
            if let (Some(a), Some(b)) = (source.node(), target.node()) {
                if a == b {
                    return Err(ConnectionError::SelfLoop(a));
                }
            }
        }
        Ok(())
    }

    fn check_endpoint(&self, graph: &Graph, endpoint: &Endpoint) -> Result<(), ConnectionError> {
        match endpoint {
            Endpoint::Point { x, y } => {
                if self.allow_blank && Point::new(*x, *y).is_finite() {
                    Ok(())
                } else {
                    Err(ConnectionError::BlankEndpoint)
                }
            }
            Endpoint::Port { node, port } => {
                let n = graph
                    .node(*node)
                    .ok_or(ConnectionError::UnknownNode(*node))?;
                if n.port(port).is_none() {
                    return Err(ConnectionError::UnknownPort {
                        node: *node,
                        port: port.clone(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Where a connector dragged to `p` lands: the nearest port within the
    /// snap radius, or the bare point.
    pub fn snap(&self, graph: &Graph, p: Point, exclude: Option<CellId>) -> Endpoint {
        match graph.port_near(p, self.snap_radius, exclude) {
            Some((node, port)) => Endpoint::port(node, port),
            None => Endpoint::point(p),
        }
    }
}
