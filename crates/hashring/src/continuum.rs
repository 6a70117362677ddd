//! Continuum construction and nearest-successor search.
//!
//! Each server gets `floor((w / W) * vnodes * n)` placement iterations, where
//! `w` is its weight, `W` the total weight, `n` the server count and `vnodes`
//! its override or the base count. Iteration `p` digests `"{id}-{p}"` once and
//! cuts `replicas` coordinates from that digest. The resulting points are
//! stable-sorted by coordinate, so ties keep insertion order.

use tracing::debug;

use crate::digest::{DigestProvider, coordinate};
use crate::error::RingError;
use crate::server::{Server, ServerId, ServerSet};

/// One point on the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingPoint {
    /// Position on the ring.
    pub coordinate: u32,
    /// Server owning the arc that ends at this point.
    pub server: ServerId,
}

/// Absorbs the rounding of `w / W` so exact integer counts do not floor one low.
const PLACEMENT_EPSILON: f64 = 1e-9;

/// Fraction of the total weight held by `server`, in `[0, 1]`.
///
/// Weights are finite individually but their sum may not be; in that case
/// every weight is first scaled down by the largest one.
fn weight_share(server: &Server, servers: &ServerSet) -> f64 {
    let total = servers.total_weight();
    if total.is_finite() {
        return if total > 0.0 { server.weight / total } else { 0.0 };
    }
    let max = servers.iter().map(|s| s.weight).fold(0.0, f64::max);
    let scaled_total: f64 = servers.iter().map(|s| s.weight / max).sum();
    (server.weight / max) / scaled_total
}

/// Number of placement iterations for `server` within `servers`.
///
/// Never exceeds `vnodes * n`, whatever the magnitude of the weights.
pub fn placed_points(server: &Server, servers: &ServerSet, base_vnodes: u32) -> usize {
    let share = weight_share(server, servers);
    if share <= 0.0 {
        return 0;
    }
    let vnodes = server.vnodes.unwrap_or(base_vnodes);
    let scaled = share * f64::from(vnodes) * servers.len() as f64;
    (scaled + PLACEMENT_EPSILON).floor() as usize
}

/// Build the sorted continuum for `servers`.
///
/// An empty set yields an empty continuum. A failing provider aborts the
/// build and the error is returned as-is.
pub fn build(
    servers: &ServerSet,
    base_vnodes: u32,
    replicas: usize,
    provider: &dyn DigestProvider,
) -> Result<Vec<RingPoint>, RingError> {
    let mut points = Vec::new();
    let mut label = String::new();

    for server in servers.iter() {
        let length = placed_points(server, servers, base_vnodes);
        points.reserve(length.saturating_mul(replicas));

        for p in 0..length {
            label.clear();
            label.push_str(server.id.as_str());
            label.push('-');
            label.push_str(&p.to_string());
            let digest = provider.digest(label.as_bytes())?;

            for r in 0..replicas {
                points.push(RingPoint {
                    coordinate: coordinate(&digest, r)?,
                    server: server.id.clone(),
                });
            }
        }
    }

    points.sort_by_key(|point| point.coordinate);
    debug!(
        servers = servers.len(),
        points = points.len(),
        replicas,
        "built continuum"
    );
    Ok(points)
}

/// Index of the first point whose coordinate is `>= hash`, wrapping to 0.
///
/// Binary search that accepts `mid` once `hash` falls in
/// `(points[mid - 1], points[mid]]`. If the bounds cross without a match the
/// hash lies above every point and the lookup wraps to the first one. Callers
/// must not invoke this on an empty continuum.
pub fn find(points: &[RingPoint], hash: u32) -> usize {
    let mut low = 0;
    let mut high = points.len();

    while low < high {
        let mid = low + (high - low) / 2;
        let upper = points[mid].coordinate;
        if hash > upper {
            low = mid + 1;
        } else if mid == 0 || hash > points[mid - 1].coordinate {
            return mid;
        } else {
            high = mid;
        }
    }

    0
}
