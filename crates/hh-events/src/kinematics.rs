//! Four-vector helpers on (pt, eta, phi, mass) records.

use std::f64::consts::PI;

/// Azimuthal difference wrapped into [-π, π].
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let mut d = phi1 - phi2;
    while d > PI {
        d -= 2.0 * PI;
    }
    while d < -PI {
        d += 2.0 * PI;
    }
    d
}

/// Angular distance ΔR = sqrt(Δη² + Δφ²).
pub fn delta_r(eta1: f64, phi1: f64, eta2: f64, phi2: f64) -> f64 {
    let deta = eta1 - eta2;
    let dphi = delta_phi(phi1, phi2);
    (deta * deta + dphi * dphi).sqrt()
}

/// A massive four-vector built from collider coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtEtaPhiM {
    /// Transverse momentum.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Mass.
    pub mass: f64,
}

impl PtEtaPhiM {
    /// Cartesian components `(E, px, py, pz)`.
    pub fn to_cartesian(self) -> [f64; 4] {
        let px = self.pt * self.phi.cos();
        let py = self.pt * self.phi.sin();
        let pz = self.pt * self.eta.sinh();
        let p2 = px * px + py * py + pz * pz;
        let e = (p2 + self.mass * self.mass).sqrt();
        [e, px, py, pz]
    }
}

/// Invariant mass of a two-object system.
pub fn invariant_mass(a: PtEtaPhiM, b: PtEtaPhiM) -> f64 {
    let [ea, xa, ya, za] = a.to_cartesian();
    let [eb, xb, yb, zb] = b.to_cartesian();
    let e = ea + eb;
    let (x, y, z) = (xa + xb, ya + yb, za + zb);
    (e * e - x * x - y * y - z * z).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn delta_phi_wraps() {
        assert_relative_eq!(delta_phi(3.0, -3.0), 6.0 - 2.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(-3.0, 3.0), 2.0 * PI - 6.0, epsilon = 1e-12);
        assert_relative_eq!(delta_r(0.0, 0.1, 0.3, 0.5), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn back_to_back_massless_pair() {
        // Two massless objects back-to-back in the transverse plane: m = 2 pt.
        let a = PtEtaPhiM { pt: 50.0, eta: 0.0, phi: 0.0, mass: 0.0 };
        let b = PtEtaPhiM { pt: 50.0, eta: 0.0, phi: PI, mass: 0.0 };
        assert_relative_eq!(invariant_mass(a, b), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn forward_pair_mass() {
        // m² = 2 pt1 pt2 (cosh Δη - cos Δφ) for massless objects.
        let a = PtEtaPhiM { pt: 40.0, eta: 3.0, phi: 0.2, mass: 0.0 };
        let b = PtEtaPhiM { pt: 30.0, eta: -2.5, phi: 1.0, mass: 0.0 };
        let expected = (2.0 * 40.0 * 30.0 * ((5.5f64).cosh() - (0.8f64).cos())).sqrt();
        assert_relative_eq!(invariant_mass(a, b), expected, max_relative = 1e-9);
    }
}
