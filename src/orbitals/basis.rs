//! Basis specification, primitives and the contraction map.

use std::ops::AddAssign;

use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::harmonics::{Angular, HarmonicsKind};
use super::norm::{primitive_norm, resolve_norms, NormalizationStrategy};
use super::radial::RadialKind;
use crate::error::{QmcError, Result};

/// Basis description as produced by an electronic-structure calculation.
///
/// All `bas_*` vectors are indexed by primitive. `bas_n`/`bas_l`/`bas_m` are
/// read for spherical harmonics and `bas_kx`/`bas_ky`/`bas_kz`/`bas_kr` for
/// cartesian ones.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BasisSpec {
    pub radial_type: String,
    pub harmonics_type: String,
    pub atom_coords: Vec<[f64; 3]>,
    /// Primitives per atom.
    pub nshells: Vec<usize>,
    /// Orbital receiving each primitive.
    pub index_ctr: Vec<usize>,
    /// Number of contracted orbitals; defaults to `max(index_ctr) + 1`.
    #[serde(default)]
    pub nao: Option<usize>,
    pub bas_exp: Vec<f64>,
    pub bas_coeffs: Vec<f64>,
    #[serde(default)]
    pub bas_n: Vec<i32>,
    #[serde(default)]
    pub bas_l: Vec<u32>,
    #[serde(default)]
    pub bas_m: Vec<i32>,
    #[serde(default)]
    pub bas_kx: Vec<u32>,
    #[serde(default)]
    pub bas_ky: Vec<u32>,
    #[serde(default)]
    pub bas_kz: Vec<u32>,
    #[serde(default)]
    pub bas_kr: Vec<i32>,
    #[serde(default)]
    pub bas_norm: Option<Vec<f64>>,
    #[serde(default)]
    pub normalization: NormalizationStrategy,
}

/// One radial × harmonic term of a contracted orbital.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisPrimitive {
    pub center: usize,
    pub angular: Angular,
    /// Power of r in the radial part.
    pub n: i32,
    pub exponent: f64,
    pub coefficient: f64,
    pub norm: f64,
}

/// Primitive index -> orbital index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractionMap {
    index: Vec<usize>,
    norb: usize,
    contracted: bool,
}

impl ContractionMap {
    pub fn new(index: Vec<usize>, norb: usize) -> Result<Self> {
        if let Some(&bad) = index.iter().find(|&&i| i >= norb) {
            return Err(QmcError::Configuration(format!(
                "contraction index {bad} out of range for {norb} orbitals"
            )));
        }
        let mut seen = vec![false; norb];
        let mut one_to_one = index.len() == norb;
        for &i in &index {
            if seen[i] {
                one_to_one = false;
            }
            seen[i] = true;
        }
        Ok(Self { index, norb, contracted: !one_to_one })
    }

    /// Identity map over `n` primitives.
    pub fn identity(n: usize) -> Self {
        Self { index: (0..n).collect(), norb: n, contracted: false }
    }

    /// False iff the map is a one-to-one relabeling of the primitives.
    pub fn is_contracted(&self) -> bool {
        self.contracted
    }

    pub fn norb(&self) -> usize {
        self.norb
    }

    pub fn nprim(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Scatter-add per-primitive values into a fresh per-orbital vector.
    pub fn contract<T>(&self, values: &[T]) -> Vec<T>
    where
        T: Copy + Default + AddAssign,
    {
        if !self.contracted && self.index.iter().enumerate().all(|(p, &o)| p == o) {
            return values.to_vec();
        }
        let mut out = vec![T::default(); self.norb];
        for (&orb, &v) in self.index.iter().zip(values) {
            out[orb] += v;
        }
        out
    }
}

/// Validated basis ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Basis {
    radial: RadialKind,
    harmonics: HarmonicsKind,
    atom_coords: Vec<Vector3<f64>>,
    nshells: Vec<usize>,
    primitives: Vec<BasisPrimitive>,
    contraction: ContractionMap,
    normalization: NormalizationStrategy,
}

fn check_len(name: &str, len: usize, nprim: usize) -> Result<()> {
    if len != nprim {
        return Err(QmcError::Configuration(format!(
            "{name} has {len} entries, expected one per primitive ({nprim})"
        )));
    }
    Ok(())
}

impl Basis {
    pub fn from_spec(spec: &BasisSpec) -> Result<Self> {
        let radial: RadialKind = spec.radial_type.parse()?;
        let harmonics: HarmonicsKind = spec.harmonics_type.parse()?;

        let nprim = spec.bas_exp.len();
        if spec.atom_coords.len() != spec.nshells.len() {
            return Err(QmcError::Configuration(format!(
                "{} atoms but {} shell counts",
                spec.atom_coords.len(),
                spec.nshells.len()
            )));
        }
        let total: usize = spec.nshells.iter().sum();
        if total != nprim {
            return Err(QmcError::Configuration(format!(
                "shell counts sum to {total} but the basis has {nprim} primitives"
            )));
        }
        check_len("bas_coeffs", spec.bas_coeffs.len(), nprim)?;
        check_len("index_ctr", spec.index_ctr.len(), nprim)?;
        if let Some(zeta) = spec.bas_exp.iter().find(|&&z| !(z > 0.0)) {
            return Err(QmcError::Configuration(format!("exponent {zeta} must be positive")));
        }

        let angular_n: Vec<(Angular, i32)> = match harmonics {
            HarmonicsKind::Spherical => {
                check_len("bas_n", spec.bas_n.len(), nprim)?;
                check_len("bas_l", spec.bas_l.len(), nprim)?;
                check_len("bas_m", spec.bas_m.len(), nprim)?;
                (0..nprim)
                    .map(|p| Ok((Angular::spherical(spec.bas_l[p], spec.bas_m[p])?, spec.bas_n[p])))
                    .collect::<Result<_>>()?
            }
            HarmonicsKind::Cartesian => {
                check_len("bas_kx", spec.bas_kx.len(), nprim)?;
                check_len("bas_ky", spec.bas_ky.len(), nprim)?;
                check_len("bas_kz", spec.bas_kz.len(), nprim)?;
                check_len("bas_kr", spec.bas_kr.len(), nprim)?;
                (0..nprim)
                    .map(|p| {
                        let angular = Angular::Cartesian {
                            kx: spec.bas_kx[p],
                            ky: spec.bas_ky[p],
                            kz: spec.bas_kz[p],
                        };
                        (angular, spec.bas_kr[p])
                    })
                    .collect()
            }
        };

        let norb = spec
            .nao
            .unwrap_or_else(|| spec.index_ctr.iter().max().map_or(0, |&m| m + 1));
        let contraction = ContractionMap::new(spec.index_ctr.clone(), norb)?;

        let analytic = angular_n
            .iter()
            .zip(&spec.bas_exp)
            .map(|(&(angular, n), &zeta)| primitive_norm(radial, &angular, n, zeta))
            .collect();
        let norms = resolve_norms(spec.normalization, analytic, spec.bas_norm.as_deref())?;

        // center of each primitive: atom index repeated nshells times
        let centers = spec
            .nshells
            .iter()
            .enumerate()
            .flat_map(|(atom, &count)| std::iter::repeat(atom).take(count));
        let primitives = centers
            .zip(angular_n)
            .enumerate()
            .map(|(p, (center, (angular, n)))| BasisPrimitive {
                center,
                angular,
                n,
                exponent: spec.bas_exp[p],
                coefficient: spec.bas_coeffs[p],
                norm: norms[p],
            })
            .collect();

        let basis = Self {
            radial,
            harmonics,
            atom_coords: spec.atom_coords.iter().map(|c| Vector3::from(*c)).collect(),
            nshells: spec.nshells.clone(),
            primitives,
            contraction,
            normalization: spec.normalization,
        };
        debug!(
            "basis: {radial}/{harmonics}, {} atoms, {} primitives -> {} orbitals (contracted: {})",
            basis.natoms(),
            basis.nprim(),
            basis.norb(),
            basis.contraction.is_contracted()
        );
        Ok(basis)
    }

    pub fn radial(&self) -> RadialKind {
        self.radial
    }

    pub fn harmonics(&self) -> HarmonicsKind {
        self.harmonics
    }

    pub fn natoms(&self) -> usize {
        self.atom_coords.len()
    }

    pub fn nprim(&self) -> usize {
        self.primitives.len()
    }

    pub fn norb(&self) -> usize {
        self.contraction.norb()
    }

    pub fn nshells(&self) -> &[usize] {
        &self.nshells
    }

    pub fn primitives(&self) -> &[BasisPrimitive] {
        &self.primitives
    }

    pub fn contraction(&self) -> &ContractionMap {
        &self.contraction
    }

    pub fn atom_coords(&self) -> &[Vector3<f64>] {
        &self.atom_coords
    }

    pub fn set_atom_coords(&mut self, coords: &[Vector3<f64>]) -> Result<()> {
        check_len("atom coordinates", coords.len(), self.natoms())?;
        self.atom_coords = coords.to_vec();
        Ok(())
    }

    /// Replace the exponents; analytic norms follow the new values.
    pub fn set_exponents(&mut self, exponents: &[f64]) -> Result<()> {
        check_len("exponents", exponents.len(), self.nprim())?;
        if let Some(zeta) = exponents.iter().find(|&&z| !(z > 0.0)) {
            return Err(QmcError::Configuration(format!("exponent {zeta} must be positive")));
        }
        let radial = self.radial;
        let renormalize = self.normalization == NormalizationStrategy::Analytic;
        for (prim, &zeta) in self.primitives.iter_mut().zip(exponents) {
            prim.exponent = zeta;
            if renormalize {
                prim.norm = primitive_norm(radial, &prim.angular, prim.n, zeta);
            }
        }
        Ok(())
    }

    pub fn set_coefficients(&mut self, coefficients: &[f64]) -> Result<()> {
        check_len("coefficients", coefficients.len(), self.nprim())?;
        for (prim, &c) in self.primitives.iter_mut().zip(coefficients) {
            prim.coefficient = c;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::orbitals::norm::norm_slater_cartesian;
    use approx::assert_relative_eq;

    /// Two hydrogens, each with a contracted 1s and a px primitive.
    pub(crate) fn h2_cartesian(radial: &str) -> BasisSpec {
        BasisSpec {
            radial_type: radial.into(),
            harmonics_type: "cart".into(),
            atom_coords: vec![[0.0, 0.0, -0.7], [0.0, 0.0, 0.7]],
            nshells: vec![3, 3],
            index_ctr: vec![0, 0, 1, 2, 2, 3],
            nao: None,
            bas_exp: vec![1.24, 0.6, 0.9, 1.24, 0.6, 0.9],
            bas_coeffs: vec![0.7, 0.3, 1.0, 0.7, 0.3, 1.0],
            bas_n: vec![],
            bas_l: vec![],
            bas_m: vec![],
            bas_kx: vec![0, 0, 1, 0, 0, 1],
            bas_ky: vec![0; 6],
            bas_kz: vec![0; 6],
            bas_kr: vec![0, 0, 0, 0, 0, 0],
            bas_norm: None,
            normalization: NormalizationStrategy::Analytic,
        }
    }

    /// One atom carrying the nine spherical harmonics up to l = 2.
    pub(crate) fn spherical_atom(radial: &str) -> BasisSpec {
        let mut bas_l = vec![];
        let mut bas_m = vec![];
        for l in 0..=2u32 {
            for m in -(l as i32)..=(l as i32) {
                bas_l.push(l);
                bas_m.push(m);
            }
        }
        let nprim = bas_l.len();
        BasisSpec {
            radial_type: radial.into(),
            harmonics_type: "sph".into(),
            atom_coords: vec![[0.1, -0.2, 0.3]],
            nshells: vec![nprim],
            index_ctr: (0..nprim).collect(),
            nao: None,
            bas_exp: (0..nprim).map(|p| 0.8 + 0.1 * p as f64).collect(),
            bas_coeffs: vec![1.0; nprim],
            bas_n: bas_l.iter().map(|&l| l as i32).collect(),
            bas_l,
            bas_m,
            bas_kx: vec![],
            bas_ky: vec![],
            bas_kz: vec![],
            bas_kr: vec![],
            bas_norm: None,
            normalization: NormalizationStrategy::Analytic,
        }
    }

    #[test]
    fn test_contraction_map() {
        let map = ContractionMap::new(vec![0, 0, 1, 2], 3).unwrap();
        assert!(map.is_contracted());
        assert_eq!(map.contract(&[1.0, 2.0, 3.0, 4.0]), vec![3.0, 3.0, 4.0]);

        let relabel = ContractionMap::new(vec![2, 0, 1], 3).unwrap();
        assert!(!relabel.is_contracted());
        assert_eq!(relabel.contract(&[1.0, 2.0, 3.0]), vec![2.0, 3.0, 1.0]);

        let identity = ContractionMap::identity(3);
        assert_eq!(identity.contract(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);

        assert!(ContractionMap::new(vec![0, 3], 3).is_err());
    }

    #[test]
    fn test_orbital_without_primitives_is_zero() {
        let map = ContractionMap::new(vec![0, 2], 3).unwrap();
        assert!(map.is_contracted());
        assert_eq!(map.contract(&[1.5, 2.5]), vec![1.5, 0.0, 2.5]);
    }

    #[test]
    fn test_basis_from_spec() {
        let basis = Basis::from_spec(&h2_cartesian("sto")).unwrap();
        assert_eq!(basis.natoms(), 2);
        assert_eq!(basis.nprim(), 6);
        assert_eq!(basis.norb(), 4);
        assert!(basis.contraction().is_contracted());
        let centers: Vec<usize> = basis.primitives().iter().map(|p| p.center).collect();
        assert_eq!(centers, vec![0, 0, 0, 1, 1, 1]);
        assert_relative_eq!(
            basis.primitives()[2].norm,
            norm_slater_cartesian([1, 0, 0], 0, 0.9),
            max_relative = 1e-14
        );
    }

    #[test]
    fn test_basis_rejects_inconsistent_spec() {
        let mut spec = h2_cartesian("sto");
        spec.nshells = vec![3, 2];
        assert!(matches!(Basis::from_spec(&spec), Err(QmcError::Configuration(_))));

        let mut spec = h2_cartesian("slater");
        spec.nshells = vec![3, 3];
        assert!(Basis::from_spec(&spec).is_err());

        let mut spec = h2_cartesian("gto");
        spec.harmonics_type = "sph".into();
        assert!(Basis::from_spec(&spec).is_err());

        let mut spec = h2_cartesian("gto");
        spec.bas_exp[0] = -1.0;
        assert!(Basis::from_spec(&spec).is_err());
    }

    #[test]
    fn test_norms_from_specification() {
        let mut spec = h2_cartesian("gto");
        spec.normalization = NormalizationStrategy::FromSpecification;
        assert!(Basis::from_spec(&spec).is_err());
        spec.bas_norm = Some(vec![1.0; 6]);
        let mut basis = Basis::from_spec(&spec).unwrap();
        assert!(basis.primitives().iter().all(|p| p.norm == 1.0));
        basis.set_exponents(&[2.0; 6]).unwrap();
        assert!(basis.primitives().iter().all(|p| p.norm == 1.0));
    }

    #[test]
    fn test_set_exponents_renormalizes() {
        let mut basis = Basis::from_spec(&spherical_atom("sto")).unwrap();
        let before = basis.primitives()[0].norm;
        let exps: Vec<f64> = basis.primitives().iter().map(|p| 2.0 * p.exponent).collect();
        basis.set_exponents(&exps).unwrap();
        assert!(basis.primitives()[0].norm > before);
        assert!(basis.set_exponents(&[1.0]).is_err());
    }

    #[test]
    fn test_spec_from_yaml() {
        let yaml = r#"
radial_type: gto
harmonics_type: sph
atom_coords: [[0.0, 0.0, 0.0]]
nshells: [2]
index_ctr: [0, 0]
bas_exp: [1.0, 0.5]
bas_coeffs: [0.6, 0.4]
bas_n: [0, 0]
bas_l: [0, 0]
bas_m: [0, 0]
"#;
        let spec: BasisSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.normalization, NormalizationStrategy::Analytic);
        let basis = Basis::from_spec(&spec).unwrap();
        assert_eq!(basis.norb(), 1);
        assert!(basis.contraction().is_contracted());
    }
}
