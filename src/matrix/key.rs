use crate::shape::ShapeType;
use crate::std_regions::ExpansionKey;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The kinds of elemental matrices that can be constructed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatrixType {
    Mass,
    InvMass,
    Laplacian,
    /// The Laplacian component $(\partial_i \phi, \partial_j \phi)$.
    LaplacianComponent(usize, usize),
    /// The weak derivative $(\phi, \partial_i \phi)$.
    WeakDeriv(usize),
    /// The Helmholtz operator $L + \lambda M$. Requires [`ConstFactorType::Lambda`].
    Helmholtz,
    InvLaplacianWithUnityMean,
    /// Maps quadrature values to inner products with the basis.
    IProductWrtBase,
    /// Maps quadrature values to inner products with the derivative of the basis in direction `i`.
    IProductWrtDerivBase(usize),
    /// Maps coefficients to quadrature values.
    BwdTrans,
    PreconDiagonal,
    PreconLinearSpace,
    HybridDgHelmholtz,
    InvHybridDgHelmholtz,
}

impl MatrixType {
    /// Whether the matrix is symmetric whenever its variable coefficients are.
    pub fn is_symmetric(&self) -> bool {
        use MatrixType::*;
        matches!(
            self,
            Mass | InvMass | Laplacian | Helmholtz | InvLaplacianWithUnityMean | PreconDiagonal | PreconLinearSpace
        ) || matches!(self, LaplacianComponent(i, j) if i == j)
    }
}

/// Named scalar parameters of a matrix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstFactorType {
    Lambda,
    Tau,
}

/// Named spatially varying coefficients of a matrix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VarCoeffType {
    /// Weighting of the mass term.
    Mass,
    D00,
    D01,
    D02,
    D11,
    D12,
    D22,
}

impl VarCoeffType {
    /// The diffusion tensor entry `D_ij`, using symmetry for `i > j`.
    pub fn diffusion(i: usize, j: usize) -> Self {
        use VarCoeffType::*;
        match (i.min(j), i.max(j)) {
            (0, 0) => D00,
            (0, 1) => D01,
            (0, 2) => D02,
            (1, 1) => D11,
            (1, 2) => D12,
            (2, 2) => D22,
            _ => panic!("Diffusion tensor index ({i}, {j}) out of bounds"),
        }
    }
}

/// A coefficient field given at the quadrature points of an expansion.
///
/// Equality and hashing are based on the bit patterns of the values, so two fields compare equal
/// exactly when they hold identical numbers.
#[derive(Clone)]
pub struct VarCoeff {
    values: Arc<[f64]>,
    hash: u64,
}

impl VarCoeff {
    pub fn new(values: impl Into<Arc<[f64]>>) -> Self {
        let values = values.into();
        let mut hasher = DefaultHasher::new();
        values.len().hash(&mut hasher);
        for v in values.iter() {
            v.to_bits().hash(&mut hasher);
        }
        Self {
            values,
            hash: hasher.finish(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl PartialEq for VarCoeff {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for VarCoeff {}

impl Hash for VarCoeff {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state)
    }
}

impl Debug for VarCoeff {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "VarCoeff(len = {}, hash = {:#x})", self.values.len(), self.hash)
    }
}

/// Identifies an elemental matrix.
///
/// A key combines the matrix type with the reference expansion it belongs to and optional
/// constant factors and variable coefficients. Keys with identical contents compare equal, which
/// is what the matrix caches rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatrixKey {
    matrix_type: MatrixType,
    expansion: ExpansionKey,
    const_factors: BTreeMap<ConstFactorType, OrderedFloat<f64>>,
    var_coeffs: BTreeMap<VarCoeffType, VarCoeff>,
}

impl MatrixKey {
    pub fn new(matrix_type: MatrixType, expansion: &ExpansionKey) -> Self {
        Self {
            matrix_type,
            expansion: expansion.clone(),
            const_factors: BTreeMap::new(),
            var_coeffs: BTreeMap::new(),
        }
    }

    pub fn with_const_factor(mut self, factor: ConstFactorType, value: f64) -> Self {
        self.const_factors.insert(factor, OrderedFloat(value));
        self
    }

    pub fn with_var_coeff(mut self, coeff: VarCoeffType, values: impl Into<Arc<[f64]>>) -> Self {
        self.var_coeffs.insert(coeff, VarCoeff::new(values));
        self
    }

    /// Returns a copy of this key with a different matrix type, keeping all factors and coefficients.
    pub fn with_matrix_type(&self, matrix_type: MatrixType) -> Self {
        Self {
            matrix_type,
            ..self.clone()
        }
    }

    /// Returns a copy of this key without any variable coefficients.
    pub fn without_var_coeffs(&self) -> Self {
        Self {
            var_coeffs: BTreeMap::new(),
            ..self.clone()
        }
    }

    pub fn matrix_type(&self) -> MatrixType {
        self.matrix_type
    }

    pub fn shape(&self) -> ShapeType {
        self.expansion.shape()
    }

    pub fn expansion_key(&self) -> &ExpansionKey {
        &self.expansion
    }

    pub fn const_factor(&self, factor: ConstFactorType) -> Option<f64> {
        self.const_factors.get(&factor).map(|v| v.into_inner())
    }

    pub fn const_factors(&self) -> impl Iterator<Item = (ConstFactorType, f64)> + '_ {
        self.const_factors.iter().map(|(k, v)| (*k, v.into_inner()))
    }

    pub fn var_coeff(&self, coeff: VarCoeffType) -> Option<&[f64]> {
        self.var_coeffs.get(&coeff).map(VarCoeff::values)
    }

    pub fn has_var_coeffs(&self) -> bool {
        !self.var_coeffs.is_empty()
    }

    /// The `Lambda` factor required by Helmholtz-type matrices.
    ///
    /// # Panics
    ///
    /// Panics if the key does not carry a `Lambda` factor.
    pub fn lambda(&self) -> f64 {
        self.const_factor(ConstFactorType::Lambda).unwrap_or_else(|| {
            panic!(
                "{:?} matrix requires the Lambda constant factor",
                self.matrix_type
            )
        })
    }
}
