//! Index-based storage for nodes and cells.
//!
//! The [`Domain`] is an arena: nodes and cells are owned here and referred to by
//! stable indices everywhere else. Elements and terms hold indices or shared
//! references, never private copies of nodal data. Structural mutation (dof
//! creation) is confined to the single-threaded initialization phase that
//! precedes any concurrent integration or assembly.
use crate::dof::{Dof, DofId};
use crate::error::AssemblyError;
use log::debug;
use nalgebra::{RealField, Vector3};
use serde::{Deserialize, Serialize};

/// The geometric type of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Two-node segment with reference domain $[-1, 1]$.
    Line2,
    /// Three-node triangle with reference domain $\{(x, y) : x, y \geq 0, x + y \leq 1\}$.
    Tri3,
    /// Four-node quadrilateral with reference domain $[-1, 1]^2$.
    Quad4,
}

impl CellKind {
    pub fn num_nodes(&self) -> usize {
        match self {
            Self::Line2 => 2,
            Self::Tri3 => 3,
            Self::Quad4 => 4,
        }
    }

    /// Dimension of the reference domain.
    pub fn reference_dim(&self) -> usize {
        match self {
            Self::Line2 => 1,
            Self::Tri3 | Self::Quad4 => 2,
        }
    }
}

/// A geometric cell: a kind plus the indices of the nodes it connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    kind: CellKind,
    connectivity: Vec<usize>,
}

impl Cell {
    /// Constructs a cell, verifying that the connectivity length matches the kind.
    pub fn new(kind: CellKind, connectivity: Vec<usize>) -> Result<Self, AssemblyError> {
        if connectivity.len() != kind.num_nodes() {
            return Err(AssemblyError::configuration(format!(
                "cell of kind {:?} requires {} nodes, got {}",
                kind,
                kind.num_nodes(),
                connectivity.len()
            )));
        }
        Ok(Self { kind, connectivity })
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }
}

/// A mesh node: a position and the dofs it carries.
///
/// Positions are stored with three components regardless of the domain
/// dimension; unused components are zero. Dofs are stored in creation order so
/// that equation numbering is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Node<T: RealField> {
    position: Vector3<T>,
    dofs: Vec<Dof<T>>,
}

impl<T: RealField> Node<T> {
    pub fn new(position: Vector3<T>) -> Self {
        Self {
            position,
            dofs: Vec::new(),
        }
    }

    pub fn position(&self) -> &Vector3<T> {
        &self.position
    }

    pub fn dofs(&self) -> &[Dof<T>] {
        &self.dofs
    }

    pub fn dof(&self, id: DofId) -> Option<&Dof<T>> {
        self.dofs.iter().find(|dof| dof.id() == id)
    }

    pub fn dof_mut(&mut self, id: DofId) -> Option<&mut Dof<T>> {
        self.dofs.iter_mut().find(|dof| dof.id() == id)
    }

    /// Returns the dof with the given identity, creating it if absent.
    ///
    /// Creation merges by identity: a dof requested by several field descriptors
    /// is created exactly once.
    pub fn ensure_dof(&mut self, id: DofId) -> &mut Dof<T> {
        if let Some(position) = self.dofs.iter().position(|dof| dof.id() == id) {
            &mut self.dofs[position]
        } else {
            self.dofs.push(Dof::new(id));
            self.dofs.last_mut().unwrap()
        }
    }
}

/// Arena of nodes and cells making up the discretized domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Domain<T: RealField> {
    dim: usize,
    nodes: Vec<Node<T>>,
    cells: Vec<Cell>,
}

impl<T: RealField> Domain<T> {
    /// Creates an empty domain of the given spatial dimension (1, 2 or 3).
    pub fn new(dim: usize) -> Self {
        assert!((1..=3).contains(&dim), "spatial dimension must be 1, 2 or 3");
        Self {
            dim,
            nodes: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Adds a node at the given coordinates and returns its index.
    ///
    /// `coords` must have exactly `dim` entries; trailing position components
    /// are padded with zero.
    pub fn add_node(&mut self, coords: &[T]) -> usize {
        assert_eq!(coords.len(), self.dim, "node coordinate dimension mismatch");
        let mut position = Vector3::zeros();
        for (i, x) in coords.iter().enumerate() {
            position[i] = x.clone();
        }
        self.nodes.push(Node::new(position));
        self.nodes.len() - 1
    }

    pub fn add_cell(&mut self, cell: Cell) -> usize {
        assert!(
            cell.connectivity().iter().all(|&i| i < self.nodes.len()),
            "cell connectivity references nonexistent node"
        );
        self.cells.push(cell);
        self.cells.len() - 1
    }

    pub fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &Node<T> {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: usize) -> &mut Node<T> {
        &mut self.nodes[index]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    /// Assigns global equation numbers to every dof in the domain.
    ///
    /// Numbering is deterministic: node index order, then dof creation order
    /// within each node. Returns the total number of equations.
    pub fn number_equations(&mut self) -> usize {
        let mut next = 0;
        for node in &mut self.nodes {
            for dof in &mut node.dofs {
                dof.set_equation_number(next);
                next += 1;
            }
        }
        debug!(
            "Assigned {} equation numbers across {} nodes",
            next,
            self.nodes.len()
        );
        next
    }

    /// Commits the current unknown values of every dof as previous-step values.
    pub fn commit_step(&mut self) {
        for node in &mut self.nodes {
            for dof in &mut node.dofs {
                dof.commit();
            }
        }
    }
}
