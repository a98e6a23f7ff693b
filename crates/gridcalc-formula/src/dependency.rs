//! Dependency tracking for formula calculation
//!
//! [`resolve_dependencies`] collects what a single formula reads. A
//! [`DependencyGraph`] links a batch of formula cells together, finds circular
//! references and orders the rest into layers that can be evaluated in parallel.

use crate::ast::{ExprKind, FormulaExpr};
use crate::error::FormulaError;
use ahash::{AHashMap, AHashSet};
use gridcalc_core::{CellKey, RangeKey};

/// Everything a formula reads, in first-seen order
///
/// `cells` holds single cells and named values; `ranges` stays unexpanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    pub cells: Vec<CellKey>,
    pub ranges: Vec<RangeKey>,
}

impl DependencySet {
    /// Whether the formula reads nothing from the snapshot
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.ranges.is_empty()
    }

    /// Whether `key` is read directly or through one of the ranges
    pub fn touches(&self, key: &CellKey) -> bool {
        self.cells.contains(key) || self.ranges.iter().any(|range| range.contains(key))
    }

    /// Fully-qualified text of every dependency, cells first
    pub fn to_strings(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(ToString::to_string)
            .chain(self.ranges.iter().map(ToString::to_string))
            .collect()
    }
}

/// Collect every cell, range and name an AST references
///
/// This is a pure traversal; ranges are kept as ranges.
///
/// ```rust
/// use gridcalc_formula::{parse_formula, resolve_dependencies};
///
/// let ast = parse_formula("=SUM(A1:A3)*$B$1+Sheet2!C1+rate").unwrap();
/// let deps = resolve_dependencies(&ast);
/// assert_eq!(deps.to_strings(), vec!["B1", "Sheet2!C1", "RATE", "A1:A3"]);
/// ```
pub fn resolve_dependencies(expr: &FormulaExpr) -> DependencySet {
    let mut set = DependencySet::default();
    let mut seen_cells = AHashSet::new();
    let mut seen_ranges = AHashSet::new();

    expr.walk(&mut |node| match &node.kind {
        ExprKind::CellRef(reference) => {
            let key = reference.key();
            if seen_cells.insert(key.clone()) {
                set.cells.push(key);
            }
        }
        ExprKind::NameRef(name) => {
            let key = CellKey::name(name);
            if seen_cells.insert(key.clone()) {
                set.cells.push(key);
            }
        }
        ExprKind::RangeRef(reference) => {
            let key = reference.key();
            if seen_ranges.insert(key.clone()) {
                set.ranges.push(key);
            }
        }
        _ => {}
    });

    set
}

/// Evaluation order for a batch of formula cells
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    /// Cells grouped by level; no cell depends on another cell of its own layer
    /// or of a later one
    pub layers: Vec<Vec<CellKey>>,
    /// Cells that sit on, or downstream of, a cycle, with the cycle path they report
    pub circular: AHashMap<CellKey, Vec<CellKey>>,
}

impl Schedule {
    /// The cycle blocking `key`, if any
    pub fn cycle_for(&self, key: &CellKey) -> Option<&[CellKey]> {
        self.circular.get(key).map(Vec::as_slice)
    }

    /// The error reported for `key` when it cannot be evaluated
    pub fn error_for(&self, key: &CellKey) -> Option<FormulaError> {
        self.cycle_for(key).map(circular_reference)
    }
}

/// Build the circular-reference error for a cycle path
pub fn circular_reference(path: &[CellKey]) -> FormulaError {
    FormulaError::CircularReference(path.iter().map(ToString::to_string).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Dependency graph over a batch of formula cells
///
/// Edges point from a dependent cell to each batch cell it reads, either directly
/// or through a range. References to cells outside the batch are plain snapshot
/// reads and do not create edges.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    nodes: Vec<CellKey>,
    index: AHashMap<CellKey, usize>,
    /// node → its dependencies, deduplicated
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a batch of `(cell, dependencies)` pairs
    ///
    /// Every cell becomes a node before any edge is added, so a range may pick up
    /// batch cells listed after the formula that reads it.
    pub fn from_formulas<'a, I>(formulas: I) -> Self
    where
        I: IntoIterator<Item = (CellKey, &'a DependencySet)>,
    {
        let formulas: Vec<_> = formulas.into_iter().collect();
        let mut graph = Self::new();
        for (cell, _) in &formulas {
            graph.add_cell(cell.clone());
        }

        for (cell, deps) in &formulas {
            for dep in &deps.cells {
                if graph.index.contains_key(dep) {
                    graph.add_dependency(cell, dep);
                }
            }
            for range in &deps.ranges {
                let inside: Vec<CellKey> = graph
                    .nodes
                    .iter()
                    .filter(|node| range.contains(node))
                    .cloned()
                    .collect();
                for dep in &inside {
                    graph.add_dependency(cell, dep);
                }
            }
        }

        graph
    }

    /// Add a node, returning its index; adding an existing cell is a no-op
    pub fn add_cell(&mut self, cell: CellKey) -> usize {
        if let Some(&idx) = self.index.get(&cell) {
            return idx;
        }
        let idx = self.nodes.len();
        self.index.insert(cell.clone(), idx);
        self.nodes.push(cell);
        self.edges.push(Vec::new());
        idx
    }

    /// Add a dependency: `dependent` reads `precedent`
    pub fn add_dependency(&mut self, dependent: &CellKey, precedent: &CellKey) {
        let from = self.add_cell(dependent.clone());
        let to = self.add_cell(precedent.clone());
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
    }

    /// Cells that `cell` reads directly
    pub fn dependencies(&self, cell: &CellKey) -> impl Iterator<Item = &CellKey> + '_ {
        self.index
            .get(cell)
            .into_iter()
            .flat_map(move |&idx| self.edges[idx].iter().map(move |&dep| &self.nodes[dep]))
    }

    /// Number of cells in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no cells
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `cell` is on a cycle or depends on one
    pub fn has_circular_reference(&self, cell: &CellKey) -> bool {
        self.schedule().circular.contains_key(cell)
    }

    /// Find circular references and order the remaining cells into layers
    ///
    /// Cycles are found by depth-first search; revisiting a cell that is still on the
    /// search path yields the path from that cell back to itself, e.g.
    /// `A1 -> B1 -> A1`. Cells that depend on a cycle report the same path. The
    /// remaining cells are layered with Kahn's algorithm, keeping insertion order
    /// within a layer.
    pub fn schedule(&self) -> Schedule {
        let n = self.nodes.len();
        let mut state = vec![Visit::New; n];
        let mut blocked: Vec<Option<usize>> = vec![None; n];
        let mut cycles: Vec<Vec<usize>> = Vec::new();
        let mut postorder = Vec::with_capacity(n);
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if state[root] != Visit::New {
                continue;
            }
            state[root] = Visit::Active;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                frame.1 += 1;

                let Some(&dep) = self.edges[node].get(next) else {
                    state[node] = Visit::Done;
                    postorder.push(node);
                    stack.pop();
                    continue;
                };

                match state[dep] {
                    Visit::New => {
                        state[dep] = Visit::Active;
                        stack.push((dep, 0));
                    }
                    Visit::Active => {
                        let at = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                        let mut path: Vec<usize> = stack[at..].iter().map(|&(n, _)| n).collect();
                        path.push(dep);
                        let id = cycles.len();
                        for &member in &path {
                            blocked[member].get_or_insert(id);
                        }
                        cycles.push(path);
                    }
                    Visit::Done => {}
                }
            }
        }

        // postorder visits dependencies before dependents outside of cycles
        for &node in &postorder {
            if blocked[node].is_none() {
                blocked[node] = self.edges[node].iter().find_map(|&dep| blocked[dep]);
            }
        }

        let mut schedule = Schedule::default();
        for (node, cycle) in blocked.iter().enumerate() {
            if let Some(id) = cycle {
                let path = cycles[*id].iter().map(|&i| self.nodes[i].clone()).collect();
                schedule.circular.insert(self.nodes[node].clone(), path);
            }
        }
        if !cycles.is_empty() {
            tracing::warn!(
                cycles = cycles.len(),
                blocked = schedule.circular.len(),
                "circular references in batch"
            );
        }

        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for node in (0..n).filter(|&i| blocked[i].is_none()) {
            for &dep in &self.edges[node] {
                indegree[node] += 1;
                dependents[dep].push(node);
            }
        }

        let mut current: Vec<usize> = (0..n)
            .filter(|&i| blocked[i].is_none() && indegree[i] == 0)
            .collect();
        while !current.is_empty() {
            let mut next = Vec::new();
            for &node in &current {
                for &dependent in &dependents[node] {
                    indegree[dependent] -= 1;
                    if indegree[dependent] == 0 {
                        next.push(dependent);
                    }
                }
            }
            next.sort_unstable();
            tracing::trace!(layer = schedule.layers.len(), cells = current.len(), "scheduled layer");
            schedule
                .layers
                .push(current.iter().map(|&i| self.nodes[i].clone()).collect());
            current = next;
        }

        schedule
    }

    /// Topological layers of the cells not blocked by a cycle
    pub fn layers(&self) -> Vec<Vec<CellKey>> {
        self.schedule().layers
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.edges.clear();
    }
}
