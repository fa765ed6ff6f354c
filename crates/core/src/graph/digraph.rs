use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

/// A directed graph stored as an adjacency map from vertex to successor set.
///
/// Self-loops are rejected and duplicate edges are absorbed by the set-valued
/// adjacency. Every traversal is iterative (explicit work stack), so graph
/// depth never translates into call-stack depth.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    pub adj_map: HashMap<T, HashSet<T>>,
}

impl<T> Default for DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    fn default() -> Self {
        Self {
            adj_map: HashMap::new(),
        }
    }
}

/// Work item for the iterative depth-first traversals.
enum Visit<T> {
    Enter(T),
    Exit(T),
}

impl<T> DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    pub fn add_vertex(&mut self, vertex: T) {
        self.adj_map.entry(vertex).or_default();
    }

    /// Insert the edge `source -> target`.
    ///
    /// Returns `true` if the edge was newly inserted, `false` if it already
    /// existed or is a self-loop.
    pub fn add_edge(&mut self, source: T, target: T) -> bool {
        if source == target {
            return false;
        }
        let inserted = self
            .adj_map
            .entry(source)
            .or_default()
            .insert(target.clone());
        self.adj_map.entry(target).or_default();
        inserted
    }

    /// Remove the edge `source -> target`, keeping both vertices.
    ///
    /// Returns `true` if the edge was present.
    pub fn remove_edge(&mut self, source: &T, target: &T) -> bool {
        self.adj_map
            .get_mut(source)
            .is_some_and(|neighbors| neighbors.remove(target))
    }

    /// Remove a vertex and its outgoing edges.
    ///
    /// Incoming edges are not searched for; callers remove a vertex only
    /// once nothing points at it anymore.
    pub fn remove_vertex(&mut self, vertex: &T) -> Option<HashSet<T>> {
        self.adj_map.remove(vertex)
    }

    #[must_use]
    pub fn has_vertex(&self, vertex: &T) -> bool {
        self.adj_map.contains_key(vertex)
    }

    #[must_use]
    pub fn has_edge(&self, source: &T, target: &T) -> bool {
        self.adj_map
            .get(source)
            .is_some_and(|neighbors| neighbors.contains(target))
    }

    #[must_use]
    pub fn neighbors(&self, source: &T) -> Option<&HashSet<T>> {
        self.adj_map.get(source)
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.adj_map.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adj_map.values().map(HashSet::len).sum()
    }

    /// Iterate over every recorded edge as a `(source, target)` pair.
    pub fn edges(&self) -> impl Iterator<Item = (&T, &T)> {
        self.adj_map
            .iter()
            .flat_map(|(source, neighbors)| neighbors.iter().map(move |target| (source, target)))
    }

    /// Three-color depth-first search over every vertex.
    ///
    /// A vertex is `active` while it sits on the current traversal path and
    /// `closed` once its whole subtree has been explored; meeting an active
    /// vertex again is a back edge, hence a cycle.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        let mut closed: HashSet<T> = HashSet::new();
        let mut active: HashSet<T> = HashSet::new();
        let mut stack: Vec<Visit<T>> = Vec::new();

        for root in self.adj_map.keys() {
            if closed.contains(root) {
                continue;
            }
            stack.push(Visit::Enter(root.clone()));
            while let Some(visit) = stack.pop() {
                match visit {
                    Visit::Enter(vertex) => {
                        if closed.contains(&vertex) || active.contains(&vertex) {
                            continue;
                        }
                        active.insert(vertex.clone());
                        if let Some(neighbors) = self.adj_map.get(&vertex) {
                            stack.push(Visit::Exit(vertex));
                            for neighbor in neighbors {
                                if active.contains(neighbor) {
                                    return true;
                                }
                                if !closed.contains(neighbor) {
                                    stack.push(Visit::Enter(neighbor.clone()));
                                }
                            }
                        } else {
                            active.remove(&vertex);
                            closed.insert(vertex);
                        }
                    }
                    Visit::Exit(vertex) => {
                        active.remove(&vertex);
                        closed.insert(vertex);
                    }
                }
            }
        }

        false
    }

    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        !self.has_cycle()
    }

    /// Every vertex reachable from `source` by following edges, `source`
    /// itself included.
    #[must_use]
    pub fn reachable_from(&self, source: &T) -> HashSet<T> {
        let mut reachable: HashSet<T> = [source.clone()].into();
        let mut stack = vec![source.clone()];
        while let Some(vertex) = stack.pop() {
            if let Some(neighbors) = self.adj_map.get(&vertex) {
                for neighbor in neighbors {
                    if reachable.insert(neighbor.clone()) {
                        stack.push(neighbor.clone());
                    }
                }
            }
        }
        reachable
    }

    /// Build the graph with every edge direction flipped.
    #[must_use]
    pub fn reverse(&self) -> Self {
        let mut reversed = Self::default();
        for (source, neighbors) in &self.adj_map {
            for target in neighbors {
                reversed.add_edge(target.clone(), source.clone());
            }
        }
        reversed
    }
}
