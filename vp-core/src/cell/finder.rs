/// Connected-component labeling of weather cells over the cyclic-azimuth
/// polar raster.
///
/// Runs as a classic two-pass union-find labeling treating azimuth as a
/// linear raster dimension, then fixes up the azimuth seam (ray 0 is
/// adjacent to ray `n_azim - 1`) as an explicit second phase rather than
/// folding it into the main scan. Non-recursive by construction: labeling
/// conflicts are resolved by merging equivalence classes in a `parent`
/// table, never by re-walking already-visited gates.
use std::collections::HashMap;

use ndarray::Array2;

use crate::model::{cyclic, CellMap, CELL_ID_START};

fn find_root(parent: &mut [i32], x: i32) -> i32 {
    let mut root = x;
    while parent[root as usize] != root {
        root = parent[root as usize];
    }
    let mut cur = x;
    while parent[cur as usize] != root {
        let next = parent[cur as usize];
        parent[cur as usize] = root;
        cur = next;
    }
    root
}

fn union(parent: &mut Vec<i32>, a: i32, b: i32) {
    let ra = find_root(parent, a);
    let rb = find_root(parent, b);
    if ra != rb {
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[hi as usize] = lo;
    }
}

pub struct CellFinder;

impl CellFinder {
    /// Label 8-connected runs of `true` gates in `is_weather` into
    /// `cell_map`, assigning ids starting at `next_id`. A candidate gate
    /// only joins a cell when at least `n_neighbors_min` of the 3x3 window
    /// around it (center excluded) also qualify. Returns the next free id,
    /// so a second call (e.g. a dual-pol refinement pass) can continue
    /// numbering into the same map without id collisions.
    pub fn find(is_weather: &Array2<bool>, cell_map: &mut CellMap, next_id: i32, n_neighbors_min: usize) -> i32 {
        let shape = is_weather.shape();
        let (n_azim, n_rang) = (shape[0], shape[1]);
        let mut labels = Array2::from_elem((n_azim, n_rang), 0i32);
        let mut parent: Vec<i32> = vec![0];

        for i in 0..n_azim {
            for j in 0..n_rang {
                if !is_weather[[i, j]] {
                    continue;
                }

                let mut n_qualifying_neighbors = 0usize;
                for di in [-1i64, 0, 1] {
                    for dj in [-1i64, 0, 1] {
                        if di == 0 && dj == 0 {
                            continue;
                        }
                        let jj = j as i64 + dj;
                        if jj < 0 || jj as usize >= n_rang {
                            continue;
                        }
                        let ii = cyclic(i as i64 + di, n_azim);
                        if is_weather[[ii, jj as usize]] {
                            n_qualifying_neighbors += 1;
                        }
                    }
                }
                if n_qualifying_neighbors < n_neighbors_min {
                    continue;
                }

                let mut neighbor_labels: Vec<i32> = Vec::new();
                if i > 0 {
                    if j > 0 && labels[[i - 1, j - 1]] != 0 {
                        neighbor_labels.push(labels[[i - 1, j - 1]]);
                    }
                    if labels[[i - 1, j]] != 0 {
                        neighbor_labels.push(labels[[i - 1, j]]);
                    }
                    if j + 1 < n_rang && labels[[i - 1, j + 1]] != 0 {
                        neighbor_labels.push(labels[[i - 1, j + 1]]);
                    }
                }
                if j > 0 && labels[[i, j - 1]] != 0 {
                    neighbor_labels.push(labels[[i, j - 1]]);
                }

                if neighbor_labels.is_empty() {
                    let new_label = parent.len() as i32;
                    parent.push(new_label);
                    labels[[i, j]] = new_label;
                } else {
                    let min_label = *neighbor_labels.iter().min().unwrap();
                    labels[[i, j]] = min_label;
                    for &l in &neighbor_labels {
                        union(&mut parent, min_label, l);
                    }
                }
            }
        }

        if n_azim > 1 {
            for j in 0..n_rang {
                if !is_weather[[0, j]] {
                    continue;
                }
                for dj in [-1i64, 0, 1] {
                    let jj = j as i64 + dj;
                    if jj < 0 || jj as usize >= n_rang {
                        continue;
                    }
                    let jj = jj as usize;
                    let last = cyclic(-1, n_azim);
                    if !is_weather[[last, jj]] {
                        continue;
                    }
                    let (a, b) = (labels[[0, j]], labels[[last, jj]]);
                    if a != 0 && b != 0 {
                        union(&mut parent, a, b);
                    }
                }
            }
        }

        let mut root_to_id: HashMap<i32, i32> = HashMap::new();
        let mut id_counter = next_id;
        for i in 0..n_azim {
            for j in 0..n_rang {
                let label = labels[[i, j]];
                if label == 0 {
                    continue;
                }
                let root = find_root(&mut parent, label);
                let id = *root_to_id.entry(root).or_insert_with(|| {
                    let id = id_counter;
                    id_counter += 1;
                    id
                });
                cell_map[[i, j]] = id;
            }
        }

        id_counter
    }
}
