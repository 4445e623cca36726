//! Minimum-cost bipartite assignment (Hungarian / Kuhn-Munkres).
//!
//! Shortest augmenting path formulation with row/column potentials,
//! O(n² · m) for an n × m matrix with n ≤ m. Taller matrices are solved on
//! their transpose.

use ndarray::Array2;

/// Substitute for non-finite costs so every augmenting search terminates.
const FORBIDDEN_COST: f64 = 1e12;

/// Solve the assignment problem for a rectangular cost matrix.
///
/// Returns, for each row, the column it is assigned to. Every row receives a
/// column when `rows <= cols`; otherwise exactly `cols` rows do.
pub fn solve(cost: &Array2<f64>) -> Vec<Option<usize>> {
    let (rows, cols) = cost.dim();
    if rows == 0 || cols == 0 {
        return vec![None; rows];
    }

    if rows > cols {
        let transposed = cost.t().to_owned();
        let mut assignment = vec![None; rows];
        for (col, row) in solve(&transposed).into_iter().enumerate() {
            if let Some(row) = row {
                assignment[row] = Some(col);
            }
        }
        return assignment;
    }

    let at = |r: usize, c: usize| -> f64 {
        let value = cost[[r, c]];
        if value.is_finite() {
            value
        } else {
            FORBIDDEN_COST
        }
    };

    // 1-indexed; index 0 is the virtual column used to seed each search.
    let mut u = vec![0.0f64; rows + 1];
    let mut v = vec![0.0f64; cols + 1];
    let mut owner = vec![0usize; cols + 1];
    let mut way = vec![0usize; cols + 1];

    for row in 1..=rows {
        owner[0] = row;
        let mut j0 = 0usize;
        let mut min_slack = vec![f64::INFINITY; cols + 1];
        let mut used = vec![false; cols + 1];

        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=cols {
                if used[j] {
                    continue;
                }
                let slack = at(i0 - 1, j - 1) - u[i0] - v[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }

            for j in 0..=cols {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }

            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path.
        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; rows];
    for col in 1..=cols {
        if owner[col] != 0 {
            assignment[owner[col] - 1] = Some(col - 1);
        }
    }
    assignment
}

/// Total cost of an assignment.
pub fn assignment_cost(cost: &Array2<f64>, assignment: &[Option<usize>]) -> f64 {
    assignment
        .iter()
        .enumerate()
        .filter_map(|(row, col)| col.map(|c| cost[[row, c]]))
        .sum()
}
