/// Indices that visit `masses` in ascending order.
///
/// Equal masses keep their original relative order, so the result only
/// depends on the input values and never on the sort implementation.
/// NaN sorts after every number (`f64::total_cmp`).
pub fn argsort_masses(masses: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..masses.len()).collect();
    // Stable sort, ties stay by index.
    order.sort_by(|&a, &b| masses[a].total_cmp(&masses[b]));
    order
}

/// Macro that sorts an arbitrary number of vecs by the mass values
/// in the first one.
///
/// NOTE: This macro creates a new ordered vec for each one.
/// Ties in the first vec keep their original order.
///
/// # Example
/// ```
/// use msialign::sort_vecs_by_mass;
///
/// let mz = vec![300.5, 100.25, 200.0];
/// let intensity = vec![1.0, 2.0, 3.0];
/// let out = sort_vecs_by_mass!(&mz, &intensity);
///
/// assert_eq!(out.0, vec![100.25, 200.0, 300.5]);
/// assert_eq!(out.1, vec![2.0, 3.0, 1.0]);
/// ```
#[macro_export]
macro_rules! sort_vecs_by_mass {
    ($first:expr $(,$rest:expr)*) => {{
        let first_vec = $first;
        let len = first_vec.len();
        let indices = $crate::utils::sorting::argsort_masses(&first_vec[..]);

        let sorted_first: Vec<f64> = indices.iter().map(|&i| first_vec[i]).collect();

        (sorted_first, $( {
            let other_vec = $rest;
            assert_eq!(other_vec.len(), len, "All vectors must have the same length");
            indices.iter().map(|&i| other_vec[i]).collect::<Vec<_>>()
        }, )*)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argsort_ties_keep_index_order() {
        let masses = vec![5.0, 1.0, 5.0, 1.0, 3.0];
        assert_eq!(argsort_masses(&masses), vec![1, 3, 4, 0, 2]);
    }

    #[test]
    fn test_sort_three_vecs() {
        let v1 = vec![3.0, 1.0, 4.0];
        let v2 = vec!['x', 'y', 'z'];
        let v3 = vec![true, false, true];

        let (sorted_v1, sorted_v2, sorted_v3) = sort_vecs_by_mass!(v1, v2, v3);

        assert_eq!(sorted_v1, vec![1.0, 3.0, 4.0]);
        assert_eq!(sorted_v2, vec!['y', 'x', 'z']);
        assert_eq!(sorted_v3, vec![false, true, true]);
    }

    #[test]
    fn test_sort_empty() {
        let v1: Vec<f64> = vec![];
        let v2: Vec<f64> = vec![];
        let (a, b) = sort_vecs_by_mass!(v1, v2);
        assert!(a.is_empty());
        assert!(b.is_empty());
    }
}
