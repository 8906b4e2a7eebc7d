/// Builds the offsets of consecutive slices with the given lengths.
///
/// Slice `i` spans `offsets[i]..offsets[i + 1]`, the output has
/// `lengths.len() + 1` elements and always starts with 0.
///
/// # Examples
/// ```
/// use msialign::utils::offsets::offsets_from_lengths;
///
/// assert_eq!(offsets_from_lengths(&[2, 0, 3]), vec![0, 2, 2, 5]);
/// assert_eq!(offsets_from_lengths(&[]), vec![0]);
/// ```
pub fn offsets_from_lengths(lengths: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(lengths.len() + 1);
    let mut acc = 0;
    offsets.push(acc);
    for len in lengths {
        acc += len;
        offsets.push(acc);
    }
    offsets
}
