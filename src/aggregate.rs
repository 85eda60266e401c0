use crate::vocab::VocabularyIndex;

use ndarray::Array1;

/// IDF-weighted average of the neighbour vectors of the centred id in `window`.
///
/// `window` holds `2 * context_size + 1` ids. The centred offset carries no weight. Returns
/// `None` when the neighbour idfs sum to zero, in which case nothing must be written.
pub fn aggregate(window: &[usize], vocab: &VocabularyIndex, context_size: usize) -> Option<Array1<f32>> {

    debug_assert_eq!(window.len(), 2 * context_size + 1);
    let left = &window[..context_size];
    let right = &window[context_size + 1..];

    // left half then right half, both starting from zero
    let idfsum = left.iter().map(|id| vocab.idf(*id)).sum::<f32>()
        + right.iter().map(|id| vocab.idf(*id)).sum::<f32>();
    if idfsum == 0.0 {
        return None;
    }
    let inv_idfsum = 1.0 / idfsum;

    let mut out: Array1<f32> = Array1::zeros(vocab.vecdim());
    for id in left.iter().chain(right.iter()) {
        let weight = vocab.idf(*id) * inv_idfsum;
        out.scaled_add(weight, &vocab.vector(*id));
    }
    Some(out)
}
