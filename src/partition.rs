use crate::feature::Features;
use crate::selector::Selection;

/// Splits `features` into the ones strictly inside the selection and the rest.
/// Both halves keep the input order.
pub fn partition(features: &Features, selection: &Selection) -> (Features, Features) {
    let bbox = selection.bounding_box();
    let (inside, outside): (Vec<usize>, Vec<usize>) =
        (0..features.len()).partition(|&idx| bbox.contains(&features.points()[idx]));

    (features.select(&inside), features.select(&outside))
}
