use nalgebra as na;

/// Mean and population standard deviation of every coordinate.
///
/// Returns `None` for an empty input.
pub fn mean_std<'a, I>(points: I) -> Option<(na::Vector2<f64>, na::Vector2<f64>)>
where
    I: IntoIterator<Item = &'a na::Point2<f32>>,
{
    let mut n = 0usize;
    let mut sum = na::Vector2::<f64>::zeros();
    let mut sum_sq = na::Vector2::<f64>::zeros();

    for p in points {
        let v = na::Vector2::new(p.x as f64, p.y as f64);
        sum += v;
        sum_sq += v.component_mul(&v);
        n += 1;
    }

    if n == 0 {
        return None;
    }

    let n = n as f64;
    let mean = sum / n;
    let var = (sum_sq / n - mean.component_mul(&mean)).map(|x| x.max(0.0));

    Some((mean, var.map(f64::sqrt)))
}
