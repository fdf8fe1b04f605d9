//! Dugan gain-sharing computation.

/// Denominator guard for the weighted-level sum.
const EPSILON: f64 = 1e-10;

/// Compute gain-sharing targets for one block.
///
/// Pure and stateless: given per-channel RMS levels, weights, and activity
/// flags (all slices of equal length), writes a target gain per channel into
/// `gains` and returns the number of open microphones.
///
/// Active channels split a single unit of gain in proportion to their
/// weighted RMS, so the targets over the active set sum to 1. Inactive
/// channels get 0. When the active set is non-empty but its weighted level
/// sum is vanishing, the unit is split by weight alone. When nothing is
/// active, `held` (the last-mic-hold channel, if any) keeps the whole unit.
pub fn compute_gain_share(
    rms: &[f64],
    weights: &[f64],
    active: &[bool],
    held: Option<usize>,
    gains: &mut [f64],
) -> f64 {
    let n = gains.len();
    gains.fill(0.0);

    let mut weighted_sum = 0.0;
    let mut nom = 0.0;
    for i in 0..n {
        if active[i] {
            weighted_sum += rms[i] * weights[i];
            nom += 1.0;
        }
    }

    if nom > 0.0 {
        if weighted_sum > EPSILON {
            for i in 0..n {
                if active[i] {
                    gains[i] = rms[i] * weights[i] / weighted_sum;
                }
            }
        } else {
            // Active channels with no measurable level: split by weight.
            let weight_sum: f64 = (0..n).filter(|&i| active[i]).map(|i| weights[i]).sum();
            if weight_sum > EPSILON {
                for i in 0..n {
                    if active[i] {
                        gains[i] = weights[i] / weight_sum;
                    }
                }
            }
        }
    } else if let Some(ch) = held {
        if ch < n {
            gains[ch] = 1.0;
            nom = 1.0;
        }
    }

    nom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share(rms: &[f64], weights: &[f64], active: &[bool], held: Option<usize>) -> (Vec<f64>, f64) {
        let mut gains = vec![0.0; rms.len()];
        let nom = compute_gain_share(rms, weights, active, held, &mut gains);
        (gains, nom)
    }

    #[test]
    fn test_single_active_channel_gets_unity() {
        let (gains, nom) = share(&[0.5], &[1.0], &[true], None);
        assert!((gains[0] - 1.0).abs() < 1e-12);
        assert_eq!(nom, 1.0);
    }

    #[test]
    fn test_equal_channels_split_evenly() {
        let (gains, nom) = share(&[0.5, 0.5], &[1.0, 1.0], &[true, true], None);
        assert!((gains[0] - 0.5).abs() < 1e-12);
        assert!((gains[1] - 0.5).abs() < 1e-12);
        assert_eq!(nom, 2.0);
    }

    #[test]
    fn test_proportional_to_level() {
        let (gains, _) = share(&[0.75, 0.25], &[1.0, 1.0], &[true, true], None);
        assert!((gains[0] - 0.75).abs() < 1e-12);
        assert!((gains[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_weights_shift_distribution() {
        let (gains, _) = share(&[0.5, 0.5], &[1.0, 0.5], &[true, true], None);
        assert!((gains[0] - 0.5 / 0.75).abs() < 1e-12);
        assert!((gains[1] - 0.25 / 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_higher_weight_never_gets_less() {
        let (gains, _) = share(&[0.3, 0.3], &[0.9, 0.4], &[true, true], None);
        assert!(gains[0] >= gains[1]);
    }

    #[test]
    fn test_inactive_channel_gets_zero() {
        let (gains, nom) = share(&[0.5, 0.5], &[1.0, 1.0], &[true, false], None);
        assert!((gains[0] - 1.0).abs() < 1e-12);
        assert_eq!(gains[1], 0.0);
        assert_eq!(nom, 1.0);
    }

    #[test]
    fn test_gains_sum_to_one() {
        let rms = [0.1, 0.3, 0.2, 0.4];
        let weights = [1.0, 0.8, 1.0, 0.5];
        let (gains, _) = share(&rms, &weights, &[true; 4], None);
        let sum: f64 = gains.iter().sum();
        // Conservation bound: 2^-20 relative.
        assert!((sum - 1.0).abs() < 9.6e-7, "gain sum {} not ~1", sum);
    }

    #[test]
    fn test_silent_actives_split_by_weight() {
        let (gains, nom) = share(&[0.0, 0.0], &[1.0, 0.5], &[true, true], None);
        assert!((gains[0] - 1.0 / 1.5).abs() < 1e-12);
        assert!((gains[1] - 0.5 / 1.5).abs() < 1e-12);
        assert_eq!(nom, 2.0);
    }

    #[test]
    fn test_all_silent_holds_last_mic() {
        let (gains, nom) = share(&[0.0, 0.0], &[1.0, 1.0], &[false, false], Some(1));
        assert_eq!(gains[0], 0.0);
        assert!((gains[1] - 1.0).abs() < 1e-12);
        assert_eq!(nom, 1.0);
    }

    #[test]
    fn test_all_silent_no_hold_is_all_zero() {
        let (gains, nom) = share(&[0.0, 0.0], &[1.0, 1.0], &[false, false], None);
        assert_eq!(gains, vec![0.0, 0.0]);
        assert_eq!(nom, 0.0);
    }

    #[test]
    fn test_out_of_range_hold_ignored() {
        let (gains, nom) = share(&[0.0, 0.0], &[1.0, 1.0], &[false, false], Some(7));
        assert_eq!(gains, vec![0.0, 0.0]);
        assert_eq!(nom, 0.0);
    }

    #[test]
    fn test_many_channels_conserve_gain() {
        let n = 32;
        let rms: Vec<f64> = (0..n).map(|i| 0.01 + 0.02 * i as f64).collect();
        let weights: Vec<f64> = (0..n).map(|i| 0.2 + 0.025 * i as f64).collect();
        let active = vec![true; n];
        let (gains, nom) = share(&rms, &weights, &active, None);
        assert_eq!(nom, n as f64);
        let sum: f64 = gains.iter().sum();
        assert!((sum - 1.0).abs() < 9.6e-7, "gain sum {} not ~1", sum);
        assert!(gains.iter().all(|&g| (0.0..=1.0).contains(&g)));
    }
}
