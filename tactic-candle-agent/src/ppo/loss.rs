//! Terms of the PPO objective.
use anyhow::Result;
use candle_core::{Tensor, D};

/// Centers advantages and divides them by their standard deviation.
///
/// The standard deviation is floored at `eps`, so a batch of identical
/// advantages gives zeros instead of NaN.
pub fn normalize_advantages(adv: &Tensor, eps: f64) -> Result<Tensor> {
    let n = adv.dims1()?;
    let centered = adv.broadcast_sub(&adv.mean_all()?)?;
    let var = match n {
        0 | 1 => 0.0,
        n => centered.sqr()?.sum_all()?.to_scalar::<f32>()? as f64 / (n - 1) as f64,
    };
    let std = var.sqrt().max(eps);
    Ok((centered / std)?)
}

/// Log-probability of composite actions.
///
/// `base_act` holds base action indices, shape `[batch]`. `spatial` holds
/// the spatial probabilities `[batch, 2, n_cells]`, the chosen cells
/// `[batch, 2]` and the applicability of each slot `[batch, 2]`; slots that
/// are not applicable do not contribute.
pub fn composite_log_prob(
    base_probs: &Tensor,
    base_act: &Tensor,
    spatial: Option<(&Tensor, &Tensor, &Tensor)>,
    eps: f64,
) -> Result<Tensor> {
    let lp = base_probs
        .gather(&base_act.unsqueeze(1)?, 1)?
        .squeeze(1)?
        .affine(1.0, eps)?
        .log()?;

    match spatial {
        None => Ok(lp),
        Some((probs, cells, applicable)) => {
            let picked = probs.gather(&cells.unsqueeze(2)?, 2)?.squeeze(2)?;
            let lp_spatial = (picked.affine(1.0, eps)?.log()? * applicable)?.sum(1)?;
            Ok((lp + lp_spatial)?)
        }
    }
}

/// Mean entropy of categorical distributions along the last dimension.
pub fn entropy(probs: &Tensor, eps: f64) -> Result<Tensor> {
    let plogp = (probs * probs.affine(1.0, eps)?.log()?)?;
    Ok(plogp.sum(D::Minus1)?.mean_all()?.neg()?)
}

/// Negated mean of the clipped surrogate objective.
pub fn clipped_surrogate(ratio: &Tensor, adv: &Tensor, clip: f64) -> Result<Tensor> {
    let unclipped = (ratio * adv)?;
    let clipped = (ratio.clamp(1.0 - clip, 1.0 + clip)? * adv)?;
    Ok(unclipped.minimum(&clipped)?.mean_all()?.neg()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn vec1(v: &[f32]) -> Result<Tensor> {
        Ok(Tensor::from_slice(v, (v.len(),), &Device::Cpu)?)
    }

    #[test]
    fn test_normalize_advantages() -> Result<()> {
        let adv = normalize_advantages(&vec1(&[1.0, 2.0, 3.0])?, 1e-6)?.to_vec1::<f32>()?;
        assert!((adv[0] + 1.0).abs() < 1e-5);
        assert!(adv[1].abs() < 1e-5);
        assert!((adv[2] - 1.0).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_degenerate_advantages_are_finite() -> Result<()> {
        let adv = normalize_advantages(&vec1(&[0.5, 0.5, 0.5, 0.5])?, 1e-6)?.to_vec1::<f32>()?;
        assert!(adv.iter().all(|a| *a == 0.0));

        let adv = normalize_advantages(&vec1(&[2.0])?, 1e-6)?.to_vec1::<f32>()?;
        assert_eq!(adv, vec![0.0]);
        Ok(())
    }

    #[test]
    fn test_inapplicable_slots_do_not_contribute() -> Result<()> {
        let dev = Device::Cpu;
        let base_probs = Tensor::from_slice(&[0.5f32, 0.5, 0.25, 0.75], (2, 2), &dev)?;
        let base_act = Tensor::from_slice(&[0u32, 1], (2,), &dev)?;
        let spatial = Tensor::from_slice(
            &[0.1f32, 0.9, 0.3, 0.7, 0.6, 0.4, 0.2, 0.8],
            (2, 2, 2),
            &dev,
        )?;
        let cells = Tensor::from_slice(&[1u32, 0, 0, 1], (2, 2), &dev)?;
        let applicable = Tensor::from_slice(&[1f32, 0.0, 0.0, 0.0], (2, 2), &dev)?;

        let lp = composite_log_prob(&base_probs, &base_act, Some((&spatial, &cells, &applicable)), 0.0)?
            .to_vec1::<f32>()?;
        assert!((lp[0] - (0.5f32.ln() + 0.9f32.ln())).abs() < 1e-5);
        assert!((lp[1] - 0.75f32.ln()).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_entropy_of_uniform() -> Result<()> {
        let probs = Tensor::from_slice(&[0.25f32; 4], (1, 4), &Device::Cpu)?;
        let ent = entropy(&probs, 0.0)?.to_scalar::<f32>()?;
        assert!((ent - 4f32.ln()).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_clipped_surrogate() -> Result<()> {
        let ratio = vec1(&[1.5, 0.5])?;
        let adv = vec1(&[1.0, -1.0])?;
        // min(1.5, 1.1) = 1.1 and min(-0.5, -0.9) = -0.9
        let loss = clipped_surrogate(&ratio, &adv, 0.1)?.to_scalar::<f32>()?;
        assert!((loss + 0.1).abs() < 1e-5);
        Ok(())
    }
}
