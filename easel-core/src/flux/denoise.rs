use candle_core::{Result, Tensor, D};
use candle_transformers::models::flux::{sampling::State, WithForward};

/// Euler sampling over `timesteps`, with true classifier-free guidance when an
/// unconditional state is given.
pub(super) fn denoise<M: WithForward>(
    model: &M,
    cond: &State,
    uncond: Option<&State>,
    timesteps: &[f64],
    guidance: f64,
    true_cfg_scale: f64,
) -> Result<Tensor> {
    let b_sz = cond.img.dim(0)?;
    let dev = cond.img.device();
    let guidance = Tensor::full(guidance as f32, b_sz, dev)?;
    let mut img = cond.img.clone();
    for window in timesteps.windows(2) {
        let (t_curr, t_prev) = match window {
            [a, b] => (*a, *b),
            _ => continue,
        };
        let t_vec = Tensor::full(t_curr as f32, b_sz, dev)?;
        let pred = predict(model, &img, cond, &t_vec, &guidance)?;
        let pred = match uncond {
            Some(uncond) => {
                let neg_pred = predict(model, &img, uncond, &t_vec, &guidance)?;
                true_cfg(&pred, &neg_pred, true_cfg_scale)?
            }
            None => pred,
        };
        img = (img + (pred * (t_prev - t_curr))?)?;
    }
    Ok(img)
}

fn predict<M: WithForward>(
    model: &M,
    img: &Tensor,
    state: &State,
    t_vec: &Tensor,
    guidance: &Tensor,
) -> Result<Tensor> {
    model.forward(
        img,
        &state.img_ids,
        &state.txt,
        &state.txt_ids,
        t_vec,
        &state.vec,
        Some(guidance),
    )
}

/// `uncond + scale * (cond - uncond)`, rescaled so each token keeps the norm of
/// the conditional prediction.
pub(super) fn true_cfg(cond: &Tensor, uncond: &Tensor, scale: f64) -> Result<Tensor> {
    let combined = (uncond + ((cond - uncond)? * scale)?)?;
    let cond_norm = cond.sqr()?.sum_keepdim(D::Minus1)?.sqrt()?;
    let combined_norm = combined.sqr()?.sum_keepdim(D::Minus1)?.sqrt()?;
    combined.broadcast_mul(&cond_norm.broadcast_div(&combined_norm)?)
}
