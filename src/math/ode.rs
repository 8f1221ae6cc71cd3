/// Stage slopes and the trial state of one [`rk4_step`]. Allocated once per
/// integration and refitted when the state length changes.
#[derive(Debug, Clone, Default)]
pub struct Rk4Workspace {
    slopes: [Vec<f64>; 4],
    trial: Vec<f64>,
}

impl Rk4Workspace {
    pub fn new(len: usize) -> Self {
        let mut ws = Self::default();
        ws.fit(len);
        ws
    }

    pub fn len(&self) -> usize {
        self.trial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trial.is_empty()
    }

    fn fit(&mut self, len: usize) {
        if self.trial.len() == len {
            return;
        }
        for buf in self.slopes.iter_mut().chain(std::iter::once(&mut self.trial)) {
            buf.resize(len, 0.0);
        }
    }
}

/// One fixed-step classical RK4 step. No error control.
///
/// The derivative closure may fail; `y` is only updated once all four stages
/// succeeded.
pub fn rk4_step<F, E>(y: &mut [f64], t: f64, dt: f64, ws: &mut Rk4Workspace, mut f: F) -> Result<(), E>
where
    F: FnMut(f64, &[f64], &mut [f64]) -> Result<(), E>,
{
    ws.fit(y.len());
    let Rk4Workspace { slopes: [k1, k2, k3, k4], trial } = ws;
    let half = 0.5 * dt;

    f(t, y, k1)?;
    offset(trial, y, half, k1);
    f(t + half, trial, k2)?;
    offset(trial, y, half, k2);
    f(t + half, trial, k3)?;
    offset(trial, y, dt, k3);
    f(t + dt, trial, k4)?;

    let w = dt / 6.0;
    for (i, yi) in y.iter_mut().enumerate() {
        *yi += w * (k1[i] + 2.0 * (k2[i] + k3[i]) + k4[i]);
    }
    Ok(())
}

/// `trial = y + h * k`
fn offset(trial: &mut [f64], y: &[f64], h: f64, k: &[f64]) {
    for ((tr, yi), ki) in trial.iter_mut().zip(y).zip(k) {
        *tr = yi + h * ki;
    }
}
