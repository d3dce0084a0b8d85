//! LSTM (Long Short-Term Memory) layer with backpropagation through time

use super::layers::outer;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayViewD, ArrayViewMutD};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One LSTM layer run over a whole sequence.
///
/// Gate parameters are stacked in the order input, forget, cell candidate,
/// output, so every weight matrix has `4 * hidden_size` rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    pub input_size: usize,
    pub hidden_size: usize,
    /// input -> gates `[4H, input_size]`
    w_x: Array2<f64>,
    /// hidden -> gates `[4H, H]`
    w_h: Array2<f64>,
    /// gate biases `[4H]`
    b: Array1<f64>,
}

#[derive(Debug, Clone)]
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    tanh_c: Array1<f64>,
}

/// Per-step activations kept for the backward pass
#[derive(Debug, Clone)]
pub struct LstmCache {
    steps: Vec<StepCache>,
}

#[derive(Debug, Clone)]
pub struct LstmGradients {
    pub w_x: Array2<f64>,
    pub w_h: Array2<f64>,
    pub b: Array1<f64>,
}

impl LstmLayer {
    pub fn new<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let gates = 4 * hidden_size;

        let mut b = Array1::zeros(gates);
        // forget gate starts open
        b.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);

        Self {
            input_size,
            hidden_size,
            w_x: Array2::random_using((gates, input_size), Uniform::new(-limit, limit), rng),
            w_h: Array2::random_using((gates, hidden_size), Uniform::new(-limit, limit), rng),
            b,
        }
    }

    /// Gate activations for one step: (i, f, g, o)
    fn gates(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>, Array1<f64>, Array1<f64>) {
        let hs = self.hidden_size;
        let a = self.w_x.dot(x) + self.w_h.dot(h_prev) + &self.b;

        let i = sigmoid(a.slice(s![..hs]));
        let f = sigmoid(a.slice(s![hs..2 * hs]));
        let g = a.slice(s![2 * hs..3 * hs]).mapv(f64::tanh);
        let o = sigmoid(a.slice(s![3 * hs..]));
        (i, f, g, o)
    }

    /// Runs the layer over `inputs` `[seq_len, input_size]` from a zero state.
    ///
    /// Returns the hidden state of every step, `[seq_len, hidden_size]`.
    pub fn forward(&self, inputs: &Array2<f64>) -> Array2<f64> {
        self.forward_cached(inputs).0
    }

    pub fn forward_cached(&self, inputs: &Array2<f64>) -> (Array2<f64>, LstmCache) {
        let seq_len = inputs.nrows();
        let mut h = Array1::zeros(self.hidden_size);
        let mut c = Array1::zeros(self.hidden_size);
        let mut outputs = Array2::zeros((seq_len, self.hidden_size));
        let mut steps = Vec::with_capacity(seq_len);

        for t in 0..seq_len {
            let x = inputs.row(t).to_owned();
            let (i, f, g, o) = self.gates(&x, &h);

            // c = f * c_prev + i * g, h = o * tanh(c)
            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f64::tanh);
            let h_next = &o * &tanh_c;

            outputs.row_mut(t).assign(&h_next);
            steps.push(StepCache {
                x,
                h_prev: h,
                c_prev: c,
                i,
                f,
                g,
                o,
                tanh_c,
            });

            h = h_next;
            c = c_next;
        }

        (outputs, LstmCache { steps })
    }

    /// Backpropagation through time.
    ///
    /// * `output_grads` - loss gradient for every hidden output
    ///   `[seq_len, hidden_size]`
    ///
    /// Accumulates parameter gradients into `grads` and returns the gradient
    /// with respect to the inputs, `[seq_len, input_size]`.
    pub fn backward(
        &self,
        cache: &LstmCache,
        output_grads: &Array2<f64>,
        grads: &mut LstmGradients,
    ) -> Array2<f64> {
        let hs = self.hidden_size;
        let seq_len = cache.steps.len();
        let mut input_grads = Array2::zeros((seq_len, self.input_size));
        let mut dh_next = Array1::zeros(hs);
        let mut dc_next = Array1::zeros(hs);

        for t in (0..seq_len).rev() {
            let step = &cache.steps[t];
            let dh = output_grads.row(t).to_owned() + &dh_next;

            let d_o = &dh * &step.tanh_c;
            let dc = &dh * &step.o * &step.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let d_i = &dc * &step.g;
            let d_f = &dc * &step.c_prev;
            let d_g = &dc * &step.i;
            dc_next = &dc * &step.f;

            // back through the gate non-linearities
            let mut da = Array1::zeros(4 * hs);
            da.slice_mut(s![..hs])
                .assign(&(&d_i * &step.i.mapv(|v| v * (1.0 - v))));
            da.slice_mut(s![hs..2 * hs])
                .assign(&(&d_f * &step.f.mapv(|v| v * (1.0 - v))));
            da.slice_mut(s![2 * hs..3 * hs])
                .assign(&(&d_g * &step.g.mapv(|v| 1.0 - v * v)));
            da.slice_mut(s![3 * hs..])
                .assign(&(&d_o * &step.o.mapv(|v| v * (1.0 - v))));

            grads.w_x += &outer(&da, &step.x);
            grads.w_h += &outer(&da, &step.h_prev);
            grads.b += &da;

            input_grads.row_mut(t).assign(&self.w_x.t().dot(&da));
            dh_next = self.w_h.t().dot(&da);
        }

        input_grads
    }

    pub fn zero_gradients(&self) -> LstmGradients {
        LstmGradients {
            w_x: Array2::zeros(self.w_x.dim()),
            w_h: Array2::zeros(self.w_h.dim()),
            b: Array1::zeros(self.b.len()),
        }
    }

    pub fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.w_x.view_mut().into_dyn(),
            self.w_h.view_mut().into_dyn(),
            self.b.view_mut().into_dyn(),
        ]
    }

    pub fn num_parameters(&self) -> usize {
        self.w_x.len() + self.w_h.len() + self.b.len()
    }
}

impl LstmGradients {
    pub fn views(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![
            self.w_x.view().into_dyn(),
            self.w_h.view().into_dyn(),
            self.b.view().into_dyn(),
        ]
    }

    pub fn views_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.w_x.view_mut().into_dyn(),
            self.w_h.view_mut().into_dyn(),
            self.b.view_mut().into_dyn(),
        ]
    }
}

fn sigmoid(x: ArrayView1<'_, f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sequence() -> Array2<f64> {
        Array2::from_shape_fn((5, 3), |(t, f)| ((t * 3 + f) as f64 * 0.37).sin())
    }

    #[test]
    fn test_output_shape() {
        let mut rng = StdRng::seed_from_u64(0);
        let lstm = LstmLayer::new(3, 6, &mut rng);
        let out = lstm.forward(&sequence());

        assert_eq!(out.dim(), (5, 6));
        // h = o * tanh(c) is bounded by 1
        assert!(out.iter().all(|v| v.abs() < 1.0));
        assert_eq!(lstm.num_parameters(), 4 * 6 * (3 + 6 + 1));
    }

    #[test]
    fn test_bptt_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(21);
        let lstm = LstmLayer::new(3, 4, &mut rng);
        let inputs = sequence();

        // loss = sum of the last hidden state
        let loss = |layer: &LstmLayer, x: &Array2<f64>| layer.forward(x).row(4).sum();

        let (out, cache) = lstm.forward_cached(&inputs);
        let mut upstream = Array2::zeros(out.dim());
        upstream.row_mut(4).fill(1.0);
        let mut grads = lstm.zero_gradients();
        let input_grads = lstm.backward(&cache, &upstream, &mut grads);

        let eps = 1e-6;
        for t in 0..5 {
            for f in 0..3 {
                let mut plus = inputs.clone();
                plus[[t, f]] += eps;
                let mut minus = inputs.clone();
                minus[[t, f]] -= eps;
                let numeric = (loss(&lstm, &plus) - loss(&lstm, &minus)) / (2.0 * eps);
                assert_relative_eq!(input_grads[[t, f]], numeric, epsilon = 1e-6);
            }
        }

        for row in [0, 5, 9, 14] {
            for col in 0..4 {
                let mut plus = lstm.clone();
                plus.w_h[[row, col]] += eps;
                let mut minus = lstm.clone();
                minus.w_h[[row, col]] -= eps;
                let numeric = (loss(&plus, &inputs) - loss(&minus, &inputs)) / (2.0 * eps);
                assert_relative_eq!(grads.w_h[[row, col]], numeric, epsilon = 1e-6);
            }
        }
    }
}
