//! Convolutional + recurrent forecaster
//!
//! Causal Conv1D (ReLU) → stacked LSTM → dense ReLU layers → Dense(1).
//! The network reads a window of any length and predicts the next value.

use super::config::{ModelConfig, TrainingConfig};
use super::conv::{CausalConv1d, ConvCache, ConvGradients};
use super::layers::{Activation, Dense, DenseCache, DenseGradients};
use super::loss::HuberLoss;
use super::lstm::{LstmCache, LstmGradients, LstmLayer};
use super::optimizer::Sgd;
use super::{ForecastModel, TrainingReport};
use crate::error::{ForecastError, Result};
use crate::preprocessing::{Batch, WindowDataset};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{array, Array1, Array2, ArrayView1, ArrayView2, ArrayViewD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvLstmNetwork {
    config: ModelConfig,
    training: TrainingConfig,
    conv: CausalConv1d,
    lstm: Vec<LstmLayer>,
    /// Hidden ReLU layers followed by the linear output layer
    dense: Vec<Dense>,
    /// Window length of the last training run
    window_size: Option<usize>,
    #[serde(skip, default = "entropy_rng")]
    rng: StdRng,
}

/// Everything the backward pass needs from one forward pass
struct Trace {
    conv: ConvCache,
    lstm: Vec<LstmCache>,
    dense: Vec<DenseCache>,
    seq_len: usize,
    prediction: f64,
}

/// Gradients for every parameter tensor of the network
#[derive(Debug, Clone)]
pub struct NetworkGradients {
    conv: ConvGradients,
    lstm: Vec<LstmGradients>,
    dense: Vec<DenseGradients>,
}

impl NetworkGradients {
    pub fn views(&self) -> Vec<ArrayViewD<'_, f64>> {
        let mut views = self.conv.views();
        views.extend(self.lstm.iter().flat_map(|g| g.views()));
        views.extend(self.dense.iter().flat_map(|g| g.views()));
        views
    }

    fn views_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut views = self.conv.views_mut();
        views.extend(self.lstm.iter_mut().flat_map(|g| g.views_mut()));
        views.extend(self.dense.iter_mut().flat_map(|g| g.views_mut()));
        views
    }

    /// L2 norm over all gradients
    pub fn global_norm(&self) -> f64 {
        self.views()
            .iter()
            .map(|v| v.iter().map(|x| x * x).sum::<f64>())
            .sum::<f64>()
            .sqrt()
    }

    pub fn scale(&mut self, factor: f64) {
        for mut view in self.views_mut() {
            view *= factor;
        }
    }

    /// Rescales the gradients so their global norm does not exceed `max_norm`
    pub fn clip(&mut self, max_norm: f64) {
        let norm = self.global_norm();
        if norm > max_norm {
            self.scale(max_norm / norm);
        }
    }
}

/// Loss and gradients of one batch
struct BatchStep {
    gradients: NetworkGradients,
    loss_sum: f64,
    abs_error_sum: f64,
}

impl ConvLstmNetwork {
    /// Builds a freshly initialised network.
    ///
    /// With `config.seed` set, initialisation and shuffling are reproducible.
    pub fn new(config: ModelConfig, training: TrainingConfig) -> Result<Self> {
        config.validate()?;
        training.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let conv = CausalConv1d::new(1, config.conv_filters, config.kernel_size, &mut rng);

        let mut lstm = Vec::with_capacity(config.lstm_units.len());
        let mut input_size = config.conv_filters;
        for &units in &config.lstm_units {
            lstm.push(LstmLayer::new(input_size, units, &mut rng));
            input_size = units;
        }

        let mut dense = Vec::with_capacity(config.dense_units.len() + 1);
        for &units in &config.dense_units {
            dense.push(Dense::new(input_size, units, Activation::Relu, &mut rng));
            input_size = units;
        }
        dense.push(Dense::new(input_size, 1, Activation::Linear, &mut rng));

        Ok(Self {
            config,
            training,
            conv,
            lstm,
            dense,
            window_size: None,
            rng,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    /// Input length the network was trained on; `None` before training
    pub fn window_size(&self) -> Option<usize> {
        self.window_size
    }

    pub fn num_parameters(&self) -> usize {
        self.conv.num_parameters()
            + self.lstm.iter().map(|l| l.num_parameters()).sum::<usize>()
            + self.dense.iter().map(|d| d.num_parameters()).sum::<usize>()
    }

    /// Logs the layer stack
    pub fn summary(&self) {
        info!(
            "Conv1D: {} filters, kernel {}, causal, relu",
            self.conv.out_channels, self.conv.kernel_size
        );
        for (idx, layer) in self.lstm.iter().enumerate() {
            info!("LSTM {}: {} -> {}", idx + 1, layer.input_size, layer.hidden_size);
        }
        for layer in &self.dense {
            info!(
                "Dense: {} -> {} ({:?})",
                layer.input_size(),
                layer.output_size(),
                layer.activation
            );
        }
        info!("Total parameters: {}", self.num_parameters());
    }

    /// Hidden state of the last LSTM layer at the final step
    fn last_hidden(&self, sequence: &Array2<f64>) -> Array1<f64> {
        let top_units = self.lstm.last().map_or(0, |l| l.hidden_size);
        sequence
            .rows()
            .into_iter()
            .last()
            .map(|row| row.to_owned())
            .unwrap_or_else(|| Array1::zeros(top_units))
    }

    /// Prediction for a single window
    pub fn predict_one(&self, window: ArrayView1<'_, f64>) -> f64 {
        let input = window.insert_axis(Axis(0)).to_owned();
        let features = self.conv.forward(&input);

        let mut sequence = features.t().to_owned();
        for layer in &self.lstm {
            sequence = layer.forward(&sequence);
        }

        let mut hidden = self.last_hidden(&sequence);
        for layer in &self.dense {
            hidden = layer.forward(hidden.view());
        }
        hidden[0]
    }

    /// Predicts the value following `series` from its last `window_size` values.
    ///
    /// Uses the window length recorded by the last training run.
    pub fn forecast_next(&self, series: &[f64]) -> Result<f64> {
        let window_size = self.window_size.ok_or_else(|| {
            ForecastError::Config("model has not been trained, window size unknown".to_string())
        })?;
        if series.len() < window_size {
            return Err(ForecastError::InvalidWindow(format!(
                "series of length {} is shorter than the trained window size {}",
                series.len(),
                window_size
            )));
        }

        let history = &series[series.len() - window_size..];
        Ok(self.predict_one(ArrayView1::from(history)))
    }

    fn forward_trace(&self, window: ArrayView1<'_, f64>) -> Trace {
        let input = window.insert_axis(Axis(0)).to_owned();
        let (features, conv_cache) = self.conv.forward_cached(&input);

        let mut sequence = features.t().to_owned();
        let mut lstm_caches = Vec::with_capacity(self.lstm.len());
        for layer in &self.lstm {
            let (out, cache) = layer.forward_cached(&sequence);
            sequence = out;
            lstm_caches.push(cache);
        }

        let seq_len = sequence.nrows();
        let mut hidden = self.last_hidden(&sequence);
        let mut dense_caches = Vec::with_capacity(self.dense.len());
        for layer in &self.dense {
            let (out, cache) = layer.forward_cached(hidden.view());
            hidden = out;
            dense_caches.push(cache);
        }

        Trace {
            conv: conv_cache,
            lstm: lstm_caches,
            dense: dense_caches,
            seq_len,
            prediction: hidden[0],
        }
    }

    fn zero_gradients(&self) -> NetworkGradients {
        NetworkGradients {
            conv: self.conv.zero_gradients(),
            lstm: self.lstm.iter().map(|l| l.zero_gradients()).collect(),
            dense: self.dense.iter().map(|d| d.zero_gradients()).collect(),
        }
    }

    /// Backpropagates `d loss / d prediction` through the whole stack
    fn backward(&self, trace: &Trace, prediction_grad: f64, grads: &mut NetworkGradients) {
        let mut grad = array![prediction_grad];
        for idx in (0..self.dense.len()).rev() {
            grad = self.dense[idx].backward(&trace.dense[idx], &grad, &mut grads.dense[idx]);
        }

        if trace.seq_len == 0 {
            return;
        }

        // only the final step of the top LSTM layer feeds the dense head
        let top_units = grad.len();
        let mut sequence_grad = Array2::zeros((trace.seq_len, top_units));
        sequence_grad.row_mut(trace.seq_len - 1).assign(&grad);

        for idx in (0..self.lstm.len()).rev() {
            sequence_grad =
                self.lstm[idx].backward(&trace.lstm[idx], &sequence_grad, &mut grads.lstm[idx]);
        }

        let conv_grad = sequence_grad.t().to_owned();
        self.conv.backward(&trace.conv, &conv_grad, &mut grads.conv);
    }

    /// Mean Huber gradients over one batch
    fn batch_step(&self, batch: &Batch, loss: &HuberLoss) -> BatchStep {
        let mut gradients = self.zero_gradients();
        let mut loss_sum = 0.0;
        let mut abs_error_sum = 0.0;

        for (window, &target) in batch.inputs.rows().into_iter().zip(batch.targets.iter()) {
            let trace = self.forward_trace(window);
            loss_sum += loss.loss(trace.prediction, target);
            abs_error_sum += (target - trace.prediction).abs();

            let grad = loss.gradient(trace.prediction, target);
            self.backward(&trace, grad, &mut gradients);
        }

        if !batch.is_empty() {
            gradients.scale(1.0 / batch.len() as f64);
        }

        BatchStep {
            gradients,
            loss_sum,
            abs_error_sum,
        }
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut params = self.conv.params_mut();
        params.extend(self.lstm.iter_mut().flat_map(|l| l.params_mut()));
        params.extend(self.dense.iter_mut().flat_map(|d| d.params_mut()));
        params
    }

    /// Writes architecture and parameters to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = bincode::serialize(self)?;
        std::fs::write(path.as_ref(), encoded)?;
        info!("Saved model to {:?}", path.as_ref());
        Ok(())
    }

    /// Restores a network written by [`save`](Self::save)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let mut model: Self = bincode::deserialize(&data)?;
        if let Some(seed) = model.config.seed {
            model.rng = StdRng::seed_from_u64(seed);
        }
        Ok(model)
    }

    fn progress_bar(&self, epochs: usize) -> ProgressBar {
        if !self.training.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(epochs as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) Loss: {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

impl ForecastModel for ConvLstmNetwork {
    fn train(&mut self, dataset: &WindowDataset<'_>, epochs: usize) -> Result<TrainingReport> {
        let loss = HuberLoss::new(self.training.huber_delta);
        let mut optimizer =
            Sgd::new(self.training.learning_rate).with_momentum(self.training.momentum);
        let mut report = TrainingReport::new(dataset.len(), dataset.num_batches());

        info!(
            "Training for {} epochs on {} windows ({} batches of up to {})",
            epochs,
            dataset.len(),
            dataset.num_batches(),
            dataset.batch_size()
        );

        self.window_size = Some(dataset.window_size());
        let pb = self.progress_bar(epochs);

        for epoch in 0..epochs {
            let mut loss_sum = 0.0;
            let mut abs_error_sum = 0.0;
            let mut seen = 0usize;

            let batches = dataset.batches(&mut self.rng);
            for (batch_idx, batch) in batches.enumerate() {
                let mut step = self.batch_step(&batch, &loss);
                if let Some(max_norm) = self.training.gradient_clip {
                    step.gradients.clip(max_norm);
                }
                optimizer.step(self.params_mut(), step.gradients.views());

                loss_sum += step.loss_sum;
                abs_error_sum += step.abs_error_sum;
                seen += batch.len();

                debug!(
                    "Epoch {} batch {}: loss={:.4}",
                    epoch + 1,
                    batch_idx + 1,
                    step.loss_sum / batch.len() as f64
                );
            }

            let epoch_loss = loss_sum / seen as f64;
            let epoch_mae = abs_error_sum / seen as f64;
            if !epoch_loss.is_finite() {
                pb.abandon();
                return Err(ForecastError::Diverged {
                    epoch: epoch + 1,
                    loss: epoch_loss,
                });
            }

            report.push_epoch(epoch_loss, epoch_mae);
            debug!(
                "Epoch {}/{}: loss={:.6}, mae={:.6}",
                epoch + 1,
                epochs,
                epoch_loss,
                epoch_mae
            );
            pb.set_message(format!("{:.6}", epoch_loss));
            pb.inc(1);
        }

        pb.finish_and_clear();
        if let Some(final_loss) = report.final_loss() {
            info!("Training finished, final loss {:.6}", final_loss);
        }
        Ok(report)
    }

    fn predict(&self, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
        let predictions: Array1<f64> = inputs
            .rows()
            .into_iter()
            .map(|window| self.predict_one(window))
            .collect();
        predictions.insert_axis(Axis(1))
    }
}

fn entropy_rng() -> StdRng {
    StdRng::from_entropy()
}
