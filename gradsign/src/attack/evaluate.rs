use std::fmt;

use gradsign_core::{dtypes::Dtype, tensor::Tensor};
use tracing::{debug, info, instrument};

use super::{
    classifier::{Classifier, Labels},
    error::check_epsilon,
    fgsm::{Fgsm, FgsmConfig},
    perturb::{check_pixels, AdversarialBatch},
    AttackError,
};

/// Configuration of [evaluate()].
///
/// ```rust
/// # use gradsign::prelude::*;
/// let cfg = EvalConfig {
///     epsilons: vec![0.0, 0.05, 0.1],
///     batch_size: 64,
///     ..Default::default()
/// };
/// assert_eq!(cfg.fgsm, FgsmConfig::nominal());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
    /// Attack strengths to sweep. Defaults to `[0.0, 0.1, 0.2, 0.3, 0.5, 1.0]`.
    pub epsilons: Vec<f64>,
    /// Samples per forward pass. Defaults to `32`.
    pub batch_size: usize,
    pub fgsm: FgsmConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            epsilons: vec![0.0, 0.1, 0.2, 0.3, 0.5, 1.0],
            batch_size: 32,
            fgsm: Default::default(),
        }
    }
}

/// Accuracy on adversarial examples crafted with one epsilon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonAccuracy {
    pub epsilon: f64,
    /// Fraction of adversarial images classified as their true label.
    pub accuracy: f64,
    /// Mean of `|perturbation|` over every pixel of the dataset, as reported
    /// by the configured [super::PerturbationReport].
    pub mean_abs_perturbation: f64,
}

/// Output of [evaluate()].
#[derive(Debug, Clone, PartialEq)]
pub struct RobustnessReport {
    pub num_samples: usize,
    /// Accuracy on the unperturbed images.
    pub clean_accuracy: f64,
    /// One entry per configured epsilon, in configuration order.
    pub points: Vec<EpsilonAccuracy>,
}

impl RobustnessReport {
    /// Whether accuracy never increases as epsilon grows.
    ///
    /// This is an empirical property of FGSM, not a guarantee: a larger step
    /// can overshoot into a correctly classified region.
    pub fn is_monotone_non_increasing(&self) -> bool {
        let mut points = self.points.clone();
        points.sort_by(|a, b| a.epsilon.total_cmp(&b.epsilon));
        points.windows(2).all(|w| w[1].accuracy <= w[0].accuracy)
    }
}

impl fmt::Display for RobustnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} samples, clean accuracy {:.4}",
            self.num_samples, self.clean_accuracy
        )?;
        writeln!(f, "{:>10} {:>10} {:>12}", "epsilon", "accuracy", "mean |pert|")?;
        for p in self.points.iter() {
            writeln!(
                f,
                "{:>10.4} {:>10.4} {:>12.6}",
                p.epsilon, p.accuracy, p.mean_abs_perturbation
            )?;
        }
        Ok(())
    }
}

fn count_correct<E: Dtype>(probs: &Tensor<E>, truth: &[usize]) -> usize {
    probs
        .argmax_last_axis()
        .iter()
        .zip(truth)
        .filter(|(p, t)| p == t)
        .count()
}

fn check_dataset<E: Dtype>(
    images: &Tensor<E>,
    labels: &Labels<E>,
    batch_size: usize,
) -> Result<usize, AttackError> {
    if batch_size == 0 {
        return Err(AttackError::ZeroBatchSize);
    }
    let n = images.num_rows();
    if labels.len() != n {
        return Err(AttackError::BatchMismatch {
            images: n,
            labels: labels.len(),
        });
    }
    if n == 0 {
        return Err(AttackError::EmptyDataset);
    }
    check_pixels(images)?;
    Ok(n)
}

fn batches(n: usize, batch_size: usize) -> impl Iterator<Item = std::ops::Range<usize>> {
    (0..n)
        .step_by(batch_size)
        .map(move |start| start..(start + batch_size).min(n))
}

/// Measures clean accuracy and FGSM accuracy of `classifier` for every epsilon
/// in `cfg`.
///
/// The dataset is processed in consecutive batches of `cfg.batch_size`. The
/// input gradient of each batch does not depend on epsilon, so it is computed
/// once and reused across the sweep.
///
/// Every epsilon is validated before any forward pass. An empty dataset is
/// [AttackError::EmptyDataset].
///
/// ```rust
/// # use gradsign::prelude::*;
/// # let dev: Cpu = Cpu::seed_from_u64(0);
/// let mlp: Mlp<f32> = dev.build_module(MlpConfig::new(8, vec![16], 4)).unwrap();
/// let images: Tensor<f32> = dev.sample_uniform([10, 8], 0.0, 1.0);
/// let labels = Labels::Classes(vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1]);
/// let report = evaluate(&mlp, &images, &labels, &EvalConfig::default()).unwrap();
/// assert_eq!(report.num_samples, 10);
/// assert_eq!(report.points.len(), 6);
/// assert_eq!(report.points[0].accuracy, report.clean_accuracy);
/// ```
#[instrument(
    skip(classifier, images, labels, cfg),
    fields(input_shape = %images.shape(), batch_size = cfg.batch_size)
)]
pub fn evaluate<E: Dtype, C: Classifier<E> + ?Sized>(
    classifier: &C,
    images: &Tensor<E>,
    labels: &Labels<E>,
    cfg: &EvalConfig,
) -> Result<RobustnessReport, AttackError> {
    for &epsilon in cfg.epsilons.iter() {
        check_epsilon(epsilon)?;
    }
    let n = check_dataset(images, labels, cfg.batch_size)?;
    let fgsm = Fgsm::new(cfg.fgsm);
    let truth = labels.class_indices();

    let mut clean_correct = 0;
    let mut correct = vec![0usize; cfg.epsilons.len()];
    let mut abs_sum = vec![0.0f64; cfg.epsilons.len()];
    for range in batches(n, cfg.batch_size) {
        let x = images.clone().try_slice_rows(range.clone())?;
        let y = labels.try_slice(range.clone())?;
        let truth = &truth[range.clone()];

        let clean = count_correct(&classifier.try_predict(x.clone())?, truth);
        clean_correct += clean;

        let gradient = fgsm.input_gradient(classifier, &x, &y)?;
        for (i, &epsilon) in cfg.epsilons.iter().enumerate() {
            let adv = fgsm.perturb_with_gradient(&x, epsilon, &gradient)?;
            let num_elements = adv.perturbation().num_elements() as f64;
            abs_sum[i] += adv.mean_abs_perturbation() * num_elements;
            let (adversarial, _) = adv.into_parts();
            correct[i] += count_correct(&classifier.try_predict(adversarial)?, truth);
        }
        debug!(start = range.start, end = range.end, clean, "evaluated batch");
    }

    let total_elements = images.num_elements() as f64;
    let points: Vec<EpsilonAccuracy> = cfg
        .epsilons
        .iter()
        .zip(correct.iter().zip(abs_sum.iter()))
        .map(|(&epsilon, (&c, &abs))| EpsilonAccuracy {
            epsilon,
            accuracy: c as f64 / n as f64,
            mean_abs_perturbation: abs / total_elements,
        })
        .collect();

    let clean_accuracy = clean_correct as f64 / n as f64;
    info!(samples = n, clean_accuracy, "clean accuracy");
    for p in points.iter() {
        info!(
            epsilon = p.epsilon,
            accuracy = p.accuracy,
            mean_abs_perturbation = p.mean_abs_perturbation,
            "adversarial accuracy"
        );
    }
    Ok(RobustnessReport {
        num_samples: n,
        clean_accuracy,
        points,
    })
}

/// Crafts adversarial examples for a whole dataset, `batch_size` samples at a
/// time, and stacks the results back into one [AdversarialBatch].
#[instrument(skip(classifier, images, labels, cfg), fields(input_shape = %images.shape()))]
pub fn build_in_batches<E: Dtype, C: Classifier<E> + ?Sized>(
    classifier: &C,
    images: &Tensor<E>,
    labels: &Labels<E>,
    epsilon: f64,
    batch_size: usize,
    cfg: FgsmConfig,
) -> Result<AdversarialBatch<E>, AttackError> {
    check_epsilon(epsilon)?;
    let n = check_dataset(images, labels, batch_size)?;
    let fgsm = Fgsm::new(cfg);
    let mut adversarial = Vec::new();
    let mut perturbation = Vec::new();
    for range in batches(n, batch_size) {
        let x = images.clone().try_slice_rows(range.clone())?;
        let y = labels.try_slice(range)?;
        let (a, p) = fgsm.build(classifier, &x, &y, epsilon)?.into_parts();
        adversarial.push(a);
        perturbation.push(p);
    }
    let dev = images.device();
    Ok(AdversarialBatch {
        adversarial: Tensor::try_concat_rows(dev, &adversarial)?,
        perturbation: Tensor::try_concat_rows(dev, &perturbation)?,
        epsilon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attack::{build, ModuleClassifier},
        nn::{Linear, Softmax},
        tensor::*,
        tests::*,
    };

    fn two_class() -> ModuleClassifier<(Linear<TestDtype>, Softmax)> {
        let dev: TestDevice = Default::default();
        let weight = dev.tensor([[4.0, -4.0], [-4.0, 4.0]]);
        let linear = Linear::from_params(weight, dev.zeros([2])).unwrap();
        ModuleClassifier::new((linear, Softmax), 2)
    }

    fn dataset() -> (Tensor<TestDtype>, Labels<TestDtype>) {
        let dev: TestDevice = Default::default();
        let images = dev
            .tensor_from_vec(
                vec![0.9, 0.1, 0.8, 0.3, 0.65, 0.5, 0.2, 0.7, 0.45, 0.55],
                [5, 2],
            )
            .unwrap();
        (images, Labels::Classes(vec![0, 0, 0, 1, 1]))
    }

    #[test]
    fn test_report_over_default_epsilons() {
        let (images, labels) = dataset();
        let cfg = EvalConfig {
            batch_size: 2,
            ..Default::default()
        };
        let report = evaluate(&two_class(), &images, &labels, &cfg).unwrap();
        assert_eq!(report.num_samples, 5);
        assert_eq!(report.clean_accuracy, 1.0);
        assert_eq!(report.points.len(), 6);
        assert_eq!(report.points[0].accuracy, 1.0);
        assert_eq!(report.points[0].mean_abs_perturbation, 0.0);
        // each step moves x0 - x1 by 2 * epsilon toward the boundary
        let accuracy: Vec<f64> = report.points.iter().map(|p| p.accuracy).collect();
        assert_eq!(accuracy, [1.0, 0.6, 0.6, 0.2, 0.0, 0.0]);
        assert!(report.is_monotone_non_increasing());
        assert!((report.points[1].mean_abs_perturbation - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_batch_size_does_not_change_report() {
        let (images, labels) = dataset();
        let a = EvalConfig {
            batch_size: 1,
            ..Default::default()
        };
        let b = EvalConfig {
            batch_size: 100,
            ..Default::default()
        };
        let classifier = two_class();
        let ra = evaluate(&classifier, &images, &labels, &a).unwrap();
        let rb = evaluate(&classifier, &images, &labels, &b).unwrap();
        assert_eq!(ra.clean_accuracy, rb.clean_accuracy);
        for (pa, pb) in ra.points.iter().zip(rb.points.iter()) {
            assert_eq!(pa.accuracy, pb.accuracy);
            assert!((pa.mean_abs_perturbation - pb.mean_abs_perturbation).abs() < 1e-9);
        }
    }

    #[test]
    fn test_evaluate_errors() {
        let dev: TestDevice = Default::default();
        let (images, labels) = dataset();
        let classifier = two_class();
        let bad_eps = EvalConfig {
            epsilons: vec![0.1, -1.0],
            ..Default::default()
        };
        assert!(matches!(
            evaluate(&classifier, &images, &labels, &bad_eps),
            Err(AttackError::InvalidEpsilon(_))
        ));
        let zero = EvalConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            evaluate(&classifier, &images, &labels, &zero),
            Err(AttackError::ZeroBatchSize)
        ));
        let empty: Tensor<TestDtype> = dev.zeros([0, 2]);
        assert!(matches!(
            evaluate(&classifier, &empty, &Labels::Classes(vec![]), &Default::default()),
            Err(AttackError::EmptyDataset)
        ));
        assert!(matches!(
            evaluate(&classifier, &images, &Labels::Classes(vec![0]), &Default::default()),
            Err(AttackError::BatchMismatch { .. })
        ));
    }

    #[test]
    fn test_monotone_check_sorts_by_epsilon() {
        let point = |epsilon, accuracy| EpsilonAccuracy {
            epsilon,
            accuracy,
            mean_abs_perturbation: 0.0,
        };
        let mut report = RobustnessReport {
            num_samples: 4,
            clean_accuracy: 1.0,
            points: vec![point(0.3, 0.25), point(0.0, 1.0), point(0.1, 0.5)],
        };
        assert!(report.is_monotone_non_increasing());
        report.points.push(point(0.5, 0.75));
        assert!(!report.is_monotone_non_increasing());
    }

    #[test]
    fn test_display() {
        let report = RobustnessReport {
            num_samples: 2,
            clean_accuracy: 0.5,
            points: vec![EpsilonAccuracy {
                epsilon: 0.1,
                accuracy: 0.0,
                mean_abs_perturbation: 0.1,
            }],
        };
        let s = report.to_string();
        assert!(s.starts_with("2 samples, clean accuracy 0.5000"));
        assert!(s.contains("    0.1000     0.0000     0.100000"));
    }

    #[test]
    fn test_build_in_batches_matches_single_batch() {
        let (images, labels) = dataset();
        let classifier = two_class();
        let whole = build(&classifier, &images, &labels, 0.2).unwrap();
        let split =
            build_in_batches(&classifier, &images, &labels, 0.2, 2, FgsmConfig::default()).unwrap();
        assert_eq!(split.epsilon(), 0.2);
        assert_eq!(split.adversarial().shape(), images.shape());
        assert_eq!(split.perturbation().as_vec(), whole.perturbation().as_vec());
    }
}
