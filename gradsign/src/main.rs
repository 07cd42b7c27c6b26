use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueHint};
use gradsign::{
    prelude::*,
    safetensors::{Dtype as StDtype, SafeTensors},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Fast Gradient Sign Method robustness evaluation for MLP classifiers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Measure clean and adversarial accuracy over a sweep of epsilons
    Eval(EvalArgs),
}

#[derive(Args)]
struct EvalArgs {
    /// `.safetensors` file holding `images` ([N, ...] in [0, 1]) and `labels`
    /// ([N] class ids or [N, C] one-hot rows)
    #[arg(long, value_hint = ValueHint::FilePath)]
    data: PathBuf,

    /// MLP parameters saved with `SaveSafeTensors`. Randomly initialized
    /// from `--seed` when absent.
    #[arg(long, value_hint = ValueHint::FilePath)]
    weights: Option<PathBuf>,

    /// Attack strengths to evaluate
    #[arg(long, value_delimiter = ',', default_values_t = EvalConfig::default().epsilons)]
    epsilons: Vec<f64>,

    #[arg(long, default_value_t = EvalConfig::default().batch_size)]
    batch_size: usize,

    /// Hidden layer widths of the MLP
    #[arg(long, value_delimiter = ',', default_values_t = MlpConfig::mnist().hidden)]
    hidden: Vec<usize>,

    /// Number of classes, used when labels are class ids
    #[arg(long, default_value_t = MlpConfig::mnist().classes)]
    classes: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Report the perturbation that survives clipping instead of
    /// `sign(gradient) * epsilon`
    #[arg(long)]
    effective_perturbation: bool,

    /// Write `adversarial` and `perturbation` for the largest epsilon here
    #[arg(long, value_hint = ValueHint::FilePath)]
    save_adversarial: Option<PathBuf>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Eval(args) => eval(args),
    }
}

/// Flattens every trailing axis so images are `[N, features]`.
fn flatten_images(dev: &Cpu, images: Tensor<f32>) -> Result<Tensor<f32>> {
    let dims = images.shape().dims().to_vec();
    match dims.as_slice() {
        [_, _] => Ok(images),
        [n, rest @ ..] if !rest.is_empty() => {
            let features = rest.iter().product::<usize>();
            Ok(dev.tensor_from_vec(images.as_vec(), [*n, features])?)
        }
        _ => bail!("images must have a batch axis, found shape {}", images.shape()),
    }
}

fn load_labels(
    dev: &Cpu,
    tensors: &SafeTensors<'_>,
    num_classes: usize,
) -> Result<Labels<f32>> {
    let view = tensors.tensor("labels").context("reading `labels`")?;
    let labels = match (view.dtype(), view.shape().len()) {
        (StDtype::F32 | StDtype::F64, 2) => Labels::OneHot(load_tensor(dev, tensors, "labels")?),
        _ => Labels::Classes(load_class_indices(tensors, "labels")?),
    };
    if let Labels::Classes(classes) = &labels {
        if let Some(&label) = classes.iter().find(|&&c| c >= num_classes) {
            bail!("label {label} does not fit in {num_classes} classes (see --classes)");
        }
    }
    Ok(labels)
}

fn eval(args: EvalArgs) -> Result<()> {
    let dev = Cpu::seed_from_u64(args.seed);

    let file = SafeTensorsFile::open(&args.data)
        .with_context(|| format!("opening {}", args.data.display()))?;
    let tensors = file.tensors()?;
    let images: Tensor<f32> = load_tensor(&dev, &tensors, "images").context("reading `images`")?;
    let images = flatten_images(&dev, images)?;
    let labels = load_labels(&dev, &tensors, args.classes)?;
    let num_classes = match &labels {
        Labels::OneHot(t) => t.shape().last_dim(),
        Labels::Classes(_) => args.classes,
    };
    info!(
        samples = images.num_rows(),
        features = images.shape().last_dim(),
        num_classes,
        "loaded dataset"
    );

    let cfg = MlpConfig::new(images.shape().last_dim(), args.hidden, num_classes);
    let mut mlp: Mlp<f32> = dev.build_module(cfg)?;
    match &args.weights {
        Some(path) => mlp
            .load_safetensors(path)
            .with_context(|| format!("loading weights from {}", path.display()))?,
        None => warn!(
            seed = args.seed,
            "no --weights given, evaluating a randomly initialized model"
        ),
    }

    let fgsm = if args.effective_perturbation {
        FgsmConfig::effective()
    } else {
        FgsmConfig::nominal()
    };
    let eval_cfg = EvalConfig {
        epsilons: args.epsilons,
        batch_size: args.batch_size,
        fgsm,
    };
    let report = evaluate(&mlp, &images, &labels, &eval_cfg)?;
    print!("{report}");
    if !report.is_monotone_non_increasing() {
        warn!("accuracy increased with epsilon for at least one step");
    }

    if let Some(path) = &args.save_adversarial {
        let Some(epsilon) = eval_cfg.epsilons.iter().copied().reduce(f64::max) else {
            bail!("--save-adversarial needs at least one epsilon");
        };
        let batch = build_in_batches(&mlp, &images, &labels, epsilon, eval_cfg.batch_size, fgsm)?;
        batch
            .save_safetensors(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(epsilon, path = %path.display(), "saved adversarial examples");
    }
    Ok(())
}
