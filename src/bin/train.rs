//! Command line tool to fine-tune an encoder classifier on one of the supported tasks

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use burn::{
    config::Config as _,
    module::Module,
    record::CompactRecorder,
    tensor::backend::Backend,
};
use burn_finetune::{
    cli::{models::Model, tasks::Task},
    datasets::{Reader, Split},
    models::bert,
    pipelines::sequence_classification::{
        self, sink::Fanout, wordpiece::expand_examples, FeatureSet, JsonLinesSink, LogSink,
    },
    utils::{
        hugging_face::{download_hf_model, download_tokenizer},
        tokenizer::load_tokenizer,
    },
};
use pico_args::Arguments;

#[cfg(not(feature = "tch"))]
type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

#[cfg(feature = "tch")]
type TrainBackend = burn::backend::Autodiff<burn::backend::LibTorch>;

const HELP: &str = "\
Usage: train TASK [OPTIONS]

Arguments:
  TASK                   The task to train on ('sentences', 'mrpc', 'comp' or 'conll')

Options:
  -h, --help             Print help
  -m, --model            The pretrained model to fine-tune (e.g., 'bert-base-cased')
  -p, --pretrained-dir   A local directory with config.json, model.safetensors and tokenizer.json
                         to use instead of downloading them
  -t, --tokenizer        A local tokenizer.json to use instead of the model's
  -d, --data-dir         The path to the task's data directory (defaults to 'data')
  -o, --output-dir       Where to save the config and trained model (defaults to DATA_DIR/output)
  -n, --num-epochs       Number of epochs to train for
  -b, --batch-size       Batch size
  -l, --max-seq-length   Maximum sequence length, special tokens included
  --learning-rate        Peak learning rate
  --warmup               Fraction of all steps spent warming up
  --max-grad-norm        Gradients are clipped to this norm
  --seed                 Seed for shuffling and initialization
  --tab                  Tagging files are tab-separated
  --cased                Keep the text's case
  --metrics              Also write every metric as JSON lines to this file
";

#[derive(Debug)]
struct Args {
    task: String,
    model: Option<String>,
    pretrained_dir: Option<PathBuf>,
    tokenizer: Option<PathBuf>,
    data_dir: Option<String>,
    output_dir: Option<PathBuf>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    max_seq_length: Option<usize>,
    learning_rate: Option<f64>,
    warmup: Option<f64>,
    max_grad_norm: Option<f32>,
    seed: Option<u64>,
    metrics: Option<PathBuf>,
    tab: bool,
    cased: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            model: pargs.opt_value_from_str(["-m", "--model"])?,
            pretrained_dir: pargs.opt_value_from_str(["-p", "--pretrained-dir"])?,
            tokenizer: pargs.opt_value_from_str(["-t", "--tokenizer"])?,
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            output_dir: pargs.opt_value_from_str(["-o", "--output-dir"])?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            max_seq_length: pargs.opt_value_from_str(["-l", "--max-seq-length"])?,
            learning_rate: pargs.opt_value_from_str("--learning-rate")?,
            warmup: pargs.opt_value_from_str("--warmup")?,
            max_grad_norm: pargs.opt_value_from_str("--max-grad-norm")?,
            seed: pargs.opt_value_from_str("--seed")?,
            metrics: pargs.opt_value_from_str("--metrics")?,
            tab: pargs.contains("--tab"),
            cased: pargs.contains("--cased"),
            task: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: TASK"),
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
    }

    /// Build the training config, applying any overrides given on the command line
    fn config(&self, task: &Task, model: &Model) -> sequence_classification::Config {
        let mut config = sequence_classification::Config::new(task.to_string(), model.to_string());

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.to_string();
        }

        if let Some(num_epochs) = self.num_epochs {
            config.num_epochs = num_epochs;
        }

        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }

        if let Some(max_seq_length) = self.max_seq_length {
            config.max_seq_length = max_seq_length;
        }

        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }

        if let Some(warmup) = self.warmup {
            config.warmup_proportion = warmup;
        }

        if let Some(max_grad_norm) = self.max_grad_norm {
            config.max_grad_norm = max_grad_norm;
        }

        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        if self.tab {
            config.delimiter = '\t';
        }

        config.lowercase = !self.cased;

        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let task = Task::try_from(args.task.as_str())?;

    let model = if let Some(model) = &args.model {
        Model::try_from(model.as_str())?
    } else {
        task.default_model()
    };

    let config = args.config(&task, &model);

    let (config_file, weights_file) = match &args.pretrained_dir {
        Some(dir) => (dir.join("config.json"), dir.join("model.safetensors")),
        None => download_hf_model(model.name()).await?,
    };

    let tokenizer_file = match (&args.tokenizer, &args.pretrained_dir) {
        (Some(path), _) => path.clone(),
        (None, Some(dir)) => dir.join("tokenizer.json"),
        (None, None) => download_tokenizer(model.name()).await?,
    };
    let tokenizer = load_tokenizer(&tokenizer_file)?;

    let delimiter = u8::try_from(config.delimiter)
        .map_err(|_| anyhow!("Delimiter must be a single byte: {:?}", config.delimiter))?;

    let reader = task.reader(config.lowercase, delimiter);
    let schema = reader.labels().clone();
    let data_dir = Path::new(&config.data_dir);

    let mut examples_train = reader.read(data_dir, Split::Train)?;
    let mut examples_valid = reader.read(data_dir, Split::Valid)?;

    if schema.is_tagging() {
        examples_train = expand_examples(examples_train, &schema, &tokenizer)?;
        examples_valid = expand_examples(examples_valid, &schema, &tokenizer)?;
    }

    let dataset_train =
        FeatureSet::build(&examples_train, &schema, config.max_seq_length, &tokenizer)?;
    let dataset_valid =
        FeatureSet::build(&examples_valid, &schema, config.max_seq_length, &tokenizer)?;

    let model_config = bert::Config::load_pretrained(&config_file, &schema)?;

    if tokenizer.get_vocab_size(true) > model_config.vocab_size {
        return Err(anyhow!(
            "The tokenizer's {} tokens exceed the model's vocabulary of {}",
            tokenizer.get_vocab_size(true),
            model_config.vocab_size
        ));
    }

    if config.max_seq_length > model_config.max_position_embeddings {
        return Err(anyhow!(
            "Max sequence length {} exceeds the model's {} position embeddings",
            config.max_seq_length,
            model_config.max_position_embeddings
        ));
    }

    let device = <TrainBackend as Backend>::Device::default();
    TrainBackend::seed(&device, config.seed);

    let classifier = model_config
        .init::<TrainBackend>(&device)
        .load_pretrained_file(&weights_file)?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("output"));
    std::fs::create_dir_all(&output_dir)?;

    let mut log_sink = LogSink;
    let mut json_sink = match &args.metrics {
        Some(path) => Some(JsonLinesSink::create(path)?),
        None => None,
    };

    let mut sink = Fanout::default().with(&mut log_sink);
    if let Some(json_sink) = json_sink.as_mut() {
        sink = sink.with(json_sink);
    }

    let (classifier, summaries) = sequence_classification::train::<TrainBackend, _>(
        classifier,
        dataset_train,
        dataset_valid,
        &schema,
        &config,
        device,
        &mut sink,
    )?;

    // Save the configuration and the trained model
    config
        .save(output_dir.join("config.json"))
        .map_err(|e| anyhow!("Unable to save config: {}", e))?;
    model_config
        .save(output_dir.join("model-config.json"))
        .map_err(|e| anyhow!("Unable to save model config: {}", e))?;
    std::fs::write(
        output_dir.join("summaries.json"),
        serde_json::to_string_pretty(&summaries)?,
    )?;

    classifier
        .save_file(output_dir.join("model"), &CompactRecorder::new())
        .map_err(|e| anyhow!("Unable to save trained model weights: {}", e))?;

    log::info!("Saved the trained model to {}", output_dir.display());

    Ok(())
}
