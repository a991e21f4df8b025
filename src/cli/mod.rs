//! Command-line interface for data preparation, training and prediction.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{load_data, write_csv, FeatureSchema, ReferenceData};
use crate::export::ModelArtifact;
use crate::inference::{InferenceEngine, InputForm, Prediction, StudentRecord};
use crate::training::{PipelineConfig, TrainEngine};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn alert(s: &str) -> ColoredString  { s.truecolor(240, 110, 100) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn print_indented(block: &str) {
    for line in block.lines() {
        println!("  {}", line);
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "dropout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predict student dropout with a resampled, tuned logistic regression")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean a raw student CSV: keep Dropout/Graduate rows, encode Status, drop unused columns
    Prepare {
        /// Raw student records CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run cross-validation, grid search and evaluation, then save the artifact
    Train {
        /// Pipeline configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Student records CSV (overrides the config)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Artifact output path (overrides the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Random seed (overrides the config)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of cross-validation folds (overrides the config)
        #[arg(long)]
        folds: Option<usize>,

        /// Worker threads (overrides the config)
        #[arg(long)]
        n_jobs: Option<usize>,
    },

    /// Score one student
    Predict {
        /// Trained artifact
        #[arg(short, long, default_value = "students_performance_logreg.bin")]
        model: PathBuf,

        /// Reference CSV providing the category options
        #[arg(short, long, default_value = "students_performance_cleaned.csv")]
        reference: PathBuf,

        /// JSON object of field values
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Field override as name=value; repeatable
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the input form: selectors with their options and sliders with their ranges
    Form {
        /// Reference CSV providing the category options
        #[arg(short, long, default_value = "students_performance_cleaned.csv")]
        reference: PathBuf,
    },

    /// Show what a trained artifact contains
    Info {
        /// Trained artifact
        #[arg(short, long, default_value = "students_performance_logreg.bin")]
        model: PathBuf,
    },

    /// Start the web server
    Serve {
        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Trained artifact
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Reference CSV providing the category options
        #[arg(short, long)]
        reference: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_prepare(data_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    section("Prepare");

    step_run("Cleaning records");
    let start = Instant::now();
    let mut df = load_data(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run(&format!("Saving → {}", output_path.display()));
    write_csv(&mut df, output_path)?;
    step_done("");

    println!();
    Ok(())
}

/// Config file (or defaults) with command line overrides applied
pub fn resolve_config(
    config_path: Option<&Path>,
    data: Option<PathBuf>,
    output: Option<PathBuf>,
    seed: Option<u64>,
    folds: Option<usize>,
    n_jobs: Option<usize>,
) -> anyhow::Result<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(data) = data {
        config = config.with_data_path(data);
    }
    if let Some(output) = output {
        config = config.with_model_path(output);
    }
    if let Some(seed) = seed {
        config = config.with_random_state(seed);
    }
    if let Some(folds) = folds {
        config = config.with_n_splits(folds);
    }
    if let Some(n_jobs) = n_jobs {
        config = config.with_n_jobs(n_jobs);
    }
    config.validate()?;
    Ok(config)
}

pub fn cmd_train(config: PipelineConfig) -> anyhow::Result<()> {
    section("Train");

    println!("  {:<16} {}", muted("Data"), config.data_path.display());
    println!("  {:<16} {}", muted("Candidates"), config.param_grid.len());
    println!("  {:<16} {}", muted("Folds"), config.n_splits);
    println!();

    let outcome = TrainEngine::new(config).run()?;

    section("Results");
    println!("  {:<16} {}", muted("Baseline F2"), format!("{:.4}", outcome.baseline.mean_score).white());
    println!("  {:<16} {}", muted("Best CV F2"), format!("{:.4}", outcome.best_score).white().bold());
    println!("  {:<16} {}", muted("Best params"), outcome.best_params.to_string().white());
    println!("  {:<16} {}", muted("Train / test"), format!("{} / {}", outcome.n_train, outcome.n_test).white());
    println!("  {:<16} {}", muted("Time"), format!("{:.2}s", outcome.training_time_secs).white());
    if let Some(path) = &outcome.artifact_path {
        println!("  {:<16} {}", muted("Saved"), path.display().to_string().white());
    }

    section("Test classification report");
    print_indented(&outcome.evaluation.test.to_string());
    println!();
    Ok(())
}

/// Defaults, then the JSON file, then `name=value` overrides
pub fn build_record(form: &InputForm, input: Option<&Path>, overrides: &[String]) -> anyhow::Result<StudentRecord> {
    let mut record = form.default_record();

    if let Some(path) = input {
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let values = json
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("{} must contain a JSON object", path.display()))?;
        record.apply_json(form, values)?;
    }

    for pair in overrides {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected NAME=VALUE, got '{}'", pair))?;
        record.set_from_str(form, name.trim(), value)?;
    }

    Ok(record)
}

fn print_prediction(prediction: &Prediction) {
    println!();
    let verdict = prediction.verdict();
    let (verdict, bullet) = match prediction.status {
        crate::data::Status::Dropout => (alert(&verdict).bold(), alert("•")),
        crate::data::Status::Graduate => (ok(&verdict).bold(), ok("•")),
    };
    println!("  {}", verdict);
    println!();
    println!("  {}", prediction.heading().white());
    for line in prediction.recommendations() {
        println!("  {} {}", bullet, line);
    }
    println!();
}

pub fn cmd_predict(
    model_path: &Path,
    reference_path: &Path,
    input: Option<&Path>,
    overrides: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let engine = InferenceEngine::load(model_path, reference_path, &FeatureSchema::default())?;
    let record = build_record(engine.form(), input, overrides)?;
    let prediction = engine.predict(&record)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        section("Prediction");
        print_prediction(&prediction);
    }
    Ok(())
}

pub fn cmd_form(reference_path: &Path) -> anyhow::Result<()> {
    let schema = FeatureSchema::default();
    let reference = ReferenceData::load(reference_path, &schema)?;
    let form = InputForm::new(&schema, &reference)?;

    section("Categorical");
    for field in &form.categorical {
        println!("  {:<46} {}", field.name.white(), muted(&field.label));
        println!("    {} {}", dim("options"), field.options.join(", "));
    }

    section("Numeric");
    println!(
        "  {:<46} {:>7} {:>7} {:>5} {:>8}",
        muted("Field"), muted("Min"), muted("Max"), muted("Step"), muted("Default")
    );
    for field in &form.numeric {
        println!(
            "  {:<46} {:>7} {:>7} {:>5} {:>8}",
            field.name, field.min, field.max, field.step, field.effective_default()
        );
    }
    println!();
    Ok(())
}

pub fn cmd_info(model_path: &Path) -> anyhow::Result<()> {
    section("Model");

    let artifact = ModelArtifact::load(model_path)?;
    let meta = &artifact.metadata;

    println!("  {:<14} {}", muted("File"), model_path.display());
    println!("  {:<14} {}", muted("Type"), meta.model_type);
    println!("  {:<14} {}", muted("Trained"), meta.trained_at.to_rfc3339());
    println!("  {:<14} v{}", muted("Written by"), meta.crate_version);
    println!("  {:<14} {}", muted("Params"), meta.best_params);
    println!("  {:<14} {:.4}", muted("CV F2"), meta.cv_f2);
    println!("  {:<14} {:.4}", muted("Baseline F2"), meta.baseline_f2);
    println!("  {:<14} {} / {}", muted("Train / test"), meta.n_train, meta.n_test);
    println!(
        "  {:<14} {} categorical, {} numeric",
        muted("Features"),
        artifact.schema.categorical.len(),
        artifact.schema.numeric.len()
    );

    section("Test classification report");
    print_indented(&meta.test_report.to_string());
    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    model: Option<PathBuf>,
    reference: Option<PathBuf>,
) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(model) = model {
        config = config.with_model_path(model);
    }
    if let Some(reference) = reference {
        config = config.with_reference_data(reference);
    }

    let base = format!("http://{}:{}", config.host, config.port);
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Student Dropout Predictor".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Form   ", &base));
    line_box(&kv("Predict", &format!("{}/api/predict", base)));
    line_box(&kv("Health ", &format!("{}/api/health", base)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

pub fn show_help() {
    section("Commands");

    let cmds: &[(&str, &str)] = &[
        ("dropout prepare -d raw.csv -o out.csv", "Clean a raw dataset"),
        ("dropout train", "Tune and save the model"),
        ("dropout train -c pipeline.json", "Train with a config file"),
        ("dropout predict -s Course=9500", "Score one student"),
        ("dropout form", "List form fields"),
        ("dropout info", "Inspect a trained artifact"),
        ("dropout serve -p 3000", "Serve the form and API"),
    ];

    for (cmd, desc) in cmds {
        println!("  {:<44} {}", cmd.white(), muted(desc));
    }
    println!();
}
