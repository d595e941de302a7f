use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

use anyhow::Context;
use checkers_evaluator::{Genome, ReferenceMatchEvaluator};
use checkers_training::{
    genetic::{GenerationReport, GeneticAlgorithm, TrainingConfig},
    tournament::TournamentKind,
};

use crate::{model::ai_model::AiModel, util};

const DEFAULT_LOG_PATH: &str = "./fittestByGeneration.csv";

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// JSON file with training parameters; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of generations to run
    #[arg(long, default_value_t = 100)]
    generations: usize,
    /// Search depth handed to the match evaluator
    #[arg(long, default_value_t = 5)]
    search_depth: u32,
    /// Start from the weights of a previously trained model
    #[arg(long)]
    seed_model: Option<PathBuf>,
    /// The population holds 2^N genomes
    #[arg(long, value_name = "N")]
    population_log2: Option<u32>,
    /// Mutation strength of the last population slot
    #[arg(long)]
    max_mutation: Option<f64>,
    /// Fraction of the ranked population eligible as parents
    #[arg(long)]
    top_fraction: Option<f64>,
    /// Mean absolute weight offspring are rescaled to
    #[arg(long)]
    target_magnitude: Option<f64>,
    /// Keep the first weight fixed as a reference constant
    #[arg(long)]
    pin_reference_weight: bool,
    /// Standard deviation of the jitter applied to the initial population
    #[arg(long)]
    initial_spread: Option<f64>,
    /// Losses before a genome is eliminated from the tournament
    #[arg(long, conflicts_with = "round_robin")]
    losses: Option<u8>,
    /// Score generations with a round-robin tournament
    #[arg(long)]
    round_robin: bool,
    /// Number of worker threads
    #[arg(long)]
    workers: Option<NonZeroUsize>,
    /// Seed of the random source
    #[arg(long)]
    seed: Option<u64>,
    /// CSV file receiving the elite of every generation
    #[arg(long, conflicts_with = "no_log")]
    log_path: Option<PathBuf>,
    /// Do not write the elite log
    #[arg(long)]
    no_log: bool,
    /// Name stored in the exported model
    #[arg(long, default_value = "trained")]
    name: String,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

impl TrainArg {
    /// Configuration file values, overridden by command-line flags.
    fn training_config(&self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file::<TrainingConfig, _>("training config", path)?,
            None => TrainingConfig {
                log_path: Some(PathBuf::from(DEFAULT_LOG_PATH)),
                ..TrainingConfig::default()
            },
        };

        if let Some(v) = self.population_log2 {
            config.population_log2 = v;
        }
        if let Some(v) = self.max_mutation {
            config.max_mutation = v;
        }
        if let Some(v) = self.top_fraction {
            config.top_fraction = v;
        }
        if let Some(v) = self.target_magnitude {
            config.target_magnitude = v;
        }
        if self.pin_reference_weight {
            config.pin_reference_weight = true;
        }
        if let Some(v) = self.initial_spread {
            config.initial_spread = v;
        }
        if let Some(losses_before_elimination) = self.losses {
            config.tournament = TournamentKind::Elimination {
                losses_before_elimination,
            };
        }
        if self.round_robin {
            config.tournament = TournamentKind::RoundRobin;
        }
        if self.workers.is_some() {
            config.worker_count = self.workers;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.log_path.is_some() {
            config.log_path.clone_from(&self.log_path);
        }
        if self.no_log {
            config.log_path = None;
        }
        Ok(config)
    }
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let config = arg.training_config()?;
    config
        .validate()
        .context("Invalid training configuration")?;

    let seed = match &arg.seed_model {
        Some(path) => AiModel::open(path)?
            .to_genome()
            .with_context(|| format!("Invalid seed model: {}", path.display()))?,
        None => Genome::default(),
    };
    let evaluator = Arc::new(ReferenceMatchEvaluator::new(
        Genome::default(),
        arg.search_depth,
    ));

    eprintln!(
        "Training {} genomes for {} generation(s) ({:?})",
        config.population_size(),
        arg.generations,
        config.tournament
    );
    let mut ga = GeneticAlgorithm::new(config, evaluator, seed)?;
    if let Some(path) = ga.log_path() {
        eprintln!("  Fittest log: {}", path.display());
    }

    let mut final_score = 0;
    for _ in 0..arg.generations {
        let report = ga.process_generation()?;
        print_report(&report);
        final_score = report.elite_score;
    }
    ga.release();

    eprintln!("Fittest genome:");
    eprint!("{}", ga.fittest());

    let model = AiModel::new(arg.name.clone(), ga.fittest(), ga.generation(), final_score);
    util::save_json(&model, arg.output.as_deref())?;

    eprintln!();
    eprintln!("Model saved successfully");
    if let Some(path) = &arg.output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Name: {}", model.name);
    eprintln!("  Trained at: {}", model.trained_at);
    eprintln!("  Generations: {}", model.generations);
    eprintln!("  Final score: {}", model.final_score);

    Ok(())
}

fn print_report(report: &GenerationReport) {
    let GenerationReport {
        generation,
        elite_index,
        elite_score,
        standings,
        score_stats,
        weight_stats,
        ..
    } = report;

    eprintln!("Generation #{generation}:");
    eprintln!(
        "  Elite: #{elite_index} with {elite_score} point(s), {} game(s) played",
        standings.games_played
    );
    if let Some(places) = &standings.places {
        eprintln!("  Places: {places:?}");
    }
    eprintln!("  Score Stats:");
    eprintln!("    Min:  {:.1}", score_stats.min);
    eprintln!("    Max:  {:.1}", score_stats.max);
    eprintln!("    Mean: {:.3}", score_stats.mean);
    eprintln!("  Weight Stats:");
    eprintln!(
        "    Mean:   {:.3?}",
        weight_stats.iter().map(|s| s.mean).collect::<Vec<_>>()
    );
    eprintln!(
        "    Stddev: {:.3?}",
        weight_stats.iter().map(|s| s.std_dev).collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[clap(flatten)]
        arg: TrainArg,
    }

    fn parse(args: &[&str]) -> TrainArg {
        Cli::try_parse_from(std::iter::once("train").chain(args.iter().copied()))
            .unwrap()
            .arg
    }

    #[test]
    fn test_defaults_log_to_csv() {
        let config = parse(&[]).training_config().unwrap();
        assert_eq!(config.log_path, Some(PathBuf::from(DEFAULT_LOG_PATH)));
        assert_eq!(
            config.population_log2,
            TrainingConfig::default().population_log2
        );
    }

    #[test]
    fn test_flags_override_config_file() {
        let path = env::temp_dir().join(format!("checkers-{}-train.json", process::id()));
        let json = r#"{"population_log2": 3, "max_mutation": 0.5, "seed": 1,
            "tournament": "round_robin"}"#;
        fs::write(&path, json).unwrap();

        let path_arg = path.display().to_string();
        let config = parse(&[
            "--config", &path_arg, "--seed", "42", "--losses", "3", "--no-log",
        ])
        .training_config()
        .unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.population_log2, 3);
        assert_eq!(config.max_mutation, 0.5);
        assert_eq!(config.seed, Some(42));
        assert_eq!(
            config.tournament,
            TournamentKind::Elimination {
                losses_before_elimination: 3
            }
        );
        assert_eq!(config.log_path, None);
    }

    #[test]
    fn test_losses_conflict_with_round_robin() {
        let result = Cli::try_parse_from(["train", "--losses", "2", "--round-robin"]);
        assert!(result.is_err());
    }
}
