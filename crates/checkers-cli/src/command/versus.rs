use std::path::PathBuf;

use checkers_evaluator::{Genome, MatchEvaluator, POINTS_PER_MATCH, ReferenceMatchEvaluator};

use crate::model::ai_model::AiModel;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct VersusArg {
    /// Model playing first in the opening game (default brain if omitted)
    #[arg(long)]
    first: Option<PathBuf>,
    /// Model playing second in the opening game (default brain if omitted)
    #[arg(long)]
    second: Option<PathBuf>,
    /// Search depth handed to the match evaluator
    #[arg(long, default_value_t = 5)]
    search_depth: u32,
}

fn load(path: Option<&PathBuf>) -> anyhow::Result<(String, Genome)> {
    match path {
        Some(path) => {
            let model = AiModel::open(path)?;
            let genome = model.to_genome()?;
            Ok((model.name, genome))
        }
        None => Ok(("default".to_owned(), Genome::default())),
    }
}

/// Plays both seatings and returns the points of `a` and `b`.
fn play_both_seatings<E>(evaluator: &E, a: &Genome, b: &Genome) -> (u32, u32)
where
    E: MatchEvaluator + ?Sized,
{
    let (a1, b1) = evaluator.play_match(a, b).points();
    let (b2, a2) = evaluator.play_match(b, a).points();
    (a1 + a2, b1 + b2)
}

pub(crate) fn run(arg: &VersusArg) -> anyhow::Result<()> {
    let (first_name, first) = load(arg.first.as_ref())?;
    let (second_name, second) = load(arg.second.as_ref())?;
    let evaluator = ReferenceMatchEvaluator::new(Genome::default(), arg.search_depth);

    let (first_points, second_points) = play_both_seatings(&evaluator, &first, &second);
    eprintln!(
        "{first_name} vs {second_name} (search depth {}):",
        arg.search_depth
    );
    eprintln!("  {first_name}: {first_points} point(s)");
    eprintln!("  {second_name}: {second_points} point(s)");

    let winner = match first_points.cmp(&second_points) {
        std::cmp::Ordering::Greater => first_name.as_str(),
        std::cmp::Ordering::Less => second_name.as_str(),
        std::cmp::Ordering::Equal => "nobody",
    };
    eprintln!("  Winner: {winner}");
    debug_assert_eq!(first_points + second_points, 2 * POINTS_PER_MATCH);
    Ok(())
}
