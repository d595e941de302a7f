use std::{collections::BTreeMap, path::Path};

use checkers_evaluator::Genome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util;

/// A trained genome as written by `checkers-ga train`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiModel {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    pub generations: usize,
    pub final_score: u32,
    pub weights: BTreeMap<String, f64>,
}

impl AiModel {
    pub fn new(name: String, genome: &Genome, generations: usize, final_score: u32) -> Self {
        Self {
            name,
            trained_at: Utc::now(),
            generations,
            final_score,
            weights: genome
                .named_weights()
                .map(|(name, weight)| (name.to_owned(), weight))
                .collect(),
        }
    }

    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        util::read_json_file("AI model", path)
    }

    /// Rebuilds the genome. Every weight must be present and no unknown
    /// weight may appear.
    pub fn to_genome(&self) -> anyhow::Result<Genome> {
        if let Some(unknown) = self
            .weights
            .keys()
            .find(|name| !Genome::NAMES.contains(&name.as_str()))
        {
            anyhow::bail!("Unknown weight {unknown} in model {}", self.name);
        }

        let mut weights = [0.0; Genome::LEN];
        for (weight, name) in weights.iter_mut().zip(Genome::NAMES) {
            *weight = *self
                .weights
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("Weight {name} missing from model {}", self.name))?;
        }
        Ok(Genome::from_weights(weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genome_survives_json() {
        let genome = Genome::from_weights([1.0, 2.5, 3.0, -0.5, 0.25, 0.0, 0.125, -1.0, 4.0]);
        let model = AiModel::new("test".to_owned(), &genome, 12, 30);
        let json = serde_json::to_string(&model).unwrap();
        let model: AiModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model.generations, 12);
        assert_eq!(model.final_score, 30);
        assert_eq!(model.to_genome().unwrap(), genome);
    }

    #[test]
    fn test_missing_weight_is_rejected() {
        let mut model = AiModel::new("test".to_owned(), &Genome::default(), 1, 0);
        model.weights.remove(Genome::NAMES[3]);
        let err = model.to_genome().unwrap_err();
        assert!(err.to_string().contains(Genome::NAMES[3]));
    }

    #[test]
    fn test_unknown_weight_is_rejected() {
        let mut model = AiModel::new("test".to_owned(), &Genome::default(), 1, 0);
        model.weights.insert("pointsForNothing".to_owned(), 1.0);
        assert!(model.to_genome().is_err());
    }
}
