//! Population statistics for the simulation.

use crate::config::SimulationOptions;
use crate::species::SpeciesId;
use serde::{Deserialize, Serialize};

/// Lifecycle counters for one species
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCounters {
    /// Agents created, at start-up or by reproduction
    pub created: u64,
    /// Successful reproductions
    pub reproduced: u64,
    /// Agents killed by being eaten
    pub consumed: u64,
    /// Agents removed from the world
    pub died: u64,
    /// Agents currently registered
    pub population: u64,
}

/// Per-species counters plus what the last step changed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Census {
    /// Iteration this census describes
    pub time: u64,
    /// Births in the last step
    pub births: usize,
    /// Deaths in the last step
    pub deaths: usize,
    species: Vec<SpeciesCounters>,
}

impl Census {
    /// Empty counters for `species_count` species
    pub fn new(species_count: usize) -> Self {
        Self {
            species: vec![SpeciesCounters::default(); species_count],
            ..Self::default()
        }
    }

    fn counters_mut(&mut self, species: SpeciesId) -> &mut SpeciesCounters {
        let idx = species.0 as usize;
        if idx >= self.species.len() {
            self.species.resize(idx + 1, SpeciesCounters::default());
        }
        &mut self.species[idx]
    }

    pub fn counters(&self, species: SpeciesId) -> Option<&SpeciesCounters> {
        self.species.get(species.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &SpeciesCounters)> {
        self.species
            .iter()
            .enumerate()
            .map(|(idx, c)| (SpeciesId(idx as u16), c))
    }

    /// Clear the per-step counters before a new step
    pub fn begin_step(&mut self, time: u64) {
        self.time = time;
        self.births = 0;
        self.deaths = 0;
    }

    pub fn record_created(&mut self, species: SpeciesId) {
        let c = self.counters_mut(species);
        c.created += 1;
        c.population += 1;
    }

    pub fn record_birth(&mut self, species: SpeciesId) {
        self.record_created(species);
        self.counters_mut(species).reproduced += 1;
        self.births += 1;
    }

    pub fn record_consumed(&mut self, species: SpeciesId) {
        self.counters_mut(species).consumed += 1;
    }

    pub fn record_death(&mut self, species: SpeciesId) {
        let c = self.counters_mut(species);
        c.died += 1;
        c.population = c.population.saturating_sub(1);
        self.deaths += 1;
    }

    /// Total population across species
    pub fn population(&self) -> u64 {
        self.species.iter().map(|c| c.population).sum()
    }

    /// Format as a one-line summary
    pub fn summary(&self, options: &SimulationOptions) -> String {
        let mut line = format!("T:{:6} | Pop:{:5}", self.time, self.population());
        for (id, c) in self.iter() {
            line.push_str(&format!(
                " | {}:{} (+{} -{})",
                options.species_name(id),
                c.population,
                c.created,
                c.died
            ));
        }
        line
    }
}

/// Census snapshots taken at a fixed interval
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CensusHistory {
    pub snapshots: Vec<Census>,
    pub interval: u64,
}

impl CensusHistory {
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval,
        }
    }

    /// Whether `time` falls on the recording interval
    pub fn is_due(&self, time: u64) -> bool {
        self.interval > 0 && time % self.interval == 0
    }

    pub fn record(&mut self, census: Census) {
        self.snapshots.push(census);
    }

    /// Population of one species over time
    pub fn population_series(&self, species: SpeciesId) -> Vec<(u64, u64)> {
        self.snapshots
            .iter()
            .map(|s| (s.time, s.counters(species).map_or(0, |c| c.population)))
            .collect()
    }

    /// Save history to a JSON file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_census_counters() {
        let mut census = Census::new(2);
        census.record_created(SpeciesId(0));
        census.record_created(SpeciesId(0));
        census.begin_step(1);
        census.record_birth(SpeciesId(1));
        census.record_consumed(SpeciesId(0));
        census.record_death(SpeciesId(0));

        let wolves = census.counters(SpeciesId(0)).unwrap();
        assert_eq!((wolves.created, wolves.died, wolves.population), (2, 1, 1));
        assert_eq!(wolves.consumed, 1);
        assert_eq!(census.counters(SpeciesId(1)).unwrap().reproduced, 1);
        assert_eq!((census.births, census.deaths), (1, 1));
        assert_eq!(census.population(), 2);
    }

    #[test]
    fn test_history_series() {
        let mut history = CensusHistory::new(10);
        assert!(history.is_due(20));
        assert!(!history.is_due(21));

        for i in 0..3u64 {
            let mut census = Census::new(1);
            census.time = i * 10;
            for _ in 0..=i {
                census.record_created(SpeciesId(0));
            }
            history.record(census);
        }

        assert_eq!(
            history.population_series(SpeciesId(0)),
            vec![(0, 1), (10, 2), (20, 3)]
        );
    }

    #[test]
    fn test_history_json_roundtrip() {
        let mut history = CensusHistory::new(5);
        history.record(Census::new(3));
        let path = std::env::temp_dir().join("trophic_census_history_test.json");
        let path = path.to_string_lossy().to_string();

        history.save(&path).unwrap();
        let loaded = CensusHistory::load(&path).unwrap();
        assert_eq!(loaded.interval, 5);
        assert_eq!(loaded.snapshots.len(), 1);
        std::fs::remove_file(&path).ok();
    }
}
