//! Hardware profile to model candidate chain

use std::sync::Arc;

use dashmap::DashSet;

use crate::config::AppConfig;
use crate::config::ModelsConfig;
use crate::models::HardwareProfile;

/// Ordered fallback sequence of models, most capable first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidateChain {
    profile: HardwareProfile,
    models: Arc<[String]>,
}

impl ModelCandidateChain {
    pub fn new(profile: HardwareProfile, models: Vec<String>) -> Self {
        Self {
            profile,
            models: models.into(),
        }
    }

    pub const fn profile(&self) -> HardwareProfile {
        self.profile
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn primary(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(String::as_str)
    }
}

/// Resolves the candidate chain for a hardware profile; no I/O
#[derive(Debug, Clone)]
pub struct ModelSelector {
    gpu: ModelCandidateChain,
    cpu: ModelCandidateChain,
}

impl ModelSelector {
    pub fn new(gpu: Vec<String>, cpu: Vec<String>) -> Self {
        Self {
            gpu: ModelCandidateChain::new(HardwareProfile::Gpu, gpu),
            cpu: ModelCandidateChain::new(HardwareProfile::Cpu, cpu),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.models.gpu.clone(), config.models.cpu.clone())
    }

    pub fn resolve_chain(&self, profile: HardwareProfile) -> ModelCandidateChain {
        match profile {
            HardwareProfile::Gpu => self.gpu.clone(),
            HardwareProfile::Cpu => self.cpu.clone(),
        }
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        let models = ModelsConfig::default();
        Self::new(models.gpu, models.cpu)
    }
}

/// Candidates that failed during this session
///
/// Owned by one orchestrator instance. Marked candidates are skipped, not
/// removed from their chain, until [`CandidateAvailability::reset`].
#[derive(Debug, Default)]
pub struct CandidateAvailability {
    unavailable: DashSet<String>,
}

impl CandidateAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the model was not already marked
    pub fn mark_unavailable(&self, model: &str) -> bool {
        self.unavailable.insert(model.to_string())
    }

    pub fn is_available(&self, model: &str) -> bool {
        !self.unavailable.contains(model)
    }

    /// Sorted snapshot of the marked models
    pub fn unavailable(&self) -> Vec<String> {
        let mut models: Vec<String> = self.unavailable.iter().map(|m| m.key().clone()).collect();
        models.sort();
        models
    }

    pub fn reset(&self) {
        self.unavailable.clear();
    }
}
