// 8.4 engine/diff.rs: resolve named diff sides to snapshots and compare them.

use std::sync::Arc;

use super::core::{ConfigEngine, EngineState};
use super::results::ConfigError;
use crate::diff::{compute, DiffResult, DiffTarget};
use crate::domains::ConfigDomain;
use crate::item::Snapshot;

impl<D: ConfigDomain> ConfigEngine<D> {
    pub fn diff(&self, from: &DiffTarget, to: &DiffTarget) -> Result<DiffResult<D::Payload>, ConfigError> {
        // both sides from one read so a concurrent publish can't land between them
        let state = self.read();
        let before = Self::side(&state, from)?;
        let after = Self::side(&state, to)?;
        Ok(compute(&before, &after))
    }

    /// What the next publish would change.
    pub fn pending_diff(&self) -> DiffResult<D::Payload> {
        let state = self.read();
        compute(&state.repo.published(), &state.repo.effective())
    }

    fn side(state: &EngineState<D>, target: &DiffTarget) -> Result<Arc<Snapshot<D::Payload>>, ConfigError> {
        match target {
            DiffTarget::Draft => Ok(Arc::new(state.repo.effective())),
            DiffTarget::Published => Ok(state.repo.published()),
            DiffTarget::Version(reference) => Ok(Arc::clone(&state.resolve(reference)?.snapshot)),
        }
    }
}
