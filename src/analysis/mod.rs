/// Data analysis for the coastal monitoring service.
///
/// Submodules:
/// - `conditions`: classifies readings into categories, safety levels
///   and advisories.

pub mod conditions;
