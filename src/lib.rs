//! Workspace root package. Carries repository tooling (pre-commit hooks);
//! the Lambda handlers live under `crates/`.
