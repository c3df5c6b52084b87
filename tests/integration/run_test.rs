//! Integration tests for container startup.
//!
//! These tests are implemented in:
//! `crates/whale-runtime/tests/e2e_test.rs`
//!
//! Covered scenarios:
//! - `pipeline_descriptor_survives_the_stage_boundary`: Save/load across both stages
//! - `pipeline_mask_covers_exactly_the_requested_kinds`: Clone flag resolution
//! - `pipeline_overlay_paths_are_populated_and_staged`: Overlay layout under the state dir
//! - `pipeline_default_volume_is_the_read_only_resolver`: Implicit resolv.conf binding
//! - `pipeline_caller_mapping_overrides_the_resolver_binding`: Volume conflict handling
//!
//! The privileged half of the pipeline (overlay mount, device nodes,
//! pivot_root, cgroup writes against /sys/fs/cgroup, the final exec)
//! requires root and real namespaces; run those scenarios manually:
//!
//! ```text
//! whale run --image debian -- /bin/echo hi
//! ```
