/*! Integration tests for cfgmgmt.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * - helpers: Shared fixtures (temp archive layout, schema, fake system)
 * - scenarios: End-to-end flows from boot bring-up to rollback
 * - properties: Quantified invariants over generated trees
 * - session: File-backed sessions committing through the engine
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("cfgmgmt=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod properties;
mod scenarios;
mod session;
